//! End-to-end behavior of the filtering entry points.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use sift::{Expression, FilterError, FilterOptions, Sift};

fn options() -> FilterOptions {
    FilterOptions::default()
}

fn names(items: &[&Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item["name"].as_str().map(str::to_string))
        .collect()
}

fn ids(items: &[&Value]) -> Vec<i64> {
    items.iter().filter_map(|item| item["id"].as_i64()).collect()
}

fn users() -> Vec<Value> {
    vec![
        json!({"name": "Alice", "age": 30, "city": "Berlin", "email": "alice@example.com"}),
        json!({"name": "Bob", "age": null, "city": "Paris", "email": "bob@test.org"}),
        json!({"name": "Carol", "age": 22, "city": "Berlin", "email": "carol@example.com"}),
        json!({"name": "Dave", "age": 41, "city": "Bern", "email": "dave@example.com"}),
        json!({"name": "Eve", "city": "Madrid", "email": "eve@test.org"}),
    ]
}

// ============================================================================
// Logical nesting
// ============================================================================

fn logical_fixture() -> Vec<Value> {
    vec![
        json!({"id": 1, "active": true, "value": 10}),
        json!({"id": 2, "active": true, "value": 20}),
        json!({"id": 3, "active": false, "value": 40}),
        json!({"id": 4, "active": false, "value": 30}),
        json!({"id": 5, "active": true, "value": 5}),
    ]
}

#[test]
fn nested_or_of_ands() {
    let data = logical_fixture();
    let expr = json!({"$or": [
        {"$and": [{"active": true}, {"value": {"$lt": 15}}]},
        {"$and": [{"active": false}, {"value": {"$gt": 35}}]},
    ]});
    let out = Sift::new().filter(&data, expr, &options()).unwrap();
    assert_eq!(ids(&out), vec![1, 3, 5]);
}

#[test]
fn logical_inside_a_field() {
    let data = logical_fixture();
    let expr = json!({"value": {"$or": [{"$lt": 10}, {"$gt": 35}]}});
    let out = Sift::new().filter(&data, expr, &options()).unwrap();
    assert_eq!(ids(&out), vec![3, 5]);
}

#[test]
fn not_is_the_complement() {
    let data = logical_fixture();
    let engine = Sift::new();
    let inner = json!({"value": {"$gte": 20}});
    let yes = engine.filter(&data, &inner, &options()).unwrap();
    let no = engine.filter(&data, json!({"$not": inner}), &options()).unwrap();
    assert_eq!(ids(&yes), vec![2, 3, 4]);
    assert_eq!(ids(&no), vec![1, 5]);
}

#[test]
fn malformed_and_names_the_operator() {
    let err = Sift::new()
        .filter(&logical_fixture(), json!({"$and": {"active": true}}), &options())
        .unwrap_err();
    match err {
        FilterError::Operator { operator, .. } => assert_eq!(operator, "$and"),
        other => panic!("expected an operator error, got {other:?}"),
    }
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn wildcards() {
    let data = vec![json!({"city": "Berlin"}), json!({"city": "Berln"})];
    let engine = Sift::new();

    let out = engine.filter(&data, json!({"city": "B__lin"}), &options()).unwrap();
    assert_eq!(out, vec![&data[0]]);

    let out = engine.filter(&data, json!({"city": "%erli%"}), &options()).unwrap();
    assert_eq!(out, vec![&data[0]]);
}

#[test]
fn case_sensitivity() {
    let data = vec![json!({"n": "BERLIN"})];
    let engine = Sift::new();
    assert_eq!(engine.filter(&data, "berlin", &options()).unwrap().len(), 1);
    assert!(engine
        .filter(&data, "berlin", &options().case_sensitive(true))
        .unwrap()
        .is_empty());
}

#[test]
fn negated_literal_and_membership() {
    let data = users();
    let engine = Sift::new();
    let out = engine.filter(&data, json!({"city": "!Berlin"}), &options()).unwrap();
    assert_eq!(names(&out), vec!["Bob", "Dave", "Eve"]);

    let out = engine
        .filter(&data, json!({"city": ["Paris", "Madrid"]}), &options())
        .unwrap();
    assert_eq!(names(&out), vec!["Bob", "Eve"]);
}

#[test]
fn nested_and_dotted_paths() {
    let data = vec![
        json!({"id": 1, "address": {"city": "Berlin", "geo": {"zip": "10115"}}}),
        json!({"id": 2, "address": {"city": "Hamburg", "geo": {"zip": "20095"}}}),
    ];
    let engine = Sift::new();
    let out = engine
        .filter(&data, json!({"address": {"city": "Berlin"}}), &options())
        .unwrap();
    assert_eq!(ids(&out), vec![1]);
    let out = engine
        .filter(&data, json!({"address.geo.zip": {"$startsWith": "20"}}), &options())
        .unwrap();
    assert_eq!(ids(&out), vec![2]);
}

#[test]
fn object_expectations_match_within_one_element() {
    let data = vec![
        json!({"id": 1, "orders": [{"status": "paid", "total": 1}, {"status": "open", "total": 5}]}),
        json!({"id": 2, "orders": [{"status": "paid", "total": 5}]}),
    ];
    let engine = Sift::new();

    let split = json!({"orders": {"status": "paid", "total": 5}});
    let out = engine.filter(&data, split.clone(), &options()).unwrap();
    assert_eq!(ids(&out), vec![2]);
    let debug = engine.filter_debug(&data, split, &options()).unwrap();
    assert_eq!(debug.stats.matched, 1);

    let out = engine
        .filter(&data, json!({"orders": {"status": "paid", "total": 1}}), &options())
        .unwrap();
    assert_eq!(ids(&out), vec![1]);

    let out = engine.filter(&data, json!({"orders": {"$size": 2}}), &options()).unwrap();
    assert_eq!(ids(&out), vec![1]);
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn string_operators() {
    let data = users();
    let engine = Sift::new();
    let out = engine
        .filter(&data, json!({"email": {"$endsWith": "@TEST.org"}}), &options())
        .unwrap();
    assert_eq!(names(&out), vec!["Bob", "Eve"]);

    // `$regex` takes its case sensitivity from its flags only.
    let out = engine
        .filter(&data, json!({"name": {"$regex": "^[a-c]"}}), &options())
        .unwrap();
    assert!(out.is_empty());

    let out = engine
        .filter(&data, json!({"name": {"$regex": {"pattern": "^[a-c]", "flags": "i"}}}), &options())
        .unwrap();
    assert_eq!(names(&out), vec!["Alice", "Bob", "Carol"]);

    let out = engine
        .filter(&data, json!({"name": {"$match": "^[a-c]"}}), &options())
        .unwrap();
    assert_eq!(names(&out), vec!["Alice", "Bob", "Carol"]);
}

#[test]
fn geo_zero_distance() {
    let data = vec![
        json!({"id": 1, "at": {"lat": 52.52, "lng": 13.405}}),
        json!({"id": 2, "at": {"lat": 52.5201, "lng": 13.405}}),
    ];
    let expr = json!({"at": {"$near": {"center": {"lat": 52.52, "lng": 13.405}, "maxDistanceMeters": 0}}});
    let out = Sift::new().filter(&data, expr, &options()).unwrap();
    assert_eq!(ids(&out), vec![1]);
}

#[test]
fn geo_operators_fan_out_over_arrays() {
    let data = vec![
        json!({"id": 1, "stops": [{"lat": 48.85, "lng": 2.35}, {"lat": 52.52, "lng": 13.405}]}),
        json!({"id": 2, "stops": [{"lat": 48.85, "lng": 2.35}]}),
    ];
    let expr = json!({"stops": {"$near": {"center": {"lat": 52.52, "lng": 13.405}, "maxDistanceMeters": 1000}}});
    let out = Sift::new().filter(&data, expr, &options()).unwrap();
    assert_eq!(ids(&out), vec![1]);
}

#[test]
fn geo_out_of_range_coordinates_fail() {
    let expr = json!({"at": {"$near": {"center": {"lat": 95.0, "lng": 0.0}, "maxDistanceMeters": 10}}});
    let err = Sift::new().filter(&users(), expr, &options()).unwrap_err();
    assert!(matches!(err, FilterError::Geospatial(_)));
}

#[test]
fn datetime_operators_use_the_fixed_clock() {
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    let data = vec![
        json!({"id": 1, "at": "2024-06-15T08:00:00Z", "born": "2000-01-01"}),
        json!({"id": 2, "at": "2024-06-10T08:00:00Z", "born": "2010-06-16"}),
        json!({"id": 3, "at": "2024-06-17T23:30:00Z", "born": "1990-06-15"}),
    ];
    let engine = Sift::new();
    let opts = options().now(now);

    let recent = engine.filter(&data, json!({"at": {"$recent": {"days": 1}}}), &opts).unwrap();
    assert_eq!(ids(&recent), vec![1]);

    let upcoming = engine.filter(&data, json!({"at": {"$upcoming": {"days": 3}}}), &opts).unwrap();
    assert_eq!(ids(&upcoming), vec![3]);

    let adults = engine.filter(&data, json!({"born": {"$age": {"min": 18}}}), &opts).unwrap();
    assert_eq!(ids(&adults), vec![1, 3]);

    let weekend = engine.filter(&data, json!({"at": {"$isWeekend": true}}), &opts).unwrap();
    assert_eq!(ids(&weekend), vec![1]);

    let night = engine
        .filter(&data, json!({"at": {"$timeOfDay": {"start": 22, "end": 6}}}), &opts)
        .unwrap();
    assert_eq!(ids(&night), vec![3]);
}

#[test]
fn datetime_operators_fan_out_over_arrays() {
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    let data = vec![
        json!({"id": 1, "visits": ["2024-06-15"]}),
        json!({"id": 2, "visits": ["2024-06-13", "2024-06-14"]}),
        json!({"id": 3, "visits": []}),
    ];
    let opts = options().now(now);
    let engine = Sift::new();

    let weekend = engine.filter(&data, json!({"visits": {"$isWeekend": true}}), &opts).unwrap();
    assert_eq!(ids(&weekend), vec![1]);

    let recent = engine.filter(&data, json!({"visits": {"$recent": {"days": 2}}}), &opts).unwrap();
    assert_eq!(ids(&recent), vec![1, 2]);
}

#[test]
fn unknown_operators_are_all_reported() {
    let err = Sift::new()
        .filter(&users(), json!({"age": {"$gtx": 1}, "city": {"$nope": "x"}}), &options())
        .unwrap_err();
    assert_eq!(err.violations().len(), 2);
}

// ============================================================================
// Ordering and limit
// ============================================================================

#[test]
fn order_by_age_puts_nulls_last() {
    let data = users();
    let out = Sift::new()
        .filter(&data, json!({}), &FilterOptions::from_json(&json!({"orderBy": "age"})).unwrap())
        .unwrap();
    assert_eq!(names(&out), vec!["Carol", "Alice", "Dave", "Bob", "Eve"]);
}

#[test]
fn order_then_limit() {
    let data = users();
    let opts = FilterOptions::from_json(&json!({
        "orderBy": [{"field": "city", "direction": "desc"}, "name"],
        "limit": 3
    }))
    .unwrap();
    let out = Sift::new().filter(&data, json!({}), &opts).unwrap();
    assert_eq!(names(&out), vec!["Bob", "Eve", "Dave"]);
}

#[test]
fn bad_configuration() {
    let engine = Sift::new();
    let err = engine
        .filter(&users(), json!({}), &options().max_depth(11))
        .unwrap_err();
    assert!(matches!(err, FilterError::Configuration(_)));

    assert!(FilterOptions::from_json(&json!({"orderBy": {"field": "age", "direction": "up"}})).is_err());
    assert!(FilterOptions::from_json(&json!({"colour": true})).is_err());
}

// ============================================================================
// Drivers
// ============================================================================

#[test]
fn filter_first_stops_early() {
    let visits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&visits);
    let expr = Expression::predicate(move |item: &Value| {
        counter.fetch_add(1, Ordering::Relaxed);
        item["value"].as_i64().is_some_and(|v| v >= 20)
    });
    let data = logical_fixture();

    let out = Sift::new().filter_first(&data, &expr, 2, &options()).unwrap();
    assert_eq!(ids(&out), vec![2, 3]);
    assert_eq!(visits.load(Ordering::Relaxed), 3);

    visits.store(0, Ordering::Relaxed);
    let out = Sift::new().filter_first(&data, &expr, 10, &options()).unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(visits.load(Ordering::Relaxed), data.len());
}

#[test]
fn lazy_consumes_only_what_is_asked() {
    let pulled = AtomicUsize::new(0);
    let source = (0..).map(|n| {
        pulled.fetch_add(1, Ordering::Relaxed);
        json!({"n": n})
    });
    let found: Vec<Value> = Sift::new()
        .filter_lazy::<Value, _, _>(source, json!({"n": {"$gte": 3}}), &options())
        .unwrap()
        .take(2)
        .collect();
    assert_eq!(found, vec![json!({"n": 3}), json!({"n": 4})]);
    assert_eq!(pulled.load(Ordering::Relaxed), 5);
}

#[test]
fn lazy_chunks_flush_the_tail() {
    let data: Vec<Value> = (1..=7).map(|n| json!({"n": n})).collect();
    let sizes: Vec<usize> = Sift::new()
        .filter_lazy_chunked::<Value, _, _>(&data, json!({}), 3, &options())
        .unwrap()
        .map(|chunk| chunk.len())
        .collect();
    assert_eq!(sizes, vec![3, 3, 1]);
}

#[test]
fn zero_sizes_fail_before_traversal() {
    let data = logical_fixture();
    let engine = Sift::new();
    let err = engine.filter_chunked(&data, json!({}), 0, &options()).unwrap_err();
    assert!(matches!(err, FilterError::Validation { .. }));
    assert!(engine.filter_first(&data, json!({}), 0, &options()).is_err());
}

#[test]
fn debug_pass_reports_counts() {
    let data = logical_fixture();
    let result = Sift::new()
        .filter_debug(
            &data,
            json!({"$or": [{"active": false}, {"value": {"$lt": 8}}]}),
            &options(),
        )
        .unwrap();
    assert_eq!(ids(&result.items), vec![3, 4, 5]);
    assert_eq!(result.stats.matched, 3);
    assert_eq!(result.stats.total, 5);
    assert_eq!(result.tree.matched, 3);
    assert_eq!(result.tree.children.len(), 2);
    assert_eq!(result.tree.children[0].matched, 2);
    assert_eq!(result.tree.children[0].total, 5);
}

#[test]
fn free_functions_share_the_global_cache() {
    let data = logical_fixture();
    let expr = json!({"active": true, "value": {"$gte": 10}});
    let out = sift::filter(&data, &expr, &options().enable_cache(true)).unwrap();
    assert_eq!(ids(&out), vec![1, 2]);
    assert!(sift::filter_cache_stats().predicates >= 1);
    assert!(sift::filter_exists(&data, &expr, &options()).unwrap());
    assert_eq!(sift::filter_count(&data, json!({"active": true}), &options()).unwrap(), 3);
}

#[test]
fn filter_json_rejects_non_collections() {
    let err = sift::filter_json(&json!("nope"), json!({}), &options()).unwrap_err();
    assert!(matches!(err, FilterError::TypeMismatch { actual: "string", .. }));
}
