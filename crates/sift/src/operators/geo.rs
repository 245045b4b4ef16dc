//! Geospatial operators: `$near`, `$geoBox`, `$geoPolygon`.
//!
//! Points are `{lat, lng}` objects (`lon` is accepted for `lng`). Payload
//! coordinates are validated strictly; record coordinates that are missing
//! or out of range simply do not match.

use serde_json::{Map, Value};

use crate::error::{FilterError, Result};
use crate::op::Op;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a point, rejecting out-of-range coordinates.
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(FilterError::Geospatial(format!(
                "latitude {} is outside [-90, 90]",
                lat
            )));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(FilterError::Geospatial(format!(
                "longitude {} is outside [-180, 180]",
                lng
            )));
        }
        Ok(GeoPoint { lat, lng })
    }

    /// Reads a point from a record value, if it is a valid one.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let (lat, lng) = read_coordinates(map)?;
        GeoPoint::new(lat, lng).ok()
    }

    fn from_payload(op: Op, value: Option<&Value>, what: &str) -> Result<Self> {
        let (lat, lng) = value
            .and_then(Value::as_object)
            .and_then(read_coordinates)
            .ok_or_else(|| {
                FilterError::operator(
                    op.as_str(),
                    format!("'{}' must be an object with numeric 'lat' and 'lng'", what),
                )
            })?;
        GeoPoint::new(lat, lng)
    }
}

fn read_coordinates(map: &Map<String, Value>) -> Option<(f64, f64)> {
    let lat = map.get("lat")?.as_f64()?;
    let lng = map.get("lng").or_else(|| map.get("lon"))?.as_f64()?;
    Some((lat, lng))
}

/// Axis-aligned latitude/longitude rectangle.
///
/// A box whose southwest longitude is east of its northeast longitude
/// crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub southwest: GeoPoint,
    pub northeast: GeoPoint,
}

impl BoundingBox {
    pub fn contains(&self, p: &GeoPoint) -> bool {
        let lat_ok = p.lat >= self.southwest.lat && p.lat <= self.northeast.lat;
        let lng_ok = if self.southwest.lng <= self.northeast.lng {
            p.lng >= self.southwest.lng && p.lng <= self.northeast.lng
        } else {
            p.lng >= self.southwest.lng || p.lng <= self.northeast.lng
        };
        lat_ok && lng_ok
    }
}

/// Closed polygon given by its vertices in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<GeoPoint>,
}

impl Polygon {
    pub fn new(points: Vec<GeoPoint>) -> Result<Self> {
        if points.len() < 3 {
            return Err(FilterError::operator(
                Op::GeoPolygon.as_str(),
                format!("a polygon needs at least 3 points, got {}", points.len()),
            ));
        }
        Ok(Polygon { points })
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Ray-casting point-in-polygon test (lng as x, lat as y).
    pub fn contains(&self, p: &GeoPoint) -> bool {
        let mut inside = false;
        let n = self.points.len();
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (&self.points[i], &self.points[j]);
            if (a.lat > p.lat) != (b.lat > p.lat)
                && p.lng < (b.lng - a.lng) * (p.lat - a.lat) / (b.lat - a.lat) + a.lng
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearQuery {
    pub center: GeoPoint,
    pub max_distance_m: f64,
    pub min_distance_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeoQuery {
    Near(NearQuery),
    Box(BoundingBox),
    Polygon(Polygon),
}

/// Great-circle distance between two points, in meters.
pub fn haversine_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

pub fn parse(op: Op, payload: &Value) -> Result<GeoQuery> {
    let map = super::expect_object(op, payload)?;
    match op {
        Op::Near => {
            let center = GeoPoint::from_payload(op, map.get("center"), "center")?;
            let max_distance_m = super::optional_number(op, map, "maxDistanceMeters")?
                .ok_or_else(|| FilterError::operator(op.as_str(), "'maxDistanceMeters' is required"))?;
            let min_distance_m = super::optional_number(op, map, "minDistanceMeters")?.unwrap_or(0.0);
            Ok(GeoQuery::Near(NearQuery {
                center,
                max_distance_m,
                min_distance_m,
            }))
        }
        Op::GeoBox => {
            let southwest = GeoPoint::from_payload(op, map.get("southwest"), "southwest")?;
            let northeast = GeoPoint::from_payload(op, map.get("northeast"), "northeast")?;
            if southwest.lat > northeast.lat {
                return Err(FilterError::Geospatial(format!(
                    "southwest latitude {} is north of northeast latitude {}",
                    southwest.lat, northeast.lat
                )));
            }
            Ok(GeoQuery::Box(BoundingBox {
                southwest,
                northeast,
            }))
        }
        _ => {
            let raw = map
                .get("points")
                .and_then(Value::as_array)
                .ok_or_else(|| FilterError::operator(op.as_str(), "'points' must be an array"))?;
            let points = raw
                .iter()
                .map(|p| GeoPoint::from_payload(op, Some(p), "points[]"))
                .collect::<Result<Vec<_>>>()?;
            Ok(GeoQuery::Polygon(Polygon::new(points)?))
        }
    }
}

/// Tests a record value. An array of points holds if any point does.
pub fn evaluate(query: &GeoQuery, actual: &Value) -> bool {
    if let Value::Array(items) = actual {
        return items.iter().any(|item| evaluate(query, item));
    }
    let Some(point) = GeoPoint::from_value(actual) else {
        return false;
    };
    match query {
        GeoQuery::Near(near) => {
            let distance = haversine_distance(&near.center, &point);
            distance <= near.max_distance_m && distance >= near.min_distance_m
        }
        GeoQuery::Box(bbox) => bbox.contains(&point),
        GeoQuery::Polygon(polygon) => polygon.contains(&point),
    }
}
