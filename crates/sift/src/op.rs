//! The operator vocabulary.
//!
//! The [`Op`] enum names every `$`-prefixed operator an expression may use,
//! grouped into families by the kind of value they inspect.

use std::cmp::Ordering;

/// Operator family, used for dispatch and for labelling debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Comparison,
    Array,
    String,
    Logical,
    Geo,
    DateTime,
}

/// A named operator as it appears on the wire (`$gt`, `$near`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // Comparison
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,

    // Array
    In,
    Nin,
    Contains,
    Size,

    // String
    StartsWith,
    EndsWith,
    Regex,
    Match,

    // Logical
    And,
    Or,
    Not,

    // Geospatial
    Near,
    GeoBox,
    GeoPolygon,

    // Datetime
    Recent,
    Upcoming,
    DayOfWeek,
    TimeOfDay,
    Age,
    IsWeekday,
    IsWeekend,
    IsBefore,
    IsAfter,
}

impl Op {
    /// Every operator, in declaration order.
    pub const ALL: [Op; 29] = [
        Op::Gt,
        Op::Gte,
        Op::Lt,
        Op::Lte,
        Op::Eq,
        Op::Ne,
        Op::In,
        Op::Nin,
        Op::Contains,
        Op::Size,
        Op::StartsWith,
        Op::EndsWith,
        Op::Regex,
        Op::Match,
        Op::And,
        Op::Or,
        Op::Not,
        Op::Near,
        Op::GeoBox,
        Op::GeoPolygon,
        Op::Recent,
        Op::Upcoming,
        Op::DayOfWeek,
        Op::TimeOfDay,
        Op::Age,
        Op::IsWeekday,
        Op::IsWeekend,
        Op::IsBefore,
        Op::IsAfter,
    ];

    /// Resolves a wire key such as `"$gte"`.
    pub fn from_key(key: &str) -> Option<Op> {
        Op::ALL.iter().copied().find(|op| op.as_str() == key)
    }

    /// Returns the wire name of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Gt => "$gt",
            Op::Gte => "$gte",
            Op::Lt => "$lt",
            Op::Lte => "$lte",
            Op::Eq => "$eq",
            Op::Ne => "$ne",
            Op::In => "$in",
            Op::Nin => "$nin",
            Op::Contains => "$contains",
            Op::Size => "$size",
            Op::StartsWith => "$startsWith",
            Op::EndsWith => "$endsWith",
            Op::Regex => "$regex",
            Op::Match => "$match",
            Op::And => "$and",
            Op::Or => "$or",
            Op::Not => "$not",
            Op::Near => "$near",
            Op::GeoBox => "$geoBox",
            Op::GeoPolygon => "$geoPolygon",
            Op::Recent => "$recent",
            Op::Upcoming => "$upcoming",
            Op::DayOfWeek => "$dayOfWeek",
            Op::TimeOfDay => "$timeOfDay",
            Op::Age => "$age",
            Op::IsWeekday => "$isWeekday",
            Op::IsWeekend => "$isWeekend",
            Op::IsBefore => "$isBefore",
            Op::IsAfter => "$isAfter",
        }
    }

    pub fn family(self) -> Family {
        match self {
            Op::Gt | Op::Gte | Op::Lt | Op::Lte | Op::Eq | Op::Ne => Family::Comparison,
            Op::In | Op::Nin | Op::Contains | Op::Size => Family::Array,
            Op::StartsWith | Op::EndsWith | Op::Regex | Op::Match => Family::String,
            Op::And | Op::Or | Op::Not => Family::Logical,
            Op::Near | Op::GeoBox | Op::GeoPolygon => Family::Geo,
            _ => Family::DateTime,
        }
    }

    /// Returns `true` for `$and`, `$or`, and `$not`.
    pub fn is_logical(self) -> bool {
        self.family() == Family::Logical
    }

    /// Evaluates an ordering operator given the ordering of actual vs. bound.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
            _ => false,
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operator_round_trips_through_its_key() {
        for op in Op::ALL {
            assert_eq!(Op::from_key(op.as_str()), Some(op));
        }
        assert_eq!(Op::from_key("$unknown"), None);
        assert_eq!(Op::from_key("gt"), None);
    }

    #[test]
    fn families() {
        assert_eq!(Op::Gte.family(), Family::Comparison);
        assert_eq!(Op::Nin.family(), Family::Array);
        assert_eq!(Op::Match.family(), Family::String);
        assert_eq!(Op::GeoPolygon.family(), Family::Geo);
        assert_eq!(Op::IsAfter.family(), Family::DateTime);
        assert!(Op::Not.is_logical());
        assert!(!Op::Ne.is_logical());
    }

    #[test]
    fn op_eval_ordering() {
        assert!(Op::Gt.eval_ordering(Ordering::Greater));
        assert!(!Op::Gt.eval_ordering(Ordering::Equal));
        assert!(Op::Gte.eval_ordering(Ordering::Equal));
        assert!(!Op::Gte.eval_ordering(Ordering::Less));
        assert!(Op::Lt.eval_ordering(Ordering::Less));
        assert!(Op::Lte.eval_ordering(Ordering::Equal));
        assert!(!Op::Lte.eval_ordering(Ordering::Greater));
        assert!(Op::Ne.eval_ordering(Ordering::Less));
        assert!(!Op::Contains.eval_ordering(Ordering::Equal));
    }

    #[test]
    fn op_display() {
        assert_eq!(Op::StartsWith.to_string(), "$startsWith");
        assert_eq!(Op::GeoBox.to_string(), "$geoBox");
    }
}
