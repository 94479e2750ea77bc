//! Cross-type value comparison
//!
//! The ranking is asymmetric in places (Boolean ranks above Text, Empty is
//! only ordered against Text) and is kept that way for compatibility with
//! existing workbooks. Sorting and lookup functions depend on it.

use super::{Value, ValueKind, ValueType};
use std::cmp::Ordering;

pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    compare_numbers(a, b) == Ordering::Equal
}

/// Compare two floats with an epsilon tolerance
pub(crate) fn compare_numbers(a: f64, b: f64) -> Ordering {
    let diff = a - b;
    if diff > f64::EPSILON {
        Ordering::Greater
    } else if diff < -f64::EPSILON {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

impl Value {
    /// Spreadsheet ordering of two values
    ///
    /// - Errors rank below everything else; two errors are equal only when
    ///   they carry the same code, otherwise the left one ranks higher.
    /// - Empty equals Empty, and equals Text only when the text is empty.
    /// - Boolean ranks above Integer, Float and Text.
    /// - Integer and Float rank below Text.
    /// - Text compares case-sensitively.
    /// - Any pair not listed compares equal; [`allow_comparison`] rejects
    ///   those pairs.
    ///
    /// [`allow_comparison`]: Value::allow_comparison
    pub fn compare(&self, other: &Value) -> Ordering {
        use ValueKind::*;
        match (&self.kind, &other.kind) {
            (Error(a), Error(b)) => {
                if a == b {
                    Ordering::Equal
                } else {
                    Ordering::Greater
                }
            }
            (Error(_), _) => Ordering::Less,
            (_, Error(_)) => Ordering::Greater,

            (Empty, Empty) => Ordering::Equal,
            (Empty, Text(t)) => {
                if t.is_empty() {
                    Ordering::Equal
                } else {
                    Ordering::Less
                }
            }

            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Boolean(_), Integer(_) | Float(_) | Text(_)) => Ordering::Greater,

            (Integer(a), Integer(b)) => a.cmp(b),
            (Integer(_) | Float(_), Boolean(_)) => Ordering::Less,
            (Integer(_) | Float(_), Integer(_) | Float(_)) => {
                let a = self.as_number().unwrap_or_default();
                let b = other.as_number().unwrap_or_default();
                compare_numbers(a, b)
            }
            (Integer(_) | Float(_), Text(_)) => Ordering::Less,

            (Text(t), Empty) => {
                if t.is_empty() {
                    Ordering::Equal
                } else {
                    Ordering::Greater
                }
            }
            (Text(_), Boolean(_)) => Ordering::Less,
            (Text(_), Integer(_) | Float(_)) => Ordering::Greater,
            (Text(a), Text(b)) => a.cmp(b),

            _ => Ordering::Equal,
        }
    }

    /// Whether [`compare`](Value::compare) is meaningful for this pair
    pub fn allow_comparison(&self, other: &Value) -> bool {
        use ValueType::*;
        matches!(
            (self.value_type(), other.value_type()),
            (Empty, Empty | Text)
                | (Boolean | Integer | Float | Complex, Boolean | Integer | Float | Text)
                | (Text, Empty | Boolean | Integer | Float | Complex | Text)
                | (Error, Error)
        )
    }

    /// Gated equality: false for pairs that cannot be compared
    pub fn equal(&self, other: &Value) -> bool {
        self.allow_comparison(other) && self.compare(other) == Ordering::Equal
    }

    /// Gated less-than: false for pairs that cannot be compared
    pub fn less(&self, other: &Value) -> bool {
        self.allow_comparison(other) && self.compare(other) == Ordering::Less
    }

    /// Gated greater-than: false for pairs that cannot be compared
    pub fn greater(&self, other: &Value) -> bool {
        self.allow_comparison(other) && self.compare(other) == Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use proptest::prelude::*;

    #[test]
    fn test_errors_rank_lowest() {
        let err = Value::error(ErrorCode::Name);
        assert_eq!(err.compare(&Value::empty()), Ordering::Less);
        assert_eq!(Value::integer(-100).compare(&err), Ordering::Greater);
        assert_eq!(err.compare(&Value::error(ErrorCode::Name)), Ordering::Equal);
        assert_ne!(err.compare(&Value::error(ErrorCode::Value)), Ordering::Equal);
        assert_ne!(
            Value::error(ErrorCode::Value).compare(&err),
            Ordering::Equal
        );
    }

    #[test]
    fn test_empty_against_text() {
        assert_eq!(Value::empty().compare(&Value::text("")), Ordering::Equal);
        assert_eq!(Value::empty().compare(&Value::text("x")), Ordering::Less);
        assert_eq!(Value::text("x").compare(&Value::empty()), Ordering::Greater);
        assert_eq!(Value::empty().compare(&Value::empty()), Ordering::Equal);
    }

    #[test]
    fn test_boolean_ranks_above_numbers_and_text() {
        let t = Value::boolean(true);
        let f = Value::boolean(false);
        assert_eq!(t.compare(&Value::integer(i64::MAX)), Ordering::Greater);
        assert_eq!(f.compare(&Value::float(1e300)), Ordering::Greater);
        assert_eq!(f.compare(&Value::text("zzz")), Ordering::Greater);
        assert_eq!(Value::text("zzz").compare(&f), Ordering::Less);
        assert_eq!(f.compare(&t), Ordering::Less);
        assert_eq!(t.compare(&t), Ordering::Equal);
    }

    #[test]
    fn test_numbers_below_text() {
        assert_eq!(Value::integer(5).compare(&Value::text("1")), Ordering::Less);
        assert_eq!(Value::text("1").compare(&Value::float(5.0)), Ordering::Greater);
    }

    #[test]
    fn test_numeric_comparison() {
        assert_eq!(Value::integer(2).compare(&Value::integer(3)), Ordering::Less);
        assert_eq!(Value::integer(3).compare(&Value::float(3.0)), Ordering::Equal);
        assert_eq!(
            Value::float(0.1 + 0.2).compare(&Value::float(0.3)),
            Ordering::Equal
        );
    }

    #[test]
    fn test_text_is_case_sensitive() {
        assert_eq!(Value::text("a").compare(&Value::text("b")), Ordering::Less);
        assert_ne!(Value::text("a").compare(&Value::text("A")), Ordering::Equal);
    }

    #[test]
    fn test_unlisted_pairs_compare_equal() {
        assert_eq!(Value::empty().compare(&Value::integer(0)), Ordering::Equal);
        assert_eq!(Value::empty().compare(&Value::integer(5)), Ordering::Equal);
        assert!(!Value::empty().allow_comparison(&Value::integer(5)));
        assert!(!Value::empty().equal(&Value::integer(5)));
    }

    #[test]
    fn test_allow_comparison_table() {
        let empty = Value::empty();
        let b = Value::boolean(true);
        let n = Value::integer(1);
        let t = Value::text("t");
        let e = Value::error(ErrorCode::Na);

        assert!(empty.allow_comparison(&t));
        assert!(!empty.allow_comparison(&b));
        assert!(b.allow_comparison(&n));
        assert!(!n.allow_comparison(&empty));
        assert!(t.allow_comparison(&empty));
        assert!(e.allow_comparison(&e));
        assert!(!e.allow_comparison(&n));
        assert!(!n.allow_comparison(&e));
    }

    #[test]
    fn test_gated_predicates() {
        assert!(Value::integer(1).less(&Value::integer(2)));
        assert!(Value::integer(2).greater(&Value::float(1.5)));
        assert!(Value::text("abc").equal(&Value::text("abc")));
        assert!(!Value::error(ErrorCode::Na).less(&Value::integer(1)));
    }

    proptest! {
        #[test]
        fn prop_integer_compare_is_antisymmetric(a in any::<i64>(), b in any::<i64>()) {
            let x = Value::integer(a);
            let y = Value::integer(b);
            prop_assert_eq!(x.compare(&y), y.compare(&x).reverse());
        }

        #[test]
        fn prop_boolean_outranks_any_integer(n in any::<i64>(), b in any::<bool>()) {
            prop_assert_eq!(Value::boolean(b).compare(&Value::integer(n)), Ordering::Greater);
            prop_assert_eq!(Value::integer(n).compare(&Value::boolean(b)), Ordering::Less);
        }

        #[test]
        fn prop_text_compare_matches_str_order(a in "[a-zA-Z]{0,8}", b in "[a-zA-Z]{0,8}") {
            prop_assert_eq!(Value::text(&a).compare(&Value::text(&b)), a.cmp(&b));
        }
    }
}
