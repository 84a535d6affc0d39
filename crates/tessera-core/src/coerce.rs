//! Type coercion between wire values and cell values
//!
//! Both wire codecs lower their native representation into [`WireValue`] and
//! call [`coerce`]; this is the only place the column type table lives.
//!
//! | Column type | Accepts        | Stored as                              |
//! |-------------|----------------|----------------------------------------|
//! | String      | text           | text                                   |
//! | Bool        | boolean        | boolean                                |
//! | Number      | int, real      | integer when whole, otherwise real     |
//! | Currency    | int, real      | always real                            |
//! | any         | null           | absent                                 |

use crate::error::CellError;
use crate::table::ColumnDef;
use crate::types::{ColumnType, Value};

/// Shape of a value as it arrived on a wire, before type checking
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WireValue<'a> {
    /// Value field present but carrying no kind
    Unset,
    /// Explicit null marker
    Null,
    Text(&'a str),
    Bool(bool),
    Int(i64),
    Real(f64),
    /// A shape no column accepts (JSON arrays and objects)
    Unsupported(&'static str),
}

impl<'a> From<&'a Value> for WireValue<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Text(s) => WireValue::Text(s),
            Value::Integer(n) => WireValue::Int(*n),
            Value::Real(x) => WireValue::Real(*x),
            Value::Boolean(b) => WireValue::Bool(*b),
            Value::Absent => WireValue::Null,
        }
    }
}

/// Check a wire value against a column and produce the cell value to store
pub fn coerce(wire: WireValue<'_>, column: &ColumnDef) -> Result<Value, CellError> {
    let mismatch = || CellError::TypeMismatch {
        expected: column.column_type,
    };

    match wire {
        WireValue::Unset => Err(CellError::MissingValue),
        WireValue::Null => Ok(Value::Absent),
        WireValue::Unsupported(_) => Err(mismatch()),
        WireValue::Text(s) => match column.column_type {
            ColumnType::String => Ok(Value::Text(s.to_string())),
            _ => Err(mismatch()),
        },
        WireValue::Bool(b) => match column.column_type {
            ColumnType::Bool => Ok(Value::Boolean(b)),
            _ => Err(mismatch()),
        },
        WireValue::Int(n) => match column.column_type {
            ColumnType::Number => Ok(Value::Integer(n)),
            ColumnType::Currency => Ok(Value::Real(n as f64)),
            _ => Err(mismatch()),
        },
        WireValue::Real(x) if !x.is_finite() => Err(mismatch()),
        WireValue::Real(x) => match column.column_type {
            ColumnType::Number => Ok(whole_number(x).map_or(Value::Real(x), Value::Integer)),
            ColumnType::Currency => Ok(Value::Real(x)),
            _ => Err(mismatch()),
        },
    }
}

/// `x` as an integer if it has no fractional part and fits in i64
fn whole_number(x: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or past it overflows i64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if x.is_finite() && x.fract() == 0.0 && x >= -LIMIT && x < LIMIT {
        Some(x as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(column_type: ColumnType) -> ColumnDef {
        ColumnDef::new("c", "C", column_type, 10).editable()
    }

    const ALL_TYPES: [ColumnType; 4] = [
        ColumnType::String,
        ColumnType::Number,
        ColumnType::Currency,
        ColumnType::Bool,
    ];

    #[test]
    fn test_number_collapses_whole_reals() {
        assert_eq!(
            coerce(WireValue::Real(42.0), &col(ColumnType::Number)),
            Ok(Value::Integer(42))
        );
        assert_eq!(
            coerce(WireValue::Real(42.5), &col(ColumnType::Number)),
            Ok(Value::Real(42.5))
        );
        assert_eq!(
            coerce(WireValue::Int(7), &col(ColumnType::Number)),
            Ok(Value::Integer(7))
        );
    }

    #[test]
    fn test_currency_always_real() {
        assert_eq!(
            coerce(WireValue::Real(42.0), &col(ColumnType::Currency)),
            Ok(Value::Real(42.0))
        );
        assert_eq!(
            coerce(WireValue::Int(600000), &col(ColumnType::Currency)),
            Ok(Value::Real(600000.0))
        );
    }

    #[test]
    fn test_huge_reals_stay_real() {
        let number = col(ColumnType::Number);
        assert_eq!(coerce(WireValue::Real(1e300), &number), Ok(Value::Real(1e300)));
        assert_eq!(
            coerce(WireValue::Real(-9_223_372_036_854_775_808.0), &number),
            Ok(Value::Integer(i64::MIN))
        );
    }

    #[test]
    fn test_non_finite_reals_rejected() {
        for t in ALL_TYPES {
            for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
                let err = coerce(WireValue::Real(x), &col(t)).unwrap_err();
                assert_eq!(err, CellError::TypeMismatch { expected: t });
            }
        }
        assert_eq!(
            coerce(WireValue::Real(f64::INFINITY), &col(ColumnType::Currency))
                .unwrap_err()
                .to_string(),
            "Expected numeric value"
        );
    }

    #[test]
    fn test_null_accepted_everywhere() {
        for t in ALL_TYPES {
            assert_eq!(coerce(WireValue::Null, &col(t)), Ok(Value::Absent));
        }
    }

    #[test]
    fn test_unset_is_missing_everywhere() {
        for t in ALL_TYPES {
            assert_eq!(coerce(WireValue::Unset, &col(t)), Err(CellError::MissingValue));
        }
    }

    #[test]
    fn test_mismatches() {
        let cases = [
            (WireValue::Int(1), ColumnType::String, "Expected string value"),
            (WireValue::Bool(true), ColumnType::String, "Expected string value"),
            (WireValue::Text("x"), ColumnType::Bool, "Expected boolean value"),
            (WireValue::Int(0), ColumnType::Bool, "Expected boolean value"),
            (WireValue::Text("1"), ColumnType::Number, "Expected numeric value"),
            (WireValue::Bool(false), ColumnType::Currency, "Expected numeric value"),
            (WireValue::Unsupported("array"), ColumnType::String, "Expected string value"),
        ];

        for (wire, t, message) in cases {
            let err = coerce(wire, &col(t)).unwrap_err();
            assert_eq!(err.to_string(), message, "{:?} -> {:?}", wire, t);
        }
    }

    #[test]
    fn test_value_round_trips_through_wire_shape() {
        let cases = [
            (Value::Text("a".into()), ColumnType::String),
            (Value::Integer(3), ColumnType::Number),
            (Value::Real(3.25), ColumnType::Number),
            (Value::Real(10.0), ColumnType::Currency),
            (Value::Boolean(true), ColumnType::Bool),
            (Value::Absent, ColumnType::Currency),
        ];

        for (value, t) in cases {
            assert_eq!(coerce(WireValue::from(&value), &col(t)), Ok(value.clone()));
        }
    }
}
