//! Conversion of statistic values into JSON-safe values.

use chrono::SecondsFormat;
use serde_json::{Number, Value};

use crate::error::{MetascribeError, Result};
use crate::schema::StatValue;

/// A float as a JSON number: integral values become integers, non-finite become null.
pub fn coerce_number(value: f64) -> Value {
    match StatValue::from_f64(value) {
        StatValue::Integer(i) => Value::Number(i.into()),
        _ => Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null),
    }
}

/// A statistic value as plain JSON.
///
/// Fails only when a value has no JSON form at all, naming the column and field.
pub fn coerce_stat(column: &str, field: &str, value: &StatValue) -> Result<Value> {
    let coerced = match value {
        StatValue::Integer(i) => Value::Number((*i).into()),
        StatValue::Float(x) => coerce_number(*x),
        StatValue::Boolean(b) => Value::Bool(*b),
        StatValue::Text(s) => Value::String(s.clone()),
        StatValue::Timestamp(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        StatValue::Decimal(s) => match s.trim().parse::<f64>() {
            Ok(x) if x.is_finite() => coerce_number(x),
            _ => {
                return Err(MetascribeError::Coercion {
                    column: column.to_string(),
                    field: field.to_string(),
                    value_type: format!("{} '{}'", value.type_name(), s),
                });
            }
        },
    };
    Ok(coerced)
}

/// An optional float; `None` becomes null.
pub(crate) fn coerce_optional(value: Option<f64>) -> Value {
    value.map(coerce_number).unwrap_or(Value::Null)
}
