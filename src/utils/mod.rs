//! Coercions for loosely typed JSON fields.

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Parse i64 from string, ignoring surrounding whitespace
pub fn parse_i64(s: &str) -> Option<i64> {
    s.trim().parse().ok()
}

/// Coerce a JSON value to an integer. `Ok(None)` for `null`.
pub fn coerce_i64(value: &Value) -> Result<Option<i64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(i64::from(*b))),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(truncate_f64))
            .map(Some)
            .ok_or_else(|| format!("integer out of range: {n}")),
        Value::String(s) => parse_i64(s)
            .map(Some)
            .ok_or_else(|| format!("invalid integer: {s:?}")),
        other => Err(format!("expected an integer, found {other}")),
    }
}

/// Truncate toward zero. `None` for non-finite values and values outside `i64`.
fn truncate_f64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range
    let in_range = f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64;
    in_range.then(|| f.trunc() as i64)
}

/// Text form of a scalar identifier, or `None` when the value is falsy.
/// Arrays, objects and `true` are not identifiers.
pub fn coerce_key(value: &Value) -> Result<Option<String>, String> {
    if !truthy(value) {
        return Ok(None);
    }
    match value {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.to_string(),
        })),
        other => Err(format!("expected a string or number identifier, found {other}")),
    }
}

/// serde adapter for identifier fields. Falsy values become `None`.
pub fn lenient_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    coerce_key(&value).map_err(de::Error::custom)
}

/// serde adapter for free-text fields. Strings pass through, other values keep their
/// JSON text (`4` becomes `"4"`), `null` is `None`.
pub fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// serde adapter for optional integer fields that may arrive as numbers or strings.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    coerce_i64(&value).map_err(de::Error::custom)
}

/// serde adapter for boolean fields that accept any JSON value by truthiness.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(truthy(&other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_matches_loose_json_semantics() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(!truthy(&falsy), "{falsy}");
        }
        for truthy_value in [json!(true), json!(1), json!(-2.5), json!("false"), json!([0]), json!({"a": 1})] {
            assert!(truthy(&truthy_value), "{truthy_value}");
        }
    }

    #[test]
    fn coerce_i64_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce_i64(&json!(42)).unwrap(), Some(42));
        assert_eq!(coerce_i64(&json!(7.9)).unwrap(), Some(7));
        assert_eq!(coerce_i64(&json!(-7.9)).unwrap(), Some(-7));
        assert_eq!(coerce_i64(&json!(" 15 ")).unwrap(), Some(15));
        assert_eq!(coerce_i64(&json!(true)).unwrap(), Some(1));
        assert_eq!(coerce_i64(&json!(null)).unwrap(), None);
    }

    #[test]
    fn coerce_i64_rejects_out_of_range_numbers() {
        assert!(coerce_i64(&json!(1e30)).is_err());
        assert!(coerce_i64(&json!(-1e30)).is_err());
        assert!(coerce_i64(&json!(u64::MAX)).is_err());
        assert!(coerce_i64(&json!(9_223_372_036_854_775_808.0_f64)).is_err());
        assert_eq!(coerce_i64(&json!(i64::MAX)).unwrap(), Some(i64::MAX));
        assert_eq!(coerce_i64(&json!(-9.0e18)).unwrap(), Some(-9_000_000_000_000_000_000));
    }

    #[test]
    fn coerce_key_maps_falsy_values_to_none() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert_eq!(coerce_key(&falsy).unwrap(), None, "{falsy}");
        }
    }

    #[test]
    fn coerce_key_renders_scalars_as_text() {
        assert_eq!(coerce_key(&json!("q-1")).unwrap().as_deref(), Some("q-1"));
        assert_eq!(coerce_key(&json!(12)).unwrap().as_deref(), Some("12"));
        assert_eq!(coerce_key(&json!(2.5)).unwrap().as_deref(), Some("2.5"));
        assert!(coerce_key(&json!(true)).is_err());
        assert!(coerce_key(&json!([1])).is_err());
        assert!(coerce_key(&json!({"id": 1})).is_err());
    }

    #[test]
    fn coerce_i64_rejects_garbage() {
        assert!(coerce_i64(&json!("ten")).is_err());
        assert!(coerce_i64(&json!("1.5")).is_err());
        assert!(coerce_i64(&json!([1])).is_err());
        assert!(coerce_i64(&json!({"n": 1})).is_err());
    }
}
