//! Tolerant field deserializers.
//!
//! Ids and timestamps arrive as strings or numbers; counters as integers,
//! floats, numeric strings or `null`. Anything that cannot be read as the
//! field's type falls back to the type's default.

use crate::entities::FlexNumber;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// String field: numbers and booleans are stringified, `null` is empty.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Unsigned counter: floats truncate, negatives and junk read as zero.
pub fn counter<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(float_to_u64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(float_to_u64))
        }
        _ => None,
    }
    .unwrap_or_default())
}

/// Floating point field: numeric strings parse, junk reads as zero.
pub fn float<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
    .unwrap_or_default())
}

/// Number-or-string field: `null` and other shapes read as zero.
pub fn flex_number<'de, D>(deserializer: D) -> Result<FlexNumber, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => FlexNumber::Number(n),
        Value::String(s) => FlexNumber::Text(s),
        _ => FlexNumber::default(),
    })
}

fn float_to_u64(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 {
        f as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "text")]
        label: String,
        #[serde(deserialize_with = "counter")]
        count: u64,
        #[serde(deserialize_with = "float")]
        ratio: f64,
        #[serde(deserialize_with = "flex_number")]
        port: FlexNumber,
    }

    fn read(value: serde_json::Value) -> Sample {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_accepts_numbers_and_null() {
        assert_eq!(read(json!({"label": 7, "count": 0, "ratio": 0, "port": 0})).label, "7");
        assert_eq!(read(json!({"label": null, "count": 0, "ratio": 0, "port": 0})).label, "");
        assert_eq!(
            read(json!({"label": 1700000000000u64, "count": 0, "ratio": 0, "port": 0})).label,
            "1700000000000"
        );
    }

    #[test]
    fn test_counter_shapes() {
        let cases = [
            (json!(12), 12),
            (json!(2.0), 2),
            (json!(2.9), 2),
            (json!("15"), 15),
            (json!("3.5"), 3),
            (json!(null), 0),
            (json!(-4), 0),
            (json!("lots"), 0),
        ];
        for (input, expected) in cases {
            let sample = read(json!({"label": "", "count": input, "ratio": 0, "port": 0}));
            assert_eq!(sample.count, expected, "counter from {input}");
        }
    }

    #[test]
    fn test_float_shapes() {
        let from = |v: serde_json::Value| read(json!({"label": "", "count": 0, "ratio": v, "port": 0})).ratio;
        assert_eq!(from(json!(1.5)), 1.5);
        assert_eq!(from(json!("42.125")), 42.125);
        assert_eq!(from(json!(null)), 0.0);
        assert_eq!(from(json!("NaN")), 0.0);
    }

    #[test]
    fn test_flex_number_null_is_zero() {
        let sample = read(json!({"label": "", "count": 0, "ratio": 0, "port": null}));
        assert_eq!(sample.port.as_u64(), Some(0));
    }
}
