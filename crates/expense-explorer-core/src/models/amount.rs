//! Lenient decoding for monetary values.
//!
//! The backend serializes Django decimals as strings (`"12.50"`) on model
//! serializers and as floats on the analytics endpoint. Both decode to `f64`.

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
    Null,
}

fn to_f64<E: de::Error>(value: NumberOrString) -> Result<f64, E> {
    match value {
        NumberOrString::Number(n) if n.is_finite() => Ok(n),
        NumberOrString::Number(_) | NumberOrString::Null => Ok(0.0),
        NumberOrString::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0.0);
            }
            trimmed
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid amount: {:?}", s)))
        }
    }
}

/// Deserialize an amount given as a number, numeric string or null.
pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    to_f64(NumberOrString::deserialize(deserializer)?)
}
