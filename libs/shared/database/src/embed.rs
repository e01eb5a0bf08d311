//! Serde helpers for PostgREST resource embedding. A to-one embed arrives
//! as an object, `null`, or (for reverse relations on older servers) a
//! one-element array.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn one<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let inner = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(mut items)) => {
            if items.is_empty() {
                return Ok(None);
            }
            items.swap_remove(0)
        }
        Some(other) => other,
    };
    serde_json::from_value(inner).map(Some).map_err(serde::de::Error::custom)
}
