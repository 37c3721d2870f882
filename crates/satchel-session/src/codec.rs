//! Payload codec: the `(data, flash)` pair to and from the stored blob.
//!
//! The current format is a JSON object `{"data": {...}, "flash": {...}}`.
//! Older writers stored a positional array `[data, flash]`; it is still
//! accepted on decode and rewritten in the current format on the next write.

use serde::Serialize;
use serde_json::Value;

/// Session data or flash mapping.
pub type Map = serde_json::Map<String, Value>;

/// Error decoding or encoding a payload.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The blob is not JSON at all.
    #[error("Invalid payload JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The blob is JSON but not a recognised payload shape.
    #[error("Unrecognised payload shape: {0}")]
    Shape(String),
}

#[derive(Serialize)]
struct Payload<'a> {
    data: &'a Map,
    flash: &'a Map,
}

/// Encode the pair into a payload blob.
pub fn encode(data: &Map, flash: &Map) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&Payload { data, flash })?)
}

/// Decode a payload blob. Empty or whitespace-only input is an empty session.
pub fn decode(blob: &str) -> Result<(Map, Map), CodecError> {
    if blob.trim().is_empty() {
        return Ok((Map::new(), Map::new()));
    }

    match serde_json::from_str::<Value>(blob)? {
        Value::Null => Ok((Map::new(), Map::new())),
        Value::Object(mut doc) => {
            let data = mapping(doc.remove("data"), "data")?;
            let flash = mapping(doc.remove("flash"), "flash")?;
            Ok((data, flash))
        }
        Value::Array(items) if items.len() <= 2 => {
            let mut items = items.into_iter();
            let data = mapping(items.next(), "data")?;
            let flash = mapping(items.next(), "flash")?;
            Ok((data, flash))
        }
        Value::Array(items) => Err(CodecError::Shape(format!(
            "positional payload has {} elements",
            items.len()
        ))),
        other => Err(CodecError::Shape(format!("top-level {}", kind(&other)))),
    }
}

fn mapping(value: Option<Value>, field: &str) -> Result<Map, CodecError> {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        // Older writers stored an empty mapping as `[]`.
        Some(Value::Array(items)) if items.is_empty() => Ok(Map::new()),
        Some(other) => Err(CodecError::Shape(format!("{field} is {}", kind(&other)))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map {
        match value {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_empty_input_is_empty_session() {
        for blob in ["", "   ", "\n", "null"] {
            let (data, flash) = decode(blob).unwrap();
            assert!(data.is_empty() && flash.is_empty(), "{blob:?}");
        }
    }

    #[test]
    fn test_roundtrip_nested() {
        let data = map(json!({
            "user": {"id": 42, "roles": ["admin", "ops"]},
            "cart": [1, 2, 3],
            "theme": "dark"
        }));
        let flash = map(json!({"notice": "Saved"}));

        let blob = encode(&data, &flash).unwrap();
        let (d, f) = decode(&blob).unwrap();
        assert_eq!(d, data);
        assert_eq!(f, flash);
    }

    #[test]
    fn test_encoded_shape() {
        let blob = encode(&map(json!({"a": 1})), &Map::new()).unwrap();
        let value: Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(value, json!({"data": {"a": 1}, "flash": {}}));
    }

    #[test]
    fn test_legacy_positional_payload() {
        let (data, flash) = decode(r#"[{"a": 1}, {"b": 2}]"#).unwrap();
        assert_eq!(data, map(json!({"a": 1})));
        assert_eq!(flash, map(json!({"b": 2})));

        let (data, flash) = decode(r#"[{"a": 1}]"#).unwrap();
        assert_eq!(data.len(), 1);
        assert!(flash.is_empty());

        let (data, flash) = decode("[[], null]").unwrap();
        assert!(data.is_empty() && flash.is_empty());
    }

    #[test]
    fn test_object_missing_parts() {
        let (data, flash) = decode(r#"{"flash": {"x": true}}"#).unwrap();
        assert!(data.is_empty());
        assert_eq!(flash.get("x"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(decode("{not json"), Err(CodecError::Json(_))));
        assert!(matches!(decode("42"), Err(CodecError::Shape(_))));
        assert!(matches!(decode(r#""text""#), Err(CodecError::Shape(_))));
        assert!(matches!(decode("[{}, {}, {}]"), Err(CodecError::Shape(_))));
        assert!(matches!(decode(r#"{"data": 5}"#), Err(CodecError::Shape(_))));
    }
}
