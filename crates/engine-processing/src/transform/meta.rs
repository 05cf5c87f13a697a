use crate::transform::error::SkipReason;
use model::core::value::Value;

pub const META: &str = "meta";

/// Decodes an action's `meta` column into top-level fields.
///
/// NULL and blank text mean "no meta". Anything that is not a JSON object is
/// malformed. Integral numbers become `Value::Int` (or `Value::Uint`).
pub fn decode(value: &Value) -> Result<Option<Vec<(String, Value)>>, SkipReason> {
    let json = match value {
        Value::Null => return Ok(None),
        Value::Json(serde_json::Value::Null) => return Ok(None),
        Value::Json(json) => json.clone(),
        Value::String(text) => match parse_text(text)? {
            Some(json) => json,
            None => return Ok(None),
        },
        Value::Bytes(bytes) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| SkipReason::MalformedMeta(e.to_string()))?;
            match parse_text(text)? {
                Some(json) => json,
                None => return Ok(None),
            }
        }
        other => {
            return Err(SkipReason::MalformedMeta(format!(
                "expected JSON text, got {}",
                other.type_name()
            )));
        }
    };

    match json {
        serde_json::Value::Object(map) => Ok(Some(
            map.into_iter()
                .map(|(key, value)| (key, Value::from_json(value)))
                .collect(),
        )),
        other => Err(SkipReason::MalformedMeta(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

fn parse_text(text: &str) -> Result<Option<serde_json::Value>, SkipReason> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| SkipReason::MalformedMeta(e.to_string()))
}
