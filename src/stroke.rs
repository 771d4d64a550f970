//! Stroke batch wire format
//!
//! The drawing surface sends one batch per stroke:
//!
//! ```json
//! {"color": "2 0xff3366cc", "size": "3 12.5", "data": ["0 0 0.4 120", "1 0.5 0.4 118"]}
//! ```
//!
//! Relays wrap it in an envelope whose `data` is the batch serialized again as
//! a string, and the batch's own `data` may arrive as a JSON string holding the
//! sample array. Both layers are unwrapped here.

use paintkit_resources::BrushRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Envelopes nested deeper than this are rejected
const MAX_NESTING: usize = 4;

/// Errors decoding a stroke message
#[derive(Error, Debug)]
pub enum WireError {
    #[error("Invalid stroke message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stroke message has no usable `{0}` field")]
    MissingField(&'static str),

    #[error("Stroke message nested more than {} levels deep", MAX_NESTING)]
    TooDeep,
}

/// One stroke as sent by the drawing surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeBatch {
    /// `"<pot number> <hex color>"`, pot numbers start at 1
    pub color: String,
    /// `"<size number> <diameter mm>"`, 1 is the smallest brush
    pub size: String,
    /// Samples, `"x y pressure velocity"`
    pub data: Vec<String>,
}

impl StrokeBatch {
    /// Decode a message in any of the accepted shapes
    pub fn from_wire(text: &str) -> Result<Self, WireError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value, 0)
    }

    fn from_value(value: Value, depth: usize) -> Result<Self, WireError> {
        if depth > MAX_NESTING {
            return Err(WireError::TooDeep);
        }
        match value {
            Value::String(inner) => Self::from_value(serde_json::from_str(&inner)?, depth + 1),
            Value::Object(mut map) if map.contains_key("color") => {
                let color = take_string(&mut map, "color")?;
                let size = take_string(&mut map, "size")?;
                let data = match map.remove("data") {
                    Some(Value::String(samples)) => serde_json::from_str(&samples)?,
                    Some(samples @ Value::Array(_)) => serde_json::from_value(samples)?,
                    _ => return Err(WireError::MissingField("data")),
                };
                Ok(Self { color, size, data })
            }
            Value::Object(mut map) => match map.remove("data") {
                Some(inner) => Self::from_value(inner, depth + 1),
                None => Err(WireError::MissingField("color")),
            },
            _ => Err(WireError::MissingField("color")),
        }
    }

    /// Holder and slot indices the labels select
    pub fn request(&self) -> Option<BrushRequest> {
        BrushRequest::from_labels(&self.color, &self.size)
    }

    /// Brush diameter from the size label, if present
    pub fn diameter_mm(&self) -> Option<f64> {
        self.size.split_whitespace().nth(1)?.parse().ok()
    }
}

fn take_string(
    map: &mut serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<String, WireError> {
    match map.remove(field) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(WireError::MissingField(field)),
    }
}
