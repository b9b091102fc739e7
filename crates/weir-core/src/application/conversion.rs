use crate::domain::expression::ReturnType;
use crate::types::RuntimeValue;
use crate::{EngineError, Result};

/// Convert stored text to a value of the declared return type
///
/// Booleans follow the lenient convention where only a case-insensitive
/// `"true"` is true. Numbers must parse completely; surrounding whitespace
/// is ignored.
pub fn convert_text(text: &str, return_type: &ReturnType) -> Result<RuntimeValue> {
    match return_type {
        ReturnType::String => Ok(RuntimeValue::from(text)),
        ReturnType::Boolean => Ok(RuntimeValue::from(text.trim().eq_ignore_ascii_case("true"))),
        ReturnType::Integer => text
            .trim()
            .parse::<i32>()
            .map(|value| RuntimeValue::from(i64::from(value)))
            .map_err(|_| unconvertible(text, return_type)),
        ReturnType::Long => text
            .trim()
            .parse::<i64>()
            .map(RuntimeValue::from)
            .map_err(|_| unconvertible(text, return_type)),
        ReturnType::Double => match text.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(RuntimeValue::from(value)),
            _ => Err(unconvertible(text, return_type)),
        },
        ReturnType::List | ReturnType::Entity(_) => Err(EngineError::evaluation(format!(
            "A text value cannot be converted to {}",
            return_type
        ))),
    }
}

fn unconvertible(text: &str, return_type: &ReturnType) -> EngineError {
    EngineError::evaluation(format!("Unable to convert '{}' to {}", text, return_type))
}
