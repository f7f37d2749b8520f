//! Dynamically-typed values stored in logic variables and produced by expressions.

use std::fmt;

use tracing::warn;

/// Weakly-typed scalar.
///
/// Equality is the derived structural equality: values of different kinds never
/// compare equal, so `Null != String("10")` and `Number(10.0) != String("10")`.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric coercion.
    ///
    /// `Null` is 0, booleans are 0/1, strings parse as numbers and then as
    /// booleans; anything else logs and yields 0.
    pub fn to_f64(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(value) => f64::from(u8::from(*value)),
            Value::Number(value) => *value,
            Value::String(text) => {
                if let Ok(number) = text.trim().parse::<f64>() {
                    number
                } else if let Some(flag) = parse_boolean(text) {
                    f64::from(u8::from(flag))
                } else {
                    warn!(target: "sim::expression", value = %text, "Cannot coerce string to number");
                    0.0
                }
            }
        }
    }

    /// Boolean coercion.
    ///
    /// `Null` is false, numbers are true when non-zero, strings parse as numbers
    /// and then as booleans; anything else logs and yields false.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(value) => *value,
            Value::Number(value) => *value != 0.0,
            Value::String(text) => {
                if let Ok(number) = text.trim().parse::<f64>() {
                    number != 0.0
                } else if let Some(flag) = parse_boolean(text) {
                    flag
                } else {
                    warn!(target: "sim::expression", value = %text, "Cannot coerce string to boolean");
                    false
                }
            }
        }
    }
}

fn parse_boolean(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Number(value) => write!(f, "{value}"),
            Value::String(value) => f.write_str(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion_covers_every_kind() {
        assert_eq!(Value::Null.to_f64(), 0.0);
        assert_eq!(Value::Bool(true).to_f64(), 1.0);
        assert_eq!(Value::Bool(false).to_f64(), 0.0);
        assert_eq!(Value::from("3.5").to_f64(), 3.5);
        assert_eq!(Value::from("TRUE").to_f64(), 1.0);
        assert_eq!(Value::from("abc").to_f64(), 0.0);
        assert_eq!(Value::Number(1.0).to_f64(), 1.0);
    }

    #[test]
    fn boolean_coercion_covers_every_kind() {
        assert!(!Value::Null.to_bool());
        assert!(Value::Bool(true).to_bool());
        assert!(!Value::Bool(false).to_bool());
        assert!(Value::from("3.5").to_bool());
        assert!(!Value::from("abc").to_bool());
        assert!(!Value::Number(0.0).to_bool());
        assert!(Value::Number(1.0).to_bool());
        assert!(!Value::from("0").to_bool());
    }

    #[test]
    fn equality_never_crosses_kinds() {
        assert_ne!(Value::Null, Value::from("10"));
        assert_ne!(Value::Number(10.0), Value::from("10"));
        assert_eq!(Value::Number(10.0), Value::from(10));
        assert_eq!(Value::Null, Value::Null);
    }
}
