use super::TargetConfig;
use crate::state::Value;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UnaryOp {
    Round,
    Ceil,
    Floor,
    Increment,
    Decrement,
    Negate,
    Not,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BinaryOp {
    Power,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    And,
    Or,
    Xor,
    Less,
    Greater,
    Equals,
    NotEquals,
    LessEqual,
    GreaterEqual,
}

/// Weakly-typed expression tree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExpressionConfig {
    Constant(Value),
    /// First non-null variable `name` across the resolved targets.
    Reference {
        #[cfg_attr(feature = "serde", serde(default))]
        target: TargetConfig,
        name: String,
    },
    /// The caller-supplied prior value.
    Previous,
    Unary {
        op: UnaryOp,
        operand: Box<ExpressionConfig>,
    },
    Binary {
        op: BinaryOp,
        left: Box<ExpressionConfig>,
        right: Box<ExpressionConfig>,
    },
    /// Textual infix expression, parsed on first evaluation.
    Parsed(String),
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        ExpressionConfig::Constant(Value::Null)
    }
}

impl ExpressionConfig {
    pub fn constant(value: impl Into<Value>) -> Self {
        ExpressionConfig::Constant(value.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        ExpressionConfig::Reference {
            target: TargetConfig::Source,
            name: name.into(),
        }
    }

    pub fn unary(op: UnaryOp, operand: ExpressionConfig) -> Self {
        ExpressionConfig::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, left: ExpressionConfig, right: ExpressionConfig) -> Self {
        ExpressionConfig::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}
