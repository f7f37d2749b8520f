//! Weakly-typed expression evaluation.
//!
//! Arithmetic operators coerce both operands with [`Value::to_f64`], logical
//! operators with [`Value::to_bool`]. Equality is the generic structural
//! equality of [`Value`], so values of different kinds never compare equal.
mod parse;

pub use parse::{ParseError, parse_expression};

use tracing::warn;

use super::{IntervalId, LogicContext, LogicNode, TargetLogic, TransferContext};
use crate::schema::{BinaryOp, ExpressionConfig, UnaryOp};
use crate::state::{EntityKey, Value};

#[derive(Debug)]
pub enum ExpressionLogic {
    Constant(Value),
    Reference {
        target: TargetLogic,
        name: String,
    },
    Previous,
    Unary {
        op: UnaryOp,
        operand: Box<ExpressionLogic>,
    },
    Binary {
        op: BinaryOp,
        left: Box<ExpressionLogic>,
        right: Box<ExpressionLogic>,
    },
    Parsed {
        source: String,
        parsed: Option<Box<ExpressionLogic>>,
    },
}

impl ExpressionLogic {
    pub fn new(config: &ExpressionConfig) -> Self {
        match config {
            ExpressionConfig::Constant(value) => ExpressionLogic::Constant(value.clone()),
            ExpressionConfig::Reference { target, name } => ExpressionLogic::Reference {
                target: TargetLogic::new(target),
                name: name.clone(),
            },
            ExpressionConfig::Previous => ExpressionLogic::Previous,
            ExpressionConfig::Unary { op, operand } => ExpressionLogic::Unary {
                op: *op,
                operand: Box::new(Self::new(operand)),
            },
            ExpressionConfig::Binary { op, left, right } => ExpressionLogic::Binary {
                op: *op,
                left: Box::new(Self::new(left)),
                right: Box::new(Self::new(right)),
            },
            ExpressionConfig::Parsed(source) => ExpressionLogic::Parsed {
                source: source.clone(),
                parsed: None,
            },
        }
    }

    pub fn evaluate(
        &mut self,
        ctx: &mut LogicContext<'_>,
        activator: Option<EntityKey>,
        previous: &Value,
    ) -> Value {
        match self {
            ExpressionLogic::Constant(value) => value.clone(),
            ExpressionLogic::Reference { target, name } => {
                let mut keys = Vec::new();
                target.resolve(ctx, activator, &mut keys);
                keys.into_iter()
                    .filter_map(|key| ctx.scene.logic(key))
                    .map(|logic| logic.variable(name))
                    .find(|value| !value.is_null())
                    .unwrap_or_default()
            }
            ExpressionLogic::Previous => previous.clone(),
            ExpressionLogic::Unary { op, operand } => {
                let value = operand.evaluate(ctx, activator, previous);
                apply_unary(*op, &value)
            }
            ExpressionLogic::Binary { op, left, right } => {
                let lhs = left.evaluate(ctx, activator, previous);
                // Logical operators short-circuit.
                match op {
                    BinaryOp::And if !lhs.to_bool() => return Value::Bool(false),
                    BinaryOp::Or if lhs.to_bool() => return Value::Bool(true),
                    _ => {}
                }
                let rhs = right.evaluate(ctx, activator, previous);
                apply_binary(*op, &lhs, &rhs)
            }
            ExpressionLogic::Parsed { source, parsed } => {
                let logic = parsed.get_or_insert_with(|| {
                    let config = parse_expression(source).unwrap_or_else(|error| {
                        warn!(
                            target: "sim::expression",
                            expression = %source,
                            %error,
                            "Failed to parse expression"
                        );
                        ExpressionConfig::constant("")
                    });
                    Box::new(ExpressionLogic::new(&config))
                });
                logic.evaluate(ctx, activator, previous)
            }
        }
    }
}

fn apply_unary(op: UnaryOp, value: &Value) -> Value {
    match op {
        UnaryOp::Round => Value::Number((value.to_f64() + 0.5).floor()),
        UnaryOp::Ceil => Value::Number(value.to_f64().ceil()),
        UnaryOp::Floor => Value::Number(value.to_f64().floor()),
        UnaryOp::Increment => Value::Number(value.to_f64() + 1.0),
        UnaryOp::Decrement => Value::Number(value.to_f64() - 1.0),
        UnaryOp::Negate => Value::Number(-value.to_f64()),
        UnaryOp::Not => Value::Bool(!value.to_bool()),
    }
}

fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    let number = |f: fn(f64, f64) -> f64| Value::Number(f(lhs.to_f64(), rhs.to_f64()));
    let compare = |f: fn(f64, f64) -> bool| Value::Bool(f(lhs.to_f64(), rhs.to_f64()));
    match op {
        BinaryOp::Power => number(f64::powf),
        BinaryOp::Add => number(|a, b| a + b),
        BinaryOp::Subtract => number(|a, b| a - b),
        BinaryOp::Multiply => number(|a, b| a * b),
        BinaryOp::Divide => number(|a, b| a / b),
        BinaryOp::Remainder => number(|a, b| a % b),
        BinaryOp::And => Value::Bool(lhs.to_bool() && rhs.to_bool()),
        BinaryOp::Or => Value::Bool(lhs.to_bool() || rhs.to_bool()),
        BinaryOp::Xor => Value::Bool(lhs.to_bool() ^ rhs.to_bool()),
        BinaryOp::Less => compare(|a, b| a < b),
        BinaryOp::Greater => compare(|a, b| a > b),
        BinaryOp::LessEqual => compare(|a, b| a <= b),
        BinaryOp::GreaterEqual => compare(|a, b| a >= b),
        BinaryOp::Equals => Value::Bool(lhs == rhs),
        BinaryOp::NotEquals => Value::Bool(lhs != rhs),
    }
}

impl LogicNode for ExpressionLogic {
    fn fire_interval(&mut self, ctx: &mut LogicContext<'_>, id: IntervalId) -> bool {
        match self {
            ExpressionLogic::Reference { target, .. } => target.fire_interval(ctx, id),
            ExpressionLogic::Unary { operand, .. } => operand.fire_interval(ctx, id),
            ExpressionLogic::Binary { left, right, .. } => {
                left.fire_interval(ctx, id) || right.fire_interval(ctx, id)
            }
            ExpressionLogic::Parsed { parsed, .. } => parsed.fire_interval(ctx, id),
            ExpressionLogic::Constant(_) | ExpressionLogic::Previous => false,
        }
    }

    fn collect_intervals(&self, out: &mut Vec<IntervalId>) {
        match self {
            ExpressionLogic::Reference { target, .. } => target.collect_intervals(out),
            ExpressionLogic::Unary { operand, .. } => operand.collect_intervals(out),
            ExpressionLogic::Binary { left, right, .. } => {
                left.collect_intervals(out);
                right.collect_intervals(out);
            }
            ExpressionLogic::Parsed { parsed, .. } => parsed.collect_intervals(out),
            ExpressionLogic::Constant(_) | ExpressionLogic::Previous => {}
        }
    }

    fn transfer(&mut self, source: &Self, tx: &mut TransferContext<'_>) {
        match (self, source) {
            (
                ExpressionLogic::Reference { target, .. },
                ExpressionLogic::Reference { target: from, .. },
            ) => target.transfer(from, tx),
            (
                ExpressionLogic::Unary { operand, .. },
                ExpressionLogic::Unary { operand: from, .. },
            ) => operand.transfer(from, tx),
            (
                ExpressionLogic::Binary { left, right, .. },
                ExpressionLogic::Binary {
                    left: from_left,
                    right: from_right,
                    ..
                },
            ) => {
                left.transfer(from_left, tx);
                right.transfer(from_right, tx);
            }
            (
                ExpressionLogic::Parsed { source, parsed },
                ExpressionLogic::Parsed {
                    parsed: Some(from), ..
                },
            ) => {
                if parsed.is_none()
                    && let Ok(config) = parse_expression(source)
                {
                    *parsed = Some(Box::new(ExpressionLogic::new(&config)));
                }
                if let Some(parsed) = parsed {
                    parsed.transfer(from, tx);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_coerces_operands() {
        let sum = apply_binary(BinaryOp::Add, &Value::from("2"), &Value::Bool(true));
        assert_eq!(sum, Value::Number(3.0));
        let power = apply_binary(BinaryOp::Power, &Value::from(2), &Value::from(3));
        assert_eq!(power, Value::Number(8.0));
        let rem = apply_binary(BinaryOp::Remainder, &Value::from(7), &Value::from(4));
        assert_eq!(rem, Value::Number(3.0));
    }

    #[test]
    fn equality_is_generic() {
        let null_vs_string = apply_binary(BinaryOp::Equals, &Value::Null, &Value::from("10"));
        assert_eq!(null_vs_string, Value::Bool(false));
        let numbers = apply_binary(BinaryOp::Equals, &Value::from(10), &Value::Number(10.0));
        assert_eq!(numbers, Value::Bool(true));
    }

    #[test]
    fn round_goes_half_up() {
        assert_eq!(apply_unary(UnaryOp::Round, &Value::Number(2.5)), Value::Number(3.0));
        assert_eq!(apply_unary(UnaryOp::Round, &Value::Number(-2.5)), Value::Number(-2.0));
        assert_eq!(apply_unary(UnaryOp::Not, &Value::from("0")), Value::Bool(true));
    }
}
