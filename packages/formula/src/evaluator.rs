use crate::ast::{BinaryOp, Expression, UnaryOp};
use crate::context::{EvaluationContext, ScopedContext};
use crate::error::{EvalError, EvalResult};
use crate::functions::FunctionRegistry;
use crate::parser::parse;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Tree-walking evaluator over a function registry
#[derive(Debug)]
pub struct Evaluator {
    registry: FunctionRegistry,
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            registry: FunctionRegistry::with_builtins(),
        }
    }

    pub fn with_registry(registry: FunctionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Parse and evaluate a formula in one step
    pub fn evaluate_str(&self, source: &str, ctx: &dyn EvaluationContext) -> EvalResult<Value> {
        let expr = parse(source)?;
        self.evaluate(&expr, ctx)
    }

    pub fn evaluate(&self, expr: &Expression, ctx: &dyn EvaluationContext) -> EvalResult<Value> {
        match expr {
            Expression::Number(n) => Ok(Value::Number(*n)),

            Expression::String(s) => Ok(Value::String(s.clone())),

            Expression::Boolean(b) => Ok(Value::Boolean(*b)),

            Expression::Null => Ok(Value::Null),

            Expression::Array(items) => items
                .iter()
                .map(|item| self.evaluate(item, ctx))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::Array),

            Expression::Object(pairs) => {
                let mut map = BTreeMap::new();
                for (key, value) in pairs {
                    map.insert(key.clone(), self.evaluate(value, ctx)?);
                }
                Ok(Value::Object(map))
            }

            Expression::Reference(name) => ctx.resolve(name),

            Expression::Member { object, property } => {
                let value = self.evaluate(object, ctx)?;
                value.property(property)
            }

            Expression::Index { object, index } => {
                let value = self.evaluate(object, ctx)?;
                match self.evaluate(index, ctx)? {
                    Value::Number(n) if n.fract() == 0.0 && n >= 0.0 => value.property(&(n as usize).to_string()),
                    Value::Number(n) => Err(EvalError::IndexOutOfBounds { index: n as i64 }),
                    Value::String(key) => value.property(&key),
                    other => Err(EvalError::type_mismatch("Number or String index", other.type_name())),
                }
            }

            Expression::Call { function, arguments } => {
                let builtin = self
                    .registry
                    .lookup(function)
                    .ok_or_else(|| EvalError::unknown_function(function.clone()))?;
                builtin(arguments, ctx, self)
            }

            Expression::Unary { operator, operand } => {
                let value = self.evaluate(operand, ctx)?;
                match operator {
                    UnaryOp::Negate => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(EvalError::InvalidOperands {
                            operator: "-".to_string(),
                            details: format!("Expected number, got {}", other.type_name()),
                        }),
                    },
                    UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
                }
            }

            Expression::Binary { left, operator, right } => {
                self.evaluate_binary(left, *operator, right, ctx)
            }

            Expression::Lambda { params, body } => Ok(Value::Lambda {
                params: params.clone(),
                body: body.clone(),
            }),
        }
    }

    fn evaluate_binary(
        &self,
        left: &Expression,
        operator: BinaryOp,
        right: &Expression,
        ctx: &dyn EvaluationContext,
    ) -> EvalResult<Value> {
        // Short-circuit before evaluating the right-hand side
        match operator {
            BinaryOp::And => {
                let left_val = self.evaluate(left, ctx)?;
                if !left_val.is_truthy() {
                    return Ok(Value::Boolean(false));
                }
                return Ok(Value::Boolean(self.evaluate(right, ctx)?.is_truthy()));
            }
            BinaryOp::Or => {
                let left_val = self.evaluate(left, ctx)?;
                if left_val.is_truthy() {
                    return Ok(Value::Boolean(true));
                }
                return Ok(Value::Boolean(self.evaluate(right, ctx)?.is_truthy()));
            }
            _ => {}
        }

        let left_val = self.evaluate(left, ctx)?;
        let right_val = self.evaluate(right, ctx)?;

        match operator {
            BinaryOp::Add => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, b.stringify()))),
                (a, Value::String(b)) => Ok(Value::String(format!("{}{}", a.stringify(), b))),
                _ => Err(invalid_operands(operator, &left_val, &right_val)),
            },
            BinaryOp::Subtract => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(invalid_operands(operator, &left_val, &right_val)),
            },
            BinaryOp::Multiply => match (&left_val, &right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(invalid_operands(operator, &left_val, &right_val)),
            },
            BinaryOp::Divide => match (&left_val, &right_val) {
                (Value::Number(_), Value::Number(b)) if *b == 0.0 => {
                    debug!("Division by zero resolves to null");
                    Ok(Value::Null)
                }
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
                _ => Err(invalid_operands(operator, &left_val, &right_val)),
            },
            BinaryOp::Equals => Ok(Value::Boolean(left_val.strict_equals(&right_val))),
            BinaryOp::NotEquals => Ok(Value::Boolean(!left_val.strict_equals(&right_val))),
            BinaryOp::GreaterThan => Ok(compare_with(&left_val, &right_val, |o| o == Ordering::Greater)),
            BinaryOp::GreaterThanOrEqual => Ok(compare_with(&left_val, &right_val, |o| o != Ordering::Less)),
            BinaryOp::LessThan => Ok(compare_with(&left_val, &right_val, |o| o == Ordering::Less)),
            BinaryOp::LessThanOrEqual => Ok(compare_with(&left_val, &right_val, |o| o != Ordering::Greater)),
            BinaryOp::And | BinaryOp::Or => Ok(Value::Null),
        }
    }

    /// Invoke a lambda value with positional arguments bound to its parameters
    pub fn call_lambda(&self, lambda: &Value, args: &[Value], ctx: &dyn EvaluationContext) -> EvalResult<Value> {
        let Value::Lambda { params, body } = lambda else {
            return Err(EvalError::type_mismatch("Lambda", lambda.type_name()));
        };

        let mut scope = ScopedContext::new(ctx);
        for (param, arg) in params.iter().zip(args) {
            scope = scope.bind(param, arg.clone());
        }

        self.evaluate(body, &scope)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Composite operands have no ordering and yield null; mismatched scalars compare false
fn compare_with(left: &Value, right: &Value, test: impl Fn(Ordering) -> bool) -> Value {
    let composite = |v: &Value| matches!(v, Value::Array(_) | Value::Object(_) | Value::Lambda { .. });
    if composite(left) || composite(right) {
        return Value::Null;
    }

    match left.compare(right) {
        Some(ordering) => Value::Boolean(test(ordering)),
        None => Value::Boolean(false),
    }
}

fn invalid_operands(operator: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::InvalidOperands {
        operator: operator.to_string(),
        details: format!("{} {} {}", left.type_name(), operator, right.type_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MapContext;

    fn eval(source: &str) -> EvalResult<Value> {
        Evaluator::new().evaluate_str(source, &MapContext::new())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Value::Number(9.0));
        assert_eq!(eval("-(2 - 5)").unwrap(), Value::Number(3.0));
        assert_eq!(eval("10 / 4").unwrap(), Value::Number(2.5));
    }

    #[test]
    fn test_division_by_zero_is_null() {
        assert_eq!(eval("5 / 0").unwrap(), Value::Null);
        assert_eq!(eval("0 / 0").unwrap(), Value::Null);
    }

    #[test]
    fn test_strict_equality() {
        assert_eq!(eval(r#"1 == "1""#).unwrap(), Value::Boolean(false));
        assert_eq!(eval("null == null").unwrap(), Value::Boolean(true));
        assert_eq!(eval("[] == []").unwrap(), Value::Boolean(false));
        assert_eq!(eval("{} == {}").unwrap(), Value::Boolean(false));
        assert_eq!(eval("true == 1").unwrap(), Value::Boolean(false));
        assert_eq!(eval("[] != []").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("3 > 2").unwrap(), Value::Boolean(true));
        assert_eq!(eval("2 >= 2").unwrap(), Value::Boolean(true));
        assert_eq!(eval(r#""apple" < "banana""#).unwrap(), Value::Boolean(true));
        assert_eq!(eval(r#"1 < "2""#).unwrap(), Value::Boolean(false));
        assert_eq!(eval("[1] > 0").unwrap(), Value::Null);
        assert_eq!(eval("null < 1").unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval(r#""a" + 1"#).unwrap(), Value::String("a1".into()));
        assert_eq!(eval(r#"2.5 + "b""#).unwrap(), Value::String("2.5b".into()));
        assert!(matches!(eval("true + 1"), Err(EvalError::InvalidOperands { .. })));
    }

    #[test]
    fn test_logical_short_circuit() {
        // the right side would fail if evaluated
        assert_eq!(eval("false && missing").unwrap(), Value::Boolean(false));
        assert_eq!(eval("true || missing").unwrap(), Value::Boolean(true));
        assert!(eval("true && missing").is_err());
    }

    #[test]
    fn test_references_and_members() {
        let ctx = MapContext::new().with("price", 4.0).with("name", "Widget");
        let evaluator = Evaluator::new();
        assert_eq!(evaluator.evaluate_str("price * 2", &ctx).unwrap(), Value::Number(8.0));
        assert_eq!(
            evaluator.evaluate_str(r#"{ "a": [1, 2] }.a.1"#, &ctx).unwrap(),
            Value::Number(2.0)
        );
        assert!(matches!(
            evaluator.evaluate_str("unknown", &ctx),
            Err(EvalError::UnknownReference { .. })
        ));
    }

    #[test]
    fn test_unknown_function() {
        assert!(matches!(eval("nope(1)"), Err(EvalError::UnknownFunction { .. })));
    }
}
