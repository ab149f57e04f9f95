//! Built-in formula functions.
//!
//! Functions receive their arguments unevaluated so that `if` can stay lazy
//! and higher-order functions can bind lambda parameters per item. Names are
//! matched case-insensitively.

mod array;
mod logical;
mod math;
mod string;

use crate::ast::Expression;
use crate::context::EvaluationContext;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::value::Value;
use std::collections::HashMap;

pub type BuiltinFn = fn(&[Expression], &dyn EvaluationContext, &Evaluator) -> EvalResult<Value>;

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, BuiltinFn>,
}

impl FunctionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in function
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        // Logical
        registry.register("if", logical::if_);
        registry.register("and", logical::and);
        registry.register("or", logical::or);
        registry.register("not", logical::not);
        registry.register("empty", logical::empty);

        // String
        registry.register("concat", string::concat);
        registry.register("contains", string::contains);
        registry.register("upper", string::upper);
        registry.register("lower", string::lower);
        registry.register("length", string::length);
        registry.register("toNumber", string::to_number);
        registry.register("toString", string::to_string);
        registry.register("join", string::join);
        registry.register("trim", string::trim);

        // Math
        registry.register("sum", math::sum);
        registry.register("max", math::max);
        registry.register("min", math::min);
        registry.register("count", math::count);
        registry.register("avg", math::avg);
        registry.register("average", math::avg);
        registry.register("round", math::round);
        registry.register("ceil", math::ceil);
        registry.register("floor", math::floor);
        registry.register("pow", math::pow);
        registry.register("sqrt", math::sqrt);
        registry.register("mod", math::modulo);

        // Array
        registry.register("flat", array::flat);
        registry.register("flatten", array::flat);
        registry.register("map", array::map);
        registry.register("filter", array::filter);
        registry.register("flatMap", array::flat_map);
        registry.register("reduce", array::reduce);
        registry.register("find", array::find);
        registry.register("every", array::every);
        registry.register("some", array::some);
        registry.register("countIf", array::count_if);
        registry.register("unique", array::unique);
        registry.register("sort", array::sort);

        registry
    }

    pub fn register(&mut self, name: &str, function: BuiltinFn) {
        self.functions.insert(name.to_lowercase(), function);
    }

    pub fn lookup(&self, name: &str) -> Option<BuiltinFn> {
        self.functions.get(&name.to_lowercase()).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_lowercase())
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

fn expect_args(function: &str, args: &[Expression], min: usize, max: usize) -> EvalResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else if max == usize::MAX {
            format!("at least {}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(EvalError::arity(function, expected, args.len()));
    }
    Ok(())
}

fn eval_all(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Vec<Value>> {
    args.iter().map(|arg| evaluator.evaluate(arg, ctx)).collect()
}

/// Array items; null counts as an empty list
fn items_of(function: &str, value: Value) -> EvalResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(EvalError::type_mismatch(
            format!("Array for {}", function),
            other.type_name(),
        )),
    }
}

/// Numbers from scalars and (nested) arrays; nulls are skipped and numeric strings parsed
fn collect_numbers(function: &str, values: &[Value], out: &mut Vec<f64>) -> EvalResult<()> {
    for value in values {
        match value {
            Value::Number(n) => out.push(*n),
            Value::Null => {}
            Value::String(s) => {
                if let Ok(n) = s.trim().parse::<f64>() {
                    out.push(n);
                } else if !s.trim().is_empty() {
                    return Err(EvalError::type_mismatch(format!("Number for {}", function), "String"));
                }
            }
            Value::Array(items) => collect_numbers(function, items, out)?,
            other => {
                return Err(EvalError::type_mismatch(
                    format!("Number for {}", function),
                    other.type_name(),
                ))
            }
        }
    }
    Ok(())
}

fn number_arg(function: &str, value: &Value) -> EvalResult<f64> {
    value
        .as_number()
        .ok_or_else(|| EvalError::type_mismatch(format!("Number for {}", function), value.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::with_builtins();
        assert!(registry.lookup("SUM").is_some());
        assert!(registry.lookup("countif").is_some());
        assert!(registry.lookup("CountIf").is_some());
        assert!(registry.lookup("dateAdd").is_none());
    }

    #[test]
    fn test_custom_registration() {
        fn answer(_: &[Expression], _: &dyn EvaluationContext, _: &Evaluator) -> EvalResult<Value> {
            Ok(Value::Number(42.0))
        }

        let mut registry = FunctionRegistry::new();
        registry.register("answer", answer);
        let evaluator = Evaluator::with_registry(registry);
        let ctx = crate::context::MapContext::new();
        assert_eq!(evaluator.evaluate_str("ANSWER()", &ctx).unwrap(), Value::Number(42.0));
        assert!(evaluator.evaluate_str("sum(1)", &ctx).is_err());
    }
}
