use super::{eval_all, expect_args, items_of};
use crate::ast::Expression;
use crate::context::EvaluationContext;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::value::Value;

fn text_arg(function: &str, value: Value) -> EvalResult<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        Value::Number(_) | Value::Boolean(_) => Ok(value.stringify()),
        other => Err(EvalError::type_mismatch(
            format!("String for {}", function),
            other.type_name(),
        )),
    }
}

/// concat(a, b, ...); array arguments contribute each element
pub(super) fn concat(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    let mut out = String::new();
    for value in eval_all(args, ctx, evaluator)? {
        match value {
            Value::Array(items) => items.iter().for_each(|item| out.push_str(&item.stringify())),
            other => out.push_str(&other.stringify()),
        }
    }
    Ok(Value::String(out))
}

/// contains(text, needle) is a case-insensitive substring test;
/// contains(array, item) tests membership
pub(super) fn contains(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("contains", args, 2, 2)?;
    let mut values = eval_all(args, ctx, evaluator)?;
    let needle = values.pop().unwrap_or(Value::Null);
    let haystack = values.pop().unwrap_or(Value::Null);

    let found = match haystack {
        Value::String(text) => text.to_lowercase().contains(&needle.stringify().to_lowercase()),
        Value::Array(items) => items.iter().any(|item| match (item, &needle) {
            (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
            (a, b) => a.strict_equals(b),
        }),
        Value::Null => false,
        other => return Err(EvalError::type_mismatch("String or Array for contains", other.type_name())),
    };
    Ok(Value::Boolean(found))
}

pub(super) fn upper(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("upper", args, 1, 1)?;
    let text = text_arg("upper", evaluator.evaluate(&args[0], ctx)?)?;
    Ok(Value::String(text.to_uppercase()))
}

pub(super) fn lower(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("lower", args, 1, 1)?;
    let text = text_arg("lower", evaluator.evaluate(&args[0], ctx)?)?;
    Ok(Value::String(text.to_lowercase()))
}

pub(super) fn trim(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("trim", args, 1, 1)?;
    let text = text_arg("trim", evaluator.evaluate(&args[0], ctx)?)?;
    Ok(Value::String(text.trim().to_string()))
}

/// Character count of a string or element count of an array
pub(super) fn length(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("length", args, 1, 1)?;
    let len = match evaluator.evaluate(&args[0], ctx)? {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Null => 0,
        other => return Err(EvalError::type_mismatch("String or Array for length", other.type_name())),
    };
    Ok(Value::Number(len as f64))
}

/// Unparsable text converts to null
pub(super) fn to_number(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("toNumber", args, 1, 1)?;
    let value = match evaluator.evaluate(&args[0], ctx)? {
        Value::Number(n) => Value::Number(n),
        Value::String(s) => s.trim().parse::<f64>().map(Value::Number).unwrap_or(Value::Null),
        Value::Boolean(b) => Value::Number(if b { 1.0 } else { 0.0 }),
        Value::Null => Value::Null,
        other => return Err(EvalError::type_mismatch("String, Number or Boolean for toNumber", other.type_name())),
    };
    Ok(value)
}

pub(super) fn to_string(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("toString", args, 1, 1)?;
    let value = evaluator.evaluate(&args[0], ctx)?;
    let text = match value {
        Value::Array(_) | Value::Object(_) => value.to_json().to_string(),
        other => other.stringify(),
    };
    Ok(Value::String(text))
}

/// join(array, [separator]); separator defaults to ","
pub(super) fn join(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("join", args, 1, 2)?;
    let values = eval_all(args, ctx, evaluator)?;
    let separator = match values.get(1) {
        Some(sep) => sep.stringify(),
        None => ",".to_string(),
    };
    let items = items_of("join", values[0].clone())?;
    let parts: Vec<String> = items.iter().map(Value::stringify).collect();
    Ok(Value::String(parts.join(&separator)))
}
