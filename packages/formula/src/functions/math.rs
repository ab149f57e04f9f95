use super::{collect_numbers, eval_all, expect_args, number_arg};
use crate::ast::Expression;
use crate::context::EvaluationContext;
use crate::error::EvalResult;
use crate::evaluator::Evaluator;
use crate::value::Value;

fn numbers(function: &str, args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Vec<f64>> {
    let values = eval_all(args, ctx, evaluator)?;
    let mut out = Vec::new();
    collect_numbers(function, &values, &mut out)?;
    Ok(out)
}

/// sum(a, b, ...) over scalars and arrays; sum() is 0
pub(super) fn sum(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    let values = numbers("sum", args, ctx, evaluator)?;
    Ok(Value::Number(values.iter().sum()))
}

pub(super) fn max(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    let values = numbers("max", args, ctx, evaluator)?;
    Ok(values
        .into_iter()
        .reduce(f64::max)
        .map(Value::Number)
        .unwrap_or(Value::Null))
}

pub(super) fn min(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    let values = numbers("min", args, ctx, evaluator)?;
    Ok(values
        .into_iter()
        .reduce(f64::min)
        .map(Value::Number)
        .unwrap_or(Value::Null))
}

/// Counts array elements and non-null scalars
pub(super) fn count(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("count", args, 1, usize::MAX)?;
    let total: usize = eval_all(args, ctx, evaluator)?
        .iter()
        .map(|value| match value {
            Value::Array(items) => items.len(),
            Value::Null => 0,
            _ => 1,
        })
        .sum();
    Ok(Value::Number(total as f64))
}

pub(super) fn avg(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    let values = numbers("avg", args, ctx, evaluator)?;
    if values.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Number(values.iter().sum::<f64>() / values.len() as f64))
}

/// round(number, [digits])
pub(super) fn round(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("round", args, 1, 2)?;
    let values = eval_all(args, ctx, evaluator)?;
    if values[0] == Value::Null {
        return Ok(Value::Null);
    }
    let number = number_arg("round", &values[0])?;
    let digits = match values.get(1) {
        Some(d) => number_arg("round", d)? as i32,
        None => 0,
    };

    if digits <= 0 {
        return Ok(Value::Number(number.round()));
    }
    let multiplier = 10f64.powi(digits);
    Ok(Value::Number((number * multiplier).round() / multiplier))
}

pub(super) fn ceil(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    unary("ceil", args, ctx, evaluator, f64::ceil)
}

pub(super) fn floor(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    unary("floor", args, ctx, evaluator, f64::floor)
}

/// Square root; negative input has no real result and yields null
pub(super) fn sqrt(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    let result = unary("sqrt", args, ctx, evaluator, f64::sqrt)?;
    match result {
        Value::Number(n) if n.is_nan() => Ok(Value::Null),
        other => Ok(other),
    }
}

pub(super) fn pow(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("pow", args, 2, 2)?;
    let values = eval_all(args, ctx, evaluator)?;
    let base = number_arg("pow", &values[0])?;
    let exponent = number_arg("pow", &values[1])?;
    Ok(Value::Number(base.powf(exponent)))
}

/// mod(a, b) keeps the sign of the dividend; a zero divisor yields null
pub(super) fn modulo(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("mod", args, 2, 2)?;
    let values = eval_all(args, ctx, evaluator)?;
    let dividend = number_arg("mod", &values[0])?;
    let divisor = number_arg("mod", &values[1])?;
    if divisor == 0.0 {
        return Ok(Value::Null);
    }
    Ok(Value::Number(dividend % divisor))
}

fn unary(
    function: &str,
    args: &[Expression],
    ctx: &dyn EvaluationContext,
    evaluator: &Evaluator,
    op: fn(f64) -> f64,
) -> EvalResult<Value> {
    expect_args(function, args, 1, 1)?;
    match evaluator.evaluate(&args[0], ctx)? {
        Value::Null => Ok(Value::Null),
        value => Ok(Value::Number(op(number_arg(function, &value)?))),
    }
}
