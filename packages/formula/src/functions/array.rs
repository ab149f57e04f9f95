use super::{eval_all, expect_args, items_of};
use crate::ast::Expression;
use crate::context::EvaluationContext;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::value::Value;
use std::collections::HashSet;

/// Evaluates `(array, lambda)` arguments shared by the higher-order functions
fn array_and_lambda(
    function: &str,
    args: &[Expression],
    ctx: &dyn EvaluationContext,
    evaluator: &Evaluator,
) -> EvalResult<(Vec<Value>, Value)> {
    let items = items_of(function, evaluator.evaluate(&args[0], ctx)?)?;
    let lambda = evaluator.evaluate(&args[1], ctx)?;
    if !matches!(lambda, Value::Lambda { .. }) {
        return Err(EvalError::type_mismatch(
            format!("Lambda for {}", function),
            lambda.type_name(),
        ));
    }
    Ok((items, lambda))
}

/// Calls `lambda(item, index)`
fn apply(
    evaluator: &Evaluator,
    lambda: &Value,
    item: &Value,
    index: usize,
    ctx: &dyn EvaluationContext,
) -> EvalResult<Value> {
    evaluator.call_lambda(lambda, &[item.clone(), Value::Number(index as f64)], ctx)
}

fn flatten_into(items: Vec<Value>, depth: usize, out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) if depth > 0 => flatten_into(inner, depth - 1, out),
            other => out.push(other),
        }
    }
}

/// flat(array, [depth]); depth defaults to 1
pub(super) fn flat(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("flat", args, 1, 2)?;
    let values = eval_all(args, ctx, evaluator)?;
    let depth = match values.get(1) {
        Some(Value::Number(n)) if *n >= 0.0 => *n as usize,
        Some(other) => return Err(EvalError::type_mismatch("non-negative Number depth", other.type_name())),
        None => 1,
    };

    let mut out = Vec::new();
    flatten_into(items_of("flat", values[0].clone())?, depth, &mut out);
    Ok(Value::Array(out))
}

pub(super) fn map(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("map", args, 2, 2)?;
    let (items, lambda) = array_and_lambda("map", args, ctx, evaluator)?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| apply(evaluator, &lambda, item, index, ctx))
        .collect::<EvalResult<Vec<_>>>()
        .map(Value::Array)
}

pub(super) fn filter(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("filter", args, 2, 2)?;
    let (items, lambda) = array_and_lambda("filter", args, ctx, evaluator)?;

    let mut kept = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        if apply(evaluator, &lambda, &item, index, ctx)?.is_truthy() {
            kept.push(item);
        }
    }
    Ok(Value::Array(kept))
}

pub(super) fn flat_map(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("flatMap", args, 2, 2)?;
    let (items, lambda) = array_and_lambda("flatMap", args, ctx, evaluator)?;

    let mut mapped = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        mapped.push(apply(evaluator, &lambda, item, index, ctx)?);
    }

    let mut out = Vec::new();
    flatten_into(mapped, 1, &mut out);
    Ok(Value::Array(out))
}

/// reduce(array, (acc, item, [index]) -> expr, initial)
pub(super) fn reduce(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("reduce", args, 3, 3)?;
    let (items, lambda) = array_and_lambda("reduce", args, ctx, evaluator)?;

    let mut accumulator = evaluator.evaluate(&args[2], ctx)?;
    for (index, item) in items.into_iter().enumerate() {
        accumulator = evaluator.call_lambda(
            &lambda,
            &[accumulator, item, Value::Number(index as f64)],
            ctx,
        )?;
    }
    Ok(accumulator)
}

pub(super) fn find(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("find", args, 2, 2)?;
    let (items, lambda) = array_and_lambda("find", args, ctx, evaluator)?;

    for (index, item) in items.into_iter().enumerate() {
        if apply(evaluator, &lambda, &item, index, ctx)?.is_truthy() {
            return Ok(item);
        }
    }
    Ok(Value::Null)
}

pub(super) fn every(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("every", args, 2, 2)?;
    let (items, lambda) = array_and_lambda("every", args, ctx, evaluator)?;

    for (index, item) in items.iter().enumerate() {
        if !apply(evaluator, &lambda, item, index, ctx)?.is_truthy() {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

pub(super) fn some(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("some", args, 2, 2)?;
    let (items, lambda) = array_and_lambda("some", args, ctx, evaluator)?;

    for (index, item) in items.iter().enumerate() {
        if apply(evaluator, &lambda, item, index, ctx)?.is_truthy() {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

/// countIf(array, lambda) or countIf(array, value)
pub(super) fn count_if(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("countIf", args, 2, 2)?;
    let items = items_of("countIf", evaluator.evaluate(&args[0], ctx)?)?;
    let criterion = evaluator.evaluate(&args[1], ctx)?;

    let mut total = 0usize;
    for (index, item) in items.iter().enumerate() {
        let matched = match &criterion {
            Value::Lambda { .. } => apply(evaluator, &criterion, item, index, ctx)?.is_truthy(),
            value => item.strict_equals(value),
        };
        if matched {
            total += 1;
        }
    }
    Ok(Value::Number(total as f64))
}

/// Removes duplicates by JSON representation, keeping first occurrences
pub(super) fn unique(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("unique", args, 1, 1)?;
    let items = items_of("unique", evaluator.evaluate(&args[0], ctx)?)?;

    let mut seen = HashSet::new();
    let kept = items
        .into_iter()
        .filter(|item| seen.insert(item.to_json().to_string()))
        .collect();
    Ok(Value::Array(kept))
}

/// sort(array, [ascending]) or sort(array, (item) -> key)
pub(super) fn sort(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("sort", args, 1, 2)?;
    let items = items_of("sort", evaluator.evaluate(&args[0], ctx)?)?;
    let option = match args.get(1) {
        Some(arg) => evaluator.evaluate(arg, ctx)?,
        None => Value::Boolean(true),
    };

    let (keys, ascending) = match &option {
        Value::Lambda { .. } => {
            let keys = items
                .iter()
                .enumerate()
                .map(|(index, item)| apply(evaluator, &option, item, index, ctx))
                .collect::<EvalResult<Vec<_>>>()?;
            (keys, true)
        }
        Value::Boolean(ascending) => (items.clone(), *ascending),
        other => return Err(EvalError::type_mismatch("Boolean or Lambda for sort", other.type_name())),
    };

    if let Some(first) = keys.first() {
        if keys.iter().any(|key| key.compare(first).is_none()) {
            return Err(EvalError::type_mismatch("comparable values for sort", "mixed types"));
        }
    }

    let mut indexed: Vec<(Value, Value)> = keys.into_iter().zip(items).collect();
    indexed.sort_by(|(a, _), (b, _)| {
        let ordering = a.compare(b).unwrap_or(std::cmp::Ordering::Equal);
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
    Ok(Value::Array(indexed.into_iter().map(|(_, item)| item).collect()))
}
