use super::{eval_all, expect_args};
use crate::ast::Expression;
use crate::context::EvaluationContext;
use crate::error::EvalResult;
use crate::evaluator::Evaluator;
use crate::value::Value;

/// if(condition, then, [else]); only the taken branch is evaluated
pub(super) fn if_(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("if", args, 2, 3)?;

    if evaluator.evaluate(&args[0], ctx)?.is_truthy() {
        evaluator.evaluate(&args[1], ctx)
    } else if let Some(otherwise) = args.get(2) {
        evaluator.evaluate(otherwise, ctx)
    } else {
        Ok(Value::Null)
    }
}

pub(super) fn and(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("and", args, 1, usize::MAX)?;

    for arg in args {
        if !evaluator.evaluate(arg, ctx)?.is_truthy() {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

pub(super) fn or(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("or", args, 1, usize::MAX)?;

    for arg in args {
        if evaluator.evaluate(arg, ctx)?.is_truthy() {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

pub(super) fn not(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("not", args, 1, 1)?;
    let value = evaluator.evaluate(&args[0], ctx)?;
    Ok(Value::Boolean(!value.is_truthy()))
}

pub(super) fn empty(args: &[Expression], ctx: &dyn EvaluationContext, evaluator: &Evaluator) -> EvalResult<Value> {
    expect_args("empty", args, 1, 1)?;
    let values = eval_all(args, ctx, evaluator)?;
    Ok(Value::Boolean(values[0].is_empty()))
}
