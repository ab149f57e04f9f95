use super::{Context, OutputFormat};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use formdoc_engine::evaluate_expression;
use serde_json::json;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Document JSON file
    pub document: PathBuf,

    /// Formula expression, e.g. `sum(items.amount)`
    pub expression: String,
}

pub fn eval(args: EvalArgs, ctx: &Context) -> Result<()> {
    let editor = ctx.open(&args.document)?;
    let value = evaluate_expression(editor.document(), &args.expression)?;

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&json!({
            "expression": args.expression,
            "value": value.to_json(),
        }))?,
        OutputFormat::Text => println!("{} {}", "=".dimmed(), value),
    }
    Ok(())
}
