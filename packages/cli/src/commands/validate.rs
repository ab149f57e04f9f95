use super::{Context, OutputFormat};
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use formdoc_engine::{FieldValidity, RowValidity};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Document JSON file
    pub document: PathBuf,

    /// List valid fields too
    #[arg(short, long)]
    pub all: bool,
}

pub fn validate(args: ValidateArgs, ctx: &Context) -> Result<()> {
    let editor = ctx.open(&args.document)?;
    let validation = editor.validate();

    if ctx.format == OutputFormat::Json {
        ctx.print_json(&validation)?;
    } else {
        println!("🔍 {} {}", "Validating".green().bold(), args.document.display());
        println!();
        for field in &validation.field_validities {
            if field.status.is_valid() && !args.all {
                continue;
            }
            print_field(field);
        }
        println!();
    }

    let invalid = validation.invalid_fields().count();
    if invalid > 0 {
        bail!("{} invalid field(s)", invalid);
    }
    if ctx.format == OutputFormat::Text {
        println!("✨ {} Document is valid", "Done".green().bold());
    }
    Ok(())
}

fn print_field(field: &FieldValidity) {
    let marker = if field.status.is_valid() { "✓".green() } else { "✗".red() };
    println!("{} {} (page {})", marker, field.field_id.bright_white(), field.page_id);
    for reason in &field.reasons {
        println!("    {}", reason.dimmed());
    }
    for row in &field.row_validities {
        print_row(row, 1);
    }
}

fn print_row(row: &RowValidity, depth: usize) {
    if row.status.is_valid() {
        return;
    }
    let indent = "  ".repeat(depth + 1);
    let empty: Vec<&str> = row
        .cell_validities
        .iter()
        .filter(|cell| !cell.status.is_valid())
        .map(|cell| cell.column_id.as_str())
        .collect();
    if empty.is_empty() {
        println!("{}row {}", indent, row.row_id);
    } else {
        println!("{}row {}: empty {}", indent, row.row_id, empty.join(", ").yellow());
    }
    for reason in &row.reasons {
        println!("{}  {}", indent, reason.dimmed());
    }
    for child in &row.children {
        print_row(child, depth + 1);
    }
}
