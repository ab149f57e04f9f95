use super::{Context, OutputFormat};
use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use formdoc_model::Change;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Document JSON file
    pub document: PathBuf,

    /// Change records: a JSON array, or an object with a `changes` array
    pub changes: PathBuf,

    /// Output file (defaults to outDir, then stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChangeFile {
    List(Vec<Change>),
    Wrapped { changes: Vec<Change> },
}

impl ChangeFile {
    fn into_changes(self) -> Vec<Change> {
        match self {
            ChangeFile::List(changes) | ChangeFile::Wrapped { changes } => changes,
        }
    }
}

pub fn apply(args: ApplyArgs, ctx: &Context) -> Result<()> {
    let mut editor = ctx.open(&args.document)?;
    let source = fs::read_to_string(&args.changes)
        .with_context(|| format!("Failed to read {}", args.changes.display()))?;
    let changes = serde_json::from_str::<ChangeFile>(&source)
        .with_context(|| format!("Failed to parse changes in {}", args.changes.display()))?
        .into_changes();

    let report = editor.apply_changes(&changes);

    let to_stdout = ctx
        .config
        .output_path(&ctx.cwd, &args.document, args.output.as_deref())
        .is_none();

    match ctx.format {
        OutputFormat::Json if to_stdout => {
            // document goes to stdout; keep the report apart
            eprintln!("{}", serde_json::to_string(&report)?);
        }
        OutputFormat::Json => ctx.print_json(&report)?,
        OutputFormat::Text => {
            let lines = report_lines(&report);
            for line in lines {
                if to_stdout {
                    eprintln!("{}", line);
                } else {
                    println!("{}", line);
                }
            }
        }
    }

    ctx.write_document(&editor, &args.document, args.output.as_deref())
}

fn report_lines(report: &formdoc_engine::BatchReport) -> Vec<String> {
    let mut lines = vec![format!(
        "📝 {} {} change(s), skipped {}",
        "Applied".green().bold(),
        report.applied,
        report.skipped.len()
    )];
    for skipped in &report.skipped {
        lines.push(format!(
            "   {} #{} {}: {}",
            "⚠️".yellow(),
            skipped.index,
            skipped.target,
            skipped.reason
        ));
    }
    if !report.refreshed.is_empty() {
        lines.push(format!("   Visibility changed: {}", report.refreshed.join(", ")));
    }
    lines
}
