use super::{Context, OutputFormat};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DuplicatePageArgs {
    /// Document JSON file
    pub document: PathBuf,

    /// Id of the page to copy
    pub page_id: String,

    /// Output file (defaults to outDir, then stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn duplicate_page(args: DuplicatePageArgs, ctx: &Context) -> Result<()> {
    let mut editor = ctx.open(&args.document)?;
    let new_page_id = editor.duplicate_page(&args.page_id)?;
    let created = editor.take_changes();

    let to_stdout = ctx
        .config
        .output_path(&ctx.cwd, &args.document, args.output.as_deref())
        .is_none();

    let summary = json!({ "pageId": new_page_id, "changes": created });
    match ctx.format {
        OutputFormat::Json if to_stdout => eprintln!("{}", serde_json::to_string(&summary)?),
        OutputFormat::Json => ctx.print_json(&summary)?,
        OutputFormat::Text => {
            let summary = format!(
                "📄 {} {} → {} ({} change(s))",
                "Duplicated".green().bold(),
                args.page_id,
                new_page_id.bright_white(),
                created.len()
            );
            if to_stdout {
                eprintln!("{}", summary);
            } else {
                println!("{}", summary);
            }
        }
    }

    ctx.write_document(&editor, &args.document, args.output.as_deref())
}
