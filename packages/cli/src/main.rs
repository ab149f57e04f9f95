mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, duplicate_page, eval, init, validate, visibility, ApplyArgs, Context, DuplicatePageArgs, EvalArgs,
    InitArgs, OutputFormat, ValidateArgs, VisibilityArgs,
};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Formdoc CLI - apply, validate and inspect form documents
#[derive(Parser, Debug)]
#[command(name = "formdoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Active view, overriding the config file
    #[arg(long, global = true)]
    view: Option<String>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default formdoc.config.json
    Init(InitArgs),

    /// Report required-value violations of visible fields
    Validate(ValidateArgs),

    /// Apply a batch of change records to a document
    Apply(ApplyArgs),

    /// Evaluate a formula expression against a document
    Eval(EvalArgs),

    /// Show page, field and column visibility for the active view
    Visibility(VisibilityArgs),

    /// Copy a page together with the fields placed only on it
    DuplicatePage(DuplicatePageArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn context(cwd: &str, format: OutputFormat, view: Option<String>) -> anyhow::Result<Context> {
    Ok(Context {
        config: Config::load(cwd)?,
        cwd: cwd.to_string(),
        format,
        view,
    })
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();
    let (format, view) = (cli.format, cli.view);

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Validate(args) => validate(args, &context(&cwd, format, view)?),
        Command::Apply(args) => apply(args, &context(&cwd, format, view)?),
        Command::Eval(args) => eval(args, &context(&cwd, format, view)?),
        Command::Visibility(args) => visibility(args, &context(&cwd, format, view)?),
        Command::DuplicatePage(args) => duplicate_page(args, &context(&cwd, format, view)?),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
