use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// View name written as the default active view
    #[arg(long, default_value = "mobile")]
    pub active_view: String,

    /// Directory for written documents
    #[arg(long)]
    pub out_dir: Option<String>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = Config {
        active_view: args.active_view,
        out_dir: args.out_dir,
        ..Config::default()
    };

    if let Some(out_dir) = &config.out_dir {
        let out_path = PathBuf::from(cwd).join(out_dir);
        if !out_path.exists() {
            fs::create_dir_all(&out_path)?;
            println!("  {} Created {}/", "✓".green(), out_dir);
        }
    }

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("Next steps:");
    println!("  1. Run: formdoc validate <document.json>");
    println!("  2. Run: formdoc apply <document.json> <changes.json>");

    Ok(())
}
