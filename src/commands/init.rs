//! Data directory initialization

use anyhow::Result;
use colored::*;

use mnemo_mcp::core::config::{get_data_dir, Config, CONFIG_FILE, DATA_PATH_ENV};

pub fn run(force: bool) -> Result<()> {
    let data_dir = get_data_dir();
    let config_path = data_dir.join(CONFIG_FILE);

    println!("{}", "mnemo Initialization".bold());
    println!("{}", "=".repeat(50));
    println!();
    println!("Data directory: {}", data_dir.display().to_string().cyan());
    println!(
        "{}",
        format!("(set {} to use a different directory)", DATA_PATH_ENV).dimmed()
    );
    println!();

    if config_path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            "!".yellow(),
            CONFIG_FILE
        );
        return Ok(());
    }

    Config::default().save(&data_dir)?;
    println!("{} wrote {}", "✓".green(), config_path.display());

    Ok(())
}
