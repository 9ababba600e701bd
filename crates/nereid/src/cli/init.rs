//! `nereid init` command implementation.

use std::path::Path;

use colored::Colorize;
use nereid::{Config, Nereid};

/// Run the init command.
pub fn run(dir: &Path) -> Result<(), nereid::Error> {
    let config_path = Config::path_in(dir);
    if config_path.exists() {
        return Err(nereid::Error::Config(format!(
            "{} already exists; remove it to re-initialize",
            config_path.display()
        )));
    }

    let config = Config::default();
    config.save(&config_path)?;

    let nereid = Nereid::open(dir)?;

    println!("{} {}", "Initialized".green().bold(), dir.display());
    println!("  {}: {}", "Config".dimmed(), config_path.display());
    println!("  {}: {}", "Database".dimmed(), nereid.database_path().display());

    Ok(())
}
