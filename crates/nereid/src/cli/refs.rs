//! `nereid refs` command implementation.

use std::path::Path;

use colored::Colorize;
use nereid::{Nereid, RepoKey};

use super::display::print_bullets;

/// Run the refs command.
pub fn run(dir: &Path, key: &RepoKey, symbol: &str) -> Result<(), nereid::Error> {
    let nereid = Nereid::open(dir)?;

    let refs = nereid.find_references(key, symbol)?;

    println!(
        "{} to {} ({}):",
        "References".white().bold(),
        symbol.cyan(),
        refs.len()
    );
    print_bullets(
        refs.iter().map(|r| {
            format!(
                "{} {}",
                r.file_path,
                format!("{}:{}", r.start_line, r.start_char).dimmed()
            )
        }),
        "No references found",
    );

    Ok(())
}
