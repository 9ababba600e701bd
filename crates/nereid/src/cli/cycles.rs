//! `nereid cycles` command implementation.

use std::path::Path;

use colored::Colorize;
use nereid::{Nereid, RepoKey};

/// Run the cycles command.
pub fn run(dir: &Path, key: &RepoKey) -> Result<(), nereid::Error> {
    let nereid = Nereid::open(dir)?;

    let cycles = nereid.detect_cycles(key)?;

    if cycles.is_empty() {
        println!("{}", "No circular dependencies detected.".green());
        return Ok(());
    }

    println!(
        "Found {} circular dependencies:",
        cycles.len().to_string().red().bold()
    );
    println!();

    for (i, cycle) in cycles.iter().enumerate() {
        println!(
            "  {} {} ({} files):",
            "Cycle".yellow().bold(),
            i + 1,
            cycle.files.len()
        );

        // Component members, closed back onto the first
        let mut path_str = cycle.files.join(" → ");
        if let Some(first) = cycle.files.first() {
            path_str.push_str(" → ");
            path_str.push_str(first);
        }

        println!("    {}", path_str.dimmed());
    }

    Ok(())
}
