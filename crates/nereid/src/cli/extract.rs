//! `nereid extract` command implementation.

use std::path::Path;
use std::time::Instant;

use colored::Colorize;
use nereid::{Nereid, RepoKey};

/// Run the extract command.
pub fn run(dir: &Path, key: &RepoKey) -> Result<(), nereid::Error> {
    let nereid = Nereid::open(dir)?;

    let start = Instant::now();
    let edges = nereid.extract_edges(key)?;
    let stats = nereid.stats(key)?;

    println!(
        "{} {} dependency edges for {} (generation {})",
        "Extracted".green().bold(),
        edges,
        key.to_string().dimmed(),
        stats.generation
    );
    println!("{}: {:.2?}", "Duration".dimmed(), start.elapsed());

    if stats.documents == 0 {
        println!(
            "{}",
            "No documents imported for this key; run `nereid import` first.".yellow()
        );
    }

    Ok(())
}
