//! `nereid stats` command implementation.

use std::path::Path;

use colored::Colorize;
use nereid::{Nereid, RepoKey};

use super::display::print_key_header;

/// Run the stats command.
pub fn run(dir: &Path, key: &RepoKey) -> Result<(), nereid::Error> {
    let nereid = Nereid::open(dir)?;

    let db_path = nereid.database_path();
    let db_size_str = match std::fs::metadata(db_path) {
        Ok(meta) => format_size(meta.len()),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to get database file size");
            "size unknown".to_string()
        }
    };

    let stats = nereid.stats(key)?;

    print_key_header("Nereid Statistics", key);

    println!(
        "  {}: {} ({})",
        "Database".white().bold(),
        db_path.display(),
        db_size_str
    );
    println!();

    println!(
        "  {}: {}",
        "Documents".white().bold(),
        stats.documents.to_string().green()
    );
    println!(
        "  {}: {} total",
        "Occurrences".white().bold(),
        stats.occurrences.to_string().green()
    );
    println!("    {}: {}", "Definitions".dimmed(), stats.definitions);
    println!("    {}: {}", "References".dimmed(), stats.references);
    println!();

    println!(
        "  {}: {}",
        "Dependency Edges".white().bold(),
        stats.edges.to_string().green()
    );
    match stats.rebuilt_at.as_deref() {
        Some(at) => println!(
            "    {}: {} ({})",
            "Generation".dimmed(),
            stats.generation,
            at
        ),
        None => println!(
            "    {}",
            "Never extracted; run `nereid extract`.".yellow()
        ),
    }

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
