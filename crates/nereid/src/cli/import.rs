//! `nereid import` command implementation.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use colored::Colorize;
use nereid::{Nereid, RepoKey, read_documents_jsonl};

/// Run the import command.
pub fn run(dir: &Path, key: &RepoKey, file: &Path, extract: bool) -> Result<(), nereid::Error> {
    let documents = if file == Path::new("-") {
        read_documents_jsonl(io::stdin().lock())?
    } else {
        read_documents_jsonl(BufReader::new(File::open(file)?))?
    };

    let nereid = Nereid::open(dir)?;
    let stats = nereid.import_documents(key, &documents)?;
    nereid.analyze()?;

    println!(
        "{} {} documents, {} occurrences into {}",
        "Imported".green().bold(),
        stats.documents,
        stats.occurrences,
        key.to_string().dimmed()
    );

    if extract {
        let edges = nereid.extract_edges(key)?;
        println!("{} {} dependency edges", "Extracted".green().bold(), edges);
    }

    Ok(())
}
