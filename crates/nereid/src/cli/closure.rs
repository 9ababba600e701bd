//! `nereid closure` command implementation.

use std::collections::BTreeMap;
use std::path::Path;

use colored::Colorize;
use nereid::{Closure, ClosurePath, Nereid, RepoKey};

use super::display::print_bullets;

/// Run the closure command.
pub fn run(
    dir: &Path,
    key: &RepoKey,
    root: &str,
    depth: Option<i64>,
    json: bool,
) -> Result<(), nereid::Error> {
    let nereid = Nereid::open(dir)?;

    let mut closure = match depth {
        Some(depth) => nereid.compute_closure(key, root, depth)?,
        None => nereid.compute_default_closure(key, root)?,
    };
    closure.sort();

    if json {
        let out = serde_json::to_string_pretty(&closure)
            .map_err(|e| nereid::Error::Internal(format!("failed to render closure: {e}")))?;
        println!("{out}");
    } else {
        print_closure(&closure);
    }

    Ok(())
}

fn print_closure(closure: &Closure) {
    if closure.edges.is_empty() {
        println!(
            "\"{}\" has no dependencies (max depth: {})",
            closure.root.cyan(),
            closure.max_depth
        );
        return;
    }

    println!(
        "{} of \"{}\":",
        "Dependency closure".white().bold(),
        closure.root.cyan().bold()
    );
    println!();

    let mut by_depth: BTreeMap<u32, Vec<&ClosurePath>> = BTreeMap::new();
    for path in &closure.edges {
        by_depth.entry(path.depth).or_default().push(path);
    }

    for (depth, paths) in &by_depth {
        let depth_label = if *depth == 0 { "direct" } else { "transitive" };
        println!(
            "  {} {} ({}):",
            format!("Depth {depth}").yellow(),
            depth_label.dimmed(),
            paths.len()
        );
        print_bullets(
            paths.iter().map(|p| {
                let line = format!("{} → {}", p.source_file, p.target_file);
                if p.is_cycle {
                    format!("{} {}", line, "(cycle)".red())
                } else {
                    line
                }
            }),
            "none",
        );
    }

    if closure.has_cycles() {
        println!();
        println!("  {}:", "Cycles".red().bold());
        print_bullets(&closure.cycles, "none");
    }

    println!();
    println!(
        "{}: {} edges, deepest level {} (max depth: {})",
        "Summary".dimmed(),
        closure.edges.len().to_string().green(),
        closure.max_depth_reached().unwrap_or_default(),
        closure.max_depth
    );
}
