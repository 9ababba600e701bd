//! Common display utilities for CLI commands.

use colored::Colorize;

const MAX_DISPLAY_ITEMS: usize = 15;

/// Print bullet items, truncating after `MAX_DISPLAY_ITEMS`.
///
/// Shows `empty_message` when there is nothing to print.
pub fn print_bullets<I>(items: I, empty_message: &str)
where
    I: IntoIterator,
    I::Item: std::fmt::Display,
{
    let mut shown = 0usize;
    let mut hidden = 0usize;

    for item in items {
        if shown < MAX_DISPLAY_ITEMS {
            println!("    {} {item}", "•".dimmed());
            shown += 1;
        } else {
            hidden += 1;
        }
    }

    if shown == 0 {
        println!("    {}", empty_message.dimmed());
    } else if hidden > 0 {
        println!("    {} ... and {hidden} more", "•".dimmed());
    }
}

/// Print the `owner@repo` header most commands start with.
pub fn print_key_header(title: &str, key: &nereid::RepoKey) {
    println!("{} {}", title.cyan().bold(), key.to_string().dimmed());
    println!();
}
