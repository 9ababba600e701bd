//! CLI command implementations.

mod display;

pub mod closure;
pub mod cycles;
pub mod extract;
pub mod graph;
pub mod import;
pub mod init;
pub mod refs;
pub mod stats;
