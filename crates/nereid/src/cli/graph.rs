//! `nereid graph` command implementation.

use std::path::Path;

use nereid::{Nereid, RepoKey};

/// Run the graph command.
pub fn run(dir: &Path, key: &RepoKey, pretty: bool) -> Result<(), nereid::Error> {
    let nereid = Nereid::open(dir)?;

    let view = nereid.assemble_graph(key)?;

    let rendered = if pretty {
        serde_json::to_string_pretty(&view)
    } else {
        serde_json::to_string(&view)
    }
    .map_err(|e| nereid::Error::Internal(format!("failed to render graph: {e}")))?;

    println!("{rendered}");
    Ok(())
}
