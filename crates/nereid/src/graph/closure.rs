//! Bounded transitive closure with per-path cycle detection.
//!
//! The walk runs level by level over an explicit frontier. Each branch
//! carries the files on its own path, so a cycle is a local check against
//! that path rather than a property of the whole graph. Termination follows
//! from the depth cap plus the cycle cut; there is no recursion.

use std::collections::{HashMap, HashSet};

use super::EdgeSource;
use crate::error::{Error, Result};
use crate::types::{CancellationFlag, Closure, ClosurePath};

/// Validate a requested depth and clamp it to `limit`.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `requested` is zero or negative.
pub fn effective_max_depth(requested: i64, limit: u32) -> Result<u32> {
    if requested <= 0 {
        return Err(Error::invalid(format!(
            "max_depth must be a positive integer, got {requested}"
        )));
    }

    let limit = limit.max(1);
    match u32::try_from(requested) {
        Ok(depth) if depth <= limit => Ok(depth),
        _ => {
            tracing::warn!(requested, limit, "Clamping closure depth to configured limit");
            Ok(limit)
        }
    }
}

/// One traversal branch: the file to expand and how we got there.
struct Branch {
    file: String,
    path: Vec<String>,
}

/// Compute the closure of `root` over `source`, up to `max_depth`.
///
/// The root's own edges are depth 0. Edges found at `max_depth` are
/// recorded but their targets are not expanded. An edge whose target is
/// already on its branch's path is flagged as a cycle and that branch stops
/// there. Identical `(source, target)` pairs reached on the same level are
/// reported once; the same pair on different levels is reported per level.
///
/// `cancel` is checked before each level.
///
/// # Errors
///
/// - [`Error::InvalidParameter`] if `root` is blank or `max_depth` is 0
/// - [`Error::Cancelled`] if `cancel` is set between levels
/// - Any error from `source`
pub fn compute_closure<S: EdgeSource + ?Sized>(
    source: &S,
    root: &str,
    max_depth: u32,
    cancel: &CancellationFlag,
) -> Result<Closure> {
    if root.trim().is_empty() {
        return Err(Error::invalid("root file must not be blank"));
    }
    if max_depth == 0 {
        return Err(Error::invalid("max_depth must be a positive integer, got 0"));
    }

    let mut outgoing_cache: HashMap<String, Vec<String>> = HashMap::new();
    let mut edges: Vec<ClosurePath> = Vec::new();
    let mut cycles: Vec<String> = Vec::new();
    let mut seen_cycles: HashSet<(String, String)> = HashSet::new();

    let mut frontier = vec![Branch {
        file: root.to_string(),
        path: vec![root.to_string()],
    }];

    for depth in 0..=max_depth {
        if frontier.is_empty() {
            break;
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled { depth });
        }

        tracing::debug!(depth, frontier = frontier.len(), "Expanding closure level");

        let mut level: HashMap<(String, String), usize> = HashMap::new();
        let mut next = Vec::new();

        for branch in frontier {
            if !outgoing_cache.contains_key(&branch.file) {
                let targets = source
                    .outgoing(&branch.file)?
                    .into_iter()
                    .map(|e| e.target_file)
                    .collect();
                outgoing_cache.insert(branch.file.clone(), targets);
            }
            let targets = outgoing_cache.get(&branch.file).map_or(&[][..], Vec::as_slice);

            for target in targets {
                let is_cycle = branch.path.iter().any(|f| f == target);
                let pair = (branch.file.clone(), target.clone());

                match level.get(&pair) {
                    Some(&idx) => edges[idx].is_cycle |= is_cycle,
                    None => {
                        level.insert(pair.clone(), edges.len());
                        edges.push(ClosurePath {
                            source_file: branch.file.clone(),
                            target_file: target.clone(),
                            depth,
                            is_cycle,
                        });
                    }
                }

                if is_cycle {
                    if seen_cycles.insert(pair) {
                        cycles.push(format!("{} → {}", branch.file, target));
                    }
                } else if depth < max_depth {
                    let mut path = branch.path.clone();
                    path.push(target.clone());
                    next.push(Branch {
                        file: target.clone(),
                        path,
                    });
                }
            }
        }

        frontier = next;
    }

    Ok(Closure {
        root: root.to_string(),
        max_depth,
        edges,
        cycles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeMap;
    use crate::types::{DepKinds, DependencyEdge, RepoKey};

    fn graph(pairs: &[(&str, &str)]) -> EdgeMap {
        let key = RepoKey::new("1", "repo").unwrap();
        EdgeMap::from_edges(
            pairs
                .iter()
                .map(|&(s, t)| DependencyEdge::new(&key, s, t, DepKinds::REFERENCE)),
        )
    }

    fn path(source: &str, target: &str, depth: u32, is_cycle: bool) -> ClosurePath {
        ClosurePath {
            source_file: source.to_string(),
            target_file: target.to_string(),
            depth,
            is_cycle,
        }
    }

    fn closure(map: &EdgeMap, root: &str, depth: u32) -> Closure {
        let mut closure = compute_closure(map, root, depth, &CancellationFlag::new()).unwrap();
        closure.sort();
        closure
    }

    #[test]
    fn three_cycle_stops_at_the_closing_edge() {
        let map = graph(&[("A", "B"), ("B", "C"), ("C", "A")]);

        let result = closure(&map, "A", 5);

        assert_eq!(
            result.edges,
            vec![
                path("A", "B", 0, false),
                path("B", "C", 1, false),
                path("C", "A", 2, true),
            ]
        );
        assert_eq!(result.cycles, vec!["C → A"]);
    }

    #[test]
    fn chain_within_depth_has_no_cycles() {
        let map = graph(&[("A", "B"), ("B", "C")]);

        let result = closure(&map, "A", 2);

        assert_eq!(
            result.edges,
            vec![path("A", "B", 0, false), path("B", "C", 1, false)]
        );
        assert!(result.cycles.is_empty());
    }

    #[test]
    fn edges_at_max_depth_are_recorded_but_not_expanded() {
        let map = graph(&[("A", "B"), ("B", "C"), ("C", "D")]);

        let result = closure(&map, "A", 1);

        assert_eq!(
            result.edges,
            vec![path("A", "B", 0, false), path("B", "C", 1, false)]
        );
        assert_eq!(result.max_depth_reached(), Some(1));
    }

    #[test]
    fn diamond_reports_shared_edge_once_per_level() {
        // A -> B -> D -> E and A -> C -> D -> E
        let map = graph(&[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D"), ("D", "E")]);

        let result = closure(&map, "A", 5);

        let at_two: Vec<_> = result.edges.iter().filter(|e| e.depth == 2).collect();
        assert_eq!(at_two.len(), 1, "D -> E appears once at depth 2");
        assert_eq!(result.edges.len(), 5);
    }

    #[test]
    fn same_pair_at_different_depths_is_kept() {
        // A -> C directly and A -> B -> C
        let map = graph(&[("A", "B"), ("A", "C"), ("B", "C"), ("C", "D")]);

        let result = closure(&map, "A", 5);

        let c_to_d: Vec<_> = result
            .edges
            .iter()
            .filter(|e| e.source_file == "C" && e.target_file == "D")
            .map(|e| e.depth)
            .collect();
        assert_eq!(c_to_d, vec![1, 2]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let map = graph(&[("A", "A")]);

        let result = closure(&map, "A", 3);

        assert_eq!(result.edges, vec![path("A", "A", 0, true)]);
        assert_eq!(result.cycles, vec!["A → A"]);
    }

    #[test]
    fn unknown_root_yields_empty_closure() {
        let map = graph(&[("A", "B")]);

        let result = closure(&map, "Z", 3);

        assert!(result.edges.is_empty());
        assert_eq!(result.root, "Z");
    }

    #[test]
    fn cancelled_flag_stops_before_first_level() {
        let map = graph(&[("A", "B")]);
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let err = compute_closure(&map, "A", 3, &cancel).expect_err("should be cancelled");

        assert!(matches!(err, Error::Cancelled { depth: 0 }));
    }

    #[test]
    fn blank_root_is_rejected() {
        let map = EdgeMap::default();

        assert!(matches!(
            compute_closure(&map, " ", 3, &CancellationFlag::new()),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn effective_depth_rejects_non_positive_and_clamps_large() {
        assert!(matches!(effective_max_depth(0, 32), Err(Error::InvalidParameter(_))));
        assert!(matches!(effective_max_depth(-1, 32), Err(Error::InvalidParameter(_))));
        assert_eq!(effective_max_depth(5, 32).unwrap(), 5);
        assert_eq!(effective_max_depth(1_000, 32).unwrap(), 32);
        assert_eq!(effective_max_depth(i64::MAX, 32).unwrap(), 32);
    }
}
