//! Integration tests for snapshot isolation and rebuild serialization.
//!
//! Readers must only ever observe a complete edge generation, never an empty
//! or half-written one, no matter how rebuilds interleave with them.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use common::{documents_for, key, owned_pairs, pair_set, seed_graph, temp_nereid};

const GRAPH_A: &[(&str, &str)] = &[("a", "b"), ("b", "c"), ("c", "d"), ("d", "a")];
const GRAPH_B: &[(&str, &str)] = &[("a", "x"), ("x", "y"), ("y", "z")];

#[test]
fn snapshot_keeps_reading_its_generation_across_a_rebuild() {
    let (_dir, nereid) = temp_nereid();
    let key = key();
    seed_graph(&nereid, &key, GRAPH_A);

    let snapshot = nereid.snapshot(&key).unwrap();
    let first_read = snapshot.edges().unwrap();

    seed_graph(&nereid, &key, GRAPH_B);

    assert_eq!(snapshot.generation(), 1);
    assert_eq!(snapshot.edges().unwrap(), first_read, "pinned read is stable");
    assert_eq!(pair_set(&snapshot.edges_from("a").unwrap()), owned_pairs(&[("a", "b")]));

    let fresh = nereid.snapshot(&key).unwrap();
    assert_eq!(fresh.generation(), 2);
    assert_eq!(pair_set(&fresh.edges().unwrap()), owned_pairs(GRAPH_B));
}

#[test]
fn readers_never_observe_a_partial_edge_set() {
    let (_dir, nereid) = temp_nereid();
    let key = key();
    seed_graph(&nereid, &key, GRAPH_A);

    let nereid = Arc::new(nereid);
    let done = Arc::new(AtomicBool::new(false));
    let valid: Arc<[BTreeSet<(String, String)>; 2]> =
        Arc::new([owned_pairs(GRAPH_A), owned_pairs(GRAPH_B)]);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let nereid = Arc::clone(&nereid);
            let done = Arc::clone(&done);
            let valid = Arc::clone(&valid);
            let key = key.clone();
            thread::spawn(move || {
                let mut reads = 0usize;
                while !done.load(Ordering::Acquire) || reads == 0 {
                    let seen = pair_set(&nereid.edges(&key).expect("read should succeed"));
                    assert!(
                        valid.contains(&seen),
                        "observed an intermediate edge set: {seen:?}"
                    );
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    for round in 0..20 {
        let graph = if round % 2 == 0 { GRAPH_B } else { GRAPH_A };
        nereid.import_documents(&key, &documents_for(graph)).unwrap();
        nereid.extract_edges(&key).unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        assert!(reader.join().expect("reader should not panic") > 0);
    }
    assert_eq!(nereid.stats(&key).unwrap().generation, 21);
}

#[test]
fn closure_during_rebuilds_reads_one_generation() {
    let (_dir, nereid) = temp_nereid();
    let key = key();
    seed_graph(&nereid, &key, GRAPH_A);

    let nereid = Arc::new(nereid);
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let nereid = Arc::clone(&nereid);
        let done = Arc::clone(&done);
        let key = key.clone();
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let closure = nereid.compute_closure(&key, "a", 10).expect("closure should succeed");
                let targets: BTreeSet<&str> =
                    closure.edges.iter().map(|e| e.target_file.as_str()).collect();
                let from_a: BTreeSet<&str> = ["a", "b", "c", "d"].into_iter().collect();
                let from_b: BTreeSet<&str> = ["x", "y", "z"].into_iter().collect();
                assert!(
                    targets == from_a || targets == from_b,
                    "closure mixed generations: {targets:?}"
                );
            }
        })
    };

    for round in 0..10 {
        let graph = if round % 2 == 0 { GRAPH_B } else { GRAPH_A };
        seed_graph(&nereid, &key, graph);
    }
    done.store(true, Ordering::Release);

    reader.join().expect("reader should not panic");
}

#[test]
fn concurrent_extractions_of_one_key_are_serialized() {
    let (_dir, nereid) = temp_nereid();
    let key = key();
    nereid.import_documents(&key, &documents_for(GRAPH_A)).unwrap();

    let nereid = Arc::new(nereid);
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let nereid = Arc::clone(&nereid);
            let key = key.clone();
            thread::spawn(move || nereid.extract_edges(&key).expect("extract should succeed"))
        })
        .collect();

    let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(counts.iter().all(|&c| c == GRAPH_A.len()));
    let stats = nereid.stats(&key).unwrap();
    assert_eq!(stats.generation, 6, "every rebuild committed exactly once");
    assert_eq!(stats.edges, GRAPH_A.len());
}
