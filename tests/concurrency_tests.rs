//! Thread-safety of the loader and index under concurrent use.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use audiodup::FingerprintIndex;
use common::{loader_for, patterned, synthetic_fingerprint, tone, MemoryDecoder};

#[test]
fn concurrent_generation_produces_identical_fingerprints() {
    let mut decoder = MemoryDecoder::new();
    decoder.insert("/shared.flac", tone(5.0, 0.5, 0.017));
    let loader = Arc::new(loader_for(decoder));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let loader = Arc::clone(&loader);
            thread::spawn(move || loader.generate("/shared.flac").unwrap())
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = &results[0];
    for (i, result) in results.iter().enumerate().skip(1) {
        assert_eq!(first.data, result.data, "thread {i} diverged");
    }
}

#[test]
fn concurrent_adds_assign_unique_ids() {
    let index = Arc::new(FingerprintIndex::new());

    let handles: Vec<_> = (0..8u32)
        .map(|worker| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                let mut ids = Vec::new();
                for i in 0..5u32 {
                    let seed = worker * 100 + i;
                    let id = index
                        .add_file(
                            format!("/{worker}-{i}.flac"),
                            synthetic_fingerprint(patterned(40, seed), "/x"),
                        )
                        .unwrap();
                    ids.push(id);
                }
                ids
            })
        })
        .collect();

    let mut all_ids = Vec::new();
    for handle in handles {
        all_ids.extend(handle.join().unwrap());
    }

    assert_eq!(index.file_count(), 40);
    let unique: HashSet<_> = all_ids.iter().copied().collect();
    assert_eq!(unique.len(), 40);
    assert_eq!(*all_ids.iter().max().unwrap(), 39);
}

#[test]
fn candidate_searches_run_concurrently_with_each_other() {
    let index = Arc::new(FingerprintIndex::new());
    let base = patterned(80, 3);
    index
        .add_file("/a.flac", synthetic_fingerprint(base.clone(), "/a.flac"))
        .unwrap();
    index
        .add_file("/b.flac", synthetic_fingerprint(base.clone(), "/b.flac"))
        .unwrap();

    let expected = index.find_candidates(&synthetic_fingerprint(base.clone(), "/q.flac"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let index = Arc::clone(&index);
            let query = synthetic_fingerprint(base.clone(), "/q.flac");
            thread::spawn(move || index.find_candidates(&query))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn reads_interleaved_with_writes_stay_consistent() {
    let index = Arc::new(FingerprintIndex::new());
    let query_data = patterned(60, 1);
    index
        .add_file("/seed.flac", synthetic_fingerprint(query_data.clone(), "/seed.flac"))
        .unwrap();

    let writer = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for i in 0..50u32 {
                index
                    .add_file(
                        format!("/w-{i}.flac"),
                        synthetic_fingerprint(patterned(60, i + 10_000), "/x"),
                    )
                    .unwrap();
            }
        })
    };

    let reader = {
        let index = Arc::clone(&index);
        let query = synthetic_fingerprint(query_data, "/q.flac");
        thread::spawn(move || {
            for _ in 0..50 {
                // The seed file always matches itself, whatever else has
                // landed in the index so far.
                let candidates = index.find_candidates(&query);
                assert!(candidates.contains(&0));
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(index.file_count(), 51);
}

#[test]
fn parallel_discovery_is_safe_under_repetition() {
    let index = FingerprintIndex::new();
    for pair in 0..5u32 {
        let base = patterned(70, pair * 7 + 1);
        index
            .add_file(format!("/{pair}-a.flac"), synthetic_fingerprint(base.clone(), "/x"))
            .unwrap();
        index
            .add_file(format!("/{pair}-b.flac"), synthetic_fingerprint(base, "/x"))
            .unwrap();
    }

    for _ in 0..10 {
        let groups = index.find_all_duplicates_parallel(4);
        assert_eq!(groups.len(), 5);

        let mut seen = HashSet::new();
        for group in &groups {
            assert_eq!(group.file_ids.len(), 2);
            for &id in &group.file_ids {
                assert!(seen.insert(id), "file {id} appeared in two groups");
            }
        }
    }
}

#[test]
fn batch_generation_matches_sequential_generation() {
    let mut decoder = MemoryDecoder::new();
    let paths: Vec<std::path::PathBuf> = (0..6)
        .map(|i| {
            let path = std::path::PathBuf::from(format!("/t-{i}.flac"));
            decoder.insert(path.clone(), tone(4.0, 0.5, 0.013 + i as f32 * 0.002));
            path
        })
        .collect();
    let loader = loader_for(decoder);

    let sequential: Vec<_> = paths
        .iter()
        .map(|p| loader.generate(p.clone()).unwrap().data)
        .collect();
    let batch: Vec<_> = loader
        .generate_batch(&paths, None)
        .into_iter()
        .map(|r| r.unwrap().data)
        .collect();

    assert_eq!(sequential, batch);
}
