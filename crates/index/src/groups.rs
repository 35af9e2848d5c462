//! Duplicate-group discovery over an indexed collection.
//!
//! Both variants follow the same per-file procedure: pull candidates from
//! the postings, confirm each with the full comparator, and claim every
//! confirmed member so later seeds skip them. Groups are therefore formed
//! greedily in seed order; a file that could join several disjoint sets
//! lands in the first one that reaches it.

use std::sync::{Arc, Mutex};

use hashbrown::HashSet;
use rayon::prelude::*;

use crate::types::{DuplicateGroup, FileEntry, FileId};
use crate::FingerprintIndex;

impl FingerprintIndex {
    /// Discover duplicate groups sequentially, in file-id order.
    ///
    /// Every pair inside a returned group compared as a duplicate when the
    /// group was formed, and no file appears in two groups. Output is
    /// sorted by average pairwise similarity, best first.
    pub fn find_all_duplicates(&self) -> Vec<DuplicateGroup> {
        let entries = self.snapshot();
        let mut processed = vec![false; entries.len()];
        let mut raw_groups: Vec<HashSet<FileId>> = Vec::new();

        for file_id in 0..entries.len() {
            if processed[file_id] {
                continue;
            }

            let group = self.collect_group(file_id, &entries, |candidate| processed[candidate]);

            if group.len() > 1 {
                for &member in &group {
                    processed[member] = true;
                }
                raw_groups.push(group);
            } else {
                processed[file_id] = true;
            }
        }

        self.merge_groups(raw_groups, &entries)
    }

    /// Parallel variant of [`find_all_duplicates`](Self::find_all_duplicates).
    ///
    /// `num_threads` of zero uses the rayon default. Workers share a
    /// processed bitmap under a mutex; group commits re-check it so a file
    /// claimed by a faster worker is dropped rather than emitted twice.
    /// Racing seeds can therefore split what the sequential variant reports
    /// as one group, but membership never overlaps.
    pub fn find_all_duplicates_parallel(&self, num_threads: usize) -> Vec<DuplicateGroup> {
        let entries = self.snapshot();
        if entries.is_empty() {
            return Vec::new();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .expect("failed to build discovery thread pool");

        let processed = Mutex::new(vec![false; entries.len()]);

        let raw_groups: Vec<HashSet<FileId>> = pool.install(|| {
            (0..entries.len())
                .into_par_iter()
                .fold(Vec::new, |mut local: Vec<HashSet<FileId>>, file_id| {
                    if processed.lock().unwrap()[file_id] {
                        return local;
                    }

                    let group = self.collect_group(file_id, &entries, |candidate| {
                        processed.lock().unwrap()[candidate]
                    });

                    let mut processed = processed.lock().unwrap();
                    if processed[file_id] {
                        // Another worker claimed the seed mid-comparison.
                        return local;
                    }
                    if group.len() > 1 {
                        // Members grabbed by other workers since the check
                        // above must stay where they are.
                        let claimed: HashSet<FileId> = group
                            .into_iter()
                            .filter(|&member| member == file_id || !processed[member])
                            .collect();
                        if claimed.len() > 1 {
                            for &member in &claimed {
                                processed[member] = true;
                            }
                            local.push(claimed);
                        } else {
                            processed[file_id] = true;
                        }
                    } else {
                        processed[file_id] = true;
                    }
                    local
                })
                .reduce(Vec::new, |mut merged, local| {
                    merged.extend(local);
                    merged
                })
        });

        self.merge_groups(raw_groups, &entries)
    }

    /// Run the comparator against every unclaimed candidate of `file_id`.
    fn collect_group(
        &self,
        file_id: FileId,
        entries: &[Arc<FileEntry>],
        is_processed: impl Fn(FileId) -> bool,
    ) -> HashSet<FileId> {
        let query = &entries[file_id].fingerprint;
        let candidates = self.find_candidates(query);

        let mut group = HashSet::new();
        group.insert(file_id);

        for candidate in candidates {
            if candidate == file_id || candidate >= entries.len() || is_processed(candidate) {
                continue;
            }
            let result = self
                .comparator()
                .compare(query, &entries[candidate].fingerprint);
            if result.is_duplicate {
                group.insert(candidate);
            }
        }

        group
    }

    /// Finalize raw member sets: order members, score each group by its
    /// mean pairwise similarity, and rank groups best first.
    fn merge_groups(
        &self,
        raw_groups: Vec<HashSet<FileId>>,
        entries: &[Arc<FileEntry>],
    ) -> Vec<DuplicateGroup> {
        let mut groups = Vec::with_capacity(raw_groups.len());

        for raw in raw_groups {
            if raw.len() < 2 {
                continue;
            }
            let mut file_ids: Vec<FileId> = raw.into_iter().collect();
            file_ids.sort_unstable();

            let mut total_similarity = 0.0;
            let mut comparisons = 0usize;
            for i in 0..file_ids.len() {
                for j in i + 1..file_ids.len() {
                    let result = self.comparator().compare(
                        &entries[file_ids[i]].fingerprint,
                        &entries[file_ids[j]].fingerprint,
                    );
                    total_similarity += result.similarity;
                    comparisons += 1;
                }
            }

            let avg_similarity = if comparisons > 0 {
                total_similarity / comparisons as f64
            } else {
                0.0
            };
            groups.push(DuplicateGroup {
                file_ids,
                avg_similarity,
            });
        }

        groups.sort_by(|a, b| {
            b.avg_similarity
                .partial_cmp(&a.avg_similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        groups
    }
}
