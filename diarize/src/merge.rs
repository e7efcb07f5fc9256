//! Post-pass merging of near-duplicate speaker profiles.
//!
//! Online clustering can split one voice across several profiles when it
//! drifts early in a run. This pass joins profiles whose settled centroids
//! ended up close, rewrites the affected spans, and renumbers speakers so
//! ids stay gap-free.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::clusterer::Clustering;
use crate::profile::{SpeakerId, SpeakerProfile};
use crate::similarity::Metric;

/// Centroid similarity above which two profiles count as the same speaker.
pub const MERGE_SIMILARITY: f64 = 0.85;

/// Merges near-duplicate profiles and renumbers speaker ids.
///
/// Every profile pair whose centroid similarity exceeds
/// [`MERGE_SIMILARITY`] is joined, later-created into earlier-created.
/// Chains resolve to a fixed point: if 2 joins 1 and 3 joins 2, all three
/// end up one speaker. Survivors absorb the joined histories, so the
/// centroid stays the mean of every sample they now own, and ids are
/// renumbered 1..=M by first appearance in span order with no gaps.
///
/// Display labels are not refreshed here; callers relabel once after
/// merging (see [`Clustering::relabel`]).
pub fn merge_profiles(clustering: Clustering, metric: &Metric) -> Clustering {
    let Clustering { mut spans, profiles } = clustering;
    let n = profiles.len();

    // Union over pre-merge centroids, smallest profile index as root.
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in i + 1..n {
            let sim = metric.similarity(&profiles[i].centroid, &profiles[j].centroid);
            if sim > MERGE_SIMILARITY {
                debug!(
                    from = %profiles[j].id,
                    into = %profiles[i].id,
                    similarity = sim,
                    "joining profiles"
                );
                union(&mut parent, i, j);
            }
        }
    }
    let roots: Vec<usize> = (0..n).map(|i| find(&mut parent, i)).collect();

    let original_ids: Vec<SpeakerId> = profiles.iter().map(|p| p.id).collect();
    let index_of: HashMap<SpeakerId, usize> = original_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();

    // Survivors absorb joined histories in creation order.
    let mut slots: Vec<Option<SpeakerProfile>> = profiles.into_iter().map(Some).collect();
    for i in 0..n {
        let r = roots[i];
        if r == i {
            continue;
        }
        if let Some(absorbed) = slots[i].take() {
            if let Some(survivor) = slots[r].as_mut() {
                survivor.absorb(absorbed);
            }
        }
    }

    // Renumber by first appearance in span order and rewrite span ids.
    // Ids unknown to the profile set (spans attached before any profile
    // existed) renumber like everything else.
    let mut renumbered: HashMap<SpeakerId, SpeakerId> = HashMap::new();
    let mut survivors: Vec<SpeakerProfile> = Vec::new();
    for s in &mut spans {
        let rooted = match index_of.get(&s.speaker) {
            Some(&idx) => original_ids[roots[idx]],
            None => s.speaker,
        };
        let next = SpeakerId(renumbered.len() as u32 + 1);
        let new_id = *renumbered.entry(rooted).or_insert(next);
        if new_id == next {
            // First appearance: emit the surviving profile under its new id.
            if let Some(&idx) = index_of.get(&rooted) {
                if let Some(mut p) = slots[idx].take() {
                    p.id = new_id;
                    survivors.push(p);
                }
            }
        }
        s.speaker = new_id;
    }

    // Profiles with no spans cannot normally occur; keep them rather than
    // drop samples on the floor, numbering past what the span walk used.
    let mut next_free = renumbered.len() as u32;
    for mut p in slots.into_iter().flatten() {
        next_free += 1;
        p.id = SpeakerId(next_free);
        survivors.push(p);
    }

    info!(before = n, after = survivors.len(), "profile merge complete");
    Clustering {
        spans,
        profiles: survivors,
    }
}

fn find(parent: &mut [usize], i: usize) -> usize {
    let mut root = i;
    while parent[root] != root {
        root = parent[root];
    }
    let mut cur = i;
    while parent[cur] != root {
        let next = parent[cur];
        parent[cur] = root;
        cur = next;
    }
    root
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        // Earlier-created profile survives.
        parent[ra.max(rb)] = ra.min(rb);
    }
}
