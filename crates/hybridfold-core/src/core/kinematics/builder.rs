use super::tree::{KinematicTree, Segment};
use crate::core::templates::{Chunk, TemplateSet};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TreeBuildError {
    #[error("Merged chunk set is empty; no template chunk covers the target")]
    EmptyChunkSet,
}

/// Result of merging template chunks into a sampling tree.
#[derive(Debug, Clone)]
pub struct TreeBuild {
    pub tree: KinematicTree,
    /// The merged chunk list, in sequence order.
    pub chunks: Vec<Chunk>,
    /// Pairing anchors that were admitted as single-residue chunks.
    pub pairing_positions: HashSet<usize>,
}

/// Merges the initial template's chunks, strand-pairing anchors and
/// (optionally) probabilistically admitted chunks from the other templates
/// into a kinematic tree covering the full target length.
///
/// Chunks overlapping already-covered positions are skipped. Chunks from
/// non-initial templates are considered in shuffled order and admitted with
/// probability equal to their template's prior weight; in domain-assembly
/// mode they are always admitted. Gap residues between chunks hang off the
/// preceding chunk's segment.
pub fn build_tree(
    nres: usize,
    templates: &TemplateSet,
    pairing_anchors: &[usize],
    add_non_init_chunks: bool,
    domain_assembly: bool,
    rng: &mut impl Rng,
) -> Result<TreeBuild, TreeBuildError> {
    let mut covered = vec![false; nres];
    let mut chunks: Vec<Chunk> = Vec::new();

    for chunk in templates.initial().chunks() {
        if chunk.stop >= nres {
            continue;
        }
        if chunk.residues().any(|i| covered[i]) {
            continue;
        }
        for i in chunk.residues() {
            covered[i] = true;
        }
        chunks.push(*chunk);
    }
    debug!(count = chunks.len(), "Chunks from the initial template");

    let mut pairing_positions = HashSet::new();
    for &anchor in pairing_anchors {
        if anchor >= nres || covered[anchor] {
            continue;
        }
        covered[anchor] = true;
        chunks.push(Chunk::single(anchor));
        pairing_positions.insert(anchor);
    }

    if add_non_init_chunks || domain_assembly {
        let mut candidates: Vec<(f64, Chunk)> = Vec::new();
        for (index, template) in templates.iter().enumerate() {
            if index == templates.initial_index() || templates.is_pairing(index) {
                continue;
            }
            for chunk in template.chunks() {
                if chunk.stop >= nres {
                    continue;
                }
                if chunk.residues().all(|i| !covered[i]) {
                    candidates.push((templates.weight(index), *chunk));
                }
            }
        }
        candidates.shuffle(rng);
        for (weight, chunk) in candidates {
            if chunk.residues().any(|i| covered[i]) {
                continue;
            }
            let selector = if domain_assembly {
                0.0
            } else {
                rng.r#gen::<f64>()
            };
            if selector <= weight {
                debug!(start = chunk.start, stop = chunk.stop, "Admitted extra chunk");
                for i in chunk.residues() {
                    covered[i] = true;
                }
                chunks.push(chunk);
            }
        }
    }

    if chunks.is_empty() {
        return Err(TreeBuildError::EmptyChunkSet);
    }
    chunks.sort_by_key(|c| c.start);
    info!(count = chunks.len(), "Chunks used for tree setup");

    let mut segments = Vec::with_capacity(chunks.len());
    for (k, chunk) in chunks.iter().enumerate() {
        let start = if k == 0 { 0 } else { chunk.start };
        let stop = if k + 1 == chunks.len() {
            nres - 1
        } else {
            chunks[k + 1].start - 1
        };
        segments.push(Segment {
            start,
            stop,
            anchor: chunk.start,
        });
    }

    let tree = KinematicTree::new(nres, segments)
        .expect("segments derived from sorted disjoint chunks always tile the target");

    Ok(TreeBuild {
        tree,
        chunks,
        pairing_positions,
    })
}
