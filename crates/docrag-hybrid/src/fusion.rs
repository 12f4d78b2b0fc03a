//! Weighted Reciprocal Rank Fusion.

use std::collections::HashMap;

use docrag_core::error::{Error, Result};
use docrag_core::types::{RankedResult, ScoredChunk, SourceKind};

/// Standard RRF constant (Cormack, Clarke and Buettcher, SIGIR 2009).
pub const DEFAULT_RRF_K: f32 = 60.0;

/// Merge several rankings into one.
///
/// A chunk at 0-indexed rank `r` of ranking `i` contributes
/// `weights[i] / (r + k_const)`. Chunks are identified by their text, so the
/// same passage surfacing from both indexes is counted once with the summed
/// score. Output is sorted by score, best first; equal scores keep the order
/// in which the chunks were first seen across `rankings`.
pub fn fuse(rankings: &[&[ScoredChunk]], weights: &[f32], k_const: f32) -> Result<RankedResult> {
    if rankings.len() != weights.len() {
        return Err(Error::InvalidArgument(format!(
            "{} rankings but {} weights",
            rankings.len(),
            weights.len()
        )));
    }
    if !(k_const.is_finite() && k_const > 0.0) {
        return Err(Error::InvalidArgument(format!("k_const must be a positive number, got {k_const}")));
    }
    if let Some(w) = weights.iter().find(|w| !w.is_finite()) {
        return Err(Error::InvalidArgument(format!("weight must be finite, got {w}")));
    }

    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut table: Vec<(&ScoredChunk, f64)> = Vec::new();
    for (ranking, &weight) in rankings.iter().zip(weights) {
        for (rank, item) in ranking.iter().enumerate() {
            let contribution = f64::from(weight) / (rank as f64 + f64::from(k_const));
            match slot.get(item.chunk.content.as_str()) {
                Some(&i) => table[i].1 += contribution,
                None => {
                    slot.insert(item.chunk.content.as_str(), table.len());
                    table.push((item, contribution));
                }
            }
        }
    }

    // Stable sort keeps first-seen order among ties.
    table.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(table
        .into_iter()
        .map(|(item, score)| ScoredChunk { chunk: item.chunk.clone(), score: score as f32, source: SourceKind::Fused })
        .collect())
}
