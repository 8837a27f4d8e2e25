//! Collapsing overlapping detections
//!
//! A hit is dropped when another hit with a strictly higher score has a box that
//! strictly contains the dropped hit's box center. Equal scores never eliminate
//! each other, so exactly tied overlapping hits are all kept.
//!
//! Both passes compare every hit against every other hit (O(n^2)). Raw hit lists
//! are small (a handful of clustered detections per slot), so this stays cheap; a
//! grid bucketed by box extent would be the replacement if n ever grows, and must
//! keep the same tie behavior.

use super::types::{LabeledMatch, MatchCandidate};
use crate::error::{CoreError, CoreResult};
use crate::region::Region;

fn is_shadowed(center: (u32, u32), score: f64, other_box: Region, other_score: f64) -> bool {
    score < other_score && other_box.contains_point_strict(center.0, center.1)
}

/// Keep only the best-scoring hit of each overlapping cluster of one pattern's hits
///
/// Kept hits retain their input order.
pub fn dedup(
    matches: &[MatchCandidate],
    pattern_width: u32,
    pattern_height: u32,
) -> Vec<MatchCandidate> {
    matches
        .iter()
        .filter(|a| {
            let center = a.region(pattern_width, pattern_height).center();
            !matches.iter().any(|b| {
                is_shadowed(
                    center,
                    a.score,
                    b.region(pattern_width, pattern_height),
                    b.score,
                )
            })
        })
        .copied()
        .collect()
}

/// Keep only the globally best-scoring hit per overlapping slot across patterns
///
/// `per_pattern_matches[i]` holds the raw hits of pattern `i`, whose size is
/// `pattern_sizes[i]` as `(width, height)`. Each hit's box is sized by its own
/// pattern, and hits of different patterns eliminate each other.
pub fn dedup_across_patterns(
    per_pattern_matches: &[Vec<MatchCandidate>],
    pattern_sizes: &[(u32, u32)],
) -> CoreResult<Vec<LabeledMatch>> {
    if per_pattern_matches.len() != pattern_sizes.len() {
        return Err(CoreError::PatternCountMismatch {
            matches: per_pattern_matches.len(),
            patterns: pattern_sizes.len(),
        });
    }

    let detected: Vec<(LabeledMatch, Region)> = per_pattern_matches
        .iter()
        .zip(pattern_sizes)
        .enumerate()
        .flat_map(|(index, (matches, &(width, height)))| {
            matches
                .iter()
                .map(move |m| (m.labeled(index), m.region(width, height)))
        })
        .collect();

    let kept: Vec<LabeledMatch> = detected
        .iter()
        .filter(|(a, a_box)| {
            !detected
                .iter()
                .any(|(b, b_box)| is_shadowed(a_box.center(), a.score, *b_box, b.score))
        })
        .map(|(m, _)| *m)
        .collect();

    log::debug!(
        "Resolved {} raw hits from {} patterns to {} slots",
        detected.len(),
        pattern_sizes.len(),
        kept.len()
    );

    Ok(kept)
}
