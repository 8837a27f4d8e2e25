/// Template matching module for locating patterns in screenshots
///
/// This module provides:
/// - Dense normalized cross-correlation surfaces computed in the frequency domain
/// - Threshold and best-only extraction of match positions
/// - Overlap deduplication for one pattern and across competing patterns
/// - Whole-image similarity scoring
pub mod dedup;
pub mod matcher;
pub mod similarity;
pub mod types;


pub use dedup::{dedup, dedup_across_patterns};
pub use matcher::{
    MatchSurface, TemplateMatcher, find_best_match, find_matches, match_patterns, match_surface,
};
pub use similarity::similarity;
pub use types::{LabeledMatch, MatchCandidate, MatchMode, MatchReport, Pattern};
