//! Template matching and seamless vertical stitching of scrolling screenshots
//!
//! The library works on in-memory `image::RgbImage` buffers only; loading and
//! saving files is left to the caller (see the `screenshot-stitch` binary).

pub mod config;
pub mod error;
pub mod postprocess;
pub mod region;
pub mod stitch;
pub mod template_matching;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{StitchConfig, create_default_config, create_plain_config};
pub use error::{CoreError, CoreResult};
pub use region::Region;
pub use stitch::{MatchBand, StitchPlan, stitch_horizontal, stitch_vertical};
pub use template_matching::{
    LabeledMatch, MatchCandidate, MatchMode, MatchReport, Pattern, TemplateMatcher,
    find_matches, match_patterns, similarity,
};
