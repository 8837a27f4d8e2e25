//! Joining screenshot sequences into one image

pub mod horizontal;
pub mod vertical;


pub use horizontal::stitch_horizontal;
pub use vertical::{
    MatchBand, STITCH_THRESHOLD, StitchPlan, compose_vertical, match_offsets, stitch_vertical,
};
