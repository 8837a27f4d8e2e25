use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for matching and stitching operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// The error type for all matching, stitching and configuration operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Pattern {pattern:?} does not fit inside target {target:?} (width, height)")]
    InvalidDimensions {
        pattern: (u32, u32),
        target: (u32, u32),
    },

    #[error("No match above threshold between image {pair_index} and image {}. Check the image order.", .pair_index + 1)]
    StitchFailed { pair_index: usize },

    #[error("At least one image is required")]
    EmptySequence,

    #[error("Image {index} is {found:?} but the first image is {expected:?}; all images must share one size")]
    MismatchedSizes {
        index: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("Match band ending at row {position} with height {height} does not fit an image {image_height} rows high")]
    InvalidBand {
        position: u32,
        height: u32,
        image_height: u32,
    },

    #[error("Layout produces an output of {width}x{height}, which cannot be built")]
    DegenerateLayout { width: i64, height: i64 },

    #[error("Got match sets for {matches} patterns but {patterns} patterns")]
    PatternCountMismatch { matches: usize, patterns: usize },

    #[error("Got {offsets} match rows for {pairs} image pairs")]
    OffsetCountMismatch { offsets: usize, pairs: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("Image codec error: {source}")]
    Image {
        #[from]
        source: image::ImageError,
    },
}

impl CoreError {
    /// Check if this error is a caller-side precondition violation
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidDimensions { .. }
                | CoreError::EmptySequence
                | CoreError::MismatchedSizes { .. }
                | CoreError::InvalidBand { .. }
                | CoreError::PatternCountMismatch { .. }
                | CoreError::OffsetCountMismatch { .. }
        )
    }

    pub(crate) fn check_fits(pattern: (u32, u32), target: (u32, u32)) -> CoreResult<()> {
        if pattern.0 == 0 || pattern.1 == 0 || pattern.0 > target.0 || pattern.1 > target.1 {
            return Err(CoreError::InvalidDimensions { pattern, target });
        }
        Ok(())
    }
}
