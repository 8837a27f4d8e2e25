/// Template matching data types
use crate::region::Region;
use image::RgbImage;
use serde::Serialize;

/// A named pattern to search for
#[derive(Clone, Debug)]
pub struct Pattern {
    /// Pattern label/name (e.g., "digit-3", "icon-star")
    pub label: Option<String>,
    /// Pattern pixels
    pub image: RgbImage,
}

/// A single match of a pattern within a target image
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchCandidate {
    /// X coordinate of the box's top-left corner in the target image
    pub x: u32,
    /// Y coordinate of the box's top-left corner in the target image
    pub y: u32,
    /// Normalized correlation score (-1.0 to 1.0)
    pub score: f64,
}

/// A match tagged with the index of the pattern that produced it
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LabeledMatch {
    pub x: u32,
    pub y: u32,
    pub score: f64,
    pub pattern_index: usize,
}

/// Labeled match as written to reports: the match fields plus the pattern label
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchReport<'a> {
    #[serde(flatten)]
    pub slot: LabeledMatch,
    pub label: Option<&'a str>,
}

/// Which positions of the match surface to report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Every position at or above the threshold
    #[default]
    All,
    /// Only the highest-scoring position (first in row-major order on ties)
    BestOnly,
}

impl Pattern {
    pub fn new(label: Option<String>, image: RgbImage) -> Self {
        Self { label, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Get the pattern name for display
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) => format!("{}-[{}x{}]", label, self.width(), self.height()),
            None => format!("pattern-[{}x{}]", self.width(), self.height()),
        }
    }
}

impl MatchCandidate {
    pub fn new(x: u32, y: u32, score: f64) -> Self {
        Self { x, y, score }
    }

    /// Detection box for a pattern of the given size
    pub fn region(&self, pattern_width: u32, pattern_height: u32) -> Region {
        Region::new(self.x, self.y, pattern_width, pattern_height)
    }

    pub fn labeled(self, pattern_index: usize) -> LabeledMatch {
        LabeledMatch {
            x: self.x,
            y: self.y,
            score: self.score,
            pattern_index,
        }
    }
}

impl LabeledMatch {
    pub fn candidate(&self) -> MatchCandidate {
        MatchCandidate::new(self.x, self.y, self.score)
    }

    /// Report entry carrying the label of the pattern that produced this match
    pub fn report<'a>(&self, patterns: &'a [Pattern]) -> MatchReport<'a> {
        MatchReport {
            slot: *self,
            label: patterns
                .get(self.pattern_index)
                .and_then(|p| p.label.as_deref()),
        }
    }

    /// Format match as string with score percentage
    pub fn describe(&self, patterns: &[Pattern]) -> String {
        let pattern_name = patterns
            .get(self.pattern_index)
            .and_then(|p| p.label.as_deref())
            .unwrap_or("unnamed");
        let score_pct = (self.score * 100.0) as i32;
        format!(
            "{} at ({},{}) - {}%",
            pattern_name, self.x, self.y, score_pct
        )
    }
}
