//! Configuration for stitching and post-processing

use crate::error::{CoreError, CoreResult};
use crate::postprocess::{Margins, parse_hex_color};
use crate::stitch::MatchBand;
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Bottom edge of the match band, as a percentage of image height (0 to 100)
    pub match_position_pct: u32,
    /// Height of the match band, as a percentage of image height (1 to 20)
    pub match_height_pct: u32,
    /// Minimum score when classifying slots against several patterns (-1.0 to 1.0)
    pub classify_threshold: f64,
    /// Crop applied to the stitched image, measured inward from each edge
    pub crop: Option<Margins>,
    /// Area painted over with `mask_color` before cropping (e.g. a scrollbar)
    pub scrollbar_mask: Option<Margins>,
    /// Fill color for the scrollbar mask ("#rrggbb")
    pub mask_color: String,
    /// Fill color behind horizontally joined images of unequal height ("#rrggbb")
    pub background_color: String,
    /// Raise the default log filter from `info` to `debug`
    pub debug_enabled: bool,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            match_position_pct: 79,
            match_height_pct: 5,
            classify_threshold: 0.8,
            crop: Some(Margins::new(20, 312, 20, 520)),
            scrollbar_mask: Some(Margins::new(1231, 1323, 29, 567)),
            mask_color: "#f2f2f2".to_string(),
            background_color: "#fafafa".to_string(),
            debug_enabled: false,
        }
    }
}

impl StitchConfig {
    /// Load a JSON configuration file; missing fields take their defaults
    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: StitchConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.match_position_pct > 100 {
            return Err(CoreError::InvalidConfig(format!(
                "match_position_pct must be 0-100, got {}",
                self.match_position_pct
            )));
        }
        if !(1..=20).contains(&self.match_height_pct) {
            return Err(CoreError::InvalidConfig(format!(
                "match_height_pct must be 1-20, got {}",
                self.match_height_pct
            )));
        }
        if !(-1.0..=1.0).contains(&self.classify_threshold) {
            return Err(CoreError::InvalidConfig(format!(
                "classify_threshold must be within -1.0..=1.0, got {}",
                self.classify_threshold
            )));
        }
        self.mask_color()?;
        self.background_color()?;
        Ok(())
    }

    /// Match band for images of the given height
    pub fn band_for_height(&self, image_height: u32) -> MatchBand {
        MatchBand::from_percent(
            image_height,
            self.match_position_pct,
            self.match_height_pct,
        )
    }

    /// Default log filter for `env_logger`; `RUST_LOG` still takes precedence
    pub fn log_level(&self) -> &'static str {
        if self.debug_enabled { "debug" } else { "info" }
    }

    pub fn mask_color(&self) -> CoreResult<Rgb<u8>> {
        parse_color("mask_color", &self.mask_color)
    }

    pub fn background_color(&self) -> CoreResult<Rgb<u8>> {
        parse_color("background_color", &self.background_color)
    }
}

fn parse_color(field: &str, value: &str) -> CoreResult<Rgb<u8>> {
    parse_hex_color(value).ok_or_else(|| {
        CoreError::InvalidConfig(format!("{field} must be \"#rrggbb\", got {value:?}"))
    })
}

/// Create the default configuration (crop and scrollbar mask enabled)
pub fn create_default_config() -> StitchConfig {
    StitchConfig::default()
}

/// Configuration preset that stitches without any post-processing
pub fn create_plain_config() -> StitchConfig {
    StitchConfig {
        crop: None,
        scrollbar_mask: None,
        ..StitchConfig::default()
    }
}
