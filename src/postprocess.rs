//! Cropping and masking applied to a finished stitch
//!
//! Margins are measured inward from each image edge, so the same settings fit
//! outputs of any height.

use crate::config::StitchConfig;
use crate::error::{CoreError, CoreResult};
use crate::region::Region;
use crate::stitch::MatchBand;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

const CROP_GUIDE: Rgb<u8> = Rgb([255, 0, 0]);
const MASK_GUIDE: Rgb<u8> = Rgb([0, 0, 255]);
const BAND_GUIDE: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Margins {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Parse margins from "left,top,right,bottom"
    pub fn parse(margins_str: &str) -> Option<Self> {
        let values: Vec<u32> = margins_str
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .ok()?;
        match values.as_slice() {
            &[left, top, right, bottom] => Some(Self::new(left, top, right, bottom)),
            _ => None,
        }
    }

    /// Rectangle left inside an image of the given size, or `None` when the
    /// margins meet or cross
    pub fn inner_region(&self, image_width: u32, image_height: u32) -> Option<Region> {
        let right_edge = image_width.checked_sub(self.right)?;
        let bottom_edge = image_height.checked_sub(self.bottom)?;
        if self.left >= right_edge || self.top >= bottom_edge {
            return None;
        }
        Some(Region::new(
            self.left,
            self.top,
            right_edge - self.left,
            bottom_edge - self.top,
        ))
    }
}

fn to_rect(region: &Region) -> Rect {
    Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height)
}

/// Parse a "#rrggbb" color
pub fn parse_hex_color(color: &str) -> Option<Rgb<u8>> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

/// Fill the area inside `margins` with `color` (e.g. to erase a scrollbar)
///
/// Returns `false` and leaves the image untouched when the margins leave no area.
pub fn mask_margins(image: &mut RgbImage, margins: &Margins, color: Rgb<u8>) -> bool {
    match margins.inner_region(image.width(), image.height()) {
        Some(region) => {
            draw_filled_rect_mut(image, to_rect(&region), color);
            true
        }
        None => {
            log::warn!("⚠️ Mask margins {:?} leave no area, skipped", margins);
            false
        }
    }
}

/// Crop to the area inside `margins`
pub fn crop_margins(image: &RgbImage, margins: &Margins) -> CoreResult<RgbImage> {
    let region = margins
        .inner_region(image.width(), image.height())
        .ok_or(CoreError::InvalidDimensions {
            pattern: (
                margins.left.saturating_add(margins.right),
                margins.top.saturating_add(margins.bottom),
            ),
            target: image.dimensions(),
        })?;
    Ok(image::imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image())
}

/// Apply the configured scrollbar mask, then the configured crop
pub fn apply_post_processing(image: &RgbImage, config: &StitchConfig) -> CoreResult<RgbImage> {
    let mut processed = image.clone();

    if let Some(mask) = &config.scrollbar_mask {
        mask_margins(&mut processed, mask, config.mask_color()?);
    }

    if let Some(crop) = &config.crop {
        processed = crop_margins(&processed, crop)?;
    }

    log::debug!(
        "Post-processed {}x{} -> {}x{}",
        image.width(),
        image.height(),
        processed.width(),
        processed.height()
    );

    Ok(processed)
}

/// Preview copy with the mask outlined in blue and the crop outlined in red
pub fn draw_guides(image: &RgbImage, config: &StitchConfig) -> RgbImage {
    let mut preview = image.clone();
    let (width, height) = image.dimensions();

    if let Some(region) = config
        .scrollbar_mask
        .and_then(|m| m.inner_region(width, height))
    {
        draw_hollow_rect_mut(&mut preview, to_rect(&region), MASK_GUIDE);
    }
    if let Some(region) = config.crop.and_then(|m| m.inner_region(width, height)) {
        draw_hollow_rect_mut(&mut preview, to_rect(&region), CROP_GUIDE);
    }

    preview
}

/// Preview copy with the match band outlined in red
pub fn draw_band_guide(image: &RgbImage, band: MatchBand) -> RgbImage {
    let mut preview = image.clone();
    let region = Region::new(0, band.start(), image.width(), band.height)
        .clip_to(image.width(), image.height());
    if region.is_valid() {
        draw_hollow_rect_mut(&mut preview, to_rect(&region), BAND_GUIDE);
    }
    preview
}
