//! Vertical auto-stitching of scrolling screenshots
//!
//! A band cut from each upper image is located in the next image down; the match
//! row tells how far the content scrolled between the two captures.

use crate::error::{CoreError, CoreResult};
use crate::template_matching::find_best_match;
use crate::template_matching::matcher::MAX_CONCURRENT_PASSES;
use image::RgbImage;
use rayon::prelude::*;

/// Minimum correlation for a band to count as found in the next image
pub const STITCH_THRESHOLD: f64 = 0.9;

/// Horizontal strip used as the matching pattern, spanning rows
/// `[position - height, position)` of the upper image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchBand {
    /// Row just below the band
    pub position: u32,
    /// Band height in rows
    pub height: u32,
}

impl MatchBand {
    pub fn new(position: u32, height: u32) -> Self {
        Self { position, height }
    }

    /// Band from percentages of the image height, truncated to whole rows
    pub fn from_percent(image_height: u32, position_pct: u32, height_pct: u32) -> Self {
        let to_px = |pct: u32| (image_height as u64 * pct as u64 / 100) as u32;
        Self::new(to_px(position_pct), to_px(height_pct))
    }

    /// First row of the band
    pub fn start(&self) -> u32 {
        self.position.saturating_sub(self.height)
    }

    fn validate(&self, image_height: u32) -> CoreResult<()> {
        if self.height == 0 || self.height > self.position || self.position > image_height {
            return Err(CoreError::InvalidBand {
                position: self.position,
                height: self.height,
                image_height,
            });
        }
        Ok(())
    }

    fn crop(&self, image: &RgbImage) -> RgbImage {
        image::imageops::crop_imm(image, 0, self.start(), image.width(), self.height).to_image()
    }
}

/// Result of a vertical stitch: per-pair match rows and the composed image
#[derive(Debug, Clone)]
pub struct StitchPlan {
    band: MatchBand,
    matched_ys: Vec<u32>,
    image: RgbImage,
}

impl StitchPlan {
    pub fn band(&self) -> MatchBand {
        self.band
    }

    /// Row in image `i + 1` where the band of image `i` was found
    pub fn matched_ys(&self) -> &[u32] {
        &self.matched_ys
    }

    /// Rows each subsequent image adds to the output
    pub fn deltas(&self) -> Vec<i64> {
        self.matched_ys
            .iter()
            .map(|&y| self.band.start() as i64 - y as i64)
            .collect()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

fn check_same_size(images: &[RgbImage]) -> CoreResult<(u32, u32)> {
    let first = images.first().ok_or(CoreError::EmptySequence)?;
    let expected = first.dimensions();
    for (index, image) in images.iter().enumerate().skip(1) {
        if image.dimensions() != expected {
            return Err(CoreError::MismatchedSizes {
                index,
                expected,
                found: image.dimensions(),
            });
        }
    }
    Ok(expected)
}

/// Locate the band of each image in the next one
///
/// Pairs are matched in parallel, a bounded number at a time. Fails with
/// `StitchFailed` naming the first pair whose band is not found at or above
/// [`STITCH_THRESHOLD`]; later chunks are not searched.
pub fn match_offsets(images: &[RgbImage], band: MatchBand) -> CoreResult<Vec<u32>> {
    let (_, height) = check_same_size(images)?;
    if images.len() > 1 {
        band.validate(height)?;
    }

    let pairs: Vec<&[RgbImage]> = images.windows(2).collect();
    let mut matched_ys = Vec::with_capacity(pairs.len());

    for (chunk_index, chunk) in pairs.chunks(MAX_CONCURRENT_PASSES).enumerate() {
        let found: Vec<CoreResult<Option<u32>>> = chunk
            .par_iter()
            .map(|pair| {
                let pattern = band.crop(&pair[0]);
                Ok(find_best_match(&pair[1], &pattern, STITCH_THRESHOLD)?.map(|m| m.y))
            })
            .collect();

        for (offset, result) in found.into_iter().enumerate() {
            let pair_index = chunk_index * MAX_CONCURRENT_PASSES + offset;
            match result? {
                Some(y) => {
                    log::debug!("  Pair {}: band found at y={}", pair_index, y);
                    matched_ys.push(y);
                }
                None => {
                    log::warn!(
                        "❌ Pair {}: band rows [{}, {}) not found in image {}",
                        pair_index,
                        band.start(),
                        band.position,
                        pair_index + 1
                    );
                    return Err(CoreError::StitchFailed { pair_index });
                }
            }
        }
    }

    Ok(matched_ys)
}

/// Paste the images into one tall image using precomputed match rows
///
/// `matched_ys` must hold one row per adjacent pair.
pub fn compose_vertical(
    images: &[RgbImage],
    band: MatchBand,
    matched_ys: &[u32],
) -> CoreResult<RgbImage> {
    let (width, height) = check_same_size(images)?;
    if matched_ys.len() + 1 != images.len() {
        return Err(CoreError::OffsetCountMismatch {
            offsets: matched_ys.len(),
            pairs: images.len() - 1,
        });
    }
    if images.len() > 1 {
        band.validate(height)?;
    }

    let band_start = band.start() as i64;
    let merged_height: i64 = height as i64
        + matched_ys
            .iter()
            .map(|&y| band_start - y as i64)
            .sum::<i64>();
    if merged_height <= 0 || merged_height > u32::MAX as i64 {
        return Err(CoreError::DegenerateLayout {
            width: width as i64,
            height: merged_height,
        });
    }

    let mut merged = RgbImage::new(width, merged_height as u32);
    image::imageops::replace(&mut merged, &images[0], 0, 0);

    let mut offset_y = band_start;
    for (image, &y) in images[1..].iter().zip(matched_ys) {
        let visible = height.saturating_sub(y);
        if visible > 0 {
            let cropped = image::imageops::crop_imm(image, 0, y, width, visible).to_image();
            image::imageops::replace(&mut merged, &cropped, 0, offset_y);
        }
        offset_y += band_start - y as i64;
    }

    Ok(merged)
}

/// Stitch vertically overlapping screenshots into one image
///
/// All images must share one size. A single image is returned unchanged and its
/// band is never checked.
pub fn stitch_vertical(images: &[RgbImage], band: MatchBand) -> CoreResult<StitchPlan> {
    let matched_ys = match_offsets(images, band)?;
    let image = compose_vertical(images, band, &matched_ys)?;

    log::info!(
        "✅ Stitched {} images into {}x{} (match rows {:?})",
        images.len(),
        image.width(),
        image.height(),
        matched_ys
    );

    Ok(StitchPlan {
        band,
        matched_ys,
        image,
    })
}
