//! Whole-image similarity

use super::matcher::find_best_match;
use crate::error::CoreResult;
use image::RgbImage;

/// Best correlation score of `image_b` anywhere inside `image_a`
///
/// `image_b` must fit inside `image_a`. Positions scoring below 0.0 are ignored, so
/// an image that only anti-correlates yields 0.0.
pub fn similarity(image_a: &RgbImage, image_b: &RgbImage) -> CoreResult<f64> {
    let best = find_best_match(image_a, image_b, 0.0)?;
    Ok(best.map_or(0.0, |m| m.score))
}
