//! Side-by-side concatenation without matching

use crate::error::{CoreError, CoreResult};
use image::{Rgb, RgbImage};

/// Place images left to right at the top edge
///
/// The output is as wide as all images together and as tall as the tallest one;
/// uncovered pixels keep the `background` color.
pub fn stitch_horizontal(images: &[RgbImage], background: Rgb<u8>) -> CoreResult<RgbImage> {
    if images.is_empty() {
        return Err(CoreError::EmptySequence);
    }

    let merged_height = images.iter().map(|img| img.height()).max().unwrap_or(0);
    let total_width: u64 = images.iter().map(|img| img.width() as u64).sum();
    let merged_width = u32::try_from(total_width).map_err(|_| CoreError::DegenerateLayout {
        width: total_width as i64,
        height: merged_height as i64,
    })?;

    let mut merged = RgbImage::from_pixel(merged_width, merged_height, background);
    let mut offset_x = 0i64;
    for image in images {
        image::imageops::replace(&mut merged, image, offset_x, 0);
        offset_x += image.width() as i64;
    }

    log::info!(
        "✅ Joined {} images side by side into {}x{}",
        images.len(),
        merged_width,
        merged_height
    );

    Ok(merged)
}
