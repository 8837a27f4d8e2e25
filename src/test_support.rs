//! Deterministic synthetic images for tests

use image::{Rgb, RgbImage};

fn mix(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846c_a68b);
    h ^= h >> 16;
    h
}

/// Pseudo-random color for an integer key
pub fn hash_color(key: u32, seed: u32) -> Rgb<u8> {
    let h = mix(key.wrapping_mul(0x9e37_79b1) ^ mix(seed.wrapping_add(0x5bd1_e995)));
    let [r, g, b, _] = h.to_le_bytes();
    Rgb([r, g, b])
}

/// Image where every pixel has an independent pseudo-random color
pub fn noise_image(width: u32, height: u32, seed: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| hash_color(y * 65_521 + x, seed))
}

/// `width` x `rows.len()` image where row `i` is filled with color `rows[i]`
pub fn striped_image(width: u32, rows: &[Rgb<u8>]) -> RgbImage {
    RgbImage::from_fn(width, rows.len() as u32, |_, y| rows[y as usize])
}

/// Rows `[start, end)` of a striped universe whose row colors are unique per index
pub fn unique_rows(start: u32, end: u32, seed: u32) -> Vec<Rgb<u8>> {
    (start..end).map(|row| hash_color(row, seed)).collect()
}

pub fn paste(target: &mut RgbImage, tile: &RgbImage, x: u32, y: u32) {
    image::imageops::replace(target, tile, x as i64, y as i64);
}
