/// Template matching implementation
///
/// Mean-subtracted normalized cross-correlation over RGB images. The numerator of
/// every position comes from one frequency-domain cross-correlation of the
/// zero-mean pattern against the image; window means and energies come from
/// summed-area tables. Cost is proportional to image area, not image area times
/// pattern area. When several patterns are searched in one image, the image-side
/// tables and spectra are built once.
use super::dedup::dedup_across_patterns;
use super::types::{LabeledMatch, MatchCandidate, MatchMode, Pattern};
use crate::error::{CoreError, CoreResult};
use image::RgbImage;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

const CHANNELS: usize = 3;

/// Numerators this far past the denominator saturate to +/-1 (rounding overshoot);
/// anything larger is treated as a degenerate window.
const SATURATION_MARGIN: f64 = 1.125;

/// Windows scoring within this margin of 1.0 are compared pixel by pixel.
const EXACT_CHECK_MARGIN: f64 = 1e-6;

/// Highest score a window that is not pixel-identical to the pattern can get.
const BELOW_ONE: f64 = 1.0 - f64::EPSILON;

/// Upper bound on full-image matcher passes running at once. Each pass holds
/// two complex buffers the size of the image.
pub(crate) const MAX_CONCURRENT_PASSES: usize = 4;

/// Dense score surface: one score per top-left position where the pattern fits
#[derive(Clone, Debug)]
pub struct MatchSurface {
    width: u32,
    height: u32,
    scores: Vec<f64>,
}

impl MatchSurface {
    /// Number of candidate x positions (`image width - pattern width + 1`)
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of candidate y positions (`image height - pattern height + 1`)
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.scores
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Scores in row-major order
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    fn positions(&self) -> impl Iterator<Item = MatchCandidate> + '_ {
        let width = self.width as usize;
        self.scores.iter().enumerate().map(move |(idx, &score)| {
            MatchCandidate::new((idx % width) as u32, (idx / width) as u32, score)
        })
    }

    /// All positions scoring at or above `threshold`, in row-major order
    pub fn candidates(&self, threshold: f64) -> Vec<MatchCandidate> {
        self.positions().filter(|m| m.score >= threshold).collect()
    }

    /// Highest-scoring position at or above `threshold`; the first one in
    /// row-major order wins ties
    pub fn best(&self, threshold: f64) -> Option<MatchCandidate> {
        let mut best: Option<MatchCandidate> = None;
        for candidate in self.positions() {
            if candidate.score >= threshold && best.is_none_or(|b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        best
    }
}

/// Per-channel summed-area tables of pixel values and squared pixel values
struct IntegralImages {
    stride: usize,
    sums: Vec<[u64; CHANNELS]>,
    squares: Vec<[u64; CHANNELS]>,
}

impl IntegralImages {
    fn new(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let stride = width as usize + 1;
        let mut sums = vec![[0u64; CHANNELS]; stride * (height as usize + 1)];
        let mut squares = vec![[0u64; CHANNELS]; stride * (height as usize + 1)];

        for (x, y, pixel) in image.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            let here = (y + 1) * stride + x + 1;
            let up = y * stride + x + 1;
            let left = (y + 1) * stride + x;
            let diag = y * stride + x;
            for c in 0..CHANNELS {
                let value = pixel[c] as u64;
                sums[here][c] = value + sums[up][c] + sums[left][c] - sums[diag][c];
                squares[here][c] =
                    value * value + squares[up][c] + squares[left][c] - squares[diag][c];
            }
        }

        Self {
            stride,
            sums,
            squares,
        }
    }

    fn corners(&self, x: u32, y: u32, width: u32, height: u32) -> [usize; 4] {
        let (x1, y1) = (x as usize, y as usize);
        let (x2, y2) = (x1 + width as usize, y1 + height as usize);
        [
            y2 * self.stride + x2,
            y1 * self.stride + x1,
            y1 * self.stride + x2,
            y2 * self.stride + x1,
        ]
    }

    fn sum_region(table: &[[u64; CHANNELS]], corners: [usize; 4], c: usize) -> u64 {
        let [br, tl, tr, bl] = corners;
        table[br][c] + table[tl][c] - table[tr][c] - table[bl][c]
    }

    /// Per-channel pixel sums of a window
    fn window_sums(&self, x: u32, y: u32, width: u32, height: u32) -> [u64; CHANNELS] {
        let corners = self.corners(x, y, width, height);
        std::array::from_fn(|c| Self::sum_region(&self.sums, corners, c))
    }

    /// Sum of squared deviations from the per-channel window mean, over all channels
    fn window_deviation(&self, x: u32, y: u32, width: u32, height: u32) -> f64 {
        let corners = self.corners(x, y, width, height);
        let area = width as u128 * height as u128;
        let mut scaled = 0u128;
        for c in 0..CHANNELS {
            let sum = Self::sum_region(&self.sums, corners, c) as u128;
            let sum_sq = Self::sum_region(&self.squares, corners, c) as u128;
            // area * sum_sq >= sum^2 (Cauchy-Schwarz), exact in integers
            scaled += area * sum_sq - sum * sum;
        }
        scaled as f64 / area as f64
    }
}

/// Image-side data shared by every pattern searched in one image: summed-area
/// tables and the per-channel spectra
struct PreparedImage<'a> {
    image: &'a RgbImage,
    stats: IntegralImages,
    spectra: [Vec<Complex<f64>>; CHANNELS],
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl<'a> PreparedImage<'a> {
    fn new(image: &'a RgbImage) -> Self {
        let len = image.width() as usize * image.height() as usize;
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);

        let spectra = std::array::from_fn(|c| {
            let mut buffer: Vec<Complex<f64>> = image
                .pixels()
                .map(|pixel| Complex::new(pixel[c] as f64, 0.0))
                .collect();
            forward.process(&mut buffer);
            buffer
        });

        Self {
            image,
            stats: IntegralImages::new(image),
            spectra,
            forward,
            inverse,
        }
    }

    /// Cross-correlation of the zero-mean pattern against the image, summed over
    /// channels and not yet scaled by `1 / len`. Entry `y * image_width + x` holds
    /// the numerator for position `(x, y)` in its real part.
    ///
    /// The pattern is laid out with the image's row stride, so a plain 1D circular
    /// correlation of length `width * height` never wraps for positions where the
    /// pattern fits.
    fn correlate(&self, pattern: &RgbImage, means: [f64; CHANNELS]) -> Vec<Complex<f64>> {
        let stride = self.image.width() as usize;
        let len = self.spectra[0].len();
        let zero = Complex::new(0.0, 0.0);

        let mut product = vec![zero; len];
        let mut pattern_freq = vec![zero; len];

        for (c, image_freq) in self.spectra.iter().enumerate() {
            pattern_freq.fill(zero);
            for (x, y, pixel) in pattern.enumerate_pixels() {
                pattern_freq[y as usize * stride + x as usize] =
                    Complex::new(pixel[c] as f64 - means[c], 0.0);
            }
            self.forward.process(&mut pattern_freq);

            for ((acc, img), tpl) in product.iter_mut().zip(image_freq).zip(&pattern_freq) {
                *acc += *img * tpl.conj();
            }
        }

        self.inverse.process(&mut product);
        product
    }

    /// Only a window that is pixel-identical to the pattern scores exactly 1.0
    fn confirm_exact(&self, pattern: &RgbImage, x: u32, y: u32, score: f64) -> f64 {
        if score < 1.0 - EXACT_CHECK_MARGIN {
            return score;
        }
        let identical = pattern
            .enumerate_pixels()
            .all(|(px, py, pixel)| self.image.get_pixel(x + px, y + py) == pixel);
        if identical { 1.0 } else { score.min(BELOW_ONE) }
    }

    fn surface(&self, pattern: &RgbImage) -> CoreResult<MatchSurface> {
        CoreError::check_fits(pattern.dimensions(), self.image.dimensions())?;

        let (image_width, image_height) = self.image.dimensions();
        let (pattern_width, pattern_height) = pattern.dimensions();
        let area = pattern_width as f64 * pattern_height as f64;

        let pattern_stats = IntegralImages::new(pattern);
        let means = pattern_stats
            .window_sums(0, 0, pattern_width, pattern_height)
            .map(|sum| sum as f64 / area);
        let pattern_deviation =
            pattern_stats.window_deviation(0, 0, pattern_width, pattern_height);

        let numerators = self.correlate(pattern, means);
        let scale = 1.0 / numerators.len() as f64;

        let width = image_width - pattern_width + 1;
        let height = image_height - pattern_height + 1;
        let stride = image_width as usize;

        let mut scores = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let numerator = numerators[y as usize * stride + x as usize].re * scale;
                let window_deviation =
                    self.stats.window_deviation(x, y, pattern_width, pattern_height);
                let denominator = (window_deviation * pattern_deviation).sqrt();
                let score = normalize_score(numerator, denominator);
                scores.push(self.confirm_exact(pattern, x, y, score));
            }
        }

        Ok(MatchSurface {
            width,
            height,
            scores,
        })
    }
}

fn normalize_score(numerator: f64, denominator: f64) -> f64 {
    let magnitude = numerator.abs();
    let score = if magnitude < denominator {
        numerator / denominator
    } else if magnitude < denominator * SATURATION_MARGIN {
        numerator.signum()
    } else {
        0.0
    };
    score.clamp(-1.0, 1.0)
}

/// Map `f` over `items` in parallel, at most [`MAX_CONCURRENT_PASSES`] at a
/// time; results keep input order
pub(crate) fn bounded_par_map<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let mut results = Vec::with_capacity(items.len());
    for chunk in items.chunks(MAX_CONCURRENT_PASSES) {
        results.par_extend(chunk.par_iter().map(&f));
    }
    results
}

/// Compute the full match surface of `pattern` over `image`
///
/// Fails with `InvalidDimensions` when the pattern is empty or larger than the
/// image in either axis.
pub fn match_surface(image: &RgbImage, pattern: &RgbImage) -> CoreResult<MatchSurface> {
    CoreError::check_fits(pattern.dimensions(), image.dimensions())?;
    PreparedImage::new(image).surface(pattern)
}

fn select(
    surface: &MatchSurface,
    image: &RgbImage,
    pattern: &RgbImage,
    threshold: f64,
    mode: MatchMode,
) -> Vec<MatchCandidate> {
    let matches: Vec<MatchCandidate> = match mode {
        MatchMode::All => surface.candidates(threshold),
        MatchMode::BestOnly => surface.best(threshold).into_iter().collect(),
    };

    log::debug!(
        "🔍 {}x{} pattern over {}x{} image: {} positions, {} at or above {:.3} ({:?})",
        pattern.width(),
        pattern.height(),
        image.width(),
        image.height(),
        surface.scores.len(),
        matches.len(),
        threshold,
        mode
    );

    matches
}

/// Find positions of `pattern` in `image` scoring at or above `threshold`
///
/// # Arguments
/// * `image` - The image to search in
/// * `pattern` - The pattern to find; must fit inside `image`
/// * `threshold` - Minimum correlation score (-1.0 to 1.0)
/// * `mode` - `All` for every passing position, `BestOnly` for at most one
///
/// # Returns
/// Raw (not deduplicated) matches in row-major order
pub fn find_matches(
    image: &RgbImage,
    pattern: &RgbImage,
    threshold: f64,
    mode: MatchMode,
) -> CoreResult<Vec<MatchCandidate>> {
    let surface = match_surface(image, pattern)?;
    Ok(select(&surface, image, pattern, threshold, mode))
}

/// Best-only form of [`find_matches`]; `None` when nothing clears the threshold
pub fn find_best_match(
    image: &RgbImage,
    pattern: &RgbImage,
    threshold: f64,
) -> CoreResult<Option<MatchCandidate>> {
    Ok(find_matches(image, pattern, threshold, MatchMode::BestOnly)?
        .into_iter()
        .next())
}

fn match_pattern_refs(
    image: &RgbImage,
    patterns: &[&RgbImage],
    threshold: f64,
) -> CoreResult<Vec<LabeledMatch>> {
    if patterns.is_empty() {
        return Ok(Vec::new());
    }
    for pattern in patterns {
        CoreError::check_fits(pattern.dimensions(), image.dimensions())?;
    }

    let prepared = PreparedImage::new(image);
    let per_pattern = bounded_par_map(patterns, |pattern| -> CoreResult<Vec<MatchCandidate>> {
        let surface = prepared.surface(pattern)?;
        Ok(select(&surface, image, pattern, threshold, MatchMode::All))
    })
    .into_iter()
    .collect::<CoreResult<Vec<_>>>()?;

    let sizes: Vec<(u32, u32)> = patterns.iter().map(|p| p.dimensions()).collect();
    dedup_across_patterns(&per_pattern, &sizes)
}

/// Match several patterns against one image and keep only the best-scoring
/// pattern per overlapping slot
pub fn match_patterns(
    image: &RgbImage,
    patterns: &[RgbImage],
    threshold: f64,
) -> CoreResult<Vec<LabeledMatch>> {
    let refs: Vec<&RgbImage> = patterns.iter().collect();
    match_pattern_refs(image, &refs, threshold)
}

/// Template matcher holding a set of named patterns
pub struct TemplateMatcher {
    patterns: Vec<Pattern>,
}

impl TemplateMatcher {
    /// Create a new empty matcher
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Add a pattern to the matcher
    pub fn add_pattern(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    /// Get all loaded patterns
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Clear all patterns
    pub fn clear(&mut self) {
        self.patterns.clear();
    }

    /// Find deduplicated matches of one pattern, highest score first
    ///
    /// An out-of-range `pattern_idx` yields no matches.
    pub fn find_matches(
        &self,
        image: &RgbImage,
        pattern_idx: usize,
        threshold: f64,
    ) -> CoreResult<Vec<MatchCandidate>> {
        let Some(pattern) = self.patterns.get(pattern_idx) else {
            return Ok(Vec::new());
        };

        let raw = find_matches(image, &pattern.image, threshold, MatchMode::All)?;
        let mut matches = super::dedup::dedup(&raw, pattern.width(), pattern.height());
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(matches)
    }

    /// Resolve which pattern occupies each slot of `image`
    pub fn classify(&self, image: &RgbImage, threshold: f64) -> CoreResult<Vec<LabeledMatch>> {
        let refs: Vec<&RgbImage> = self.patterns.iter().map(|p| &p.image).collect();
        let matches = match_pattern_refs(image, &refs, threshold)?;

        for m in &matches {
            log::debug!("  ✅ {}", m.describe(&self.patterns));
        }

        Ok(matches)
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{noise_image, paste};
    use image::Rgb;

    #[test]
    fn test_create_matcher() {
        let matcher = TemplateMatcher::new();
        assert_eq!(matcher.patterns().len(), 0);
    }

    #[test]
    fn test_add_pattern() {
        let mut matcher = TemplateMatcher::new();
        matcher.add_pattern(Pattern::new(Some("test".to_string()), noise_image(5, 5, 1)));
        assert_eq!(matcher.patterns().len(), 1);
        assert_eq!(matcher.patterns()[0].display_name(), "test-[5x5]");
    }

    #[test]
    fn test_surface_dimensions() {
        let image = noise_image(20, 12, 3);
        let pattern = noise_image(5, 4, 4);
        let surface = match_surface(&image, &pattern).unwrap();
        assert_eq!(surface.width(), 16);
        assert_eq!(surface.height(), 9);
        assert_eq!(surface.scores().len(), 16 * 9);
        assert!(surface.get(16, 0).is_none());
    }

    #[test]
    fn test_perfect_match_scores_one() {
        let image = noise_image(40, 30, 7);
        let pattern = image::imageops::crop_imm(&image, 13, 9, 8, 6).to_image();

        let best = find_best_match(&image, &pattern, 0.5).unwrap().unwrap();
        assert_eq!((best.x, best.y), (13, 9));
        assert_eq!(best.score, 1.0);
    }

    #[test]
    fn test_scores_stay_in_range() {
        let image = noise_image(25, 25, 11);
        let pattern = noise_image(6, 6, 12);
        let surface = match_surface(&image, &pattern).unwrap();
        assert!(surface.scores().iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_surface_matches_direct_computation() {
        let image = noise_image(9, 7, 21);
        let pattern = noise_image(4, 3, 22);
        let surface = match_surface(&image, &pattern).unwrap();

        let n = 12.0;
        for y in 0..surface.height() {
            for x in 0..surface.width() {
                let mut num = 0.0;
                let mut t_dev = 0.0;
                let mut i_dev = 0.0;
                for c in 0..3 {
                    let t_mean: f64 = pattern.pixels().map(|p| p[c] as f64).sum::<f64>() / n;
                    let mut i_mean = 0.0;
                    for (px, py, _) in pattern.enumerate_pixels() {
                        i_mean += image.get_pixel(x + px, y + py)[c] as f64;
                    }
                    i_mean /= n;
                    for (px, py, p) in pattern.enumerate_pixels() {
                        let t = p[c] as f64 - t_mean;
                        let i = image.get_pixel(x + px, y + py)[c] as f64 - i_mean;
                        num += t * i;
                        t_dev += t * t;
                        i_dev += i * i;
                    }
                }
                let expected = num / (t_dev * i_dev).sqrt();
                let actual = surface.get(x, y).unwrap();
                assert!(
                    (expected - actual).abs() < 1e-9,
                    "({x},{y}): expected {expected}, got {actual}"
                );
            }
        }
    }

    #[test]
    fn test_threshold_one_requires_exact_crop() {
        let image = noise_image(30, 30, 5);
        let exact = image::imageops::crop_imm(&image, 4, 17, 7, 7).to_image();
        let matches = find_matches(&image, &exact, 1.0, MatchMode::All).unwrap();
        assert_eq!(matches, vec![MatchCandidate::new(4, 17, 1.0)]);

        let mut altered = exact.clone();
        let p = altered.get_pixel(3, 3).0;
        altered.put_pixel(3, 3, Rgb([p[0].wrapping_add(60), p[1], p[2]]));
        let matches = find_matches(&image, &altered, 1.0, MatchMode::All).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_one_level_change_is_not_exact() {
        let image = noise_image(200, 200, 61);
        let mut altered = image.clone();
        let p = altered.get_pixel(90, 110).0;
        let bumped = if p[1] == 255 { 254 } else { p[1] + 1 };
        altered.put_pixel(90, 110, Rgb([p[0], bumped, p[2]]));

        let matches = find_matches(&image, &altered, 1.0, MatchMode::All).unwrap();
        assert!(matches.is_empty());

        let best = find_best_match(&image, &altered, 0.0).unwrap().unwrap();
        assert!(best.score < 1.0);
        assert!(best.score > 0.999);
    }

    #[test]
    fn test_shared_image_pass_agrees_with_single_pattern_search() {
        let image = noise_image(60, 40, 71);
        let patterns: Vec<image::RgbImage> = (0..6)
            .map(|i| image::imageops::crop_imm(&image, i * 9, i * 5, 6, 6).to_image())
            .collect();

        let classified = match_patterns(&image, &patterns, 0.99).unwrap();

        assert_eq!(classified.len(), patterns.len());
        for (index, pattern) in patterns.iter().enumerate() {
            let single = find_matches(&image, pattern, 0.99, MatchMode::All).unwrap();
            assert_eq!(single, vec![MatchCandidate::new(index as u32 * 9, index as u32 * 5, 1.0)]);
            assert!(classified.contains(&single[0].labeled(index)));
        }
    }

    #[test]
    fn test_bounded_par_map_keeps_order() {
        let items: Vec<usize> = (0..(MAX_CONCURRENT_PASSES * 3 + 1)).collect();
        let doubled = bounded_par_map(&items, |&i| i * 2);
        assert_eq!(doubled, items.iter().map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_flat_window_scores_zero() {
        let image = image::RgbImage::from_pixel(10, 10, Rgb([90, 90, 90]));
        let pattern = noise_image(3, 3, 9);
        let surface = match_surface(&image, &pattern).unwrap();
        assert!(surface.scores().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_pattern_larger_than_image() {
        let image = noise_image(10, 10, 1);
        let pattern = noise_image(11, 5, 2);
        let err = find_matches(&image, &pattern, 0.5, MatchMode::All).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDimensions { .. }));
        assert!(err.is_precondition());
    }

    #[test]
    fn test_best_only_breaks_ties_in_row_major_order() {
        let tile = noise_image(4, 4, 31);
        let mut image = image::RgbImage::from_pixel(20, 12, Rgb([10, 200, 30]));
        paste(&mut image, &tile, 12, 2);
        paste(&mut image, &tile, 3, 7);

        let best = find_best_match(&image, &tile, 0.9).unwrap().unwrap();
        assert_eq!((best.x, best.y), (12, 2));

        let all = find_matches(&image, &tile, 0.99, MatchMode::All).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_best_only_returns_none_below_threshold() {
        let image = noise_image(20, 20, 41);
        let pattern = noise_image(5, 5, 42);
        assert!(find_best_match(&image, &pattern, 0.99).unwrap().is_none());
    }

    #[test]
    fn test_find_matches_by_index() {
        let tile = noise_image(5, 5, 51);
        let mut image = image::RgbImage::from_pixel(30, 10, Rgb([0, 0, 0]));
        paste(&mut image, &tile, 2, 2);
        paste(&mut image, &tile, 20, 3);

        let mut matcher = TemplateMatcher::new();
        matcher.add_pattern(Pattern::new(None, tile));
        let matches = matcher.find_matches(&image, 0, 0.95).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches[0].score >= matches[1].score);
        assert!(matcher.find_matches(&image, 5, 0.95).unwrap().is_empty());
    }
}
