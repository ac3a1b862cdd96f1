//! Raster preprocessing for handwritten answer sheets.
//!
//! Fixed pipeline ahead of OCR: contrast boost, sharpening, grayscale,
//! edge-preserving denoise, adaptive thresholding, stroke closing.
//! Enhancement happens before binarization, denoising before thresholding.

use std::path::Path;

use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgb, RgbImage};

use gradescan_core::error::ExtractError;

/// File-size ceiling for input images.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Accepted dimension range. Below the minimum there is no legible page;
/// above the maximum the kernels get too slow for interactive use.
pub const MIN_DIMENSION: u32 = 100;
pub const MAX_DIMENSION: u32 = 5000;

const CONTRAST_FACTOR: f32 = 1.2;
const SHARPNESS_FACTOR: f32 = 1.1;
/// Range parameter of the denoiser: neighbors further than roughly this
/// many gray levels from the center stop contributing.
const DENOISE_STRENGTH: f32 = 10.0;
const DENOISE_RADIUS: u32 = 2;
const THRESHOLD_WINDOW: u32 = 11;
const THRESHOLD_OFFSET: f32 = 2.0;
const CLOSING_RADIUS: u32 = 1;

/// Validate an image file and decode it.
///
/// Checks run in a fixed order so the cheapest rejection wins: the file
/// must exist, fit the size ceiling, decode as a raster image, and fall
/// inside the accepted dimension range. Returns the decoded image and the
/// file size in bytes.
pub fn validate_and_load(image_path: &Path) -> Result<(DynamicImage, u64), ExtractError> {
    let metadata = std::fs::metadata(image_path)
        .map_err(|e| ExtractError::Unreadable(format!("{}: {e}", image_path.display())))?;
    let file_size = metadata.len();
    if file_size > MAX_FILE_BYTES {
        return Err(ExtractError::TooLarge {
            size: file_size,
            max: MAX_FILE_BYTES,
        });
    }

    let img = image::open(image_path)
        .map_err(|e| ExtractError::Unreadable(format!("{}: {e}", image_path.display())))?;

    let (width, height) = img.dimensions();
    if width < MIN_DIMENSION
        || height < MIN_DIMENSION
        || width > MAX_DIMENSION
        || height > MAX_DIMENSION
    {
        return Err(ExtractError::InvalidDimensions { width, height });
    }

    Ok((img, file_size))
}

/// Run the full preprocessing pipeline on a decoded image.
///
/// Output is a binarized page: ink at 0, paper at 255.
pub fn preprocess_for_ocr(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    let contrasted = boost_contrast(&rgb, CONTRAST_FACTOR);
    let sharpened = boost_sharpness(&contrasted, SHARPNESS_FACTOR);
    let gray = grayscale(&sharpened);
    let denoised = denoise(&gray, DENOISE_STRENGTH);
    let binary = adaptive_threshold(&denoised, THRESHOLD_WINDOW, THRESHOLD_OFFSET);
    close_strokes(&binary, CLOSING_RADIUS)
}

/// Scale each channel linearly away from the midpoint.
pub fn boost_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let mut out = RgbImage::new(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels() {
        let adjust = |v: u8| ((v as f32 - 128.0) * factor + 128.0).round().clamp(0.0, 255.0) as u8;
        out.put_pixel(
            x,
            y,
            Rgb([adjust(pixel.0[0]), adjust(pixel.0[1]), adjust(pixel.0[2])]),
        );
    }
    out
}

/// Sharpen by interpolating each pixel beyond its local 3x3 mean.
///
/// `factor` 1.0 is a no-op; above 1.0 pushes each pixel away from the
/// blurred estimate, which crispens stroke edges.
pub fn boost_sharpness(img: &RgbImage, factor: f32) -> RgbImage {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return img.clone();
    }
    let mut out = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut sums = [0.0f32; 3];
            let mut count = 0.0f32;
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let p = img.get_pixel(nx, ny);
                    for (c, sum) in sums.iter_mut().enumerate() {
                        *sum += p.0[c] as f32;
                    }
                    count += 1.0;
                }
            }
            let orig = img.get_pixel(x, y);
            let mut px = [0u8; 3];
            for (c, slot) in px.iter_mut().enumerate() {
                let blurred = sums[c] / count;
                let v = blurred + factor * (orig.0[c] as f32 - blurred);
                *slot = v.round().clamp(0.0, 255.0) as u8;
            }
            out.put_pixel(x, y, Rgb(px));
        }
    }
    out
}

/// Convert to grayscale with ITU-R BT.601 luminance weights.
pub fn grayscale(img: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(img.width(), img.height());
    for (x, y, p) in img.enumerate_pixels() {
        let luma =
            (0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32).round() as u8;
        gray.put_pixel(x, y, Luma([luma]));
    }
    gray
}

/// Edge-preserving local mean smoothing.
///
/// Each pixel becomes a weighted mean of its neighborhood where a
/// neighbor's weight falls off with its intensity distance from the
/// center. Flat-region speckle averages out while stroke edges, whose
/// neighbors differ by far more than `strength`, stay untouched.
pub fn denoise(img: &GrayImage, strength: f32) -> GrayImage {
    let (w, h) = (img.width(), img.height());
    let mut out = GrayImage::new(w, h);
    let range_div = 2.0 * strength * strength;
    let radius = DENOISE_RADIUS;

    for y in 0..h {
        for x in 0..w {
            let center = img.get_pixel(x, y).0[0] as f32;
            let mut acc = 0.0f32;
            let mut weight_sum = 0.0f32;

            for ny in y.saturating_sub(radius)..=(y + radius).min(h - 1) {
                for nx in x.saturating_sub(radius)..=(x + radius).min(w - 1) {
                    let v = img.get_pixel(nx, ny).0[0] as f32;
                    let diff = v - center;
                    let weight = (-(diff * diff) / range_div).exp();
                    acc += v * weight;
                    weight_sum += weight;
                }
            }

            // The center's own weight is 1, so the sum never reaches 0.
            out.put_pixel(x, y, Luma([(acc / weight_sum).round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Binarize against a Gaussian-weighted local mean.
///
/// A pixel turns white (255) when it sits above its neighborhood mean
/// minus `offset`, black (0) otherwise. Local thresholds keep text
/// legible under uneven lighting where one global cut cannot.
pub fn adaptive_threshold(img: &GrayImage, window: u32, offset: f32) -> GrayImage {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return img.clone();
    }
    let kernel = gaussian_kernel(window);
    let radius = (window / 2) as i64;

    // Separable convolution; border taps are renormalized away rather
    // than mirrored.
    let mut horizontal = vec![0.0f32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            let mut weight_sum = 0.0f32;
            for (k, g) in kernel.iter().enumerate() {
                let nx = x as i64 + k as i64 - radius;
                if nx < 0 || nx >= w as i64 {
                    continue;
                }
                acc += g * img.get_pixel(nx as u32, y).0[0] as f32;
                weight_sum += g;
            }
            horizontal[(y * w + x) as usize] = acc / weight_sum;
        }
    }

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            let mut weight_sum = 0.0f32;
            for (k, g) in kernel.iter().enumerate() {
                let ny = y as i64 + k as i64 - radius;
                if ny < 0 || ny >= h as i64 {
                    continue;
                }
                acc += g * horizontal[(ny as u32 * w + x) as usize];
                weight_sum += g;
            }
            let local_mean = acc / weight_sum;
            let v = if img.get_pixel(x, y).0[0] as f32 > local_mean - offset {
                255
            } else {
                0
            };
            out.put_pixel(x, y, Luma([v]));
        }
    }
    out
}

/// Morphological closing over the ink (dark) phase.
///
/// Spreads ink by one radius, then pulls it back. Hairline white gaps
/// inside a stroke get bridged; everything else returns to its original
/// extent.
pub fn close_strokes(img: &GrayImage, radius: u32) -> GrayImage {
    local_extremum(&local_extremum(img, radius, Extremum::Min), radius, Extremum::Max)
}

#[derive(Clone, Copy, PartialEq)]
enum Extremum {
    Min,
    Max,
}

fn local_extremum(img: &GrayImage, radius: u32, which: Extremum) -> GrayImage {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return img.clone();
    }
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut best = img.get_pixel(x, y).0[0];
            for ny in y.saturating_sub(radius)..=(y + radius).min(h - 1) {
                for nx in x.saturating_sub(radius)..=(x + radius).min(w - 1) {
                    let v = img.get_pixel(nx, ny).0[0];
                    best = match which {
                        Extremum::Min => best.min(v),
                        Extremum::Max => best.max(v),
                    };
                }
            }
            out.put_pixel(x, y, Luma([best]));
        }
    }
    out
}

/// Normalized 1-D Gaussian kernel with sigma derived from the tap count
/// the way OpenCV does for its default adaptive threshold.
fn gaussian_kernel(window: u32) -> Vec<f32> {
    let sigma = 0.3 * ((window as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let radius = (window / 2) as i64;
    let mut kernel: Vec<f32> = (0..window as i64)
        .map(|k| {
            let d = (k - radius) as f32;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= total;
    }
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn save_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        let img = RgbImage::from_pixel(width, height, Rgb([180, 180, 180]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = validate_and_load(Path::new("/nonexistent/sheet.png")).unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable(_)));
    }

    #[test]
    fn oversized_file_is_rejected_before_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.png");
        // Not a valid PNG; the size check must fire first.
        std::fs::write(&path, vec![0u8; (MAX_FILE_BYTES + 1) as usize]).unwrap();

        let err = validate_and_load(&path).unwrap_err();
        match err {
            ExtractError::TooLarge { size, max } => {
                assert_eq!(size, MAX_FILE_BYTES + 1);
                assert_eq!(max, MAX_FILE_BYTES);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[test]
    fn undersized_image_fails_dimension_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_png(dir.path(), "tiny.png", 50, 50);

        let err = validate_and_load(&path).unwrap_err();
        match err {
            ExtractError::InvalidDimensions { width, height } => {
                assert_eq!((width, height), (50, 50));
            }
            other => panic!("expected InvalidDimensions, got {other:?}"),
        }
    }

    #[test]
    fn overwide_image_fails_dimension_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_png(dir.path(), "wide.png", 5001, 200);

        let err = validate_and_load(&path).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidDimensions { width: 5001, .. }));
    }

    #[test]
    fn valid_image_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_png(dir.path(), "ok.png", 200, 150);

        let (img, size) = validate_and_load(&path).unwrap();
        assert_eq!(img.dimensions(), (200, 150));
        assert!(size > 0);
    }

    #[test]
    fn contrast_spreads_values_around_midpoint() {
        let mut img = RgbImage::from_pixel(2, 1, Rgb([100, 100, 100]));
        img.put_pixel(1, 0, Rgb([200, 200, 200]));

        let out = boost_contrast(&img, 1.2);
        assert_eq!(out.get_pixel(0, 0).0[0], 94);
        assert_eq!(out.get_pixel(1, 0).0[0], 214);
    }

    #[test]
    fn contrast_clamps_extremes() {
        let img = RgbImage::from_pixel(1, 1, Rgb([255, 0, 128]));
        let out = boost_contrast(&img, 1.2);
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 128]);
    }

    #[test]
    fn grayscale_uses_luminance_weights() {
        let img = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        assert_eq!(grayscale(&img).get_pixel(0, 0).0[0], 76);

        let img = RgbImage::from_pixel(1, 1, Rgb([0, 255, 0]));
        assert_eq!(grayscale(&img).get_pixel(0, 0).0[0], 150);
    }

    #[test]
    fn denoise_smooths_speckle_but_keeps_edges() {
        // Left half dark, right half bright, one speck in the dark half.
        let mut img = GrayImage::new(20, 10);
        for y in 0..10 {
            for x in 0..20 {
                img.put_pixel(x, y, Luma([if x < 10 { 20 } else { 235 }]));
            }
        }
        img.put_pixel(5, 5, Luma([30]));

        let out = denoise(&img, 10.0);
        // Speck pulled back toward its neighborhood.
        assert!(out.get_pixel(5, 5).0[0] < 30);
        // Edge pixels keep their side.
        assert!(out.get_pixel(9, 5).0[0] < 30);
        assert!(out.get_pixel(10, 5).0[0] > 225);
    }

    #[test]
    fn adaptive_threshold_keeps_thin_ink_dark() {
        // White page with a one-pixel black rule across it.
        let mut img = GrayImage::from_pixel(60, 60, Luma([255]));
        for x in 0..60 {
            img.put_pixel(x, 30, Luma([0]));
        }

        let out = adaptive_threshold(&img, 11, 2.0);
        assert_eq!(out.get_pixel(30, 30).0[0], 0);
        assert_eq!(out.get_pixel(30, 10).0[0], 255);
        assert_eq!(out.get_pixel(30, 29).0[0], 255);
    }

    #[test]
    fn adaptive_threshold_turns_uniform_page_white() {
        let img = GrayImage::from_pixel(30, 30, Luma([128]));
        let out = adaptive_threshold(&img, 11, 2.0);
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn closing_bridges_a_one_pixel_stroke_gap() {
        // Broken horizontal stroke: ink at x in {2,3,5,6}, gap at x=4.
        let mut img = GrayImage::from_pixel(9, 9, Luma([255]));
        for x in [2u32, 3, 5, 6] {
            img.put_pixel(x, 4, Luma([0]));
        }

        let out = close_strokes(&img, 1);
        assert_eq!(out.get_pixel(4, 4).0[0], 0, "gap should be bridged");
        assert_eq!(out.get_pixel(2, 4).0[0], 0, "stroke ends survive");
        assert_eq!(out.get_pixel(0, 0).0[0], 255, "page stays white");
    }

    #[test]
    fn full_pipeline_produces_binary_output() {
        let mut rgb = RgbImage::from_pixel(120, 120, Rgb([230, 230, 230]));
        for x in 20..100 {
            rgb.put_pixel(x, 60, Rgb([20, 20, 20]));
        }
        let img = DynamicImage::ImageRgb8(rgb);

        let out = preprocess_for_ocr(&img);
        assert_eq!(out.dimensions(), (120, 120));
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(out.get_pixel(60, 60).0[0], 0, "the stroke stays ink");
    }
}
