//! Image transform: darken, boost contrast, convert to grayscale.
//!
//! A deterministic, pure function of the input bytes. The three steps run in
//! a fixed order — brightness scaling, then contrast around the image's mean
//! luma, then grayscale reduction — and that order is part of the contract:
//! boosting contrast before darkening, or measuring the mean after
//! conversion, produces a visibly different result.
//!
//! Output is always lossless PNG at the encoder's default compression,
//! regardless of the capture format, so repeated processing of the same
//! capture is byte-identical.

use crate::error::PageError;
use crate::output::TransformResult;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, warn};

/// Brightness multiplier, < 1 darkens. Matches a Photoshop-style "-57"
/// brightness step.
pub const BRIGHTNESS_FACTOR: f32 = 0.7;

/// Contrast multiplier around the mean luma, > 1 boosts. Matches a
/// Photoshop-style "+65" contrast step.
pub const CONTRAST_FACTOR: f32 = 1.6;

/// Transform one captured image into its darkened grayscale variant.
///
/// Failures (missing file, corrupt or unsupported image, write error) are
/// converted into a failed [`TransformResult`]; they never propagate.
pub fn transform(page: u32, input: &Path, output: &Path) -> TransformResult {
    match apply(input, output) {
        Ok(()) => {
            debug!(page, output = %output.display(), "transformed");
            TransformResult {
                page,
                image_path: output.to_path_buf(),
                skipped: false,
                error: None,
            }
        }
        Err(detail) => {
            warn!(page, input = %input.display(), %detail, "transform failed");
            TransformResult {
                page,
                image_path: output.to_path_buf(),
                skipped: false,
                error: Some(PageError::TransformFailed { page, detail }),
            }
        }
    }
}

fn apply(input: &Path, output: &Path) -> Result<(), String> {
    let img = image::open(input).map_err(|e| format!("decode {}: {e}", input.display()))?;

    // Normalise to 8-bit RGB first so both adjustments see the same space
    // whatever the capture format delivered (RGBA PNG, JPEG, ...).
    let mut rgb = img.into_rgb8();

    scale_brightness(&mut rgb, BRIGHTNESS_FACTOR);
    boost_contrast(&mut rgb, CONTRAST_FACTOR);

    let gray = DynamicImage::ImageRgb8(rgb).into_luma8();

    let file = File::create(output).map_err(|e| format!("create {}: {e}", output.display()))?;
    let encoder = PngEncoder::new_with_quality(
        BufWriter::new(file),
        CompressionType::Default,
        FilterType::Adaptive,
    );
    gray.write_with_encoder(encoder)
        .map_err(|e| format!("encode {}: {e}", output.display()))?;
    Ok(())
}

/// Multiply every channel by `factor`, clamped to the 8-bit range.
fn scale_brightness(img: &mut RgbImage, factor: f32) {
    for pixel in img.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = (f32::from(*channel) * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Scale every channel's distance from the image's mean luma by `factor`.
fn boost_contrast(img: &mut RgbImage, factor: f32) {
    let mean = mean_luma(img);
    for pixel in img.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = (mean + (f32::from(*channel) - mean) * factor)
                .round()
                .clamp(0.0, 255.0) as u8;
        }
    }
}

/// Rec. 601 mean luma of the image; 0 for an empty image.
fn mean_luma(img: &RgbImage) -> f32 {
    let mut sum = 0.0f64;
    let mut n = 0u64;
    for pixel in img.pixels() {
        let [r, g, b] = pixel.0;
        sum += 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
        n += 1;
    }
    if n == 0 {
        0.0
    } else {
        (sum / n as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    fn write_test_image(dir: &TempDir, name: &str) -> std::path::PathBuf {
        // Mid-gray field with a bright and a dark patch, enough structure
        // for the contrast step to act on.
        let img: RgbImage = ImageBuffer::from_fn(32, 32, |x, _y| {
            if x < 8 {
                Rgb([230, 230, 230])
            } else if x < 16 {
                Rgb([40, 40, 40])
            } else {
                Rgb([128, 128, 128])
            }
        });
        let path = dir.path().join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn output_is_single_channel_png() {
        let dir = TempDir::new().unwrap();
        let input = write_test_image(&dir, "in.png");
        let output = dir.path().join("out.png");

        let result = transform(1, &input, &output);
        assert!(result.success(), "error: {:?}", result.error);

        let processed = image::open(&output).unwrap();
        assert_eq!(processed.color(), image::ColorType::L8);
    }

    #[test]
    fn output_is_darker_than_input() {
        let dir = TempDir::new().unwrap();
        let input = write_test_image(&dir, "in.png");
        let output = dir.path().join("out.png");
        transform(1, &input, &output);

        let before = image::open(&input).unwrap().into_luma8();
        let after = image::open(&output).unwrap().into_luma8();
        let mean = |img: &image::GrayImage| {
            img.pixels().map(|p| u64::from(p.0[0])).sum::<u64>() / img.pixels().len() as u64
        };
        assert!(
            mean(&after) < mean(&before),
            "expected darker output: {} !< {}",
            mean(&after),
            mean(&before)
        );
    }

    #[test]
    fn transform_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let input = write_test_image(&dir, "in.png");
        let out_a = dir.path().join("a.png");
        let out_b = dir.path().join("b.png");

        assert!(transform(1, &input, &out_a).success());
        assert!(transform(1, &input, &out_b).success());

        let a = std::fs::read(&out_a).unwrap();
        let b = std::fs::read(&out_b).unwrap();
        assert_eq!(a, b, "byte-identical input must yield byte-identical output");
    }

    #[test]
    fn contrast_spreads_extremes() {
        let mut img: RgbImage = ImageBuffer::from_fn(4, 1, |x, _| {
            if x < 2 {
                Rgb([100, 100, 100])
            } else {
                Rgb([150, 150, 150])
            }
        });
        boost_contrast(&mut img, 1.6);
        let lo = img.get_pixel(0, 0).0[0];
        let hi = img.get_pixel(3, 0).0[0];
        assert!(lo < 100, "dark pixels pushed darker, got {lo}");
        assert!(hi > 150, "bright pixels pushed brighter, got {hi}");
    }

    #[test]
    fn missing_input_reports_failure() {
        let dir = TempDir::new().unwrap();
        let result = transform(
            3,
            &dir.path().join("nope.png"),
            &dir.path().join("out.png"),
        );
        assert!(!result.success());
        assert!(matches!(
            result.error,
            Some(PageError::TransformFailed { page: 3, .. })
        ));
    }

    #[test]
    fn corrupt_input_reports_failure() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bad.png");
        std::fs::write(&input, b"not an image at all").unwrap();
        let result = transform(4, &input, &dir.path().join("out.png"));
        assert!(!result.success());
    }
}
