use crate::config::OcrConfig;
use crate::error::{ResumeError, Result};
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

/// Prepare a rasterized page for Tesseract.
///
/// Rejects pages below the minimum dimension, downsizes oversized renders
/// (keeping aspect ratio), drops alpha, converts to grayscale and stretches
/// the histogram. Output is PNG.
pub fn preprocess_page(bytes: &[u8], config: &OcrConfig) -> Result<Vec<u8>> {
    let img = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ResumeError::Ocr(format!("Failed to read page image: {e}")))?
        .decode()
        .map_err(|e| ResumeError::Ocr(format!("Failed to decode page image: {e}")))?;

    let (width, height) = img.dimensions();
    if width < config.min_image_dimension || height < config.min_image_dimension {
        return Err(ResumeError::Ocr(format!(
            "Page image too small: {}x{}, minimum {}x{}",
            width, height, config.min_image_dimension, config.min_image_dimension
        )));
    }

    let img = resize_if_needed(img, config.max_image_dimension);
    let gray = flatten_to_luma(img);
    let gray = stretch_contrast(gray);

    let mut output = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| ResumeError::Ocr(format!("Failed to encode page image: {e}")))?;

    Ok(output)
}

/// Uses Lanczos3 for downscaling
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_dim && height <= max_dim {
        return img;
    }

    let longest = width.max(height) as u64;
    let scale = |side: u32| ((side as u64 * max_dim as u64 / longest) as u32).max(1);

    img.resize_exact(
        scale(width),
        scale(height),
        image::imageops::FilterType::Lanczos3,
    )
}

/// Grayscale without alpha. Transparent scans are composited onto white so
/// empty regions do not turn black.
fn flatten_to_luma(img: DynamicImage) -> image::GrayImage {
    match img {
        DynamicImage::ImageLumaA8(luma_a) => {
            image::GrayImage::from_fn(luma_a.width(), luma_a.height(), |x, y| {
                let [value, alpha] = luma_a.get_pixel(x, y).0;
                image::Luma([composite_on_white(value, alpha)])
            })
        }
        DynamicImage::ImageRgba8(rgba) => {
            let gray = DynamicImage::ImageRgba8(rgba.clone()).to_luma8();
            image::GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
                let alpha = rgba.get_pixel(x, y)[3];
                image::Luma([composite_on_white(gray.get_pixel(x, y)[0], alpha)])
            })
        }
        other => other.to_luma8(),
    }
}

fn composite_on_white(value: u8, alpha: u8) -> u8 {
    let alpha = alpha as u16;
    ((value as u16 * alpha + 255 * (255 - alpha)) / 255) as u8
}

/// Histogram stretch: darkest pixel maps to 0, lightest to 255.
fn stretch_contrast(gray: image::GrayImage) -> image::GrayImage {
    let (min_val, max_val) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if max_val <= min_val {
        return gray;
    }

    let range = (max_val - min_val) as f32;
    image::GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let normalized = (gray.get_pixel(x, y)[0] - min_val) as f32 / range;
        image::Luma([(normalized * 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> OcrConfig {
        OcrConfig {
            max_image_dimension: 1000,
            min_image_dimension: 50,
            ..OcrConfig::default()
        }
    }

    fn png(img: DynamicImage) -> Vec<u8> {
        let mut output = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
            .unwrap();
        output
    }

    #[test]
    fn test_preprocess_outputs_grayscale_png() {
        let processed = preprocess_page(&png(DynamicImage::new_rgb8(120, 160)), &test_config())
            .expect("valid page should preprocess");

        let decoded = image::load_from_memory(&processed).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
        assert_eq!(decoded.dimensions(), (120, 160));
    }

    #[test]
    fn test_rejects_tiny_page() {
        let err = preprocess_page(&png(DynamicImage::new_rgb8(10, 400)), &test_config())
            .unwrap_err()
            .to_string();
        assert!(err.contains("too small"), "unexpected error: {err}");
        assert!(err.contains("10x400"), "unexpected error: {err}");
    }

    #[test]
    fn test_rejects_garbage_bytes() {
        let result = preprocess_page(&[0u8, 1, 2, 3], &test_config());
        assert!(matches!(result, Err(ResumeError::Ocr(_))));
    }

    #[test]
    fn test_oversized_page_is_downscaled_keeping_aspect() {
        let img = resize_if_needed(DynamicImage::new_rgb8(510, 660), 200);
        let (w, h) = img.dimensions();
        assert_eq!(h, 200);
        assert_eq!(w, 154);
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let rgba = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 0]));
        let gray = flatten_to_luma(DynamicImage::ImageRgba8(rgba));
        assert!(gray.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_stretch_contrast_uses_full_range() {
        let mut gray = image::GrayImage::new(10, 1);
        for (i, pixel) in gray.pixels_mut().enumerate() {
            pixel[0] = 100 + i as u8 * 5;
        }
        let stretched = stretch_contrast(gray);
        assert_eq!(stretched.get_pixel(0, 0)[0], 0);
        assert_eq!(stretched.get_pixel(9, 0)[0], 255);
    }

    #[test]
    fn test_stretch_contrast_flat_page_unchanged() {
        let gray = image::GrayImage::from_pixel(8, 8, image::Luma([200]));
        let stretched = stretch_contrast(gray);
        assert!(stretched.pixels().all(|p| p[0] == 200));
    }
}
