//! Chart preprocessing module
//! Turns the scanned (vertical) Haizea-Llevant tables into horizontal PNGs for the web viewer.
//! Uses `image` for decode/rotate/resize/encode; contrast and brightness follow the usual
//! enhancement-factor semantics (1.0 leaves the image unchanged).
//! Fixed parameters: web width capped at 1200px, contrast x1.2, brightness x1.1.

use anyhow::{Context, Result};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbaImage};
use log::{debug, info};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use crate::error::ChartError;

pub const WEB_MAX_WIDTH: u32 = 1200;
pub const CONTRAST_FACTOR: f32 = 1.2;
pub const BRIGHTNESS_FACTOR: f32 = 1.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    /// 90 degrees counter-clockwise.
    Left,
    /// 90 degrees clockwise.
    Right,
}

/// Loads an image, failing with `MissingInput` before touching the decoder if the file is absent.
pub fn load(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(ChartError::MissingInput {
            path: path.to_path_buf(),
        }
        .into());
    }
    let img = image::open(path).with_context(|| format!("Failed to decode image {}", path.display()))?;
    let (w, h) = img.dimensions();
    info!("loaded {} ({}x{})", path.display(), w, h);
    Ok(img)
}

pub fn rotate(img: &DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::Left => img.rotate270(),
        Rotation::Right => img.rotate90(),
    }
}

/// Pushes each color channel away from (or towards) the mean grey level by `factor`.
pub fn enhance_contrast(img: &DynamicImage, factor: f32) -> DynamicImage {
    let mut rgba = img.to_rgba8();
    let mean = mean_luma(&rgba);
    for px in rgba.pixels_mut() {
        for c in px.0.iter_mut().take(3) {
            *c = clamp_u8(mean + factor * (f32::from(*c) - mean));
        }
    }
    DynamicImage::ImageRgba8(rgba)
}

/// Scales each color channel by `factor`, saturating at white.
pub fn enhance_brightness(img: &DynamicImage, factor: f32) -> DynamicImage {
    let mut rgba = img.to_rgba8();
    for px in rgba.pixels_mut() {
        for c in px.0.iter_mut().take(3) {
            *c = clamp_u8(f32::from(*c) * factor);
        }
    }
    DynamicImage::ImageRgba8(rgba)
}

/// Downscales proportionally so the width is at most `max_width`. Never upscales.
pub fn resize_to_width(img: DynamicImage, max_width: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w <= max_width {
        return img;
    }
    let ratio = f64::from(max_width) / f64::from(w);
    let new_height = ((f64::from(h) * ratio) as u32).max(1);
    debug!("resizing {}x{} -> {}x{}", w, h, max_width, new_height);
    img.resize_exact(max_width, new_height, FilterType::Lanczos3)
}

/// Saves as PNG with maximum compression, creating parent directories.
pub fn save_png(img: &DynamicImage, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    let file = File::create(path).map_err(|e| ChartError::io(path, e))?;
    let encoder = PngEncoder::new_with_quality(BufWriter::new(file), CompressionType::Best, PngFilter::Adaptive);
    img.write_with_encoder(encoder)
        .with_context(|| format!("Failed to encode PNG {}", path.display()))?;
    info!("saved {}", path.display());
    Ok(())
}

pub struct PreparedTable {
    pub web_dimensions: (u32, u32),
    pub hd_dimensions: (u32, u32),
}

/// Rotates the original vertical table to horizontal and writes the web and HD variants.
/// The web copy is contrast+brightness enhanced and capped at `WEB_MAX_WIDTH`; the HD copy
/// keeps the original resolution and only gets the contrast boost.
pub fn prepare_table(input: &Path, web_output: &Path, hd_output: &Path) -> Result<PreparedTable> {
    let start = Instant::now();
    let original = load(input)?;

    let rotated = rotate(&original, Rotation::Left);
    debug!("rotated to {:?}", rotated.dimensions());

    let contrasted = enhance_contrast(&rotated, CONTRAST_FACTOR);
    let enhanced = enhance_brightness(&contrasted, BRIGHTNESS_FACTOR);
    let web = resize_to_width(enhanced, WEB_MAX_WIDTH);
    save_png(&web, web_output).context("Failed to save web table")?;

    save_png(&contrasted, hd_output).context("Failed to save HD table")?;

    debug!("table preparation took {:?}", start.elapsed());
    Ok(PreparedTable {
        web_dimensions: web.dimensions(),
        hd_dimensions: contrasted.dimensions(),
    })
}

fn mean_luma(img: &RgbaImage) -> f32 {
    let count = u64::from(img.width()) * u64::from(img.height());
    if count == 0 {
        return 0.0;
    }
    let total: u64 = img
        .pixels()
        .map(|p| {
            let [r, g, b, _] = p.0;
            (299 * u64::from(r) + 587 * u64::from(g) + 114 * u64::from(b)) / 1000
        })
        .sum();
    (total as f64 / count as f64).round() as f32
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn tall_image() -> DynamicImage {
        let mut img = RgbaImage::from_pixel(4, 10, Rgba([100, 100, 100, 255]));
        img.put_pixel(0, 0, Rgba([200, 50, 0, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let img = tall_image();
        assert_eq!(rotate(&img, Rotation::Left).dimensions(), (10, 4));
        assert_eq!(rotate(&img, Rotation::Right).dimensions(), (10, 4));
    }

    #[test]
    fn test_rotation_direction() {
        let img = tall_image();
        // top-left corner goes to bottom-left when turning counter-clockwise
        let left = rotate(&img, Rotation::Left).to_rgba8();
        assert_eq!(left.get_pixel(0, 3).0, [200, 50, 0, 255]);
        // and to top-right when turning clockwise
        let right = rotate(&img, Rotation::Right).to_rgba8();
        assert_eq!(right.get_pixel(9, 0).0, [200, 50, 0, 255]);
    }

    #[test]
    fn test_unit_factors_are_identity() {
        let img = tall_image();
        assert_eq!(enhance_contrast(&img, 1.0).to_rgba8(), img.to_rgba8());
        assert_eq!(enhance_brightness(&img, 1.0).to_rgba8(), img.to_rgba8());
    }

    #[test]
    fn test_brightness_saturates_and_keeps_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([250, 100, 0, 128])));
        let out = enhance_brightness(&img, 1.1).to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0, [255, 110, 0, 128]);
    }

    #[test]
    fn test_contrast_spreads_from_mean() {
        let mut raw = RgbaImage::from_pixel(2, 1, Rgba([100, 100, 100, 255]));
        raw.put_pixel(1, 0, Rgba([200, 200, 200, 255]));
        let out = enhance_contrast(&DynamicImage::ImageRgba8(raw), 1.2).to_rgba8();
        // mean grey is 150
        assert_eq!(out.get_pixel(0, 0).0, [90, 90, 90, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [210, 210, 210, 255]);
    }

    #[test]
    fn test_resize_caps_width_only() {
        let big = DynamicImage::ImageRgba8(RgbaImage::new(2400, 1000));
        assert_eq!(resize_to_width(big, 1200).dimensions(), (1200, 500));

        let small = DynamicImage::ImageRgba8(RgbaImage::new(800, 600));
        assert_eq!(resize_to_width(small, 1200).dimensions(), (800, 600));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("no/such/table.png")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChartError>(),
            Some(ChartError::MissingInput { .. })
        ));
    }

    #[test]
    fn test_prepare_table_writes_both_variants() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tabla_haizea_original.png");
        tall_image().save(&input).unwrap();
        let web = dir.path().join("public").join("tabla_haizea_horizontal.png");
        let hd = dir.path().join("public").join("tabla_haizea_hd.png");

        let prepared = prepare_table(&input, &web, &hd).unwrap();
        assert_eq!(prepared.web_dimensions, (10, 4));
        assert_eq!(prepared.hd_dimensions, (10, 4));
        assert_eq!(image::image_dimensions(&web).unwrap(), (10, 4));
        assert!(hd.exists());
    }
}
