//! Age line overlay
//! Renders a transparent PNG the size of the chart with a vertical line at the patient's age
//! and a boxed "{age}m" label near the top. Drawing is done with `imageproc`.
//! Labels use the bundled DejaVu Sans Mono unless another TrueType font is given.

use ab_glyph::{Font, FontRef, FontVec, PxScale};
use anyhow::{Context, Result};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::{debug, info};
use std::fs;
use std::path::Path;

use crate::chart::{AgeLinePosition, ChartConfig};
use crate::error::ChartError;
use crate::preprocess;
use crate::scale::format_age;

const DEFAULT_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSansMono.ttf");

const LABEL_TOP: f64 = 10.0;
const LABEL_PAD_X: f64 = 5.0;
const LABEL_PAD_Y: f64 = 2.0;
const LABEL_SCALE: f32 = 14.0;

const TRANSPARENT: Rgba<u8> = Rgba([255, 255, 255, 0]);
const LABEL_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 200]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Result of drawing one age line.
#[derive(Debug)]
pub struct AgeOverlay {
    pub image: RgbaImage,
    pub age_months: f64,
    pub position: AgeLinePosition,
    /// Outer rectangle of the label box, outline included.
    pub label: Rect,
}

/// Parses `#RRGGBB` into an opaque color.
pub fn parse_hex_color(hex: &str) -> Result<Rgba<u8>, ChartError> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ChartError::config(format!("invalid color '{}'", hex)));
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16);
    match (channel(0), channel(2), channel(4)) {
        (Ok(r), Ok(g), Ok(b)) => Ok(Rgba([r, g, b, 255])),
        _ => Err(ChartError::config(format!("invalid color '{}'", hex))),
    }
}

/// Font compiled into the binary.
pub fn default_font() -> Result<FontRef<'static>> {
    FontRef::try_from_slice(DEFAULT_FONT).context("Failed to parse bundled label font")
}

pub fn load_font(path: &Path) -> Result<FontVec> {
    if !path.exists() {
        return Err(ChartError::MissingInput {
            path: path.to_path_buf(),
        }
        .into());
    }
    let bytes = fs::read(path).map_err(|e| ChartError::io(path, e))?;
    FontVec::try_from_vec(bytes).with_context(|| format!("Failed to parse font {}", path.display()))
}

/// Draws the age line for `age_months` on a transparent canvas sized like the chart.
pub fn render_age_line<F: Font>(config: &ChartConfig, age_months: f64, font: &F) -> Result<AgeOverlay> {
    let max_months = f64::from(config.month_scale.max_months());
    let age = age_months.clamp(0.0, max_months);
    let position = config.locate_age_line(age)?;

    let dims = config.original_dimensions;
    let mut canvas = RgbaImage::from_pixel(dims.width, dims.height, TRANSPARENT);

    let style = &config.legend.patient_age_line;
    let color = parse_hex_color(&style.color)?;
    let line_width = style.width.max(1);
    let line_left = (position.x_pixel - f64::from(line_width) / 2.0).round() as i32;
    draw_filled_rect_mut(
        &mut canvas,
        Rect::at(line_left, 0).of_size(line_width, dims.height),
        color,
    );

    let text = format!("{}m", format_age(age));
    let (text_w, text_h) = text_size(PxScale::from(LABEL_SCALE), font, &text);
    let text_x = position.x_pixel - f64::from(text_w) / 2.0;
    let label = Rect::at(
        (text_x - LABEL_PAD_X).round() as i32,
        (LABEL_TOP - LABEL_PAD_Y).round() as i32,
    )
    .of_size(
        (f64::from(text_w) + 2.0 * LABEL_PAD_X).round() as u32 + 1,
        (f64::from(text_h) + 2.0 * LABEL_PAD_Y).round() as u32 + 1,
    );
    draw_filled_rect_mut(&mut canvas, label, LABEL_BACKGROUND);
    draw_hollow_rect_mut(&mut canvas, label, BLACK);
    draw_text_mut(
        &mut canvas,
        BLACK,
        text_x.round() as i32,
        LABEL_TOP as i32,
        PxScale::from(LABEL_SCALE),
        font,
        &text,
    );
    debug!("label '{}' is {}x{}px", text, text_w, text_h);

    Ok(AgeOverlay {
        image: canvas,
        age_months: age,
        position,
        label,
    })
}

/// Renders the overlay with the font at `font_path` (bundled font when `None`) and saves it as PNG.
pub fn write_age_line(
    config: &ChartConfig,
    age_months: f64,
    font_path: Option<&Path>,
    output: &Path,
) -> Result<AgeOverlay> {
    let overlay = match font_path {
        Some(path) => render_age_line(config, age_months, &load_font(path)?)?,
        None => render_age_line(config, age_months, &default_font()?)?,
    };
    preprocess::save_png(&DynamicImage::ImageRgba8(overlay.image.clone()), output)
        .context("Failed to save age line overlay")?;
    info!(
        "age overlay for {}m at x={:.0} ({:.2}%)",
        format_age(overlay.age_months),
        overlay.position.x_pixel,
        overlay.position.x_percent
    );
    Ok(overlay)
}
