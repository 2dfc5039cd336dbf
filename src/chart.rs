//! Chart config and the patient age line.
//! The month axis here is a plain linear scale over a fixed margin and usable width.
//! It is independent of the milestone age scale in `scale.rs`; the two are not reconciled.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::areas::AreaId;
use crate::calibrate::ImageDimensions;
use crate::error::{ChartError, Result};

pub const MAX_MONTHS: u32 = 72;
pub const MONTH_STEP: u32 = 6;
pub const USABLE_WIDTH_PERCENT: f64 = 80.0;
pub const MARGIN_LEFT_PERCENT: f64 = 10.0;

/// Horizontal position of the age line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgeLinePosition {
    pub x_pixel: f64,
    pub x_percent: f64,
}

/// Places a vertical age line on a linear month axis.
///
/// `age_months` is clamped to `[0, max_months]` first, so ages past the chart pin to
/// the right end of the usable width.
pub fn locate_age_line(
    age_months: f64,
    image_width: u32,
    image_height: u32,
    max_months: f64,
    margin_left_pct: f64,
    usable_width_pct: f64,
) -> Result<AgeLinePosition> {
    check_axis(image_width, image_height, max_months)?;
    let age = age_months.clamp(0.0, max_months);
    let width = f64::from(image_width);
    let x_pixel = width * margin_left_pct / 100.0 + (age / max_months) * width * usable_width_pct / 100.0;
    Ok(AgeLinePosition {
        x_pixel,
        x_percent: x_pixel / width * 100.0,
    })
}

fn check_axis(image_width: u32, image_height: u32, max_months: f64) -> Result<()> {
    if image_width == 0 || image_height == 0 {
        return Err(ChartError::config(format!(
            "chart dimensions {}x{} are empty",
            image_width, image_height
        )));
    }
    if !(max_months.is_finite() && max_months > 0.0) {
        return Err(ChartError::config(format!("month range must be positive, got {}", max_months)));
    }
    Ok(())
}

/// One labelled tick of the month axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthMark {
    pub month: u32,
    pub x_position: i64,
    pub percentage: f64,
}

/// Ticks every six months from 0 to `max_months` inclusive.
pub fn month_marks(
    image_width: u32,
    max_months: u32,
    margin_left_pct: f64,
    usable_width_pct: f64,
) -> Result<Vec<MonthMark>> {
    check_axis(image_width, 1, f64::from(max_months))?;
    let width = f64::from(image_width);
    let margin_left = width * margin_left_pct / 100.0;
    let usable_width = width * usable_width_pct / 100.0;

    Ok((0..=max_months)
        .step_by(MONTH_STEP as usize)
        .map(|month| {
            let x = margin_left + (f64::from(month) / f64::from(max_months)) * usable_width;
            MonthMark {
                month,
                x_position: x.round() as i64,
                percentage: round2(x / width * 100.0),
            }
        })
        .collect())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// *************** Chart config ***************

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthScale {
    pub range: [u32; 2],
    pub positions: Vec<MonthMark>,
    pub usable_width_percent: f64,
    pub margin_left_percent: f64,
}

impl MonthScale {
    pub fn max_months(&self) -> u32 {
        self.range[1]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaRows {
    pub y_start_percent: f64,
    pub y_end_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: String,
    pub width: u32,
    pub style: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PercentileBands {
    pub p25: String,
    pub p50: String,
    pub p75: String,
    pub p90: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub patient_age_line: LineStyle,
    pub percentile_bands: PercentileBands,
}

impl Default for Legend {
    fn default() -> Self {
        Self {
            patient_age_line: LineStyle {
                color: "#FF0000".to_string(),
                width: 3,
                style: "solid".to_string(),
            },
            percentile_bands: PercentileBands {
                p25: "#FFE6E6".to_string(),
                p50: "#FFB3B3".to_string(),
                p75: "#FF8080".to_string(),
                p90: "#FF4D4D".to_string(),
            },
        }
    }
}

/// Display config for the rotated graphic chart, consumed by the web viewer and `overlay`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub image_path: String,
    pub original_dimensions: ImageDimensions,
    pub month_scale: MonthScale,
    pub areas: BTreeMap<AreaId, AreaRows>,
    pub legend: Legend,
}

impl ChartConfig {
    /// Default layout for a chart of the given (already rotated) size.
    pub fn for_chart(image_path: impl Into<String>, dims: ImageDimensions) -> Result<Self> {
        let positions = month_marks(dims.width, MAX_MONTHS, MARGIN_LEFT_PERCENT, USABLE_WIDTH_PERCENT)?;
        Ok(Self {
            image_path: image_path.into(),
            original_dimensions: dims,
            month_scale: MonthScale {
                range: [0, MAX_MONTHS],
                positions,
                usable_width_percent: USABLE_WIDTH_PERCENT,
                margin_left_percent: MARGIN_LEFT_PERCENT,
            },
            areas: default_area_rows(),
            legend: Legend::default(),
        })
    }

    pub fn locate_age_line(&self, age_months: f64) -> Result<AgeLinePosition> {
        locate_age_line(
            age_months,
            self.original_dimensions.width,
            self.original_dimensions.height,
            f64::from(self.month_scale.max_months()),
            self.month_scale.margin_left_percent,
            self.month_scale.usable_width_percent,
        )
    }
}

fn default_area_rows() -> BTreeMap<AreaId, AreaRows> {
    AreaId::ALL
        .iter()
        .enumerate()
        .map(|(i, area)| {
            let start = 10.0 + 15.0 * i as f64;
            (
                *area,
                AreaRows {
                    y_start_percent: start,
                    y_end_percent: start + 15.0,
                },
            )
        })
        .collect()
}
