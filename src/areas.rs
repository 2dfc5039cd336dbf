//! Developmental areas module.
//! Five horizontal strata of the chart, top to bottom.
//! Bands are hand-tuned constants with margins at the top and bottom of the chart.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ChartError, Result};

/// Developmental area. Declaration order is the chart's top-to-bottom order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AreaId {
    #[serde(rename = "socializacion", alias = "socialization")]
    Socialization,
    #[serde(rename = "lenguaje", alias = "language")]
    Language,
    #[serde(rename = "motricidad_gruesa", alias = "gross_motor")]
    GrossMotor,
    #[serde(rename = "motricidad_fina", alias = "fine_motor")]
    FineMotor,
    #[serde(rename = "resolucion_problemas", alias = "problem_solving")]
    ProblemSolving,
}

impl AreaId {
    pub const ALL: [AreaId; 5] = [
        AreaId::Socialization,
        AreaId::Language,
        AreaId::GrossMotor,
        AreaId::FineMotor,
        AreaId::ProblemSolving,
    ];

    /// Identifier used as a JSON key by the chart renderer.
    pub fn key(self) -> &'static str {
        match self {
            AreaId::Socialization => "socializacion",
            AreaId::Language => "lenguaje",
            AreaId::GrossMotor => "motricidad_gruesa",
            AreaId::FineMotor => "motricidad_fina",
            AreaId::ProblemSolving => "resolucion_problemas",
        }
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Vertical extent of one area row, as fractions of the image height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaBand {
    pub y_range: [f64; 2],
    pub center_y: f64,
}

impl AreaBand {
    pub const fn new(start: f64, end: f64, center_y: f64) -> Self {
        Self {
            y_range: [start, end],
            center_y,
        }
    }

    pub fn start(&self) -> f64 {
        self.y_range[0]
    }

    pub fn end(&self) -> f64 {
        self.y_range[1]
    }
}

/// Closed lookup table from area to band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<AreaId, AreaBand>", into = "BTreeMap<AreaId, AreaBand>")]
pub struct AreaTable {
    bands: BTreeMap<AreaId, AreaBand>,
}

impl AreaTable {
    pub fn new(bands: BTreeMap<AreaId, AreaBand>) -> Result<Self> {
        for (area, band) in &bands {
            let finite = band.start().is_finite() && band.end().is_finite() && band.center_y.is_finite();
            if !finite || band.start() >= band.end() {
                return Err(ChartError::config(format!(
                    "area '{}' has an invalid y_range [{}, {}]",
                    area,
                    band.start(),
                    band.end()
                )));
            }
        }
        Ok(Self { bands })
    }

    /// Looks up the band for `area`. A missing band is an authoring error.
    pub fn band_for(&self, area: AreaId) -> Result<&AreaBand> {
        self.bands
            .get(&area)
            .ok_or_else(|| ChartError::config(format!("no band configured for area '{}'", area)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (AreaId, &AreaBand)> {
        self.bands.iter().map(|(area, band)| (*area, band))
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }
}

impl TryFrom<BTreeMap<AreaId, AreaBand>> for AreaTable {
    type Error = ChartError;

    fn try_from(bands: BTreeMap<AreaId, AreaBand>) -> Result<Self> {
        AreaTable::new(bands)
    }
}

impl From<AreaTable> for BTreeMap<AreaId, AreaBand> {
    fn from(table: AreaTable) -> Self {
        table.bands
    }
}
