//! Calibration module.
//! Builds the calibration document for the horizontal chart: knot table, area bands
//! and one normalized (x, y) marker position per milestone.
//! The document is a snapshot; regenerate it whenever the tables change.

use log::{debug, info};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::areas::AreaTable;
use crate::config::{self, StaticTables};
use crate::error::{ChartError, Result};
use crate::milestones::{self, ResolvedPosition};
use crate::scale::{format_age, AgeScale};

pub const CALIBRATION_VERSION: &str = "1.0";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalibrationInfo {
    pub version: String,
    pub description: String,
    pub notes: String,
}

impl Default for CalibrationInfo {
    fn default() -> Self {
        Self {
            version: CALIBRATION_VERSION.to_string(),
            description: "Calibration for the official horizontal Haizea-Llevant table".to_string(),
            notes: "Positions calibrated manually from visual inspection".to_string(),
        }
    }
}

/// Everything a renderer needs to place milestone markers on the chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalibrationDocument {
    pub image_dimensions: ImageDimensions,
    pub age_scale_mapping: AgeScale,
    pub area_mapping: AreaTable,
    #[serde(serialize_with = "serialize_positions")]
    pub hito_positions: Vec<(String, ResolvedPosition)>,
    pub calibration_info: CalibrationInfo,
}

/// Resolves every milestone of `tables` against a chart of the given size.
pub fn build_document(tables: &StaticTables, dims: ImageDimensions) -> Result<CalibrationDocument> {
    let positions = milestones::resolve_all(&tables.milestones, &tables.age_knots, &tables.areas)?;
    debug!(
        "resolved {} milestone positions over {} knots and {} areas",
        positions.len(),
        tables.age_knots.knots().len(),
        tables.areas.len()
    );

    Ok(CalibrationDocument {
        image_dimensions: dims,
        age_scale_mapping: tables.age_knots.clone(),
        area_mapping: tables.areas.clone(),
        hito_positions: positions,
        calibration_info: CalibrationInfo::default(),
    })
}

/// Reads the chart's pixel size without decoding the whole image.
pub fn chart_dimensions(image_path: &Path) -> Result<ImageDimensions> {
    if !image_path.exists() {
        return Err(ChartError::MissingInput {
            path: image_path.to_path_buf(),
        });
    }
    let (width, height) = image::image_dimensions(image_path)?;
    info!("analyzing chart: {}x{}px", width, height);
    Ok(ImageDimensions { width, height })
}

/// Full calibration run: measure the chart, resolve, write once.
pub fn run(image_path: &Path, tables: &StaticTables, output: &Path) -> Result<CalibrationDocument> {
    let dims = chart_dimensions(image_path)?;
    let doc = build_document(tables, dims)?;
    config::write_json_atomic(&doc, output)?;
    info!("calibration written to {}", output.display());
    Ok(doc)
}

/// Console report lines: counts, age range and the first `examples` positions.
pub fn summary(doc: &CalibrationDocument, examples: usize) -> Vec<String> {
    let scale = &doc.age_scale_mapping;
    let mut lines = vec![
        format!("{} milestones mapped", doc.hito_positions.len()),
        format!(
            "Age scale: {} to {} months",
            format_age(scale.min_age()),
            format_age(scale.max_age())
        ),
    ];
    for (id, pos) in doc.hito_positions.iter().take(examples) {
        lines.push(format!(
            "{}: x={:.3}, y={:.3} (age {} months)",
            id,
            pos.x,
            pos.y,
            format_age(pos.age)
        ));
    }
    lines
}

fn serialize_positions<S: Serializer>(
    positions: &[(String, ResolvedPosition)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(positions.len()))?;
    for (id, pos) in positions {
        map.serialize_entry(id, pos)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{Rgba, RgbaImage};
    use std::fs;

    fn position<'a>(doc: &'a CalibrationDocument, id: &str) -> &'a ResolvedPosition {
        doc.hito_positions
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, pos)| pos)
            .unwrap()
    }

    const DIMS: ImageDimensions = ImageDimensions {
        width: 1200,
        height: 848,
    };

    #[test]
    fn test_document_resolves_every_milestone() {
        let tables = StaticTables::embedded().unwrap();
        let doc = build_document(&tables, DIMS).unwrap();
        assert_eq!(doc.hito_positions.len(), 32);
        assert_eq!(doc.hito_positions[0].0, "soc_001");

        let soc_002 = position(&doc, "soc_002");
        assert_relative_eq!(soc_002.x, 0.095, epsilon = 1e-12);
        assert_relative_eq!(soc_002.y, 0.17, epsilon = 1e-12);

        // 13 months sits between the 12 and 15 month knots
        let mg_007 = position(&doc, "mg_007");
        assert_relative_eq!(mg_007.x, 0.305 + (1.0 / 3.0) * 0.05, epsilon = 1e-12);
        assert_relative_eq!(mg_007.y, 0.53, epsilon = 1e-12);
    }

    #[test]
    fn test_document_is_idempotent() {
        let tables = StaticTables::embedded().unwrap();
        let first = build_document(&tables, DIMS).unwrap();
        let second = build_document(&tables, DIMS).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_document_json_shape() {
        let tables = StaticTables::embedded().unwrap();
        let doc = build_document(&tables, DIMS).unwrap();
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["image_dimensions"]["width"], 1200);
        assert_eq!(json["age_scale_mapping"]["60"], 0.985);
        assert_eq!(json["area_mapping"]["resolucion_problemas"]["center_y"], 0.92);
        assert_eq!(json["hito_positions"]["rp_005"]["area"], "resolucion_problemas");
        assert_eq!(json["hito_positions"]["rp_005"]["age"], 18.0);
        assert_eq!(json["calibration_info"]["version"], "1.0");
    }

    #[test]
    fn test_summary_lists_examples() {
        let tables = StaticTables::embedded().unwrap();
        let doc = build_document(&tables, DIMS).unwrap();
        let lines = summary(&doc, 5);
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "32 milestones mapped");
        assert_eq!(lines[1], "Age scale: 0 to 60 months");
        assert_eq!(lines[3], "soc_002: x=0.095, y=0.170 (age 1.5 months)");
    }

    #[test]
    fn test_run_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("chart.png");
        RgbaImage::from_pixel(40, 20, Rgba([255, 255, 255, 255]))
            .save(&image_path)
            .unwrap();
        let output = dir.path().join("public").join("haizea_table_config.json");

        let tables = StaticTables::embedded().unwrap();
        let doc = run(&image_path, &tables, &output).unwrap();
        assert_eq!(doc.image_dimensions, ImageDimensions { width: 40, height: 20 });

        let written: serde_json::Value = config::read_json(&output).unwrap();
        assert_eq!(written["hito_positions"].as_object().unwrap().len(), 32);
    }

    #[test]
    fn test_run_without_image_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        let tables = StaticTables::embedded().unwrap();

        let err = run(&dir.path().join("missing.png"), &tables, &output).unwrap_err();
        assert!(matches!(err, ChartError::MissingInput { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_run_with_blocked_output_names_output() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("chart.png");
        RgbaImage::from_pixel(40, 20, Rgba([255, 255, 255, 255]))
            .save(&image_path)
            .unwrap();
        fs::write(dir.path().join("public"), "").unwrap();
        let output = dir.path().join("public").join("haizea_table_config.json");

        let tables = StaticTables::embedded().unwrap();
        let err = run(&image_path, &tables, &output).unwrap_err();
        assert!(err.to_string().contains("haizea_table_config.json"), "{}", err);
    }
}
