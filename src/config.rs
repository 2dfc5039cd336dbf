//! Config module.
//! Loads the authored calibration tables (age knots, area bands, milestones).
//! The default tables are embedded from data/haizea_tables.json; a file with the same schema can replace them.
//! Also owns JSON output: documents are serialized in memory, then atomically persisted.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::areas::AreaTable;
use crate::error::{ChartError, Result};
use crate::milestones::Milestone;
use crate::scale::AgeScale;

const EMBEDDED_TABLES: &str = include_str!("../data/haizea_tables.json");

/// The three hand-calibrated tables the resolver works from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticTables {
    pub age_knots: AgeScale,
    pub areas: AreaTable,
    pub milestones: Vec<Milestone>,
}

impl StaticTables {
    /// Tables shipped with the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_TABLES)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let tables: StaticTables = serde_json::from_str(raw)
            .map_err(|e| ChartError::config(format!("invalid calibration tables: {}", e)))?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ChartError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|e| ChartError::io(path, e))?;
        debug!("loaded calibration tables from {}", path.display());
        Self::from_json(&raw)
    }

    /// Embedded tables unless an override path is given.
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::embedded(),
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for m in &self.milestones {
            if !seen.insert(m.id.as_str()) {
                return Err(ChartError::config(format!("duplicate milestone id '{}'", m.id)));
            }
            if !m.age_months.is_finite() || m.age_months < 0.0 || !m.vertical_offset.is_finite() {
                return Err(ChartError::config(format!(
                    "milestone '{}' has an invalid age or offset",
                    m.id
                )));
            }
        }
        Ok(())
    }
}

/// Writes `value` as pretty JSON. The file is either fully replaced or left untouched.
pub fn write_json_atomic<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;

    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| ChartError::io(path, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ChartError::io(path, e))?;
    writeln!(tmp, "{}", json).map_err(|e| ChartError::io(path, e))?;
    tmp.persist(path).map_err(|e| ChartError::io(path, e.error))?;

    debug!("wrote {} bytes to {}", json.len() + 1, path.display());
    Ok(())
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ChartError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let raw = fs::read_to_string(path).map_err(|e| ChartError::io(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}
