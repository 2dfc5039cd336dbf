//! Milestone placement.
//! x comes from the age scale, y from the area band center plus a hand-tuned offset.
//! Offsets only separate markers that would overlap within a row; y is never clamped.

use serde::{Deserialize, Serialize};

use crate::areas::{AreaId, AreaTable};
use crate::error::Result;
use crate::scale::AgeScale;

/// A developmental checkpoint placed on the chart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    #[serde(rename = "age")]
    pub age_months: f64,
    pub area: AreaId,
    #[serde(rename = "offset_y", default)]
    pub vertical_offset: f64,
}

/// Normalized marker position of one milestone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPosition {
    pub x: f64,
    pub y: f64,
    pub age: f64,
    pub area: AreaId,
}

pub fn resolve(milestone: &Milestone, scale: &AgeScale, areas: &AreaTable) -> Result<ResolvedPosition> {
    let band = areas.band_for(milestone.area)?;
    Ok(ResolvedPosition {
        x: scale.interpolate(milestone.age_months),
        y: band.center_y + milestone.vertical_offset,
        age: milestone.age_months,
        area: milestone.area,
    })
}

/// Resolves every milestone, keeping table order. Fails on the first unknown area.
pub fn resolve_all(
    milestones: &[Milestone],
    scale: &AgeScale,
    areas: &AreaTable,
) -> Result<Vec<(String, ResolvedPosition)>> {
    milestones
        .iter()
        .map(|m| resolve(m, scale, areas).map(|pos| (m.id.clone(), pos)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::AreaBand;
    use crate::error::ChartError;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn fixtures() -> (AgeScale, AreaTable) {
        let scale = AgeScale::new([(0.0, 0.065), (1.0, 0.085), (2.0, 0.105)]).unwrap();
        let areas = AreaTable::new(BTreeMap::from([(
            AreaId::Socialization,
            AreaBand::new(0.05, 0.25, 0.15),
        )]))
        .unwrap();
        (scale, areas)
    }

    fn milestone(id: &str, age: f64, area: AreaId, offset: f64) -> Milestone {
        Milestone {
            id: id.to_string(),
            age_months: age,
            area,
            vertical_offset: offset,
        }
    }

    #[test]
    fn test_resolves_fractional_age_with_offset() {
        let (scale, areas) = fixtures();
        let pos = resolve(&milestone("soc_002", 1.5, AreaId::Socialization, 0.02), &scale, &areas).unwrap();
        assert_relative_eq!(pos.x, 0.095, epsilon = 1e-12);
        assert_relative_eq!(pos.y, 0.17, epsilon = 1e-12);
        assert_eq!(pos.age, 1.5);
        assert_eq!(pos.area, AreaId::Socialization);
    }

    #[test]
    fn test_offset_may_leave_unit_range() {
        let (scale, areas) = fixtures();
        let pos = resolve(&milestone("far", 0.0, AreaId::Socialization, -0.5), &scale, &areas).unwrap();
        assert_relative_eq!(pos.y, -0.35, epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_area_fails() {
        let (scale, areas) = fixtures();
        let err = resolve(&milestone("len_001", 2.0, AreaId::Language, 0.0), &scale, &areas).unwrap_err();
        assert!(matches!(err, ChartError::Configuration(_)));
    }

    #[test]
    fn test_resolve_all_keeps_order() {
        let (scale, areas) = fixtures();
        let list = vec![
            milestone("b", 2.0, AreaId::Socialization, 0.0),
            milestone("a", 0.0, AreaId::Socialization, 0.0),
        ];
        let ids: Vec<String> = resolve_all(&list, &scale, &areas)
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_offset_defaults_to_zero() {
        let m: Milestone = serde_json::from_str(r#"{"id": "x", "age": 3, "area": "lenguaje"}"#).unwrap();
        assert_eq!(m.vertical_offset, 0.0);
        assert_eq!(m.area, AreaId::Language);
    }
}
