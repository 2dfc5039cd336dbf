//! Age scale module.
//! Piecewise linear mapping from age in months to a horizontal fraction of the chart.
//! Knots were calibrated by eye against the horizontal chart; they are data, not a formula.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ChartError, Result};

/// Returned when no bracketing knot pair exists. Unreachable for a sorted table.
const FALLBACK_X: f64 = 0.5;

/// One calibration anchor: an age and the fraction of the image width where it sits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgeKnot {
    pub age_months: f64,
    pub x_fraction: f64,
}

/// Knot table sorted by age. Never empty, no duplicate ages.
#[derive(Clone, Debug, PartialEq)]
pub struct AgeScale {
    knots: Vec<AgeKnot>,
}

impl AgeScale {
    /// Builds a scale from `(age, x)` pairs in any order.
    pub fn new(pairs: impl IntoIterator<Item = (f64, f64)>) -> Result<Self> {
        let mut knots: Vec<AgeKnot> = pairs
            .into_iter()
            .map(|(age_months, x_fraction)| AgeKnot {
                age_months,
                x_fraction,
            })
            .collect();

        if knots.is_empty() {
            return Err(ChartError::config("age scale has no knots"));
        }
        if let Some(bad) = knots
            .iter()
            .find(|k| !k.age_months.is_finite() || !k.x_fraction.is_finite())
        {
            return Err(ChartError::config(format!(
                "age knot {} -> {} is not finite",
                bad.age_months, bad.x_fraction
            )));
        }
        if let Some(bad) = knots.iter().find(|k| k.age_months < 0.0) {
            return Err(ChartError::config(format!(
                "age knot at {} months is negative",
                bad.age_months
            )));
        }
        if let Some(bad) = knots.iter().find(|k| !(0.0..=1.0).contains(&k.x_fraction)) {
            return Err(ChartError::config(format!(
                "age knot {} -> {} is outside the chart width [0, 1]",
                format_age(bad.age_months),
                bad.x_fraction
            )));
        }

        knots.sort_by(|a, b| a.age_months.total_cmp(&b.age_months));
        if let Some(pair) = knots.windows(2).find(|w| w[0].age_months == w[1].age_months) {
            return Err(ChartError::config(format!(
                "duplicate age knot at {} months",
                format_age(pair[0].age_months)
            )));
        }

        Ok(Self { knots })
    }

    pub fn knots(&self) -> &[AgeKnot] {
        &self.knots
    }

    pub fn min_age(&self) -> f64 {
        self.knots[0].age_months
    }

    pub fn max_age(&self) -> f64 {
        self.knots[self.knots.len() - 1].age_months
    }

    pub fn interpolate(&self, age: f64) -> f64 {
        interpolate(age, &self.knots)
    }
}

/// Maps `age` to a horizontal fraction over sorted `knots`.
///
/// Ages at or below the first knot return the first knot's x, ages at or above the
/// last knot return the last knot's x. In between, the bracketing pair is linearly
/// interpolated. A knot age returns its own x exactly.
///
/// `knots` must be sorted by age and non-empty; [`AgeScale`] guarantees both.
pub fn interpolate(age: f64, knots: &[AgeKnot]) -> f64 {
    let (Some(first), Some(last)) = (knots.first(), knots.last()) else {
        return FALLBACK_X;
    };

    if age <= first.age_months {
        return first.x_fraction;
    }
    if age >= last.age_months {
        return last.x_fraction;
    }

    for pair in knots.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if lo.age_months <= age && age <= hi.age_months {
            if age == hi.age_months {
                return hi.x_fraction;
            }
            let ratio = (age - lo.age_months) / (hi.age_months - lo.age_months);
            return lo.x_fraction + ratio * (hi.x_fraction - lo.x_fraction);
        }
    }

    FALLBACK_X
}

/// Formats an age the way it appears as a JSON key: `12` for whole months, `1.5` otherwise.
pub fn format_age(age: f64) -> String {
    if age.fract() == 0.0 && age.abs() < 1e15 {
        format!("{}", age as i64)
    } else {
        format!("{}", age)
    }
}

// *************** Serde ***************

impl Serialize for AgeScale {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.knots.len()))?;
        for knot in &self.knots {
            map.serialize_entry(&format_age(knot.age_months), &knot.x_fraction)?;
        }
        map.end()
    }
}

struct KnotVisitor;

impl<'de> Visitor<'de> for KnotVisitor {
    type Value = AgeScale;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of age in months to x fraction")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<AgeScale, A::Error> {
        let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, x)) = access.next_entry::<String, f64>()? {
            let age: f64 = key
                .trim()
                .parse()
                .map_err(|_| de::Error::custom(format!("invalid age key '{}'", key)))?;
            pairs.push((age, x));
        }
        AgeScale::new(pairs).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for AgeScale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(KnotVisitor)
    }
}
