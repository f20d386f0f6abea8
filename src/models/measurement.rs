//! Measurement data models shared by the session, history and persistence layers.

use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tapped screen-space coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MeasurementUnit {
    #[serde(rename = "cm")]
    Cm,
    #[serde(rename = "in")]
    In,
}

impl Default for MeasurementUnit {
    fn default() -> Self {
        MeasurementUnit::Cm
    }
}

impl MeasurementUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementUnit::Cm => "cm",
            MeasurementUnit::In => "in",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            MeasurementUnit::Cm => MeasurementUnit::In,
            MeasurementUnit::In => MeasurementUnit::Cm,
        }
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementUnit {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "cm" => Ok(MeasurementUnit::Cm),
            "in" => Ok(MeasurementUnit::In),
            other => Err(anyhow!("unknown measurement unit '{other}'")),
        }
    }
}

/// Broader unit preference kept in user settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum UnitPreference {
    Metric,
    Imperial,
}

impl Default for UnitPreference {
    fn default() -> Self {
        UnitPreference::Metric
    }
}

impl UnitPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitPreference::Metric => "metric",
            UnitPreference::Imperial => "imperial",
        }
    }
}

impl FromStr for UnitPreference {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "metric" => Ok(UnitPreference::Metric),
            "imperial" => Ok(UnitPreference::Imperial),
            other => Err(anyhow!("unknown unit preference '{other}'")),
        }
    }
}

/// One completed or saved measurement.
///
/// `id` never changes after creation and `points` is never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: String,
    pub value: f64,
    pub unit: MeasurementUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_details: Option<String>,
    #[serde(default)]
    pub points: Vec<Point>,
}

impl Measurement {
    /// `"12.5 cm"` as shown on the result badge.
    pub fn display_value(&self) -> String {
        format!("{} {}", self.value, self.unit)
    }

    /// Merge `patch` into a copy of this measurement, keeping identity and points.
    pub fn merged(&self, patch: &MeasurementPatch) -> Result<Self> {
        patch.validate()?;

        let mut updated = self.clone();
        if let Some(value) = patch.value {
            updated.value = value;
        }
        if let Some(unit) = patch.unit {
            updated.unit = unit;
        }
        if let Some(image_uri) = &patch.image_uri {
            updated.image_uri = Some(image_uri.clone());
        }
        if let Some(label) = &patch.label {
            updated.label = Some(label.clone());
        }
        if let Some(object_name) = &patch.object_name {
            updated.object_name = Some(object_name.clone());
        }
        if let Some(object_details) = &patch.object_details {
            updated.object_details = Some(object_details.clone());
        }
        Ok(updated)
    }
}

/// Partial update applied by `save`; unspecified fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementPatch {
    pub value: Option<f64>,
    pub unit: Option<MeasurementUnit>,
    pub image_uri: Option<String>,
    pub label: Option<String>,
    pub object_name: Option<String>,
    pub object_details: Option<String>,
}

impl MeasurementPatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(value) = self.value {
            if !value.is_finite() || value < 0.0 {
                bail!("measurement value must be finite and non-negative, got {value}");
            }
        }
        Ok(())
    }
}
