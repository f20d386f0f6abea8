use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeZone, Utc};

use crate::models::{MeasurementUnit, Point};

pub fn parse_timestamp_ms(value: i64, field: &str) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value)
        .single()
        .ok_or_else(|| anyhow!("{field} contains out-of-range timestamp {value}"))
}

pub fn parse_unit(value: &str) -> Result<MeasurementUnit> {
    value
        .parse()
        .with_context(|| format!("failed to parse unit column value '{value}'"))
}

pub fn encode_points(points: &[Point]) -> Result<String> {
    serde_json::to_string(points).context("failed to encode measurement points")
}

pub fn decode_points(raw: &str) -> Result<Vec<Point>> {
    serde_json::from_str(raw).context("failed to decode measurement points")
}
