use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::{
    db::{
        helpers::{decode_points, encode_points, parse_timestamp_ms, parse_unit},
        Database,
    },
    models::Measurement,
};

const SELECT_COLUMNS: &str = "SELECT id, value, unit, image_uri, timestamp_ms, label, object_name, object_details, points_json
     FROM measurements";

fn row_to_measurement(row: &Row) -> Result<Measurement> {
    let unit: String = row.get("unit")?;
    let timestamp_ms: i64 = row.get("timestamp_ms")?;
    let points_json: String = row.get("points_json")?;

    Ok(Measurement {
        id: row.get("id")?,
        value: row.get("value")?,
        unit: parse_unit(&unit)?,
        image_uri: row.get("image_uri")?,
        timestamp: parse_timestamp_ms(timestamp_ms, "timestamp_ms")?,
        label: row.get("label")?,
        object_name: row.get("object_name")?,
        object_details: row.get("object_details")?,
        points: decode_points(&points_json)?,
    })
}

impl Database {
    pub async fn insert_measurement(&self, measurement: &Measurement) -> Result<()> {
        let record = measurement.clone();
        self.execute(move |conn| {
            let points_json = encode_points(&record.points)?;
            conn.execute(
                "INSERT INTO measurements (id, value, unit, image_uri, timestamp_ms, label, object_name, object_details, points_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.value,
                    record.unit.as_str(),
                    record.image_uri,
                    record.timestamp.timestamp_millis(),
                    record.label,
                    record.object_name,
                    record.object_details,
                    points_json,
                ],
            )
            .with_context(|| format!("failed to insert measurement {}", record.id))?;
            Ok(())
        })
        .await
    }

    /// Overwrite the mutable columns of an existing row. Points and timestamp are fixed.
    ///
    /// Returns false when no row has that id.
    pub async fn update_measurement(&self, measurement: &Measurement) -> Result<bool> {
        let record = measurement.clone();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE measurements
                 SET value = ?1,
                     unit = ?2,
                     image_uri = ?3,
                     label = ?4,
                     object_name = ?5,
                     object_details = ?6
                 WHERE id = ?7",
                params![
                    record.value,
                    record.unit.as_str(),
                    record.image_uri,
                    record.label,
                    record.object_name,
                    record.object_details,
                    record.id,
                ],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }

    /// Returns whether a row was removed; unknown ids are not an error.
    pub async fn delete_measurement(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM measurements WHERE id = ?1", params![id])?;
            Ok(rows_affected > 0)
        })
        .await
    }

    pub async fn get_measurement(&self, id: &str) -> Result<Option<Measurement>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
            let raw = stmt
                .query_row(params![id], |row| Ok(row_to_measurement(row)))
                .optional()?;
            raw.transpose()
        })
        .await
    }

    /// Most recently inserted first, regardless of the stored timestamps.
    pub async fn list_measurements(&self) -> Result<Vec<Measurement>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} ORDER BY rowid DESC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut measurements = Vec::new();
            while let Some(row) = rows.next()? {
                measurements.push(row_to_measurement(row)?);
            }

            Ok(measurements)
        })
        .await
    }

    pub async fn count_measurements(&self) -> Result<usize> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM measurements", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
    }
}
