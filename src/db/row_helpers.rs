use anyhow::{Context, Result};
use sqlx::{sqlite::SqliteRow, Row};

use crate::models::*;

/// Map a SQLite row to a Device struct.
/// An unknown state label is a storage error, not a default.
pub fn map_device_row(row: &SqliteRow) -> Result<Device> {
    let state: String = row.try_get("state")?;
    let state = parse_state(&state).context("Corrupt device row")?;
    Ok(Device {
        id: Some(row.try_get("id")?),
        name: row.try_get("name")?,
        brand: row.try_get("brand")?,
        state,
        version: row.try_get("version")?,
        created_at: Some(row.try_get("created_at")?),
        updated_at: Some(row.try_get("updated_at")?),
    })
}

pub fn map_device_rows(rows: &[SqliteRow]) -> Result<Vec<Device>> {
    rows.iter().map(map_device_row).collect()
}
