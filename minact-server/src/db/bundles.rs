//! Bundle group database operations

use minact_common::db::models::Bundle;
use minact_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn from_row(row: &SqliteRow) -> Result<Bundle> {
    let created_at: String = row.get("created_at");
    Ok(Bundle {
        guid: row.get("guid"),
        name: row.get("name"),
        created_by: row.get("created_by"),
        created_at: time::from_db(&created_at)?,
    })
}

pub async fn insert(pool: &SqlitePool, name: &str, created_by: &str) -> Result<Bundle> {
    let bundle = Bundle {
        guid: Uuid::new_v4().to_string(),
        name: name.to_string(),
        created_by: created_by.to_string(),
        created_at: chrono::Utc::now(),
    };

    sqlx::query(
        "INSERT INTO bundles (guid, name, created_by, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&bundle.guid)
    .bind(&bundle.name)
    .bind(&bundle.created_by)
    .bind(time::to_db(bundle.created_at))
    .execute(pool)
    .await?;

    Ok(bundle)
}

pub async fn fetch(pool: &SqlitePool, guid: &str) -> Result<Bundle> {
    let row = sqlx::query("SELECT * FROM bundles WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => from_row(&row),
        None => Err(Error::NotFound(format!("Bundle not found: {}", guid))),
    }
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Bundle>> {
    let rows = sqlx::query("SELECT * FROM bundles ORDER BY created_at DESC, guid DESC")
        .fetch_all(pool)
        .await?;

    rows.iter().map(from_row).collect()
}

/// Delete a bundle; member tasks drop their bundle reference via the
/// ON DELETE SET NULL foreign key.
pub async fn delete(pool: &SqlitePool, guid: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM bundles WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Bundle not found: {}", guid)));
    }

    Ok(())
}
