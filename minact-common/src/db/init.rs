//! Database initialization
//!
//! Creates the SQLite database on first run, applies the schema
//! idempotently and seeds default settings. Safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Fixed guid of the shared `unassigned` user
///
/// Extraction drafts whose assignee does not resolve to a real user land
/// here. The row carries an empty password hash so it can never log in.
pub const UNASSIGNED_USER_GUID: &str = "00000000-0000-0000-0000-000000000001";

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_connection(&pool).await?;
    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    info!("Database initialization complete");
    Ok(pool)
}

/// Connect to an in-memory database with the full schema (tests)
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    configure_connection(&pool).await?;
    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

async fn configure_connection(pool: &SqlitePool) -> Result<()> {
    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}

/// Apply the schema (idempotent, safe to call multiple times)
async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_sessions_table(pool).await?;
    create_meetings_table(pool).await?;
    create_work_cycles_table(pool).await?;
    create_bundles_table(pool).await?;
    create_tasks_table(pool).await?;
    create_notifications_table(pool).await?;
    create_progress_snapshots_table(pool).await?;
    create_settings_table(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            is_admin INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create the unassigned user if it doesn't exist
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO users (guid, username, password_hash, password_salt, is_admin, created_at)
        VALUES (?, 'unassigned', '', '', 0, ?)
        "#,
    )
    .bind(UNASSIGNED_USER_GUID)
    .bind(crate::time::now_db())
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_guid TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_meetings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meetings (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            date TEXT NOT NULL,
            summary TEXT,
            processed_by TEXT REFERENCES users(guid) ON DELETE SET NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_work_cycles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS work_cycles (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            goal TEXT,
            starts_on TEXT NOT NULL,
            ends_on TEXT NOT NULL,
            created_by TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_bundles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bundles (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_by TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_tasks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            guid TEXT PRIMARY KEY,
            description TEXT NOT NULL,
            due_date TEXT,
            status TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 5,
            effort_tag TEXT,
            confidence REAL,
            needs_priority_review INTEGER NOT NULL DEFAULT 0,
            suggested_focus_time TEXT,
            is_approved INTEGER NOT NULL DEFAULT 0,
            progress INTEGER NOT NULL DEFAULT 0,
            is_blocked INTEGER NOT NULL DEFAULT 0,
            blocker_reason TEXT,
            is_potential_risk INTEGER NOT NULL DEFAULT 0,
            risk_reason TEXT,
            submitted_at TEXT,
            submission_notes TEXT,
            submission_url TEXT,
            verified_at TEXT,
            verified_by TEXT REFERENCES users(guid) ON DELETE SET NULL,
            verification_notes TEXT,
            verification_deadline_at TEXT,
            sla_breached INTEGER NOT NULL DEFAULT 0,
            story_points INTEGER,
            meeting_guid TEXT NOT NULL REFERENCES meetings(guid) ON DELETE CASCADE,
            assignee_guid TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            workcycle_guid TEXT REFERENCES work_cycles(guid) ON DELETE SET NULL,
            bundle_guid TEXT REFERENCES bundles(guid) ON DELETE SET NULL,
            created_at TEXT NOT NULL,
            last_updated TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks(assignee_guid)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_notifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            guid TEXT PRIMARY KEY,
            user_guid TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            task_guid TEXT REFERENCES tasks(guid) ON DELETE CASCADE,
            body TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_progress_snapshots_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS progress_snapshots (
            guid TEXT PRIMARY KEY,
            workcycle_guid TEXT NOT NULL REFERENCES work_cycles(guid) ON DELETE CASCADE,
            open_tasks INTEGER NOT NULL,
            remaining_points INTEGER NOT NULL,
            taken_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Session and authentication settings
    ensure_setting(pool, "session_timeout_seconds", "604800").await?; // one week

    // Verification SLA settings
    ensure_setting(pool, "verification_sla_hours", "24").await?;
    ensure_setting(pool, "sla_sweep_enabled", "true").await?;
    ensure_setting(pool, "sla_sweep_interval_secs", "300").await?;

    Ok(())
}

/// Insert a setting if it is missing or NULL
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM settings WHERE key = ? AND value IS NOT NULL)",
    )
    .bind(key)
    .fetch_one(pool)
    .await?;

    if !exists {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
    }

    Ok(())
}
