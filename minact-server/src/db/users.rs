//! User database operations

use minact_common::credentials;
use minact_common::db::models::User;
use minact_common::db::UNASSIGNED_USER_GUID;
use minact_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Password given to users created implicitly from an assignee name.
/// They can log in with it and are expected to change it.
const LAZY_USER_PASSWORD: &str = "changeme";

fn from_row(row: &SqliteRow) -> Result<User> {
    let created_at: String = row.get("created_at");
    Ok(User {
        guid: row.get("guid"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        password_salt: row.get("password_salt"),
        is_admin: row.get("is_admin"),
        created_at: time::from_db(&created_at)?,
    })
}

/// Insert a new user with the given credentials
pub async fn insert(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    is_admin: bool,
) -> Result<User> {
    let salt = credentials::generate_salt();
    let user = User {
        guid: Uuid::new_v4().to_string(),
        username: username.to_string(),
        password_hash: credentials::hash_password(password, &salt),
        password_salt: salt,
        is_admin,
        created_at: chrono::Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO users (guid, username, password_hash, password_salt, is_admin, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.guid)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.password_salt)
    .bind(user.is_admin)
    .bind(time::to_db(user.created_at))
    .execute(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(from_row).transpose()
}

pub async fn fetch(pool: &SqlitePool, guid: &str) -> Result<User> {
    let row = sqlx::query("SELECT * FROM users WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => from_row(&row),
        None => Err(Error::NotFound(format!("User not found: {}", guid))),
    }
}

/// All users ordered by username (admin listing)
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query("SELECT * FROM users ORDER BY username ASC")
        .fetch_all(pool)
        .await?;

    rows.iter().map(from_row).collect()
}

/// Explicit lookup-or-create collaborator for assignee names coming out of
/// extraction. Unknown names become real users with a placeholder password;
/// `unassigned` and empty names map to the shared unassigned user.
///
/// Takes a connection so callers can run it inside the meeting-creation
/// transaction (extraction is all-or-nothing).
pub async fn lookup_or_create(conn: &mut SqliteConnection, name: &str) -> Result<User> {
    let name = name.trim();
    let effective = if name.is_empty() || name.eq_ignore_ascii_case("unassigned") {
        "unassigned"
    } else {
        name
    };

    let row = sqlx::query("SELECT * FROM users WHERE username = ?")
        .bind(effective)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(row) = row {
        return from_row(&row);
    }

    // The unassigned row is seeded at init; missing means a broken database
    if effective == "unassigned" {
        return Err(Error::Internal(format!(
            "Bootstrap user missing (guid {})",
            UNASSIGNED_USER_GUID
        )));
    }

    let salt = credentials::generate_salt();
    let user = User {
        guid: Uuid::new_v4().to_string(),
        username: effective.to_string(),
        password_hash: credentials::hash_password(LAZY_USER_PASSWORD, &salt),
        password_salt: salt,
        is_admin: false,
        created_at: chrono::Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO users (guid, username, password_hash, password_salt, is_admin, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.guid)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.password_salt)
    .bind(user.is_admin)
    .bind(time::to_db(user.created_at))
    .execute(&mut *conn)
    .await?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minact_common::db::init_memory_database;

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let pool = init_memory_database().await.unwrap();

        let user = insert(&pool, "priya", "priya123", false).await.unwrap();
        let found = find_by_username(&pool, "priya").await.unwrap().unwrap();
        assert_eq!(found.guid, user.guid);
        assert!(!found.is_admin);
        assert!(credentials::verify_password(
            "priya123",
            &found.password_salt,
            &found.password_hash
        ));
    }

    #[tokio::test]
    async fn lookup_or_create_reuses_existing_user() {
        let pool = init_memory_database().await.unwrap();
        let existing = insert(&pool, "arjun", "arjun456", false).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let resolved = lookup_or_create(&mut conn, "arjun").await.unwrap();
        assert_eq!(resolved.guid, existing.guid);
    }

    #[tokio::test]
    async fn lookup_or_create_builds_missing_user() {
        let pool = init_memory_database().await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let created = lookup_or_create(&mut conn, "raghav").await.unwrap();
        drop(conn);

        let found = find_by_username(&pool, "raghav").await.unwrap().unwrap();
        assert_eq!(found.guid, created.guid);
        assert!(credentials::verify_password(
            LAZY_USER_PASSWORD,
            &found.password_salt,
            &found.password_hash
        ));
    }

    #[tokio::test]
    async fn empty_and_unassigned_names_share_the_bootstrap_row() {
        let pool = init_memory_database().await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let blank = lookup_or_create(&mut conn, "  ").await.unwrap();
        let named = lookup_or_create(&mut conn, "Unassigned").await.unwrap();
        assert_eq!(blank.guid, UNASSIGNED_USER_GUID);
        assert_eq!(named.guid, UNASSIGNED_USER_GUID);
    }
}
