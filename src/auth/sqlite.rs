use super::Directory;
use crate::models::{Administrator, Capabilities};
use anyhow::Result;
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};
use std::str::FromStr;

const USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
        username TEXT PRIMARY KEY,
        password_hash TEXT NOT NULL,
        can_approve_any INTEGER NOT NULL DEFAULT 0,
        can_cancel INTEGER NOT NULL DEFAULT 0,
        can_inject INTEGER NOT NULL DEFAULT 0,
        can_create_group INTEGER NOT NULL DEFAULT 0,
        can_delete_group INTEGER NOT NULL DEFAULT 0,
        can_check_groups INTEGER NOT NULL DEFAULT 0,
        local_only INTEGER NOT NULL DEFAULT 0
    )";

const MODERATORS_TABLE: &str = "CREATE TABLE IF NOT EXISTS moderators (
        username TEXT NOT NULL REFERENCES users(username),
        group_name TEXT NOT NULL,
        PRIMARY KEY(username, group_name)
    )";

#[derive(Clone)]
pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    /// Create a new SQLite directory backend, initialising the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection or schema creation fails.
    pub async fn new(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(path)?.create_if_missing(true);
        // a pooled :memory: database would be one private database per
        // connection
        let max_connections = if path.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::query(USERS_TABLE).execute(&pool).await?;
        sqlx::query(MODERATORS_TABLE).execute(&pool).await?;

        Ok(Self { pool })
    }

    fn caps_from_row(row: &SqliteRow) -> Result<Capabilities> {
        Ok(Capabilities {
            can_approve_any: row.try_get::<i64, _>("can_approve_any")? != 0,
            can_cancel: row.try_get::<i64, _>("can_cancel")? != 0,
            can_inject: row.try_get::<i64, _>("can_inject")? != 0,
            can_create_group: row.try_get::<i64, _>("can_create_group")? != 0,
            can_delete_group: row.try_get::<i64, _>("can_delete_group")? != 0,
            can_check_groups: row.try_get::<i64, _>("can_check_groups")? != 0,
            local_only: row.try_get::<i64, _>("local_only")? != 0,
        })
    }

    async fn moderates(&self, username: &str) -> Result<Vec<String>> {
        let rows =
            sqlx::query("SELECT group_name FROM moderators WHERE username = ? ORDER BY group_name")
                .bind(username)
                .fetch_all(&self.pool)
                .await?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("group_name").map_err(Into::into))
            .collect()
    }

    async fn load(&self, username: &str, row: &SqliteRow) -> Result<Administrator> {
        Ok(Administrator {
            username: username.to_string(),
            caps: Self::caps_from_row(row)?,
            moderates: self.moderates(username).await?,
        })
    }

    fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))
    }
}

#[async_trait]
impl Directory for SqliteDirectory {
    async fn add_user(&self, username: &str, password: &str, caps: &Capabilities) -> Result<()> {
        let hash = Self::hash_password(password)?;
        sqlx::query(
            "INSERT INTO users (username, password_hash, can_approve_any, can_cancel,
                 can_inject, can_create_group, can_delete_group, can_check_groups, local_only)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(&hash)
        .bind(i64::from(caps.can_approve_any))
        .bind(i64::from(caps.can_cancel))
        .bind(i64::from(caps.can_inject))
        .bind(i64::from(caps.can_create_group))
        .bind(i64::from(caps.can_delete_group))
        .bind(i64::from(caps.can_check_groups))
        .bind(i64::from(caps.local_only))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_password(&self, username: &str, new_password: &str) -> Result<()> {
        let hash = Self::hash_password(new_password)?;
        sqlx::query("UPDATE users SET password_hash = ? WHERE username = ?")
            .bind(&hash)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_user(&self, username: &str) -> Result<()> {
        sqlx::query("DELETE FROM moderators WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Administrator>> {
        let Some(row) = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let stored: String = row.try_get("password_hash")?;
        let Ok(parsed) = PasswordHash::new(&stored) else {
            return Ok(None);
        };
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Ok(None);
        }
        Ok(Some(self.load(username, &row).await?))
    }

    async fn get_administrator(&self, username: &str) -> Result<Option<Administrator>> {
        let Some(row) = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(self.load(username, &row).await?))
    }

    async fn list_administrators(&self) -> Result<Vec<Administrator>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await?;
        let mut admins = Vec::with_capacity(rows.len());
        for row in &rows {
            let username: String = row.try_get("username")?;
            admins.push(self.load(&username, row).await?);
        }
        Ok(admins)
    }

    async fn set_capabilities(&self, username: &str, caps: &Capabilities) -> Result<()> {
        sqlx::query(
            "UPDATE users SET can_approve_any = ?, can_cancel = ?, can_inject = ?,
                 can_create_group = ?, can_delete_group = ?, can_check_groups = ?, local_only = ?
             WHERE username = ?",
        )
        .bind(i64::from(caps.can_approve_any))
        .bind(i64::from(caps.can_cancel))
        .bind(i64::from(caps.can_inject))
        .bind(i64::from(caps.can_create_group))
        .bind(i64::from(caps.can_delete_group))
        .bind(i64::from(caps.can_check_groups))
        .bind(i64::from(caps.local_only))
        .bind(username)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add_moderator(&self, username: &str, group: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO moderators (username, group_name) VALUES (?, ?)")
            .bind(username)
            .bind(group)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_moderator(&self, username: &str, group: &str) -> Result<()> {
        sqlx::query("DELETE FROM moderators WHERE username = ? AND group_name = ?")
            .bind(username)
            .bind(group)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
