/// Account records and the credential store
///
/// Storage and lookup only; credential policy lives in the account manager.
use crate::error::ApiResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Account record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// Stored lower-cased and trimmed
    pub username: String,
    /// Stored lower-cased and trimmed
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    /// The single currently-valid refresh token, if any
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Credential store over the account table
#[derive(Clone)]
pub struct AccountStore {
    db: SqlitePool,
}

impl AccountStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a new account record
    ///
    /// A unique-constraint violation on username or email propagates as a
    /// database error for the caller to map onto a conflict.
    pub async fn create(&self, account: &Account) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO account (id, username, email, full_name, password_hash, avatar_url,
                                  cover_image_url, refresh_token, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.full_name)
        .bind(&account.password_hash)
        .bind(&account.avatar_url)
        .bind(&account.cover_image_url)
        .bind(&account.refresh_token)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Look up an account by id
    pub async fn find_by_id(&self, id: &str) -> ApiResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM account WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(account)
    }

    /// Look up an account by case-folded username
    pub async fn find_by_username(&self, username: &str) -> ApiResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM account WHERE username = ?1")
            .bind(username.trim().to_lowercase())
            .fetch_optional(&self.db)
            .await?;

        Ok(account)
    }

    /// Look up an account by a login identifier (username or email)
    pub async fn find_by_identifier(&self, identifier: &str) -> ApiResult<Option<Account>> {
        let folded = identifier.trim().to_lowercase();
        let account = sqlx::query_as::<_, Account>(
            "SELECT * FROM account WHERE username = ?1 OR email = ?1",
        )
        .bind(&folded)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    /// Look up an account matching either of a username/email pair
    pub async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> ApiResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT * FROM account WHERE username = ?1 OR email = ?2",
        )
        .bind(username.trim().to_lowercase())
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    /// Overwrite (or clear) the stored refresh token
    pub async fn set_refresh_token(&self, id: &str, token: Option<&str>) -> ApiResult<()> {
        sqlx::query("UPDATE account SET refresh_token = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(token)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Replace the stored refresh token only if it still equals `current`
    ///
    /// Returns false when another rotation won the race or the token was
    /// already cleared. This is the single-use guard for token rotation.
    pub async fn swap_refresh_token(
        &self,
        id: &str,
        current: &str,
        new: &str,
    ) -> ApiResult<bool> {
        let result = sqlx::query(
            "UPDATE account SET refresh_token = ?1, updated_at = ?2
             WHERE id = ?3 AND refresh_token = ?4",
        )
        .bind(new)
        .bind(Utc::now())
        .bind(id)
        .bind(current)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Store a new password hash
    pub async fn set_password_hash(&self, id: &str, password_hash: &str) -> ApiResult<()> {
        sqlx::query("UPDATE account SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}
