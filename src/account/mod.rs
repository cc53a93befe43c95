/// Account management system
///
/// Handles registration, login, logout, token refresh, and password changes.

mod manager;

pub use manager::AccountManager;

use crate::db::account::Account;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Registration input
///
/// The four required text fields stay optional here so an absent value and a
/// whitespace-only value are rejected by the same trimmed-emptiness check.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    /// Staged local path of the uploaded avatar (required)
    pub avatar_path: Option<PathBuf>,
    /// Staged local path of the uploaded cover image (optional)
    pub cover_path: Option<PathBuf>,
}

/// Sanitized account projection
///
/// Never carries the password hash or the stored refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            full_name: account.full_name,
            avatar_url: account.avatar_url,
            cover_image_url: account.cover_image_url,
            created_at: account.created_at,
        }
    }
}

/// Result of a successful login or refresh
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
