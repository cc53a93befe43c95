/// JWT issuance and verification for access and refresh tokens
use crate::config::AuthConfig;
use crate::db::account::Account;
use crate::error::{ApiError, ApiResult};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Account id
    pub sub: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a refresh token
///
/// Deliberately minimal: the account id is all the rotation check needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Account id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies both token kinds
///
/// Secrets and lifetimes come from the config read once at startup; the two
/// kinds never share a signing secret.
#[derive(Clone)]
pub struct TokenService {
    config: AuthConfig,
}

impl TokenService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Issue a short-lived access token for an account
    pub fn issue_access(&self, account: &Account) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: account.id.clone(),
            email: account.email.clone(),
            username: account.username.clone(),
            full_name: account.full_name.clone(),
            iat: now,
            exp: now + self.config.access_token_ttl_minutes * 60,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.access_token_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate access token: {}", e)))
    }

    /// Issue a long-lived refresh token for an account
    pub fn issue_refresh(&self, account: &Account) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: account.id.clone(),
            iat: now,
            exp: now + self.config.refresh_token_ttl_days * 24 * 3600,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.refresh_token_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate refresh token: {}", e)))
    }

    /// Verify an access token and return its claims
    ///
    /// Expiry, signature, and shape failures all report the same way so the
    /// caller learns nothing about which check tripped.
    pub fn verify_access(&self, token: &str) -> ApiResult<AccessClaims> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.config.access_token_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::Auth("Invalid or expired access token".to_string()))
    }

    /// Verify a refresh token and return its claims
    pub fn verify_refresh(&self, token: &str) -> ApiResult<RefreshClaims> {
        decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.config.refresh_token_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::Auth("Invalid or expired refresh token".to_string()))
    }
}
