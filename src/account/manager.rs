/// Account manager: session and credential lifecycle
///
/// Orchestrates the credential store, password hasher, token service, and
/// media store. Owns the invariant that at most one refresh token per
/// account is valid at a time.
use crate::{
    account::{AccountView, NewAccount, TokenPair},
    auth::{password, TokenService},
    db::{self, account::Account, account::AccountStore},
    error::{ApiError, ApiResult},
    media::ObjectStore,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct AccountManager {
    store: AccountStore,
    tokens: TokenService,
    media: Arc<dyn ObjectStore>,
}

impl AccountManager {
    pub fn new(store: AccountStore, tokens: TokenService, media: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            tokens,
            media,
        }
    }

    /// Register a new account
    ///
    /// Every required field must be non-empty after trimming; absent and
    /// whitespace-only are equally missing. The avatar upload must succeed,
    /// a cover failure degrades to no cover image.
    pub async fn register(&self, input: NewAccount) -> ApiResult<AccountView> {
        let username = required_field(input.username.as_deref())?;
        let email = required_field(input.email.as_deref())?;
        let full_name = required_field(input.full_name.as_deref())?;
        let password = required_field(input.password.as_deref())?;

        let username = username.to_lowercase();
        let email = email.to_lowercase();

        // Pre-check; the schema's unique indexes resolve any remaining race
        if self
            .store
            .find_by_username_or_email(&username, &email)
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict(
                "An account with this username or email already exists".to_string(),
            ));
        }

        let avatar_path = input.avatar_path.as_deref().ok_or_else(|| {
            ApiError::Validation("Avatar image is required".to_string())
        })?;
        let avatar = self.media.upload(avatar_path).await.map_err(|e| {
            tracing::warn!("Avatar upload failed during registration: {}", e);
            ApiError::Validation("Avatar upload failed".to_string())
        })?;

        let cover_image_url = match input.cover_path.as_deref() {
            Some(path) => match self.media.upload(path).await {
                Ok(uploaded) => Some(uploaded.url),
                Err(e) => {
                    tracing::warn!("Cover image upload failed, registering without: {}", e);
                    None
                }
            },
            None => None,
        };

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            full_name: full_name.to_string(),
            password_hash: password::hash(password)?,
            avatar_url: avatar.url,
            cover_image_url,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        self.store.create(&account).await.map_err(|e| match e {
            ApiError::Database(ref db_err) if db::is_unique_violation(db_err) => {
                ApiError::Conflict(
                    "An account with this username or email already exists".to_string(),
                )
            }
            other => other,
        })?;

        tracing::info!(username = %account.username, "Registered new account");
        Ok(AccountView::from(account))
    }

    /// Authenticate and open a session
    ///
    /// Issues a fresh access/refresh pair and persists the refresh token on
    /// the account, invalidating any token from a prior session.
    pub async fn login(
        &self,
        identifier: Option<&str>,
        password_input: &str,
    ) -> ApiResult<(AccountView, TokenPair)> {
        let identifier = identifier
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::Validation("Username or email is required".to_string()))?;

        let account = self
            .store
            .find_by_identifier(identifier)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account does not exist".to_string()))?;

        if !password::verify(password_input, &account.password_hash)? {
            return Err(ApiError::Auth("Incorrect password".to_string()));
        }

        let pair = self.issue_pair(&account).await?;

        tracing::info!(username = %account.username, "Account logged in");
        Ok((AccountView::from(account), pair))
    }

    /// Close the session: drop the stored refresh token
    ///
    /// Any previously issued refresh token fails the rotation check
    /// afterwards, even if not yet expired.
    pub async fn logout(&self, account_id: &str) -> ApiResult<()> {
        self.store.set_refresh_token(account_id, None).await?;
        tracing::info!(account_id, "Account logged out");
        Ok(())
    }

    /// Exchange a refresh token for a new token pair
    ///
    /// The incoming raw token must verify AND equal the stored value; the
    /// swap is conditional, so concurrent replays race to at most one
    /// winner. Every token failure reports uniformly as an auth error.
    pub async fn refresh(&self, incoming: Option<&str>) -> ApiResult<TokenPair> {
        let incoming = incoming
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::Auth("Missing refresh token".to_string()))?;

        let claims = self.tokens.verify_refresh(incoming)?;

        let account = self
            .store
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account does not exist".to_string()))?;

        let access_token = self.tokens.issue_access(&account)?;
        let refresh_token = self.tokens.issue_refresh(&account)?;

        let rotated = self
            .store
            .swap_refresh_token(&account.id, incoming, &refresh_token)
            .await?;
        if !rotated {
            tracing::warn!(account_id = %account.id, "Stale or reused refresh token rejected");
            return Err(ApiError::Auth(
                "Refresh token is stale or already used".to_string(),
            ));
        }

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Change the account password
    pub async fn change_password(
        &self,
        account_id: &str,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> ApiResult<()> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account does not exist".to_string()))?;

        if new_password != confirm_password {
            return Err(ApiError::Validation(
                "New password and confirmation do not match".to_string(),
            ));
        }

        if !password::verify(old_password, &account.password_hash)? {
            return Err(ApiError::Auth("Incorrect current password".to_string()));
        }

        let new_hash = password::hash(new_password)?;
        self.store.set_password_hash(&account.id, &new_hash).await?;

        tracing::info!(account_id, "Password changed");
        Ok(())
    }

    /// Issue a token pair and bind the refresh token to the account
    async fn issue_pair(&self, account: &Account) -> ApiResult<TokenPair> {
        let access_token = self.tokens.issue_access(account)?;
        let refresh_token = self.tokens.issue_refresh(account)?;

        self.store
            .set_refresh_token(&account.id, Some(&refresh_token))
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

/// Reject absent and empty-after-trim values alike
fn required_field(value: Option<&str>) -> ApiResult<&str> {
    match value.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(trimmed),
        _ => Err(ApiError::Validation("All fields are required".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::db::account::test_support::setup_test_db;
    use crate::media::{ObjectStore, UploadedObject};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};

    /// Media store stub that always succeeds
    struct FixedObjectStore;

    #[async_trait]
    impl ObjectStore for FixedObjectStore {
        async fn upload(&self, local_path: &Path) -> ApiResult<UploadedObject> {
            Ok(UploadedObject {
                url: format!("http://media.test/{}", local_path.display()),
            })
        }
    }

    /// Media store stub that always fails
    struct FailingObjectStore;

    #[async_trait]
    impl ObjectStore for FailingObjectStore {
        async fn upload(&self, _local_path: &Path) -> ApiResult<UploadedObject> {
            Err(ApiError::MediaStorage("Upstream rejected upload".to_string()))
        }
    }

    fn test_tokens() -> TokenService {
        TokenService::new(AuthConfig {
            access_token_secret: "access-secret-for-testing-0123456789abcdef".to_string(),
            refresh_token_secret: "refresh-secret-for-testing-0123456789abcdef".to_string(),
            access_token_ttl_minutes: 60,
            refresh_token_ttl_days: 10,
        })
    }

    async fn create_test_manager() -> (AccountManager, AccountStore) {
        let db = setup_test_db().await;
        let store = AccountStore::new(db);
        let manager = AccountManager::new(
            store.clone(),
            test_tokens(),
            Arc::new(FixedObjectStore),
        );
        (manager, store)
    }

    fn alice_input() -> NewAccount {
        NewAccount {
            username: Some("Alice".to_string()),
            email: Some("a@x.com".to_string()),
            full_name: Some("Alice A".to_string()),
            password: Some("pw123".to_string()),
            avatar_path: Some(PathBuf::from("staged/avatar.png")),
            cover_path: None,
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let (manager, store) = create_test_manager().await;

        let view = manager.register(alice_input()).await.unwrap();
        assert_eq!(view.username, "alice");
        assert_eq!(view.email, "a@x.com");
        assert!(view.avatar_url.starts_with("http://media.test/"));

        // Stored secret is hashed, no refresh token yet
        let stored = store.find_by_id(&view.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "pw123");
        assert!(stored.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_register_rejects_missing_or_blank_fields() {
        let (manager, _) = create_test_manager().await;

        let mut absent = alice_input();
        absent.full_name = None;
        assert!(matches!(
            manager.register(absent).await.unwrap_err(),
            ApiError::Validation(_)
        ));

        let mut blank = alice_input();
        blank.email = Some("   ".to_string());
        assert!(matches!(
            manager.register(blank).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_username_conflicts() {
        let (manager, _) = create_test_manager().await;
        manager.register(alice_input()).await.unwrap();

        let mut dup = alice_input();
        dup.username = Some("ALICE".to_string()); // case-insensitive
        dup.email = Some("other@x.com".to_string());
        assert!(matches!(
            manager.register(dup).await.unwrap_err(),
            ApiError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_register_requires_avatar() {
        let (manager, _) = create_test_manager().await;

        let mut no_avatar = alice_input();
        no_avatar.avatar_path = None;
        assert!(matches!(
            manager.register(no_avatar).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_register_avatar_upload_failure_is_validation() {
        let db = setup_test_db().await;
        let store = AccountStore::new(db);
        let manager =
            AccountManager::new(store.clone(), test_tokens(), Arc::new(FailingObjectStore));

        assert!(matches!(
            manager.register(alice_input()).await.unwrap_err(),
            ApiError::Validation(_)
        ));

        // Nothing was written
        assert!(store
            .find_by_username("alice")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_login_success_binds_refresh_token() {
        let (manager, store) = create_test_manager().await;
        manager.register(alice_input()).await.unwrap();

        let (view, pair) = manager.login(Some("alice"), "pw123").await.unwrap();
        assert_eq!(view.username, "alice");
        assert!(!pair.access_token.is_empty());

        let stored = store.find_by_id(&view.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(pair.refresh_token.as_str()));

        // Email works as identifier too
        manager.login(Some("a@x.com"), "pw123").await.unwrap();
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (manager, _) = create_test_manager().await;
        manager.register(alice_input()).await.unwrap();

        assert!(matches!(
            manager.login(None, "pw123").await.unwrap_err(),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            manager.login(Some("nobody"), "pw123").await.unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            manager.login(Some("alice"), "wrong").await.unwrap_err(),
            ApiError::Auth(_)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_rejects_replay() {
        let (manager, _) = create_test_manager().await;
        manager.register(alice_input()).await.unwrap();
        let (_, pair) = manager.login(Some("alice"), "pw123").await.unwrap();

        let rotated = manager.refresh(Some(&pair.refresh_token)).await.unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);

        // Replaying the consumed token fails
        assert!(matches!(
            manager.refresh(Some(&pair.refresh_token)).await.unwrap_err(),
            ApiError::Auth(_)
        ));

        // The rotated token is usable exactly once more
        manager.refresh(Some(&rotated.refresh_token)).await.unwrap();
    }

    #[tokio::test]
    async fn test_login_invalidates_previous_sessions_refresh_token() {
        let (manager, _) = create_test_manager().await;
        manager.register(alice_input()).await.unwrap();

        let (_, first) = manager.login(Some("alice"), "pw123").await.unwrap();
        let (_, _second) = manager.login(Some("alice"), "pw123").await.unwrap();

        assert!(matches!(
            manager.refresh(Some(&first.refresh_token)).await.unwrap_err(),
            ApiError::Auth(_)
        ));
    }

    #[tokio::test]
    async fn test_logout_invalidates_refresh_token() {
        let (manager, _) = create_test_manager().await;
        let view = manager.register(alice_input()).await.unwrap();
        let (_, pair) = manager.login(Some("alice"), "pw123").await.unwrap();

        manager.logout(&view.id).await.unwrap();

        assert!(matches!(
            manager.refresh(Some(&pair.refresh_token)).await.unwrap_err(),
            ApiError::Auth(_)
        ));
    }

    #[tokio::test]
    async fn test_refresh_failures() {
        let (manager, _) = create_test_manager().await;

        assert!(matches!(
            manager.refresh(None).await.unwrap_err(),
            ApiError::Auth(_)
        ));
        assert!(matches!(
            manager.refresh(Some("garbage")).await.unwrap_err(),
            ApiError::Auth(_)
        ));

        // Verifiable token for an account that does not exist
        let ghost = crate::db::account::test_support::test_account("ghost");
        let token = test_tokens().issue_refresh(&ghost).unwrap();
        assert!(matches!(
            manager.refresh(Some(&token)).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let (manager, store) = create_test_manager().await;
        let view = manager.register(alice_input()).await.unwrap();
        let before = store.find_by_id(&view.id).await.unwrap().unwrap();

        // Confirmation mismatch leaves the hash untouched
        assert!(matches!(
            manager
                .change_password(&view.id, "pw123", "new-pw", "other")
                .await
                .unwrap_err(),
            ApiError::Validation(_)
        ));
        let after = store.find_by_id(&view.id).await.unwrap().unwrap();
        assert_eq!(after.password_hash, before.password_hash);

        // Wrong old password
        assert!(matches!(
            manager
                .change_password(&view.id, "wrong", "new-pw", "new-pw")
                .await
                .unwrap_err(),
            ApiError::Auth(_)
        ));

        // Success; the new password logs in, the old one does not
        manager
            .change_password(&view.id, "pw123", "new-pw", "new-pw")
            .await
            .unwrap();
        manager.login(Some("alice"), "new-pw").await.unwrap();
        assert!(matches!(
            manager.login(Some("alice"), "pw123").await.unwrap_err(),
            ApiError::Auth(_)
        ));
    }
}
