/// Application context and dependency wiring
use crate::{
    account::AccountManager,
    auth::TokenService,
    config::ServerConfig,
    db::{self, account::AccountStore, relation::RelationStore, video::VideoStore},
    error::{ApiError, ApiResult},
    graph::GraphAggregator,
    media::{DiskObjectStore, ObjectStore},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub token_service: TokenService,
    pub account_manager: Arc<AccountManager>,
    pub graph: Arc<GraphAggregator>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to run migrations: {}", e)))?;

        db::test_connection(&db).await?;

        let accounts = AccountStore::new(db.clone());
        let relations = RelationStore::new(db.clone());
        let videos = VideoStore::new(db.clone());

        let token_service = TokenService::new(config.auth.clone());
        let media: Arc<dyn ObjectStore> = Arc::new(DiskObjectStore::new(&config.media));

        let account_manager = Arc::new(AccountManager::new(
            accounts.clone(),
            token_service.clone(),
            media,
        ));
        let graph = Arc::new(GraphAggregator::new(accounts, relations, videos));

        tracing::info!("Application context initialized");

        Ok(Self {
            config: Arc::new(config),
            db,
            token_service,
            account_manager,
            graph,
        })
    }
}
