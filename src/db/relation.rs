/// Relation store: subscription edges and watch-history entries
///
/// Append-only facts; all aggregation logic stays in the graph module.
use crate::error::ApiResult;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

/// Store over the subscription and watch_history tables
#[derive(Clone)]
pub struct RelationStore {
    db: SqlitePool,
}

impl RelationStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record a subscription edge (subscriber follows channel)
    ///
    /// The pair primary key makes the relation a set, so re-subscribing
    /// cannot inflate counts.
    pub async fn add_subscription(&self, subscriber_id: &str, channel_id: &str) -> ApiResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO subscription (subscriber_id, channel_id, created_at)
             VALUES (?1, ?2, ?3)",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Count distinct subscribers of a channel
    pub async fn subscriber_count(&self, channel_id: &str) -> ApiResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM subscription WHERE channel_id = ?1")
            .bind(channel_id)
            .fetch_one(&self.db)
            .await?;

        Ok(row.get("n"))
    }

    /// Count distinct channels an account is subscribed to
    pub async fn subscribed_to_count(&self, subscriber_id: &str) -> ApiResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM subscription WHERE subscriber_id = ?1")
            .bind(subscriber_id)
            .fetch_one(&self.db)
            .await?;

        Ok(row.get("n"))
    }

    /// Membership test for a specific (subscriber, channel) pair
    pub async fn is_subscribed(&self, subscriber_id: &str, channel_id: &str) -> ApiResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(
                 SELECT 1 FROM subscription WHERE subscriber_id = ?1 AND channel_id = ?2
             ) AS present",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.get::<i64, _>("present") != 0)
    }

    /// Append a watch-history entry
    pub async fn record_watch(&self, account_id: &str, video_id: &str) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO watch_history (account_id, video_id, watched_at) VALUES (?1, ?2, ?3)",
        )
        .bind(account_id)
        .bind(video_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Video ids watched by an account, in append order, duplicates preserved
    pub async fn watch_history(&self, account_id: &str) -> ApiResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT video_id FROM watch_history WHERE account_id = ?1 ORDER BY id ASC",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.iter().map(|row| row.get("video_id")).collect())
    }
}
