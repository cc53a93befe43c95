/// Video records and owner-joined lookups
///
/// Video uploads themselves are handled elsewhere; this store exists for the
/// watch-history join and for seeding.
use crate::error::ApiResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

/// Video record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub owner_id: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub title: String,
    pub description: String,
    pub duration_secs: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// A video row joined with its owner's display fields
#[derive(Debug, Clone)]
pub struct VideoWithOwner {
    pub video: Video,
    pub owner_full_name: String,
    pub owner_username: String,
    pub owner_avatar_url: String,
}

/// Store over the video table
#[derive(Clone)]
pub struct VideoStore {
    db: SqlitePool,
}

impl VideoStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a new video record
    pub async fn create(
        &self,
        owner_id: &str,
        title: &str,
        description: &str,
        video_url: &str,
        thumbnail_url: &str,
        duration_secs: f64,
    ) -> ApiResult<Video> {
        let video = Video {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            video_url: video_url.to_string(),
            thumbnail_url: thumbnail_url.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            duration_secs,
            views: 0,
            is_published: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO video (id, owner_id, video_url, thumbnail_url, title, description,
                                duration_secs, views, is_published, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&video.id)
        .bind(&video.owner_id)
        .bind(&video.video_url)
        .bind(&video.thumbnail_url)
        .bind(&video.title)
        .bind(&video.description)
        .bind(video.duration_secs)
        .bind(video.views)
        .bind(video.is_published)
        .bind(video.created_at)
        .execute(&self.db)
        .await?;

        Ok(video)
    }

    /// Batch-resolve videos by id, each joined with exactly one owner row
    ///
    /// Keyed by video id; ids absent from the table are simply absent from
    /// the map, which the caller treats as a dangling reference.
    pub async fn find_many_with_owner(
        &self,
        ids: &[String],
    ) -> ApiResult<HashMap<String, VideoWithOwner>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        // Runtime query building: one placeholder per id
        let placeholders = (1..=ids.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT v.id, v.owner_id, v.video_url, v.thumbnail_url, v.title, v.description,
                    v.duration_secs, v.views, v.is_published, v.created_at,
                    a.full_name AS owner_full_name, a.username AS owner_username,
                    a.avatar_url AS owner_avatar_url
             FROM video v
             JOIN account a ON a.id = v.owner_id
             WHERE v.id IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.db).await?;

        let mut resolved = HashMap::with_capacity(rows.len());
        for row in rows {
            let video = Video {
                id: row.get("id"),
                owner_id: row.get("owner_id"),
                video_url: row.get("video_url"),
                thumbnail_url: row.get("thumbnail_url"),
                title: row.get("title"),
                description: row.get("description"),
                duration_secs: row.get("duration_secs"),
                views: row.get("views"),
                is_published: row.get("is_published"),
                created_at: row.get("created_at"),
            };
            let entry = VideoWithOwner {
                owner_full_name: row.get("owner_full_name"),
                owner_username: row.get("owner_username"),
                owner_avatar_url: row.get("owner_avatar_url"),
                video,
            };
            resolved.insert(entry.video.id.clone(), entry);
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::account::test_support::{setup_test_db, test_account};
    use crate::db::account::AccountStore;

    #[tokio::test]
    async fn test_find_many_with_owner_joins_one_owner() {
        let db = setup_test_db().await;
        let accounts = AccountStore::new(db.clone());
        let owner = test_account("creator");
        accounts.create(&owner).await.unwrap();

        let store = VideoStore::new(db);
        let video = store
            .create(&owner.id, "intro", "hello", "http://m/v.mp4", "http://m/t.png", 42.5)
            .await
            .unwrap();

        let resolved = store
            .find_many_with_owner(&[video.id.clone(), "missing-id".to_string()])
            .await
            .unwrap();

        assert_eq!(resolved.len(), 1);
        let entry = resolved.get(&video.id).unwrap();
        assert_eq!(entry.owner_username, "creator");
        assert_eq!(entry.video.title, "intro");
        assert!(!resolved.contains_key("missing-id"));
    }
}
