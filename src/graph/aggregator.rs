/// Graph aggregation queries over the relation, account, and video stores
use crate::{
    db::{account::AccountStore, relation::RelationStore, video::VideoStore},
    error::{ApiError, ApiResult},
    graph::{ChannelProfile, VideoOwner, WatchedVideo},
};

pub struct GraphAggregator {
    accounts: AccountStore,
    relations: RelationStore,
    videos: VideoStore,
}

impl GraphAggregator {
    pub fn new(accounts: AccountStore, relations: RelationStore, videos: VideoStore) -> Self {
        Self {
            accounts,
            relations,
            videos,
        }
    }

    /// Build a channel profile as seen by a viewer
    ///
    /// Counts are over distinct subscription edges; the secret and
    /// refresh-token fields never cross this boundary.
    pub async fn channel_profile(
        &self,
        viewer_id: &str,
        channel_username: &str,
    ) -> ApiResult<ChannelProfile> {
        let channel_username = channel_username.trim();
        if channel_username.is_empty() {
            return Err(ApiError::Validation("Username is required".to_string()));
        }

        let channel = self
            .accounts
            .find_by_username(channel_username)
            .await?
            .ok_or_else(|| ApiError::NotFound("Channel does not exist".to_string()))?;

        let subscribers_count = self.relations.subscriber_count(&channel.id).await?;
        let channels_subscribed_to_count =
            self.relations.subscribed_to_count(&channel.id).await?;
        let is_subscribed = self.relations.is_subscribed(viewer_id, &channel.id).await?;

        Ok(ChannelProfile {
            full_name: channel.full_name,
            username: channel.username,
            email: channel.email,
            subscribers_count,
            channels_subscribed_to_count,
            is_subscribed,
            avatar_url: channel.avatar_url,
            cover_image_url: channel.cover_image_url,
        })
    }

    /// Resolve an account's watch history in stored order
    ///
    /// Duplicates are preserved; every entry joins exactly one owner. A
    /// history entry whose video cannot be resolved is an internal error,
    /// never a silent first-of-empty-list.
    pub async fn watch_history(&self, account_id: &str) -> ApiResult<Vec<WatchedVideo>> {
        if self.accounts.find_by_id(account_id).await?.is_none() {
            return Err(ApiError::NotFound("Account does not exist".to_string()));
        }

        let video_ids = self.relations.watch_history(account_id).await?;
        let resolved = self.videos.find_many_with_owner(&video_ids).await?;

        let mut history = Vec::with_capacity(video_ids.len());
        for video_id in &video_ids {
            let entry = resolved.get(video_id).ok_or_else(|| {
                tracing::error!(video_id, "Watch history references a missing video");
                ApiError::Internal("Watch history references a missing video".to_string())
            })?;

            history.push(WatchedVideo {
                id: entry.video.id.clone(),
                title: entry.video.title.clone(),
                description: entry.video.description.clone(),
                video_url: entry.video.video_url.clone(),
                thumbnail_url: entry.video.thumbnail_url.clone(),
                duration_secs: entry.video.duration_secs,
                views: entry.video.views,
                owner: VideoOwner {
                    full_name: entry.owner_full_name.clone(),
                    username: entry.owner_username.clone(),
                    avatar_url: entry.owner_avatar_url.clone(),
                },
            });
        }

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::account::test_support::{setup_test_db, test_account};
    use sqlx::SqlitePool;

    struct Fixture {
        db: SqlitePool,
        aggregator: GraphAggregator,
        accounts: AccountStore,
        relations: RelationStore,
        videos: VideoStore,
    }

    async fn setup(db: SqlitePool) -> Fixture {
        let accounts = AccountStore::new(db.clone());
        let relations = RelationStore::new(db.clone());
        let videos = VideoStore::new(db.clone());
        Fixture {
            db,
            aggregator: GraphAggregator::new(
                accounts.clone(),
                relations.clone(),
                videos.clone(),
            ),
            accounts,
            relations,
            videos,
        }
    }

    async fn seed(fixture: &Fixture, username: &str) -> String {
        let account = test_account(username);
        fixture.accounts.create(&account).await.unwrap();
        account.id
    }

    #[tokio::test]
    async fn test_channel_profile_counts_and_subscription_flag() {
        let fx = setup(setup_test_db().await).await;
        let channel = seed(&fx, "channel").await;
        let a = seed(&fx, "a").await;
        let b = seed(&fx, "b").await;
        let c = seed(&fx, "c").await;
        let outsider = seed(&fx, "outsider").await;

        // 3 distinct subscribers, channel follows 2 accounts back
        for subscriber in [&a, &b, &c] {
            fx.relations.add_subscription(subscriber, &channel).await.unwrap();
        }
        fx.relations.add_subscription(&channel, &a).await.unwrap();
        fx.relations.add_subscription(&channel, &b).await.unwrap();

        let profile = fx.aggregator.channel_profile(&a, "channel").await.unwrap();
        assert_eq!(profile.subscribers_count, 3);
        assert_eq!(profile.channels_subscribed_to_count, 2);
        assert!(profile.is_subscribed);
        assert_eq!(profile.username, "channel");

        let profile = fx
            .aggregator
            .channel_profile(&outsider, "channel")
            .await
            .unwrap();
        assert!(!profile.is_subscribed);
    }

    #[tokio::test]
    async fn test_channel_profile_lookup_is_case_folded() {
        let fx = setup(setup_test_db().await).await;
        let viewer = seed(&fx, "viewer").await;
        seed(&fx, "channel").await;

        let profile = fx
            .aggregator
            .channel_profile(&viewer, "  ChanNEL ")
            .await
            .unwrap();
        assert_eq!(profile.username, "channel");
    }

    #[tokio::test]
    async fn test_channel_profile_failures() {
        let fx = setup(setup_test_db().await).await;
        let viewer = seed(&fx, "viewer").await;

        assert!(matches!(
            fx.aggregator.channel_profile(&viewer, "   ").await.unwrap_err(),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            fx.aggregator.channel_profile(&viewer, "ghost").await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_watch_history_order_duplicates_and_single_owner() {
        let fx = setup(setup_test_db().await).await;
        let viewer = seed(&fx, "viewer").await;
        let owner = seed(&fx, "creator").await;

        let v1 = fx
            .videos
            .create(&owner, "one", "d", "http://m/v1", "http://m/t1", 1.0)
            .await
            .unwrap();
        let v2 = fx
            .videos
            .create(&owner, "two", "d", "http://m/v2", "http://m/t2", 2.0)
            .await
            .unwrap();

        for id in [&v1.id, &v2.id, &v1.id] {
            fx.relations.record_watch(&viewer, id).await.unwrap();
        }

        let history = fx.aggregator.watch_history(&viewer).await.unwrap();
        let titles: Vec<&str> = history.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two", "one"]);
        for watched in &history {
            assert_eq!(watched.owner.username, "creator");
        }
    }

    #[tokio::test]
    async fn test_watch_history_unknown_account() {
        let fx = setup(setup_test_db().await).await;
        assert!(matches!(
            fx.aggregator.watch_history("missing").await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_watch_history_dangling_reference_is_internal() {
        let fx = setup(setup_test_db().await).await;
        let viewer = seed(&fx, "viewer").await;

        // Turn foreign keys off on a pinned connection so a dangling
        // reference can be planted
        let mut conn = fx.db.acquire().await.unwrap();
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO watch_history (account_id, video_id, watched_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&viewer)
        .bind("deleted-video")
        .bind(chrono::Utc::now())
        .execute(&mut *conn)
        .await
        .unwrap();
        drop(conn);

        assert!(matches!(
            fx.aggregator.watch_history(&viewer).await.unwrap_err(),
            ApiError::Internal(_)
        ));
    }
}
