/// Read-only social-graph queries
///
/// Joins the relation store with account and video metadata into
/// denormalized view objects.

mod aggregator;

pub use aggregator::GraphAggregator;

use serde::Serialize;

/// Public channel profile as seen by a viewer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
}

/// Minimal owner projection attached to a watched video
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwner {
    pub full_name: String,
    pub username: String,
    pub avatar_url: String,
}

/// A watch-history entry enriched with video and owner metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedVideo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration_secs: f64,
    pub views: i64,
    /// Exactly one owner, never a list
    pub owner: VideoOwner,
}
