use serde::{Deserialize, Serialize};

pub mod content;
pub mod session;
pub mod user;

pub use content::{Category, ContentItem, Episode, NewContentItem};
pub use session::{format_duration, ActivityReport, Session};
pub use user::{NewUser, User};

/// One page of short-form videos from the metadata provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShortsPage {
    pub videos: Vec<ContentItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

// ============================================================================
// YouTube Data API v3 Types
// ============================================================================

/// Response from GET /videos
#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeVideoList {
    #[serde(default)]
    pub items: Vec<YouTubeVideo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeVideo {
    pub id: String,
    pub snippet: YouTubeSnippet,
    #[serde(default)]
    pub statistics: Option<YouTubeStatistics>,
    #[serde(default)]
    pub content_details: Option<YouTubeContentDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_title: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub thumbnails: YouTubeThumbnails,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct YouTubeThumbnails {
    #[serde(default)]
    pub default: Option<YouTubeThumbnail>,
    #[serde(default)]
    pub high: Option<YouTubeThumbnail>,
}

impl YouTubeThumbnails {
    /// High resolution thumbnail, falling back to the default one
    pub fn best(&self) -> Option<&str> {
        self.high
            .as_ref()
            .or(self.default.as_ref())
            .map(|t| t.url.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YouTubeThumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeStatistics {
    #[serde(default)]
    pub view_count: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YouTubeContentDetails {
    /// ISO 8601 duration, e.g. `PT1H2M3S`
    pub duration: String,
}

/// Response from GET /channels
#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeChannelList {
    #[serde(default)]
    pub items: Vec<YouTubeChannel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeChannel {
    pub id: String,
    #[serde(default)]
    pub snippet: YouTubeSnippet,
}

/// Response from GET /search
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeSearchResponse {
    #[serde(default)]
    pub items: Vec<YouTubeSearchItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeSearchItem {
    pub id: YouTubeSearchId,
    #[serde(default)]
    pub snippet: YouTubeSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeSearchId {
    #[serde(default)]
    pub video_id: Option<String>,
}

impl YouTubeSearchItem {
    /// Maps a search hit to a catalog-shaped item; shorts are at most a minute long
    pub fn into_short(self) -> Option<ContentItem> {
        let video_id = self.id.video_id?;
        Some(ContentItem {
            url: Some(format!("https://www.youtube.com/watch?v={}", video_id)),
            id: video_id,
            title: self.snippet.title,
            thumbnail_url: self.snippet.thumbnails.best().map(String::from),
            channel_title: self.snippet.channel_title,
            created_at: self.snippet.published_at.clone(),
            published_at: self.snippet.published_at,
            votes: 0,
            duration: Some(60),
            ..Default::default()
        })
    }
}
