//! YouTube Data API v3 provider
//!
//! API Flow:
//! 1. Enrichment: /videos for every linked video in one batch, then /channels
//!    for the channel avatars of the videos found
//! 2. Shorts: /search restricted to short videos, one page at a time
//!
//! Each video and channel is cached on its own, so a list that shares most
//! items with a previous request only asks the API for the new ones.

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        ContentItem, ShortsPage, YouTubeChannelList, YouTubeSearchItem, YouTubeSearchResponse,
        YouTubeVideo, YouTubeVideoList,
    },
    services::{
        links::{parse_iso8601_duration, youtube_video_id},
        providers::{MetadataProvider, DEFAULT_SHORTS_QUERY},
    },
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

const VIDEO_CACHE_TTL: u64 = 3600; // 1 hour
const CHANNEL_CACHE_TTL: u64 = 86400; // 1 day
const SHORTS_CACHE_TTL: u64 = 900; // 15 minutes

/// The API accepts at most this many ids per call
const MAX_IDS_PER_CALL: usize = 50;
const SHORTS_PAGE_SIZE: &str = "10";

#[derive(Clone)]
pub struct YouTubeProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl YouTubeProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            cache,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}/{}", self.api_url.trim_end_matches('/'), resource);

        let response = self
            .http_client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "YouTube API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// Cache lookup that treats an unreachable cache as a miss
    async fn cached_value<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.cache.get_from_cache(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn fetch_videos(&self, ids: &[String]) -> AppResult<HashMap<String, YouTubeVideo>> {
        let mut videos = HashMap::new();
        let mut missing = Vec::new();

        for id in ids {
            match self
                .cached_value::<YouTubeVideo>(&CacheKey::Video(id.clone()))
                .await
            {
                Some(video) => {
                    videos.insert(id.clone(), video);
                }
                None => missing.push(id.clone()),
            }
        }

        for batch in missing.chunks(MAX_IDS_PER_CALL) {
            let ids = batch.join(",");
            let list: YouTubeVideoList = self
                .get_json(
                    "videos",
                    &[("part", "snippet,statistics,contentDetails"), ("id", ids.as_str())],
                )
                .await?;

            for video in list.items {
                self.cache.set_in_background(
                    &CacheKey::Video(video.id.clone()),
                    &video,
                    VIDEO_CACHE_TTL,
                );
                videos.insert(video.id.clone(), video);
            }
        }

        tracing::debug!(
            requested = ids.len(),
            fetched = missing.len(),
            "Video details resolved"
        );

        Ok(videos)
    }

    async fn fetch_channel_thumbnails(
        &self,
        channel_ids: &[String],
    ) -> AppResult<HashMap<String, String>> {
        let mut thumbnails = HashMap::new();
        let mut missing = Vec::new();

        for id in channel_ids {
            match self
                .cached_value::<String>(&CacheKey::ChannelThumbnail(id.clone()))
                .await
            {
                Some(url) => {
                    thumbnails.insert(id.clone(), url);
                }
                None => missing.push(id.clone()),
            }
        }

        for batch in missing.chunks(MAX_IDS_PER_CALL) {
            let ids = batch.join(",");
            let list: YouTubeChannelList = self
                .get_json("channels", &[("part", "snippet"), ("id", ids.as_str())])
                .await?;

            for channel in list.items {
                let Some(url) = channel.snippet.thumbnails.default.map(|t| t.url) else {
                    continue;
                };
                self.cache.set_in_background(
                    &CacheKey::ChannelThumbnail(channel.id.clone()),
                    &url,
                    CHANNEL_CACHE_TTL,
                );
                thumbnails.insert(channel.id, url);
            }
        }

        Ok(thumbnails)
    }
}

/// Distinct video ids of the items linking to YouTube, in first-seen order
fn linked_video_ids(items: &[ContentItem]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in items
        .iter()
        .filter_map(|item| item.url.as_deref().and_then(youtube_video_id))
    {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Copies the live metadata of `video` onto `item`
fn decorate(
    mut item: ContentItem,
    video: &YouTubeVideo,
    channel_thumbnails: &HashMap<String, String>,
) -> ContentItem {
    let snippet = &video.snippet;

    if !snippet.title.is_empty() {
        item.title = snippet.title.clone();
    }
    if let Some(thumbnail) = snippet.thumbnails.best() {
        item.thumbnail_url = Some(thumbnail.to_string());
    }
    item.channel_title = snippet.channel_title.clone();
    item.published_at = snippet.published_at.clone();
    item.view_count = video
        .statistics
        .as_ref()
        .and_then(|s| s.view_count.clone());
    item.duration = video
        .content_details
        .as_ref()
        .and_then(|d| parse_iso8601_duration(&d.duration));

    if let Some(url) = snippet
        .channel_id
        .as_ref()
        .and_then(|id| channel_thumbnails.get(id))
    {
        item.channel_thumbnail_url = Some(url.clone());
    }

    item
}

#[async_trait::async_trait]
impl MetadataProvider for YouTubeProvider {
    async fn enrich(&self, items: Vec<ContentItem>) -> Vec<ContentItem> {
        let video_ids = linked_video_ids(&items);
        if video_ids.is_empty() {
            return items;
        }

        let videos = match self.fetch_videos(&video_ids).await {
            Ok(videos) => videos,
            Err(e) => {
                tracing::error!(error = %e, provider = self.name(), "Error fetching video details");
                return items;
            }
        };

        let mut channel_ids: Vec<String> = videos
            .values()
            .filter_map(|v| v.snippet.channel_id.clone())
            .collect();
        channel_ids.sort();
        channel_ids.dedup();

        let channel_thumbnails = match self.fetch_channel_thumbnails(&channel_ids).await {
            Ok(thumbnails) => thumbnails,
            Err(e) => {
                tracing::warn!(error = %e, provider = self.name(), "Error fetching channel data");
                HashMap::new()
            }
        };

        items
            .into_iter()
            .map(|item| {
                let video = item
                    .url
                    .as_deref()
                    .and_then(youtube_video_id)
                    .and_then(|id| videos.get(&id));
                match video {
                    Some(video) => decorate(item, video, &channel_thumbnails),
                    None => item,
                }
            })
            .collect()
    }

    async fn search_shorts(
        &self,
        query: &str,
        page_token: Option<String>,
    ) -> AppResult<ShortsPage> {
        let query = match query.trim() {
            "" => DEFAULT_SHORTS_QUERY,
            q => q,
        };

        cached!(
            self.cache,
            CacheKey::Shorts {
                query: query.to_string(),
                page_token: page_token.clone(),
            },
            SHORTS_CACHE_TTL,
            async {
                let mut params = vec![
                    ("part", "snippet"),
                    ("maxResults", SHORTS_PAGE_SIZE),
                    ("q", query),
                    ("type", "video"),
                    ("videoDuration", "short"),
                ];
                if let Some(token) = page_token.as_deref() {
                    params.push(("pageToken", token));
                }

                let response: YouTubeSearchResponse = self.get_json("search", &params).await?;
                let videos: Vec<ContentItem> = response
                    .items
                    .into_iter()
                    .filter_map(YouTubeSearchItem::into_short)
                    .collect();

                tracing::info!(
                    query = %query,
                    results = videos.len(),
                    provider = "youtube",
                    "Shorts search completed"
                );

                Ok::<_, AppError>(ShortsPage {
                    videos,
                    next_page_token: response.next_page_token,
                })
            }
        )
    }

    fn name(&self) -> &'static str {
        "youtube"
    }
}
