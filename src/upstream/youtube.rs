//! Video catalog backed by the YouTube Data API v3.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::YoutubeConfig;
use crate::resilience::RetryPolicy;
use crate::upstream::{base_url, get_json, UpstreamError};

const PROVIDER: &str = "youtube";

/// Largest page the Data API accepts.
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub published_at: String,
    pub thumbnail_url: Option<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPage {
    pub videos: Vec<Video>,
    pub next_page_token: Option<String>,
}

impl VideoPage {
    pub fn empty() -> Self {
        Self {
            videos: Vec::new(),
            next_page_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: Snippet,
    content_details: Option<ContentDetails>,
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    maxres: Option<Thumbnail>,
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(self) -> Option<String> {
        self.maxres
            .or(self.high)
            .or(self.medium)
            .or(self.default)
            .map(|t| t.url)
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

/// The Data API encodes counters as strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

impl SearchItem {
    fn into_video(self) -> Option<Video> {
        let id = self.id.video_id?;
        Some(Video {
            url: watch_url(&id),
            id,
            title: self.snippet.title,
            description: self.snippet.description,
            published_at: self.snippet.published_at,
            thumbnail_url: self.snippet.thumbnails.best(),
            duration: None,
            view_count: None,
            like_count: None,
        })
    }
}

impl From<VideoItem> for Video {
    fn from(item: VideoItem) -> Self {
        let stats = item.statistics;
        let count = |value: Option<&String>| value.and_then(|v| v.parse().ok());
        Self {
            url: watch_url(&item.id),
            view_count: count(stats.as_ref().and_then(|s| s.view_count.as_ref())),
            like_count: count(stats.as_ref().and_then(|s| s.like_count.as_ref())),
            id: item.id,
            title: item.snippet.title,
            description: item.snippet.description,
            published_at: item.snippet.published_at,
            thumbnail_url: item.snippet.thumbnails.best(),
            duration: item.content_details.and_then(|c| c.duration),
        }
    }
}

/// Client for the channel's public uploads.
pub struct VideoCatalog {
    client: reqwest::Client,
    base: Url,
    api_key: String,
    channel_id: String,
    retry: RetryPolicy,
}

impl VideoCatalog {
    pub fn new(
        client: reqwest::Client,
        config: &YoutubeConfig,
        retry: RetryPolicy,
    ) -> Result<Self, UpstreamError> {
        Ok(Self {
            client,
            base: base_url(&config.base_url)?,
            api_key: config.api_key.clone(),
            channel_id: config.channel_id.clone(),
            retry,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.channel_id.is_empty()
    }

    fn search_url(&self, max_results: u32, page_token: Option<&str>) -> Result<Url, UpstreamError> {
        let mut url = self.base.join("search")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("part", "snippet")
                .append_pair("channelId", &self.channel_id)
                .append_pair("order", "date")
                .append_pair("type", "video")
                .append_pair("maxResults", &max_results.clamp(1, MAX_PAGE_SIZE).to_string());
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
            query.append_pair("key", &self.api_key);
        }
        Ok(url)
    }

    fn video_url(&self, id: &str) -> Result<Url, UpstreamError> {
        let mut url = self.base.join("videos")?;
        url.query_pairs_mut()
            .append_pair("part", "snippet,contentDetails,statistics")
            .append_pair("id", id)
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    /// Latest uploads, newest first.
    pub async fn latest(
        &self,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<VideoPage, UpstreamError> {
        if !self.is_configured() {
            return Err(UpstreamError::NotConfigured(PROVIDER));
        }
        let url = self.search_url(max_results, page_token)?;
        let response: SearchResponse = self
            .retry
            .run(PROVIDER, || get_json(&self.client, PROVIDER, url.clone()))
            .await?;

        Ok(VideoPage {
            videos: response
                .items
                .into_iter()
                .filter_map(SearchItem::into_video)
                .collect(),
            next_page_token: response.next_page_token,
        })
    }

    /// A single video, `None` when the id is unknown.
    pub async fn video(&self, id: &str) -> Result<Option<Video>, UpstreamError> {
        if self.api_key.is_empty() {
            return Err(UpstreamError::NotConfigured(PROVIDER));
        }
        let url = self.video_url(id)?;
        let response: VideosResponse = self
            .retry
            .run(PROVIDER, || get_json(&self.client, PROVIDER, url.clone()))
            .await?;

        Ok(response.items.into_iter().next().map(Video::from))
    }
}
