//! Reddit listing collector.
//!
//! Fetches each configured listing through Reddit's JSON rendering
//! (`<listing>.json`) and turns posts into untranslated [`Item`]s.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use super::{CollectError, Collector};
use crate::context::RunContext;
use crate::item::Item;
use crate::metrics;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; AI-NewsBot/1.0)";

static PERMALINK_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/comments/([a-zA-Z0-9]+)/").unwrap());

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];

/// Settings for [`RedditCollector`].
#[derive(Debug, Clone)]
pub struct RedditCollectorConfig {
    /// Listing URLs, e.g. `https://www.reddit.com/r/ArtificialIntelligence/top/`.
    pub urls: Vec<String>,
    /// Minimum upvotes for a post to be collected.
    pub upvote_threshold: i64,
    pub user_agent: String,
    pub timeout: Duration,
}

impl RedditCollectorConfig {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            upvote_threshold: 100,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Collector reading Reddit listings.
pub struct RedditCollector {
    client: reqwest::Client,
    config: RedditCollectorConfig,
}

impl RedditCollector {
    pub fn new(config: RedditCollectorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn fetch_listing(&self, url: &str) -> Result<Vec<Item>, CollectError> {
        let json_url = listing_json_url(url);
        debug!(url = %json_url, "Fetching listing");

        let response = self
            .client
            .get(&json_url)
            .header("User-Agent", &self.config.user_agent)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| CollectError::Http {
                url: json_url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(CollectError::Status {
                url: json_url,
                status,
            });
        }

        let body = response.text().await.map_err(|e| CollectError::Http {
            url: json_url.clone(),
            message: e.to_string(),
        })?;

        parse_listing(&body, self.config.upvote_threshold).map_err(|message| {
            CollectError::Parse {
                url: json_url,
                message,
            }
        })
    }
}

#[async_trait]
impl Collector for RedditCollector {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn fetch(&self, ctx: &RunContext) -> Result<Vec<Item>, CollectError> {
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for url in &self.config.urls {
            let timer = metrics::EXTERNAL_SERVICE_DURATION
                .with_label_values(&["reddit", "listing"])
                .start_timer();
            let result = ctx.run(self.fetch_listing(url)).await;
            timer.observe_duration();
            metrics::EXTERNAL_SERVICE_REQUESTS
                .with_label_values(&[
                    "reddit",
                    "listing",
                    if result.is_ok() { "success" } else { "error" },
                ])
                .inc();

            let posts = result?;
            info!(url = %url, posts = posts.len(), "Fetched listing");

            for post in posts {
                if seen.insert(post.source_id.clone()) {
                    items.push(post);
                }
            }
        }

        Ok(items)
    }
}

/// Turn a listing page URL into its JSON rendering.
fn listing_json_url(url: &str) -> String {
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };

    let path = path.trim_end_matches('/');
    let path = if path.ends_with(".json") {
        path.to_string()
    } else {
        format!("{}.json", path)
    };

    match query {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: Post,
}

#[derive(Debug, Default, Deserialize)]
struct Post {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    ups: i64,
    #[serde(default)]
    is_video: bool,
    #[serde(default)]
    media: Option<PostMedia>,
    #[serde(default)]
    preview: Option<Preview>,
}

#[derive(Debug, Deserialize)]
struct PostMedia {
    #[serde(default)]
    reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Deserialize)]
struct RedditVideo {
    fallback_url: String,
}

#[derive(Debug, Deserialize)]
struct Preview {
    #[serde(default)]
    images: Vec<PreviewImage>,
}

#[derive(Debug, Deserialize)]
struct PreviewImage {
    source: PreviewSource,
}

#[derive(Debug, Deserialize)]
struct PreviewSource {
    url: String,
}

/// Parse a listing body into items, dropping posts below the threshold and
/// posts without id or title.
fn parse_listing(body: &str, upvote_threshold: i64) -> Result<Vec<Item>, String> {
    let listing: Listing = serde_json::from_str(body).map_err(|e| e.to_string())?;

    Ok(listing
        .data
        .children
        .into_iter()
        .map(|child| child.data)
        .filter(|post| post.ups >= upvote_threshold)
        .filter_map(post_to_item)
        .collect())
}

fn post_to_item(post: Post) -> Option<Item> {
    let source_id = if post.id.trim().is_empty() {
        post.permalink
            .as_deref()
            .and_then(|link| PERMALINK_ID.captures(link))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())?
    } else {
        post.id.trim().to_string()
    };

    let title = post.title.trim();
    if title.is_empty() {
        return None;
    }

    let media = extract_media(&post);
    Some(Item::new(source_id, title, post.selftext.trim()).with_media(media))
}

fn extract_media(post: &Post) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();

    if post.is_video {
        if let Some(video) = post.media.as_ref().and_then(|m| m.reddit_video.as_ref()) {
            urls.push(video.fallback_url.clone());
        }
    }

    if let Some(url) = post.url.as_deref() {
        if has_media_extension(url) {
            urls.push(url.to_string());
        }
    }

    if urls.is_empty() {
        if let Some(image) = post.preview.as_ref().and_then(|p| p.images.first()) {
            urls.push(image.source.url.replace("&amp;", "&"));
        }
    }

    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|u| u.starts_with("http"))
        .filter(|u| seen.insert(u.clone()))
        .collect()
}

fn has_media_extension(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    path.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext) || VIDEO_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
        "kind": "Listing",
        "data": {
            "children": [
                {"kind": "t3", "data": {
                    "id": "abc123",
                    "title": "New model released",
                    "selftext": "Details inside.",
                    "url": "https://i.redd.it/chart.png",
                    "permalink": "/r/ArtificialIntelligence/comments/abc123/new_model/",
                    "ups": 540
                }},
                {"kind": "t3", "data": {
                    "id": "low1",
                    "title": "Barely noticed",
                    "selftext": "",
                    "ups": 3
                }},
                {"kind": "t3", "data": {
                    "id": "",
                    "title": "Id from permalink",
                    "selftext": "text",
                    "permalink": "/r/ArtificialIntelligence/comments/zz9/some_title/",
                    "ups": 200,
                    "is_video": true,
                    "media": {"reddit_video": {"fallback_url": "https://v.redd.it/xyz/DASH_720.mp4?source=fallback"}}
                }},
                {"kind": "t3", "data": {
                    "id": "prev1",
                    "title": "Link post",
                    "selftext": "",
                    "url": "https://example.com/article",
                    "ups": 150,
                    "preview": {"images": [{"source": {"url": "https://preview.redd.it/p.jpg?width=640&amp;s=abc"}}]}
                }},
                {"kind": "t3", "data": {
                    "id": "notitle",
                    "title": "   ",
                    "ups": 900
                }}
            ]
        }
    }"#;

    #[test]
    fn test_listing_json_url() {
        assert_eq!(
            listing_json_url("https://www.reddit.com/r/ArtificialIntelligence/top/"),
            "https://www.reddit.com/r/ArtificialIntelligence/top.json"
        );
        assert_eq!(
            listing_json_url("https://www.reddit.com/r/rust/top/?t=day"),
            "https://www.reddit.com/r/rust/top.json?t=day"
        );
        assert_eq!(
            listing_json_url("https://www.reddit.com/r/rust/new.json"),
            "https://www.reddit.com/r/rust/new.json"
        );
    }

    #[test]
    fn test_parse_listing_filters_and_extracts() {
        let items = parse_listing(LISTING, 100).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.source_id.as_str()).collect();
        assert_eq!(ids, vec!["abc123", "zz9", "prev1"]);

        assert_eq!(items[0].title, "New model released");
        assert_eq!(items[0].body, "Details inside.");
        assert_eq!(items[0].media_refs, vec!["https://i.redd.it/chart.png"]);
        assert!(!items[0].is_translated());

        assert_eq!(
            items[1].media_refs,
            vec!["https://v.redd.it/xyz/DASH_720.mp4?source=fallback"]
        );

        assert_eq!(
            items[2].media_refs,
            vec!["https://preview.redd.it/p.jpg?width=640&s=abc"]
        );
    }

    #[test]
    fn test_parse_listing_zero_threshold_keeps_low_scores() {
        let items = parse_listing(LISTING, 0).unwrap();
        assert!(items.iter().any(|i| i.source_id == "low1"));
        assert!(items.iter().all(|i| i.source_id != "notitle"));
    }

    #[test]
    fn test_parse_listing_invalid_body() {
        assert!(parse_listing("<html>blocked</html>", 0).is_err());
    }

    #[test]
    fn test_has_media_extension() {
        assert!(has_media_extension("https://i.redd.it/a.JPG"));
        assert!(has_media_extension("https://v.redd.it/a.mp4?x=1"));
        assert!(!has_media_extension("https://example.com/article"));
        assert!(!has_media_extension("https://example.com/page.html"));
    }

    #[tokio::test]
    async fn test_fetch_with_cancelled_context() {
        let collector = RedditCollector::new(RedditCollectorConfig::new(vec![
            "http://127.0.0.1:9/r/test/top/".to_string(),
        ]));
        let ctx = RunContext::background();
        ctx.cancel();

        let result = collector.fetch(&ctx).await;
        assert!(matches!(result, Err(CollectError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_fetch_without_urls_is_empty() {
        let collector = RedditCollector::new(RedditCollectorConfig::new(vec![]));
        let items = collector.fetch(&RunContext::background()).await.unwrap();
        assert!(items.is_empty());
    }
}
