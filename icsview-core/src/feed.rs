//! Feed loading with a time-bounded cache.
//!
//! A [`FeedLoader`] fetches the calendar once, parses it, and hands out the
//! parsed result until the cache expires. Callers that arrive while a fetch
//! is in flight wait for it and share its result instead of fetching again.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono_tz::Tz;
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::error::{IcsViewError, IcsViewResult};
use crate::event::EventDefinition;
use crate::ics::{ParsedFeed, parse_feed};

/// Default time a parsed feed stays valid.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Something that can produce the raw text of a calendar feed.
pub trait FeedSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = IcsViewResult<String>> + Send;
}

/// Where the feed lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLocation {
    Url(Url),
    Path(PathBuf),
}

impl FeedLocation {
    /// Accepts http(s) and webcal URLs, `file://` URLs and plain paths.
    pub fn parse(s: &str) -> IcsViewResult<Self> {
        match Url::parse(s) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(FeedLocation::Url(url)),
            Ok(url) if url.scheme() == "webcal" => {
                let https = format!("https{}", &s["webcal".len()..]);
                Url::parse(&https)
                    .map(FeedLocation::Url)
                    .map_err(|e| IcsViewError::Config(format!("Invalid feed URL '{}': {}", s, e)))
            }
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(FeedLocation::Path)
                .map_err(|_| IcsViewError::Config(format!("Invalid file URL '{}'", s))),
            _ => Ok(FeedLocation::Path(PathBuf::from(
                shellexpand::tilde(s).into_owned(),
            ))),
        }
    }
}

impl fmt::Display for FeedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedLocation::Url(url) => write!(f, "{}", url),
            FeedLocation::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetches a [`FeedLocation`]: HTTP GET for URLs (200 expected), a file read
/// for paths.
#[derive(Debug, Clone)]
pub struct FeedClient {
    location: FeedLocation,
    http: reqwest::Client,
}

impl FeedClient {
    /// `timeout` bounds the whole HTTP request.
    pub fn new(location: FeedLocation, timeout: Duration) -> IcsViewResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IcsViewError::Config(format!("Could not build HTTP client: {}", e)))?;

        Ok(FeedClient { location, http })
    }

    pub fn location(&self) -> &FeedLocation {
        &self.location
    }
}

impl FeedSource for FeedClient {
    async fn fetch(&self) -> IcsViewResult<String> {
        match &self.location {
            FeedLocation::Url(url) => {
                let resp = self
                    .http
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|e| IcsViewError::Fetch(format!("{}: {}", url, e)))?;

                if resp.status() != StatusCode::OK {
                    return Err(IcsViewError::Fetch(format!(
                        "{} returned HTTP {}",
                        url,
                        resp.status()
                    )));
                }

                resp.text()
                    .await
                    .map_err(|e| IcsViewError::Fetch(format!("{}: {}", url, e)))
            }
            FeedLocation::Path(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| IcsViewError::Fetch(format!("{}: {}", path.display(), e))),
        }
    }
}

#[derive(Default)]
struct FeedCache {
    data: Option<Arc<ParsedFeed>>,
    expiry: Option<Instant>,
    last_error: Option<IcsViewError>,
    /// Number of completed fetches
    generation: u64,
}

impl FeedCache {
    fn fresh(&self, now: Instant) -> Option<Arc<ParsedFeed>> {
        match (&self.data, self.expiry) {
            (Some(data), Some(expiry)) if now < expiry => Some(Arc::clone(data)),
            _ => None,
        }
    }
}

/// Loads and caches a calendar feed.
pub struct FeedLoader<S> {
    source: S,
    tz: Tz,
    ttl: Duration,
    cache: Mutex<FeedCache>,
    completed: AtomicU64,
}

impl<S: FeedSource> FeedLoader<S> {
    /// `tz` pins floating times; `ttl` is how long a parsed feed is reused.
    pub fn new(source: S, tz: Tz, ttl: Duration) -> Self {
        FeedLoader {
            source,
            tz,
            ttl,
            cache: Mutex::new(FeedCache::default()),
            completed: AtomicU64::new(0),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Parsed calendar data, fetched if the cache is empty or expired.
    pub async fn feed(&self) -> IcsViewResult<Arc<ParsedFeed>> {
        let seen = self.completed.load(Ordering::Acquire);
        let mut cache = self.cache.lock().await;

        if let Some(feed) = cache.fresh(Instant::now()) {
            tracing::debug!("calendar feed served from cache");
            return Ok(feed);
        }

        // A fetch finished while we waited for the lock and it failed: share its error
        if cache.generation != seen {
            if let Some(err) = &cache.last_error {
                return Err(err.clone());
            }
        }

        tracing::info!("fetching calendar feed");
        let result = match self.source.fetch().await {
            Ok(text) => parse_feed(&text, self.tz),
            Err(e) => Err(e),
        };

        cache.generation += 1;
        self.completed.store(cache.generation, Ordering::Release);

        match result {
            Ok(parsed) => {
                tracing::info!(
                    events = parsed.definitions.len(),
                    active = parsed.active.len(),
                    "calendar feed loaded"
                );
                let parsed = Arc::new(parsed);
                cache.data = Some(Arc::clone(&parsed));
                cache.expiry = Some(Instant::now() + self.ttl);
                cache.last_error = None;
                Ok(parsed)
            }
            Err(e) => {
                tracing::warn!(error = %e, "calendar feed failed to load");
                cache.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Event definitions that are not cancelled.
    pub async fn definitions(&self) -> IcsViewResult<Arc<[Arc<EventDefinition>]>> {
        let feed = self.feed().await?;
        Ok(Arc::clone(&feed.active))
    }

    pub async fn is_cache_valid(&self) -> bool {
        self.cache.lock().await.fresh(Instant::now()).is_some()
    }

    /// Drop cached data; the next call fetches again.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.lock().await;
        cache.data = None;
        cache.expiry = None;
    }
}
