//! Lyrics module for fetching and displaying synchronized lyrics
//!
//! This module provides:
//! - LRCLIB API client and candidate ranking
//! - LRC line parser and synced-lyrics check
//! - A fetcher that fronts the client with the local cache

pub mod lrclib;
pub mod parser;

pub use lrclib::LrclibClient;
pub use parser::{LyricLine, is_synced_lyrics, parse_lyrics};

use crate::config::LyricsConfig;
use crate::storage::StorageHandle;

/// Search LRCLIB and return the best lyrics text for a track.
///
/// Any failure is treated as "no lyrics".
pub async fn fetch_lyrics(
    client: &LrclibClient,
    query: &str,
    duration: f64,
    tolerance: f64,
) -> Option<String> {
    match client.search(query).await {
        Ok(results) => lrclib::best_lyrics(&results, duration, tolerance),
        Err(e) => {
            tracing::debug!("lyrics lookup for {query:?} failed: {e:#}");
            None
        }
    }
}

/// Lyrics lookup with an optional SQLite cache in front of LRCLIB.
#[derive(Debug, Clone)]
pub struct LyricsFetcher {
    client: LrclibClient,
    tolerance: f64,
    cache: Option<StorageHandle>,
    max_age_secs: i64,
}

impl LyricsFetcher {
    pub fn new(cfg: &LyricsConfig, cache: Option<StorageHandle>) -> anyhow::Result<Self> {
        Ok(Self {
            client: LrclibClient::new(cfg)?,
            tolerance: cfg.duration_tolerance_secs,
            cache: if cfg.cache { cache } else { None },
            max_age_secs: i64::from(cfg.cache_max_age_days) * 24 * 3600,
        })
    }

    pub async fn fetch(&self, query: &str, duration: f64) -> Option<String> {
        let key = duration.round() as i64;
        let now = unix_now();

        if let Some(cache) = &self.cache
            && let Ok(Ok(Some(lyrics))) = tokio::task::spawn_blocking({
                let cache = cache.clone();
                let query = query.to_string();
                let not_before = now - self.max_age_secs;
                move || cache.get_lyrics(&query, key, not_before)
            })
            .await
        {
            tracing::debug!("lyrics cache hit for {query:?}");
            return Some(lyrics);
        }

        let lyrics = fetch_lyrics(&self.client, query, duration, self.tolerance).await?;

        if let Some(cache) = &self.cache {
            let stored = tokio::task::spawn_blocking({
                let cache = cache.clone();
                let query = query.to_string();
                let lyrics = lyrics.clone();
                move || cache.cache_lyrics(&query, key, &lyrics, now)
            })
            .await;
            if let Ok(Err(e)) = stored {
                tracing::debug!("failed to cache lyrics: {e:#}");
            }
        }

        Some(lyrics)
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
