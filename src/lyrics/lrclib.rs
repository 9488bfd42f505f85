//! LRCLIB API client
//!
//! LRCLIB is a free lyrics API that provides synchronized (LRC format) lyrics.
//! API Documentation: https://lrclib.net/docs

use crate::config::LyricsConfig;
use anyhow::Context;
use serde::Deserialize;

/// One entry of an LRCLIB search response
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LrclibResponse {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub album_name: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub plain_lyrics: Option<String>,
    #[serde(default)]
    pub synced_lyrics: Option<String>,
}

impl LrclibResponse {
    pub(crate) fn has_synced(&self) -> bool {
        self.synced_lyrics.as_deref().is_some_and(|s| !s.is_empty())
    }

    fn has_plain(&self) -> bool {
        self.plain_lyrics.as_deref().is_some_and(|s| !s.is_empty())
    }

    fn has_any_lyrics(&self) -> bool {
        self.synced_lyrics.is_some() || self.plain_lyrics.is_some()
    }

    fn within(&self, duration: f64, tolerance: f64) -> bool {
        self.duration.is_some_and(|d| (d - duration).abs() <= tolerance)
    }
}

/// LRCLIB API client
#[derive(Debug, Clone)]
pub struct LrclibClient {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibClient {
    /// Create a new LRCLIB client
    pub fn new(cfg: &LyricsConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Free-text search, returns every candidate the server knows about
    pub async fn search(&self, query: &str) -> anyhow::Result<Vec<LrclibResponse>> {
        let url = format!("{}/search?q={}", self.base_url, urlencoding::encode(query));

        let response = self.client.get(&url).send().await.context("lrclib search")?;

        if !response.status().is_success() {
            anyhow::bail!("LRCLIB search error: {}", response.status());
        }

        let results: Vec<LrclibResponse> = response.json().await.context("decode lrclib search")?;
        Ok(results)
    }
}

/// Candidates within `tolerance` seconds of `duration` that carry some lyrics,
/// synced ones first. Ties keep the server's order.
pub fn matched_songs(
    results: &[LrclibResponse],
    duration: f64,
    tolerance: f64,
) -> Vec<&LrclibResponse> {
    let mut matched: Vec<_> = results
        .iter()
        .filter(|r| r.within(duration, tolerance) && r.has_any_lyrics())
        .collect();
    // Stable: `false` sorts first, so synced entries lead.
    matched.sort_by_key(|r| !r.has_synced());
    matched
}

/// Lyrics text of the best candidate: synced if available, else plain.
pub fn best_lyrics(results: &[LrclibResponse], duration: f64, tolerance: f64) -> Option<String> {
    let best = *matched_songs(results, duration, tolerance).first()?;
    if best.has_synced() {
        best.synced_lyrics.clone()
    } else if best.has_plain() {
        best.plain_lyrics.clone()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(duration: f64, synced: Option<&str>, plain: Option<&str>) -> LrclibResponse {
        LrclibResponse {
            duration: Some(duration),
            synced_lyrics: synced.map(str::to_string),
            plain_lyrics: plain.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let results = vec![
            song(195.0, None, Some("a")),
            song(205.0, None, Some("b")),
            song(205.5, None, Some("c")),
            song(194.9, None, Some("d")),
        ];
        let matched = matched_songs(&results, 200.0, 5.0);
        let texts: Vec<_> = matched
            .iter()
            .map(|r| r.plain_lyrics.as_deref().unwrap())
            .collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[test]
    fn test_requires_some_lyrics() {
        let results = vec![song(200.0, None, None), LrclibResponse::default()];
        assert!(matched_songs(&results, 200.0, 5.0).is_empty());
        assert_eq!(best_lyrics(&results, 200.0, 5.0), None);
    }

    #[test]
    fn test_synced_sorted_first_and_stable() {
        let results = vec![
            song(200.0, None, Some("plain-1")),
            song(201.0, Some("[00:01.00] s1"), None),
            song(199.0, None, Some("plain-2")),
            song(202.0, Some("[00:01.00] s2"), Some("p")),
        ];
        let matched = matched_songs(&results, 200.0, 5.0);
        let order: Vec<_> = matched
            .iter()
            .map(|r| {
                r.synced_lyrics
                    .as_deref()
                    .or(r.plain_lyrics.as_deref())
                    .unwrap()
            })
            .collect();
        assert_eq!(
            order,
            ["[00:01.00] s1", "[00:01.00] s2", "plain-1", "plain-2"]
        );
    }

    #[test]
    fn test_best_prefers_synced_then_plain() {
        let results = vec![
            song(200.0, None, Some("plain")),
            song(200.0, Some("[00:01.00] synced"), Some("also plain")),
        ];
        assert_eq!(
            best_lyrics(&results, 200.0, 5.0).as_deref(),
            Some("[00:01.00] synced")
        );

        let plain_only = vec![song(200.0, Some(""), Some("plain"))];
        assert_eq!(best_lyrics(&plain_only, 200.0, 5.0).as_deref(), Some("plain"));
    }

    #[test]
    fn test_empty_synced_text_ranks_as_plain() {
        let results = vec![
            song(200.0, Some(""), Some("plain-1")),
            song(200.0, Some("[00:01.00] s"), None),
        ];
        let matched = matched_songs(&results, 200.0, 5.0);
        assert!(matched[0].has_synced());
        assert!(!matched[1].has_synced());
        assert_eq!(matched[1].plain_lyrics.as_deref(), Some("plain-1"));
    }

    #[test]
    fn test_empty_strings_yield_nothing() {
        let results = vec![song(200.0, Some(""), Some(""))];
        assert_eq!(matched_songs(&results, 200.0, 5.0).len(), 1);
        assert_eq!(best_lyrics(&results, 200.0, 5.0), None);
    }

    #[test]
    fn test_missing_duration_never_matches() {
        let results = vec![LrclibResponse {
            plain_lyrics: Some("x".into()),
            ..Default::default()
        }];
        assert!(matched_songs(&results, 200.0, 5.0).is_empty());
    }

    #[test]
    fn test_decode_search_payload() {
        let raw = r#"[{"id":1,"trackName":"Song","artistName":"Band","albumName":null,
            "duration":201.0,"instrumental":false,"plainLyrics":"la la","syncedLyrics":null}]"#;
        let results: Vec<LrclibResponse> = serde_json::from_str(raw).unwrap();
        assert_eq!(results[0].track_name.as_deref(), Some("Song"));
        assert_eq!(results[0].duration, Some(201.0));
        assert_eq!(results[0].synced_lyrics, None);
    }
}
