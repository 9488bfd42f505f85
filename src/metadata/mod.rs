//! Song metadata as reported by the backend.

use crate::bridge::MessageBridge;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Bridge method that extracts tags, cover art and favourite status.
pub const GET_SONG_METADATA: &str = "getSongMetadata";

/// Cover shown when a track has none (or there is no track).
pub const DEFAULT_COVER: &str = "/coverArt.png";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub common: CommonTags,
    pub format: FormatInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonTags {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatInfo {
    /// Seconds
    pub duration: Option<f64>,
}

impl Metadata {
    pub fn title(&self) -> &str {
        self.common.title.as_deref().unwrap_or("Unknown Title")
    }

    pub fn album(&self) -> &str {
        self.common.album.as_deref().unwrap_or("Unknown Album")
    }

    pub fn artist(&self) -> &str {
        self.common.artist.as_deref().unwrap_or("Unknown Artist")
    }

    pub fn duration(&self) -> Option<f64> {
        self.format.duration.filter(|d| d.is_finite())
    }

    /// Free-text LRCLIB query: "<title> <artist>"
    pub fn lyrics_query(&self) -> String {
        let title = self.common.title.as_deref().unwrap_or_default();
        let artist = self.common.artist.as_deref().unwrap_or_default();
        format!("{title} {artist}").trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataResponse {
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default = "default_cover")]
    pub art: String,
    #[serde(default)]
    pub favourite: bool,
}

fn default_cover() -> String {
    DEFAULT_COVER.to_string()
}

impl Default for MetadataResponse {
    fn default() -> Self {
        Self {
            metadata: None,
            art: default_cover(),
            favourite: false,
        }
    }
}

/// Ask the backend for a file's metadata.
///
/// An empty path yields the "nothing loaded" response without a round trip.
pub async fn fetch_metadata(
    bridge: &dyn MessageBridge,
    file: &str,
) -> anyhow::Result<MetadataResponse> {
    if file.is_empty() {
        return Ok(MetadataResponse::default());
    }

    let reply = bridge
        .invoke(GET_SONG_METADATA, json!([file]))
        .await
        .with_context(|| format!("fetch metadata for {file}"))?;
    let response: MetadataResponse = serde_json::from_value(reply)
        .with_context(|| format!("decode metadata for {file}"))?;
    Ok(response)
}
