use crate::lyrics::{LyricLine, is_synced_lyrics, parse_lyrics};
use crate::metadata::{DEFAULT_COVER, Metadata};
use crate::util::convert_time;

/// What the UI shows for the current track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackState {
    pub file: String,
    pub metadata: Option<Metadata>,
    pub cover: Option<String>,
    pub lyrics: Option<String>,
    pub favourite: bool,
    /// Bumped on every file change; older results are ignored.
    pub generation: u64,
}

impl Default for TrackState {
    fn default() -> Self {
        Self {
            file: String::new(),
            metadata: None,
            cover: Some(DEFAULT_COVER.to_string()),
            lyrics: None,
            favourite: false,
            generation: 0,
        }
    }
}

impl TrackState {
    /// Timed lines, or `None` when the lyrics are missing or plain text.
    pub fn synced_lines(&self) -> Option<Vec<LyricLine>> {
        let lyrics = self.lyrics.as_deref()?;
        if !is_synced_lyrics(lyrics) {
            return None;
        }
        Some(parse_lyrics(lyrics))
    }

    /// The lyric line to highlight at `position` seconds.
    pub fn line_at(&self, position: f64) -> Option<LyricLine> {
        self.synced_lines()?
            .into_iter()
            .take_while(|l| l.time <= position)
            .last()
    }

    pub fn status_line(&self) -> String {
        let Some(m) = &self.metadata else {
            return "Not playing".to_string();
        };
        let length = m
            .duration()
            .map(|d| format!(" ({})", convert_time(d)))
            .unwrap_or_default();
        let heart = if self.favourite { " ♥" } else { "" };
        format!("{} → {} by {}{length}{heart}", m.title(), m.album(), m.artist())
    }

    pub fn lyrics_summary(&self) -> String {
        match (&self.lyrics, self.synced_lines()) {
            (None, _) => "no lyrics".to_string(),
            (Some(_), Some(lines)) => format!("synced lyrics, {} lines", lines.len()),
            (Some(text), None) => format!("plain lyrics, {} lines", text.lines().count()),
        }
    }
}
