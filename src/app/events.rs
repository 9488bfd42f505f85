use crate::metadata::MetadataResponse;

#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    Track(TrackEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A new file was selected; empty means nothing is loaded.
    FileChanged(String),
    Closed,
}

/// Results of a background track load, tagged with the request generation.
#[derive(Debug, Clone)]
pub enum TrackEvent {
    Loaded { generation: u64, response: MetadataResponse },
    LyricsLoaded { generation: u64, lyrics: Option<String> },
    Failed { generation: u64, message: String },
}

impl TrackEvent {
    pub fn generation(&self) -> u64 {
        match self {
            TrackEvent::Loaded { generation, .. }
            | TrackEvent::LyricsLoaded { generation, .. }
            | TrackEvent::Failed { generation, .. } => *generation,
        }
    }
}
