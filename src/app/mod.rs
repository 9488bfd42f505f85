pub mod events;
pub mod state;

use crate::bridge::MessageBridge;
use crate::config::Config;
use crate::input;
use crate::lyrics::LyricsFetcher;
use crate::metadata::fetch_metadata;
use crate::presence;
use events::{Event, InputEvent, TrackEvent};
use state::TrackState;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;

/// What an applied event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    None,
    Track,
    Lyrics,
}

/// Owns the now-playing state and keeps it in sync with the selected file.
pub struct App {
    cfg: Config,
    bridge: Arc<dyn MessageBridge>,
    lyrics: LyricsFetcher,
    state: TrackState,
}

impl App {
    pub fn new(cfg: Config, bridge: Arc<dyn MessageBridge>, lyrics: LyricsFetcher) -> Self {
        Self {
            cfg,
            bridge,
            lyrics,
            state: TrackState::default(),
        }
    }

    /// Read file paths from `reader` and follow them until it closes and
    /// every load it started has reported back.
    pub async fn run<R>(&mut self, reader: R) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Event>(64);
        input::spawn_input_task(tx.clone(), reader);
        let mut tx = Some(tx);

        // Ends once the input task and every spawned load have dropped their senders.
        while let Some(ev) = rx.recv().await {
            match ev {
                Event::Input(InputEvent::FileChanged(file)) => {
                    if let Some(tx) = &tx {
                        self.on_file_changed(file, tx);
                    }
                }
                Event::Input(InputEvent::Closed) => tx = None,
                Event::Track(te) => {
                    if self.handle_track(te).await != Change::None {
                        self.render();
                    }
                }
            }
        }

        if self.cfg.presence.enabled {
            presence::reset_discord_state(self.bridge.as_ref()).await;
        }
        Ok(())
    }

    /// Start loading `file`. Results from earlier loads still in flight are
    /// dropped when they arrive.
    pub fn on_file_changed(&mut self, file: String, tx: &mpsc::Sender<Event>) {
        self.state.generation += 1;
        self.state.file = file.clone();
        tracing::debug!("loading {file:?} (generation {})", self.state.generation);

        tokio::spawn(load_track(
            self.bridge.clone(),
            self.lyrics.clone(),
            file,
            self.state.generation,
            tx.clone(),
        ));
    }

    /// Apply an event and push presence when the track changed.
    pub async fn handle_track(&mut self, ev: TrackEvent) -> Change {
        let change = self.apply(ev);
        if change == Change::Track && self.cfg.presence.enabled {
            match &self.state.metadata {
                Some(m) => presence::update_discord_state(self.bridge.as_ref(), Some(m)).await,
                None => presence::reset_discord_state(self.bridge.as_ref()).await,
            }
        }
        change
    }

    /// Fold a background result into the state.
    pub fn apply(&mut self, ev: TrackEvent) -> Change {
        if ev.generation() != self.state.generation {
            tracing::debug!(
                "dropping result of generation {} (current {})",
                ev.generation(),
                self.state.generation
            );
            return Change::None;
        }

        match ev {
            TrackEvent::Loaded { response, .. } => {
                self.state.metadata = response.metadata;
                self.state.cover = Some(response.art);
                self.state.favourite = response.favourite;
                self.state.lyrics = None;
                Change::Track
            }
            TrackEvent::LyricsLoaded { lyrics, .. } => {
                self.state.lyrics = lyrics;
                Change::Lyrics
            }
            TrackEvent::Failed { message, .. } => {
                tracing::warn!("Failed to fetch metadata: {message}");
                Change::None
            }
        }
    }

    fn render(&self) {
        println!("{}", self.state.status_line());
        if let Some(cover) = &self.state.cover {
            println!("  cover: {cover}");
        }
        println!("  {}", self.state.lyrics_summary());
    }
}

/// Fetch metadata, then lyrics, reporting each step back on `tx`.
pub async fn load_track(
    bridge: Arc<dyn MessageBridge>,
    lyrics: LyricsFetcher,
    file: String,
    generation: u64,
    tx: mpsc::Sender<Event>,
) {
    let response = match fetch_metadata(bridge.as_ref(), &file).await {
        Ok(r) => r,
        Err(e) => {
            let _ = tx
                .send(Event::Track(TrackEvent::Failed {
                    generation,
                    message: format!("{e:#}"),
                }))
                .await;
            return;
        }
    };

    // Without a duration no candidate can match, so skip the lookup.
    let lookup = response
        .metadata
        .as_ref()
        .and_then(|m| Some((m.lyrics_query(), m.duration()?)));

    if tx
        .send(Event::Track(TrackEvent::Loaded { generation, response }))
        .await
        .is_err()
    {
        return;
    }

    if let Some((query, duration)) = lookup {
        let found = lyrics.fetch(&query, duration).await;
        let _ = tx
            .send(Event::Track(TrackEvent::LyricsLoaded {
                generation,
                lyrics: found,
            }))
            .await;
    }
}
