mod app;
mod bridge;
mod config;
mod input;
mod lyrics;
mod metadata;
mod presence;
mod storage;
mod util;

use anyhow::Context;
use bridge::{MessageBridge, SocketBridge};
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "wisp", version, about = "Now-playing helpers: metadata, lyrics and presence")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Follow file paths on stdin and keep metadata, lyrics and presence current (default).
    Watch,
    /// Search LRCLIB and print the best lyrics.
    Lyrics {
        query: String,
        /// Track length in seconds.
        #[arg(long)]
        duration: f64,
        /// List every matching candidate instead.
        #[arg(long)]
        list: bool,
    },
    /// Parse an LRC file and print its timed lines.
    Parse {
        path: std::path::PathBuf,
        /// Only print the line shown at this position (seconds).
        #[arg(long)]
        at: Option<f64>,
        /// Print times as seconds instead of M:SS.
        #[arg(long, conflicts_with = "at")]
        raw: bool,
    },
    /// Format seconds as M:SS.
    Time { seconds: f64 },
    /// Print the arguments in random order.
    Shuffle { items: Vec<String> },
    /// Ask the backend for a file's metadata.
    Metadata { file: String },
    /// Push presence for a file, or reset it to idle.
    Presence {
        file: Option<String>,
        #[arg(long, conflicts_with = "file")]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => {
            let bridge = connect(&cfg).await?;
            let lyrics = make_lyrics(&cfg)?;
            let mut app = app::App::new(cfg, bridge, lyrics);
            app.run(tokio::io::BufReader::new(tokio::io::stdin())).await?;
        }
        Command::Lyrics {
            query,
            duration,
            list,
        } => {
            if list {
                let client = lyrics::LrclibClient::new(&cfg.lyrics)?;
                let results = client.search(&query).await?;
                let tolerance = cfg.lyrics.duration_tolerance_secs;
                for r in lyrics::lrclib::matched_songs(&results, duration, tolerance) {
                    print_candidate(r);
                }
            } else {
                match make_lyrics(&cfg)?.fetch(&query, duration).await {
                    Some(text) => println!("{text}"),
                    None => println!("No lyrics found."),
                }
            }
        }
        Command::Parse { path, at, raw } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            if !lyrics::is_synced_lyrics(&text) {
                println!("{} has no timed lines.", path.display());
                return Ok(());
            }
            match at {
                Some(position) => {
                    let state = app::state::TrackState {
                        lyrics: Some(text),
                        ..Default::default()
                    };
                    if let Some(line) = state.line_at(position) {
                        println!("{}", line.text);
                    }
                }
                None => {
                    for line in lyrics::parse_lyrics(&text) {
                        println!("{}", format_line(&line, raw));
                    }
                }
            }
        }
        Command::Time { seconds } => println!("{}", util::convert_time(seconds)),
        Command::Shuffle { items } => {
            for item in util::shuffle(&items) {
                println!("{item}");
            }
        }
        Command::Metadata { file } => {
            let bridge = connect(&cfg).await?;
            let response = metadata::fetch_metadata(bridge.as_ref(), &file).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Presence { file, reset } => {
            let bridge = connect(&cfg).await?;
            match file {
                Some(file) if !reset => {
                    let response = metadata::fetch_metadata(bridge.as_ref(), &file).await?;
                    presence::update_discord_state(bridge.as_ref(), response.metadata.as_ref())
                        .await;
                }
                _ => presence::reset_discord_state(bridge.as_ref()).await,
            }
        }
    }

    Ok(())
}

async fn connect(cfg: &config::Config) -> anyhow::Result<Arc<dyn MessageBridge>> {
    let bridge = SocketBridge::connect(&cfg.bridge.socket_path)
        .await
        .context("connect to backend")?;
    Ok(Arc::new(bridge))
}

fn make_lyrics(cfg: &config::Config) -> anyhow::Result<lyrics::LyricsFetcher> {
    let cache = storage::StorageHandle::new(cfg.cache_path());
    lyrics::LyricsFetcher::new(&cfg.lyrics, Some(cache))
}

fn print_candidate(r: &lyrics::lrclib::LrclibResponse) {
    let kind = if r.has_synced() { "synced" } else { "plain" };
    let album = r
        .album_name
        .as_deref()
        .map(|a| format!(" ({a})"))
        .unwrap_or_default();
    println!(
        "#{} {} - {}{}  [{}] {}",
        r.id.unwrap_or_default(),
        r.track_name.as_deref().unwrap_or("?"),
        r.artist_name.as_deref().unwrap_or("?"),
        album,
        r.duration.map(util::convert_time).unwrap_or_default(),
        kind
    );
}

fn format_line(line: &lyrics::LyricLine, raw: bool) -> String {
    if raw {
        format!("{:>8.2}  {}", line.time, line.text)
    } else {
        format!("{:>6}  {}", util::convert_time(line.time), line.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        let lines = lyrics::parse_lyrics("[01:05.50] Chorus\n[00:00.50] ");
        assert_eq!(format_line(&lines[0], false), "  1:05  Chorus");
        assert_eq!(format_line(&lines[0], true), "   64.50  Chorus");
        assert_eq!(format_line(&lines[1], true), "   -0.50  ...");
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from(["wisp", "parse", "song.lrc", "--raw"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Parse { raw: true, at: None, .. })));
        assert!(Cli::try_parse_from(["wisp", "parse", "song.lrc", "--raw", "--at", "3"]).is_err());
    }
}
