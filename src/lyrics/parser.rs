//! LRC line parser
//!
//! Parses synchronized lyrics in the LRCLIB flavour of LRC:
//! [mm:ss.xx] Lyrics line here
//!
//! Example:
//! [00:12.34] Hello world
//! [00:15.00] Another line

/// Lines are shown this many seconds before their timestamp.
const DISPLAY_LEAD_SECS: f64 = 1.0;

/// Text used for instrumental gaps (timestamp with no words).
const GAP_TEXT: &str = "...";

/// Length of the `[mm:ss.xx]` tag.
const TAG_LEN: usize = 10;

/// A single line of lyrics with timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    /// Display time in seconds from start (already shifted by the display lead)
    pub time: f64,
    /// The lyrics text
    pub text: String,
}

impl LyricLine {
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }
}

/// Parse LRC formatted lyrics into timed lines.
///
/// Blank lines and lines that are not of the exact form `[mm:ss.xx] text`
/// are dropped. Input order is preserved.
pub fn parse_lyrics(content: &str) -> Vec<LyricLine> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_timed_line)
        .collect()
}

/// True if a `[mm:ss.xx]` tag appears anywhere in the text.
pub fn is_synced_lyrics(content: &str) -> bool {
    content.as_bytes().windows(TAG_LEN).any(is_timestamp_tag)
}

/// Parse a line like `[00:12.34] Lyrics`.
///
/// The tag must open the line and be followed by exactly one space.
fn parse_timed_line(line: &str) -> Option<LyricLine> {
    let bytes = line.as_bytes();
    if bytes.len() <= TAG_LEN || !is_timestamp_tag(&bytes[..TAG_LEN]) || bytes[TAG_LEN] != b' ' {
        return None;
    }

    // The tag is pure ASCII, so these slices sit on char boundaries.
    let minutes: u32 = line[1..3].parse().ok()?;
    let seconds: f64 = line[4..9].parse().ok()?;
    let rest = &line[TAG_LEN + 1..];

    // Captured text never spans a line terminator.
    if rest.contains(['\r', '\u{2028}', '\u{2029}']) {
        return None;
    }

    let text = match rest.trim() {
        "" => GAP_TEXT,
        t => t,
    };

    Some(LyricLine::new(
        f64::from(minutes) * 60.0 + seconds - DISPLAY_LEAD_SECS,
        text,
    ))
}

/// Check for `[dd:dd.dd]` at the start of `tag`.
fn is_timestamp_tag(tag: &[u8]) -> bool {
    tag.len() >= TAG_LEN
        && tag[0] == b'['
        && tag[1].is_ascii_digit()
        && tag[2].is_ascii_digit()
        && tag[3] == b':'
        && tag[4].is_ascii_digit()
        && tag[5].is_ascii_digit()
        && tag[6] == b'.'
        && tag[7].is_ascii_digit()
        && tag[8].is_ascii_digit()
        && tag[9] == b']'
}
