//! LRC parsing and rendering

use super::{LyricLine, Lyrics, SyncType};

impl Lyrics {
    /// Parse provider text
    ///
    /// Lines starting with `[mm:ss.xx]` are read as synced; if any line has a
    /// timestamp the result is [`SyncType::LineSynced`] and untimed lines are
    /// dropped. Metadata tags such as `[ar:...]` are ignored.
    pub fn parse(source: impl Into<String>, text: &str) -> Self {
        let mut synced = Vec::new();
        let mut plain = Vec::new();

        for raw in text.lines() {
            let line = raw.trim_end();
            match split_timestamp(line) {
                Some((start_ms, rest)) => synced.push(LyricLine {
                    start_ms: Some(start_ms),
                    text: rest.trim().to_string(),
                }),
                None if is_metadata_tag(line) => {}
                None => plain.push(LyricLine {
                    start_ms: None,
                    text: line.trim().to_string(),
                }),
            }
        }

        let (sync_type, lines) = if synced.is_empty() {
            (SyncType::Unsynced, plain)
        } else {
            (SyncType::LineSynced, synced)
        };

        Self {
            source: source.into(),
            sync_type,
            lines,
        }
    }

    /// Render as LRC with title and artist headers
    ///
    /// Unsynced lyrics are written without timestamps.
    pub fn to_lrc(&self, title: &str, artist: &str) -> String {
        let mut out = format!("[ti:{title}]\n[ar:{artist}]\n[by:{}]\n\n", self.source);

        for line in &self.lines {
            match (self.sync_type, line.start_ms) {
                (SyncType::LineSynced, Some(ms)) => {
                    out.push_str(&format_timestamp(ms));
                    out.push_str(&line.text);
                }
                _ => out.push_str(&line.text),
            }
            out.push('\n');
        }

        out
    }
}

/// `[mm:ss.xx]` for a millisecond offset
fn format_timestamp(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let centis = (ms % 1000) / 10;
    format!("[{minutes:02}:{seconds:02}.{centis:02}]")
}

/// Split a leading `[mm:ss.xx]` / `[mm:ss.xxx]` / `[mm:ss]` timestamp
fn split_timestamp(line: &str) -> Option<(u64, &str)> {
    let inner_end = line.find(']')?;
    let inner = line.strip_prefix('[')?.get(..inner_end - 1)?;
    let (minutes, rest) = inner.split_once(':')?;
    let minutes: u64 = minutes.parse().ok()?;

    let (seconds, fraction) = match rest.split_once('.') {
        Some((s, f)) => (s, f),
        None => (rest, ""),
    };
    let seconds: u64 = seconds.parse().ok()?;
    if seconds >= 60 {
        return None;
    }

    let fraction_ms = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u64>().ok()? * 100,
        2 => fraction.parse::<u64>().ok()? * 10,
        3 => fraction.parse::<u64>().ok()?,
        _ => return None,
    };

    Some((
        minutes * 60_000 + seconds * 1000 + fraction_ms,
        &line[inner_end + 1..],
    ))
}

fn is_metadata_tag(line: &str) -> bool {
    line.starts_with('[')
        && line.ends_with(']')
        && line[1..].split_once(':').is_some_and(|(key, _)| {
            !key.is_empty() && key.chars().all(|c| c.is_ascii_alphabetic())
        })
}
