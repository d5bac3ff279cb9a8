//! Writing lyrics into audio file tags

use crate::error::{Error, Result};
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag, TagExt};
use std::path::{Path, PathBuf};

/// Store `lyrics` in the file's primary tag, leaving the audio untouched
///
/// Runs on the blocking pool. A tag is created if the file has none.
///
/// # Errors
///
/// Returns [`Error::Tag`] if the file cannot be read or written as audio.
pub async fn embed_lyrics(path: &Path, lyrics: &str) -> Result<()> {
    let path = path.to_path_buf();
    let lyrics = lyrics.to_string();

    tokio::task::spawn_blocking(move || write_lyrics(&path, lyrics))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

/// Lyrics currently stored in the file's primary tag
///
/// # Errors
///
/// Returns [`Error::Tag`] if the file cannot be read as audio.
pub async fn read_embedded_lyrics(path: &Path) -> Result<Option<String>> {
    let path: PathBuf = path.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<Option<String>> {
        let tagged_file = Probe::open(&path)?.read()?;
        Ok(tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
            .and_then(|tag| tag.get_string(&ItemKey::Lyrics))
            .map(str::to_string))
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

fn write_lyrics(path: &Path, lyrics: String) -> Result<()> {
    let mut tagged_file = Probe::open(path)?.read()?;
    let tag_type = tagged_file.primary_tag_type();

    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }

    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| Error::Metadata(format!("no writable tag in {}", path.display())))?;

    tag.insert_text(ItemKey::Lyrics, lyrics);
    tag.save_to_path(path, WriteOptions::default())?;

    tracing::debug!(path = %path.display(), "lyrics written to tag");
    Ok(())
}
