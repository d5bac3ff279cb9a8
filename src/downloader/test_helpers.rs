//! Shared test doubles and a builder for LosslessDownloader instances in tests.

use crate::backend::{EXISTS_MARKER, FetchByIsrc, FetchByReferenceId, FetchParams, FetchResult};
use crate::config::Config;
use crate::db::HistoryStore;
use crate::downloader::{Backends, Collaborators, LosslessDownloader};
use crate::error::{BackendError, DatabaseError, Error, Result};
use crate::identity::{CrossCatalogResolver, MetadataProvider};
use crate::lyrics::{LyricLine, Lyrics, LyricsProvider, LyricsQuery, SyncType};
use crate::planner::FilenameFormat;
use crate::types::{DownloadPreferences, HistoryItem, Isrc, ReferenceId, TrackIdentity};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{TempDir, tempdir};

/// Reference ID used by every sample identity
pub(crate) const SAMPLE_ID: &str = "4cOdK2wGLETKBW3PvgPWqT";

/// Size written by file-writing back-ends; comfortably above the 100 KiB threshold
pub(crate) const FULL_FILE_BYTES: usize = 200 * 1024;

/// What a fake back-end does when called
#[derive(Clone, Debug)]
enum Behavior {
    /// Report the target as downloaded without touching the disk
    Succeed,
    /// Write `bytes` to the target (optionally with another extension)
    Write {
        bytes: usize,
        extension: Option<&'static str>,
    },
    /// Report the target through the `EXISTS:` marker
    ReportExisting,
    /// Fail without leaving anything
    Fail(BackendError),
    /// Write `bytes` to the target, then fail naming it as partial
    PartialThenFail { bytes: usize },
    /// Write `bytes` to the target, then fail without naming any partial file
    WriteThenFail { bytes: usize },
    /// Write [`minimal_flac`] to the target
    WriteFlac,
}

impl Behavior {
    async fn run(&self, params: &FetchParams) -> std::result::Result<FetchResult, BackendError> {
        match self {
            Behavior::Succeed => Ok(FetchResult::Downloaded(params.target.clone())),
            Behavior::Write { bytes, extension } => {
                let path = match extension {
                    Some(ext) => params.target.with_extension(ext),
                    None => params.target.clone(),
                };
                write_bytes(&path, *bytes).await?;
                Ok(FetchResult::Downloaded(path))
            }
            Behavior::ReportExisting => Ok(FetchResult::from_marked_path(&format!(
                "{EXISTS_MARKER}{}",
                params.target.display()
            ))),
            Behavior::Fail(e) => Err(e.clone()),
            Behavior::PartialThenFail { bytes } => {
                write_bytes(&params.target, *bytes).await?;
                Err(BackendError::with_partial(
                    "stream interrupted",
                    params.target.clone(),
                ))
            }
            Behavior::WriteFlac => {
                tokio::fs::create_dir_all(&params.output_dir)
                    .await
                    .map_err(|e| BackendError::new(e.to_string()))?;
                tokio::fs::write(&params.target, minimal_flac())
                    .await
                    .map_err(|e| BackendError::new(e.to_string()))?;
                Ok(FetchResult::Downloaded(params.target.clone()))
            }
            Behavior::WriteThenFail { bytes } => {
                write_bytes(&params.target, *bytes).await?;
                Err(BackendError::new("stream interrupted"))
            }
        }
    }
}

/// A FLAC stream with no audio frames: the marker, a STREAMINFO block
/// (44.1 kHz, stereo, 16-bit) and a final PADDING block
///
/// Tag readers and writers accept it, which the zero-filled placeholders
/// are not.
pub(crate) fn minimal_flac() -> Vec<u8> {
    let mut bytes = b"fLaC".to_vec();

    // STREAMINFO, not last, 34 bytes
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 34]);
    bytes.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]); // block sizes 4096
    bytes.extend_from_slice(&[0; 6]); // frame sizes unknown
    bytes.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x00, 0x00, 0x00]);
    bytes.extend_from_slice(&[0; 16]); // MD5

    // PADDING, last, 64 bytes
    bytes.extend_from_slice(&[0x81, 0x00, 0x00, 64]);
    bytes.extend_from_slice(&[0; 64]);

    bytes
}

async fn write_bytes(path: &Path, bytes: usize) -> std::result::Result<(), BackendError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BackendError::new(e.to_string()))?;
    }
    tokio::fs::write(path, vec![0u8; bytes])
        .await
        .map_err(|e| BackendError::new(e.to_string()))
}

/// Fake by-reference back-end that records its calls
pub(crate) struct RecordingReferenceBackend {
    name: &'static str,
    behavior: Behavior,
    calls: AtomicUsize,
    last_params: Mutex<Option<FetchParams>>,
}

impl RecordingReferenceBackend {
    fn with_behavior(name: &'static str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior,
            calls: AtomicUsize::new(0),
            last_params: Mutex::new(None),
        })
    }

    /// Succeeds without writing anything
    pub(crate) fn succeeding(name: &'static str) -> Arc<Self> {
        Self::with_behavior(name, Behavior::Succeed)
    }

    /// Fails with `error`
    pub(crate) fn failing(name: &'static str, error: BackendError) -> Arc<Self> {
        Self::with_behavior(name, Behavior::Fail(error))
    }

    /// Writes a full-size file at the target
    pub(crate) fn writing(name: &'static str) -> Arc<Self> {
        Self::with_behavior(
            name,
            Behavior::Write {
                bytes: FULL_FILE_BYTES,
                extension: None,
            },
        )
    }

    /// Writes a full-size file next to the target with another extension
    pub(crate) fn writing_as(name: &'static str, extension: &'static str) -> Arc<Self> {
        Self::with_behavior(
            name,
            Behavior::Write {
                bytes: FULL_FILE_BYTES,
                extension: Some(extension),
            },
        )
    }

    /// Writes a small but well-formed FLAC stream at the target
    pub(crate) fn writing_flac(name: &'static str) -> Arc<Self> {
        Self::with_behavior(name, Behavior::WriteFlac)
    }

    /// Answers with an `EXISTS:`-marked path
    pub(crate) fn reporting_existing(name: &'static str) -> Arc<Self> {
        Self::with_behavior(name, Behavior::ReportExisting)
    }

    /// Writes `bytes` at the target, then fails
    pub(crate) fn partial_then_failing(name: &'static str, bytes: usize) -> Arc<Self> {
        Self::with_behavior(name, Behavior::PartialThenFail { bytes })
    }

    /// Writes `bytes` at the target, then fails without reporting it
    pub(crate) fn writing_then_failing(name: &'static str, bytes: usize) -> Arc<Self> {
        Self::with_behavior(name, Behavior::WriteThenFail { bytes })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_params(&self) -> Option<FetchParams> {
        self.last_params.lock().unwrap().clone()
    }
}

#[async_trait]
impl FetchByReferenceId for RecordingReferenceBackend {
    async fn fetch(
        &self,
        _reference_id: &ReferenceId,
        params: &FetchParams,
    ) -> std::result::Result<FetchResult, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params.clone());
        self.behavior.run(params).await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Fake by-ISRC back-end that records its calls
pub(crate) struct RecordingIsrcBackend {
    behavior: Behavior,
    calls: AtomicUsize,
    last_isrc: Mutex<Option<Isrc>>,
}

impl RecordingIsrcBackend {
    fn with_behavior(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_isrc: Mutex::new(None),
        })
    }

    /// Succeeds without writing anything
    pub(crate) fn succeeding() -> Arc<Self> {
        Self::with_behavior(Behavior::Succeed)
    }

    /// Writes a full-size file at the target
    pub(crate) fn writing() -> Arc<Self> {
        Self::with_behavior(Behavior::Write {
            bytes: FULL_FILE_BYTES,
            extension: None,
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_isrc(&self) -> Option<Isrc> {
        self.last_isrc.lock().unwrap().clone()
    }
}

#[async_trait]
impl FetchByIsrc for RecordingIsrcBackend {
    async fn fetch(
        &self,
        isrc: &Isrc,
        params: &FetchParams,
    ) -> std::result::Result<FetchResult, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_isrc.lock().unwrap() = Some(isrc.clone());
        self.behavior.run(params).await
    }

    fn name(&self) -> &'static str {
        "qobuz"
    }
}

/// Catalog that always resolves to the same ISRC
pub(crate) struct StaticCatalog {
    isrc: &'static str,
}

impl StaticCatalog {
    pub(crate) fn new(isrc: &'static str) -> Self {
        Self { isrc }
    }
}

#[async_trait]
impl CrossCatalogResolver for StaticCatalog {
    async fn secondary_url(&self, _reference_id: &ReferenceId) -> Result<String> {
        Ok("https://www.deezer.com/track/3135556".to_string())
    }

    async fn isrc_for_url(&self, _url: &str) -> Result<String> {
        Ok(self.isrc.to_string())
    }
}

/// Catalog with no match for anything
pub(crate) struct FailingCatalog;

#[async_trait]
impl CrossCatalogResolver for FailingCatalog {
    async fn secondary_url(&self, reference_id: &ReferenceId) -> Result<String> {
        Err(Error::Metadata(format!("no secondary link for {reference_id}")))
    }

    async fn isrc_for_url(&self, url: &str) -> Result<String> {
        Err(Error::Metadata(format!("no ISRC for {url}")))
    }
}

/// Lyrics source with a fixed answer
pub(crate) struct StaticLyrics {
    answer: Option<Lyrics>,
    calls: AtomicUsize,
}

impl StaticLyrics {
    /// Always has `text`
    pub(crate) fn found(text: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(Lyrics {
                source: "static".to_string(),
                sync_type: SyncType::Unsynced,
                lines: vec![LyricLine {
                    start_ms: None,
                    text: text.to_string(),
                }],
            }),
            calls: AtomicUsize::new(0),
        })
    }

    /// Never has anything
    pub(crate) fn none() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LyricsProvider for StaticLyrics {
    async fn fetch(&self, _query: &LyricsQuery) -> Result<Option<Lyrics>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// In-memory history sink, optionally slow
#[derive(Default)]
pub(crate) struct RecordingHistory {
    items: Mutex<Vec<HistoryItem>>,
    delay: Option<Duration>,
}

impl RecordingHistory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sleeps for `delay` before recording
    pub(crate) fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    pub(crate) fn items(&self) -> Vec<HistoryItem> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryStore for RecordingHistory {
    async fn append(&self, item: &HistoryItem) -> Result<i64> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut items = self.items.lock().unwrap();
        items.push(item.clone());
        Ok(items.len() as i64)
    }
}

/// History sink whose store is unavailable
pub(crate) struct FailingHistory;

#[async_trait]
impl HistoryStore for FailingHistory {
    async fn append(&self, _item: &HistoryItem) -> Result<i64> {
        Err(Error::Database(DatabaseError::QueryFailed(
            "disk I/O error".to_string(),
        )))
    }
}

/// Metadata source that knows one track
pub(crate) struct StaticMetadata(pub(crate) Option<TrackIdentity>);

#[async_trait]
impl MetadataProvider for StaticMetadata {
    async fn track(&self, reference_id: &ReferenceId) -> Result<TrackIdentity> {
        self.0
            .clone()
            .filter(|identity| &identity.reference_id == reference_id)
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("track {reference_id} not found"),
                ))
            })
    }
}

/// The identity used throughout the tests
pub(crate) fn sample_identity() -> TrackIdentity {
    let mut identity = TrackIdentity::new(SAMPLE_ID.parse().unwrap(), "Song", "Band");
    identity.album = "Album".to_string();
    identity.album_artist = "Band".to_string();
    identity.release_date = "2019-03-01".to_string();
    identity.disc_number = 1;
    identity.track_number = 3;
    identity.total_discs = 1;
    identity.total_tracks = 10;
    identity
}

/// Fetch parameters for [`sample_identity`] targeting `target`
pub(crate) fn sample_params(target: PathBuf) -> FetchParams {
    let identity = sample_identity();
    let reference_url = identity.reference_id.canonical_url();
    FetchParams {
        identity,
        output_dir: target.parent().map(Path::to_path_buf).unwrap_or_default(),
        target,
        quality: "LOSSLESS".to_string(),
        filename_format: FilenameFormat::default(),
        track_number: false,
        position: 0,
        use_album_track_number: false,
        embed_max_quality_cover: false,
        api_url: None,
        reference_url,
    }
}

/// Collaborators for a test downloader; override the fields a test cares about
pub(crate) struct TestSetup {
    pub(crate) tidal: Arc<RecordingReferenceBackend>,
    pub(crate) qobuz: Arc<RecordingIsrcBackend>,
    pub(crate) amazon: Arc<RecordingReferenceBackend>,
    pub(crate) catalog: Arc<dyn CrossCatalogResolver>,
    pub(crate) lyrics: Arc<dyn LyricsProvider>,
    pub(crate) history: Arc<dyn HistoryStore>,
    pub(crate) drain_timeout: Duration,
}

impl Default for TestSetup {
    fn default() -> Self {
        Self {
            tidal: RecordingReferenceBackend::writing("tidal"),
            qobuz: RecordingIsrcBackend::writing(),
            amazon: RecordingReferenceBackend::writing("amazon"),
            catalog: Arc::new(StaticCatalog::new("USRC17607839")),
            lyrics: StaticLyrics::none(),
            history: RecordingHistory::new(),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

/// Helper to create a test LosslessDownloader writing under a temp directory.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(setup: TestSetup) -> (LosslessDownloader, TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.download.output_dir = temp_dir.path().join("music");
    config.persistence.database_path = temp_dir.path().join("test.db");
    config.side_effects.drain_timeout = setup.drain_timeout;

    let collaborators = Collaborators {
        backends: Backends {
            tidal: setup.tidal,
            qobuz: setup.qobuz,
            amazon: setup.amazon,
        },
        catalog: setup.catalog,
        lyrics: setup.lyrics,
        history: setup.history,
    };

    (
        LosslessDownloader::with_collaborators(config, collaborators),
        temp_dir,
    )
}

/// Preferences writing under `temp_dir` through `service`
pub(crate) fn test_preferences(temp_dir: &TempDir, service: &str) -> DownloadPreferences {
    DownloadPreferences {
        service: service.to_string(),
        output_dir: temp_dir.path().join("music"),
        ..DownloadPreferences::default()
    }
}
