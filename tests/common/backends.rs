//! Fake download back-ends that write placeholder files

use async_trait::async_trait;
use lossless_dl::{
    BackendError, Backends, FetchByIsrc, FetchByReferenceId, FetchParams, FetchResult, Isrc,
    ReferenceId,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Bytes written per fake download (above the default 100 KiB threshold)
pub const FAKE_FILE_BYTES: usize = 256 * 1024;

async fn write_placeholder(path: &Path) -> Result<(), BackendError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BackendError::new(format!("create {}: {e}", parent.display())))?;
    }
    tokio::fs::write(path, vec![0u8; FAKE_FILE_BYTES])
        .await
        .map_err(|e| BackendError::with_partial(e.to_string(), path))
}

/// A FLAC stream with no audio frames: marker, STREAMINFO and a final PADDING block
pub fn minimal_flac() -> Vec<u8> {
    let mut bytes = b"fLaC".to_vec();
    bytes.extend_from_slice(&[0x00, 0x00, 0x00, 34]);
    bytes.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]);
    bytes.extend_from_slice(&[0; 6]);
    bytes.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x00, 0x00, 0x00]);
    bytes.extend_from_slice(&[0; 16]);
    bytes.extend_from_slice(&[0x81, 0x00, 0x00, 64]);
    bytes.extend_from_slice(&[0; 64]);
    bytes
}

/// By-reference back-end writing a placeholder at the planned path
#[derive(Default)]
pub struct FileWritingBackend {
    calls: AtomicUsize,
    flac: bool,
}

impl FileWritingBackend {
    /// Writes [`minimal_flac`] instead of zeros, so tags can be written
    pub fn flac() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            flac: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchByReferenceId for FileWritingBackend {
    async fn fetch(
        &self,
        _reference_id: &ReferenceId,
        params: &FetchParams,
    ) -> Result<FetchResult, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.flac {
            tokio::fs::create_dir_all(&params.output_dir)
                .await
                .map_err(|e| BackendError::new(e.to_string()))?;
            tokio::fs::write(&params.target, minimal_flac())
                .await
                .map_err(|e| BackendError::with_partial(e.to_string(), &params.target))?;
        } else {
            write_placeholder(&params.target).await?;
        }
        Ok(FetchResult::Downloaded(params.target.clone()))
    }

    fn name(&self) -> &'static str {
        "file-writing"
    }
}

/// By-ISRC back-end writing a placeholder and remembering the ISRCs it saw
#[derive(Default)]
pub struct IsrcRecordingBackend {
    seen: Mutex<Vec<Isrc>>,
}

impl IsrcRecordingBackend {
    pub fn seen(&self) -> Vec<Isrc> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl FetchByIsrc for IsrcRecordingBackend {
    async fn fetch(&self, isrc: &Isrc, params: &FetchParams) -> Result<FetchResult, BackendError> {
        self.seen.lock().unwrap().push(isrc.clone());
        write_placeholder(&params.target).await?;
        Ok(FetchResult::Downloaded(params.target.clone()))
    }

    fn name(&self) -> &'static str {
        "isrc-recording"
    }
}

/// Fake back-ends plus handles to inspect them
pub struct FakeBackends {
    pub tidal: Arc<FileWritingBackend>,
    pub qobuz: Arc<IsrcRecordingBackend>,
    pub amazon: Arc<FileWritingBackend>,
}

impl FakeBackends {
    pub fn new() -> Self {
        Self {
            tidal: Arc::new(FileWritingBackend::default()),
            qobuz: Arc::new(IsrcRecordingBackend::default()),
            amazon: Arc::new(FileWritingBackend::default()),
        }
    }

    /// Like [`new`](Self::new), but Tidal writes real FLAC streams
    pub fn with_flac_tidal() -> Self {
        Self {
            tidal: Arc::new(FileWritingBackend::flac()),
            ..Self::new()
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            tidal: self.tidal.clone(),
            qobuz: self.qobuz.clone(),
            amazon: self.amazon.clone(),
        }
    }
}
