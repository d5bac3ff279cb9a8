//! Per-request execution: plan, skip, dispatch, clean up.

use super::LosslessDownloader;
use super::side_effects::SideEffectJob;
use crate::backend::{BackendKind, Dispatched, FetchParams, Quality, ServiceSelection};
use crate::error::{Error, Result};
use crate::identity::MetadataProvider;
use crate::planner;
use crate::types::{
    DownloadOutcome, DownloadPreferences, DownloadRequest, DownloadState, Event, ReferenceId,
};
use std::path::Path;
use tracing::{debug, info, warn};

impl LosslessDownloader {
    /// Download one track
    ///
    /// Runs the request through its states:
    /// 1. The back-end name is parsed (`auto` goes through the selection policy)
    /// 2. The output path is planned; a plausible file already there ends the
    ///    request as skipped without contacting any back-end
    /// 3. The selected back-end is called (ISRC resolved first where needed)
    /// 4. On failure, partial files are removed
    /// 5. On a fresh download, lyrics and history tasks are started in the
    ///    background
    ///
    /// Always returns exactly one outcome; errors are reported in it rather
    /// than returned.
    pub async fn execute(&self, request: DownloadRequest) -> DownloadOutcome {
        let DownloadRequest {
            identity,
            preferences,
        } = request;
        let reference_id = identity.reference_id.clone();

        let kind = match preferences.service.parse::<ServiceSelection>() {
            Ok(selection) => self.policy.select(selection),
            Err(e) => return self.fail(&reference_id, e, None),
        };

        let target = planner::plan(&identity, &preferences);
        self.transition(&reference_id, DownloadState::Planned);
        self.emit_event(Event::Planned {
            reference_id: reference_id.clone(),
            path: target.clone(),
        });

        match self.plausible_file_exists(&target).await {
            Ok(true) => {
                self.transition(&reference_id, DownloadState::Skipped);
                info!(
                    reference_id = %reference_id,
                    path = %target.display(),
                    "File already exists, skipping"
                );
                self.emit_event(Event::Skipped {
                    reference_id,
                    path: target.clone(),
                });
                return DownloadOutcome::skipped(target);
            }
            Ok(false) => {}
            Err(e) => return self.fail(&reference_id, e, None),
        }

        let quality = Quality::resolve(
            kind,
            preferences.quality.as_deref(),
            self.config.backends.default_quality(kind),
        );

        let params = FetchParams {
            identity,
            output_dir: target
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| preferences.output_dir.clone()),
            target: target.clone(),
            quality: quality.as_str().to_string(),
            filename_format: preferences.filename_format,
            track_number: preferences.track_number,
            position: preferences.position,
            use_album_track_number: preferences.use_album_track_number,
            embed_max_quality_cover: preferences.embed_max_quality_cover,
            api_url: preferences.api_url.clone(),
            reference_url: reference_id.canonical_url(),
        };

        self.transition(&reference_id, DownloadState::Dispatching);
        info!(reference_id = %reference_id, backend = %kind, quality = %quality, "Dispatching download");
        self.emit_event(Event::Dispatching {
            reference_id: reference_id.clone(),
            backend: kind,
        });

        match self.registry.dispatch(kind, params).await {
            Ok(Dispatched { result, identity }) => {
                let already_exists = result.already_existed();
                let path = result.path().to_path_buf();

                self.transition(&reference_id, DownloadState::Succeeded);
                info!(
                    reference_id = %reference_id,
                    backend = %kind,
                    path = %path.display(),
                    already_exists,
                    "Download succeeded"
                );
                self.emit_event(Event::Downloaded {
                    reference_id,
                    path: path.clone(),
                    already_exists,
                });

                if already_exists {
                    return DownloadOutcome::existing_on_backend(path, kind);
                }

                let outcome = DownloadOutcome::downloaded(path, kind);
                self.side_effects.fire(
                    &outcome,
                    SideEffectJob {
                        identity,
                        preferences,
                        backend: kind,
                        quality: quality.as_str().to_string(),
                    },
                );
                outcome
            }
            Err(e) => {
                self.cleanup_after_failure(&e, &target).await;
                self.fail(&reference_id, e, Some(kind))
            }
        }
    }

    /// Download a track given only its reference URL or ID
    ///
    /// Metadata comes from `provider`. An unparseable reference or a metadata
    /// failure produces a failed outcome without any download attempt.
    pub async fn execute_reference(
        &self,
        input: &str,
        preferences: DownloadPreferences,
        provider: &dyn MetadataProvider,
    ) -> DownloadOutcome {
        let reference_id = match ReferenceId::parse(input) {
            Ok(id) => id,
            Err(e) => {
                warn!(input = %input, error = %e, "Invalid track reference");
                return DownloadOutcome::failed(&e, None);
            }
        };

        let identity = match provider.track(&reference_id).await {
            Ok(identity) => identity,
            Err(e) => {
                let e = match e {
                    Error::Metadata(_) => e,
                    other => Error::Metadata(other.to_string()),
                };
                return self.fail(&reference_id, e, None);
            }
        };

        self.execute(DownloadRequest::new(identity, preferences))
            .await
    }

    /// Whether `path` holds a file larger than the plausibility threshold
    ///
    /// A missing file is `false`; any other metadata error is returned.
    async fn plausible_file_exists(&self, path: &Path) -> Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => {
                Ok(meta.is_file() && meta.len() > self.config.download.min_existing_size_bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Remove what a failed back-end left behind
    ///
    /// The partial file the back-end reported is removed, and so is any file
    /// at the planned path: nothing plausible was there before dispatch, so
    /// whatever is there now came from the failed attempt, however large.
    /// Problems are logged and never replace the original error.
    async fn cleanup_after_failure(&self, error: &Error, target: &Path) {
        let Error::Backend(backend_error) = error else {
            return;
        };

        if let Some(partial) = &backend_error.partial_path {
            remove_quietly(partial).await;
        }

        match tokio::fs::metadata(target).await {
            Ok(meta) if meta.is_file() => remove_quietly(target).await,
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %target.display(), error = %e, "Could not inspect planned path after failure");
            }
        }
    }

    /// Build the failed outcome, logging and publishing the failure
    fn fail(
        &self,
        reference_id: &ReferenceId,
        error: Error,
        backend: Option<BackendKind>,
    ) -> DownloadOutcome {
        self.transition(reference_id, DownloadState::Failed);
        if error.is_short_circuit() {
            warn!(reference_id = %reference_id, error = %error, "Download rejected");
        } else {
            warn!(reference_id = %reference_id, backend = ?backend, error = %error, "Download failed");
        }

        self.emit_event(Event::Failed {
            reference_id: reference_id.clone(),
            kind: error.kind(),
            error: error.to_string(),
        });

        DownloadOutcome::failed(&error, backend)
    }

    fn transition(&self, reference_id: &ReferenceId, state: DownloadState) {
        debug!(reference_id = %reference_id, state = ?state, "State transition");
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial file"),
    }
}
