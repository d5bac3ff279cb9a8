//! One capability per back-end, and the dispatch over them

use super::{BackendKind, FetchByIsrc, FetchByReferenceId, FetchParams, FetchResult};
use crate::error::{Error, Result};
use crate::identity::IdentityResolver;
use crate::types::TrackIdentity;
use std::sync::Arc;
use tracing::debug;

/// Result of a dispatch
#[derive(Clone, Debug)]
pub struct Dispatched {
    /// What the back-end produced
    pub result: FetchResult,
    /// Identity the back-end was called with (ISRC filled in for by-ISRC back-ends)
    pub identity: TrackIdentity,
}

/// The capabilities serving each [`BackendKind`]
///
/// Each slot is typed by the identifier its back-end needs, so dispatch is an
/// exhaustive match with no run-time shape checks.
#[derive(Clone)]
pub struct BackendRegistry {
    tidal: Arc<dyn FetchByReferenceId>,
    qobuz: Arc<dyn FetchByIsrc>,
    amazon: Arc<dyn FetchByReferenceId>,
    resolver: IdentityResolver,
}

impl BackendRegistry {
    /// Build a registry
    ///
    /// # Arguments
    ///
    /// * `tidal` - Tidal capability
    /// * `qobuz` - Qobuz capability
    /// * `amazon` - Amazon Music capability
    /// * `resolver` - ISRC resolver used before calling by-ISRC back-ends
    pub fn new(
        tidal: Arc<dyn FetchByReferenceId>,
        qobuz: Arc<dyn FetchByIsrc>,
        amazon: Arc<dyn FetchByReferenceId>,
        resolver: IdentityResolver,
    ) -> Self {
        Self {
            tidal,
            qobuz,
            amazon,
            resolver,
        }
    }

    /// Human-readable name of the capability behind `kind`
    pub fn capability_name(&self, kind: BackendKind) -> &'static str {
        match kind {
            BackendKind::Tidal => self.tidal.name(),
            BackendKind::Qobuz => self.qobuz.name(),
            BackendKind::Amazon => self.amazon.name(),
        }
    }

    /// Hand a request to the back-end for `kind`
    ///
    /// For by-ISRC back-ends the ISRC is resolved first; if that fails the
    /// back-end is never called.
    ///
    /// # Errors
    ///
    /// - [`Error::IdentityUnresolved`] when a by-ISRC back-end is selected and
    ///   no ISRC can be found
    /// - [`Error::Backend`] when the capability fails
    pub async fn dispatch(&self, kind: BackendKind, mut params: FetchParams) -> Result<Dispatched> {
        debug!(backend = %kind, capability = self.capability_name(kind), "dispatching");

        let result = match kind {
            BackendKind::Tidal => {
                self.tidal
                    .fetch(&params.identity.reference_id, &params)
                    .await?
            }
            BackendKind::Amazon => {
                self.amazon
                    .fetch(&params.identity.reference_id, &params)
                    .await?
            }
            BackendKind::Qobuz => {
                params.identity = self.resolver.resolve(params.identity).await?;
                let isrc = params.identity.isrc().cloned().ok_or_else(|| {
                    Error::IdentityUnresolved {
                        reference_id: params.identity.reference_id.clone(),
                        reason: "ISRC is required for Qobuz".to_string(),
                    }
                })?;
                self.qobuz.fetch(&isrc, &params).await?
            }
        };

        Ok(Dispatched {
            result,
            identity: params.identity,
        })
    }
}
