//! Cross-service identity resolution
//!
//! Back-ends that cannot take a reference-catalog ID need the track's ISRC.
//! [`IdentityResolver`] obtains it through a [`CrossCatalogResolver`]: first
//! the track's URL on a secondary catalog, then the ISRC that catalog reports.

mod availability;
mod songlink;

pub use availability::{Availability, Platform};
pub use songlink::SongLinkResolver;

use crate::error::{Error, Result};
use crate::types::{Isrc, ReferenceId, TrackIdentity};
use async_trait::async_trait;
use std::sync::Arc;

/// Two-hop lookup from a reference ID to an ISRC
#[async_trait]
pub trait CrossCatalogResolver: Send + Sync {
    /// URL of the same track on the secondary catalog
    async fn secondary_url(&self, reference_id: &ReferenceId) -> Result<String>;

    /// Raw ISRC the secondary catalog reports for a track URL
    async fn isrc_for_url(&self, url: &str) -> Result<String>;
}

/// Source of track metadata for a reference ID
///
/// Used by [`LosslessDownloader::execute_reference`](crate::LosslessDownloader::execute_reference)
/// when the caller only has a URL or ID.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Describe the track
    async fn track(&self, reference_id: &ReferenceId) -> Result<TrackIdentity>;
}

/// Fills in the ISRC of a [`TrackIdentity`]
#[derive(Clone)]
pub struct IdentityResolver {
    catalog: Arc<dyn CrossCatalogResolver>,
}

impl IdentityResolver {
    /// Resolver backed by `catalog`
    pub fn new(catalog: Arc<dyn CrossCatalogResolver>) -> Self {
        Self { catalog }
    }

    /// Return `identity` carrying an ISRC
    ///
    /// An identity that already has one is returned untouched without any
    /// lookup. Otherwise both hops must succeed and the result must be a
    /// well-formed ISRC.
    ///
    /// # Errors
    ///
    /// [`Error::IdentityUnresolved`] when either hop fails or the secondary
    /// catalog returns something that is not an ISRC.
    pub async fn resolve(&self, identity: TrackIdentity) -> Result<TrackIdentity> {
        if identity.isrc().is_some() {
            return Ok(identity);
        }

        let reference_id = identity.reference_id.clone();
        let unresolved = |reason: String| Error::IdentityUnresolved {
            reference_id: reference_id.clone(),
            reason,
        };

        let url = self
            .catalog
            .secondary_url(&identity.reference_id)
            .await
            .map_err(|e| unresolved(format!("no secondary catalog link: {e}")))?;

        tracing::debug!(reference_id = %identity.reference_id, url = %url, "found secondary catalog link");

        let raw = self
            .catalog
            .isrc_for_url(&url)
            .await
            .map_err(|e| unresolved(format!("ISRC lookup failed: {e}")))?;

        let isrc = Isrc::parse(&raw).map_err(|e| unresolved(e.to_string()))?;

        tracing::info!(reference_id = %identity.reference_id, isrc = %isrc, "resolved ISRC");
        Ok(identity.with_isrc(isrc))
    }
}
