//! Download back-ends
//!
//! The engine knows a closed set of back-ends ([`BackendKind`]). Each one is
//! served by a capability object supplied by the caller; capabilities differ
//! in the identifier they need, which is why there are two traits
//! ([`FetchByReferenceId`] and [`FetchByIsrc`]) rather than one.

mod quality;
mod registry;
mod traits;

pub use quality::Quality;
pub use registry::{BackendRegistry, Dispatched};
pub use traits::{EXISTS_MARKER, FetchByIsrc, FetchByReferenceId, FetchParams, FetchResult};

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// The fixed set of download back-ends
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Tidal (fetches by reference ID)
    Tidal,
    /// Qobuz (fetches by ISRC)
    Qobuz,
    /// Amazon Music (fetches by reference ID)
    Amazon,
}

impl BackendKind {
    /// Every back-end
    pub const ALL: [BackendKind; 3] = [BackendKind::Tidal, BackendKind::Qobuz, BackendKind::Amazon];

    /// Lower-case name used in configuration and history records
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Tidal => "tidal",
            BackendKind::Qobuz => "qobuz",
            BackendKind::Amazon => "amazon",
        }
    }

    /// Whether this back-end can only be addressed by ISRC
    pub fn requires_isrc(&self) -> bool {
        matches!(self, BackendKind::Qobuz)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownBackend(s.to_string()))
    }
}

/// Back-end named by a request: a concrete one, or `auto`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceSelection {
    /// Let the [`AutoSelectionPolicy`] decide
    Auto,
    /// A specific back-end
    Named(BackendKind),
}

impl std::str::FromStr for ServiceSelection {
    type Err = Error;

    /// Parse `auto`, `tidal`, `qobuz` or `amazon` (case-insensitive)
    ///
    /// Anything else is [`Error::UnknownBackend`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(ServiceSelection::Auto);
        }
        s.parse().map(ServiceSelection::Named)
    }
}

/// Decides which back-end serves an `auto` request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutoSelectionPolicy {
    fallback: BackendKind,
}

impl AutoSelectionPolicy {
    /// Policy that maps `auto` to `fallback`
    pub fn new(fallback: BackendKind) -> Self {
        Self { fallback }
    }

    /// Concrete back-end for a selection
    pub fn select(&self, selection: ServiceSelection) -> BackendKind {
        match selection {
            ServiceSelection::Auto => self.fallback,
            ServiceSelection::Named(kind) => kind,
        }
    }
}

impl Default for AutoSelectionPolicy {
    fn default() -> Self {
        Self::new(BackendKind::Tidal)
    }
}
