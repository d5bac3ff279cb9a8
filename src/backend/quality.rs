//! Per-back-end quality vocabulary

use super::BackendKind;

const TIDAL_QUALITIES: &[&str] = &["LOSSLESS", "HI_RES_LOSSLESS"];
const QOBUZ_QUALITIES: &[&str] = &["6", "7"];
const AMAZON_QUALITIES: &[&str] = &["original"];

/// Quality token accepted by a specific back-end
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quality(String);

impl Quality {
    /// Tokens a back-end understands; the first one is its built-in default
    pub fn vocabulary(kind: BackendKind) -> &'static [&'static str] {
        match kind {
            BackendKind::Tidal => TIDAL_QUALITIES,
            BackendKind::Qobuz => QOBUZ_QUALITIES,
            BackendKind::Amazon => AMAZON_QUALITIES,
        }
    }

    /// Whether `token` is in the back-end's vocabulary (case-insensitive)
    pub fn is_valid_for(kind: BackendKind, token: &str) -> bool {
        Self::canonical(kind, token).is_some()
    }

    /// Pick the token to send to a back-end
    ///
    /// `requested` wins when the back-end understands it. Qobuz also accepts
    /// the generic Tidal names (`LOSSLESS` → `6`, `HI_RES_LOSSLESS` → `7`) and
    /// Amazon treats both as `original`. Anything else falls back to
    /// `configured_default` (or the built-in default if that is invalid too),
    /// with a warning.
    pub fn resolve(kind: BackendKind, requested: Option<&str>, configured_default: &str) -> Self {
        let fallback = Self::canonical(kind, configured_default)
            .unwrap_or(Self::vocabulary(kind)[0]);

        let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
            return Self(fallback.to_string());
        };

        if let Some(token) = Self::canonical(kind, requested).or_else(|| Self::generic(kind, requested)) {
            return Self(token.to_string());
        }

        tracing::warn!(
            backend = %kind,
            requested = %requested,
            using = %fallback,
            "quality not supported by backend, using default"
        );
        Self(fallback.to_string())
    }

    /// The token as sent to the back-end
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn canonical(kind: BackendKind, token: &str) -> Option<&'static str> {
        let token = token.trim();
        Self::vocabulary(kind)
            .iter()
            .copied()
            .find(|q| q.eq_ignore_ascii_case(token))
    }

    fn generic(kind: BackendKind, token: &str) -> Option<&'static str> {
        let hi_res = if token.eq_ignore_ascii_case("HI_RES_LOSSLESS") {
            true
        } else if token.eq_ignore_ascii_case("LOSSLESS") {
            false
        } else {
            return None;
        };

        match kind {
            BackendKind::Tidal => None,
            BackendKind::Qobuz => Some(if hi_res { "7" } else { "6" }),
            BackendKind::Amazon => Some("original"),
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
