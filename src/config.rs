use serde::Deserialize;
use std::time::Duration;

pub const SLOT_TIMEOUT_ENV: &str = "OX_COMMON_SLOT_TIMEOUT_MS";

/// Tunables handed over by the host at attach. Every field has a default so
/// an empty object (or no config at all) is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// First sdk able to negotiate partial media access.
    pub negotiation_min_sdk: u32,
    /// First sdk with per-type media read permissions.
    pub fine_grained_media_min_sdk: u32,
    /// First sdk where shared files must go through a content provider.
    pub file_provider_min_sdk: u32,
    pub file_provider_suffix: String,
    pub share_mime_type: String,
    pub share_chooser_title: String,
    /// Unset or 0 keeps a pending request around until it completes.
    pub slot_timeout_ms: Option<u64>,
    pub compression_dir: String,
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            negotiation_min_sdk: 34,
            fine_grained_media_min_sdk: 33,
            file_provider_min_sdk: 24,
            file_provider_suffix: ".fileprovider".into(),
            share_mime_type: "image/*".into(),
            share_chooser_title: "Share".into(),
            slot_timeout_ms: None,
            compression_dir: "ox_pic".into(),
            log_level: "info".into(),
        }
    }
}

impl BridgeConfig {
    /// Parses the attach JSON. Environment overrides are applied separately
    /// by `apply_env`, once logging is up.
    pub fn from_json(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(trimmed).map_err(|e| format!("config_parse_failed:{e}"))
    }

    pub fn apply_env(&mut self) {
        if let Ok(raw) = std::env::var(SLOT_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(0) => self.slot_timeout_ms = None,
                Ok(ms) => self.slot_timeout_ms = Some(ms),
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring {SLOT_TIMEOUT_ENV}"),
            }
        }
    }

    pub fn slot_timeout(&self) -> Option<Duration> {
        self.slot_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
