//! Scheduler configuration.

use std::path::Path;
use std::time::Duration;

use edlcast_edl::DEFAULT_WATCH_URL_BASE;
use serde::{Deserialize, Serialize};

use crate::error::{PublishError, Result};

/// Default resolution service endpoint.
pub const DEFAULT_TRANSLATION_SERVICE_URL: &str =
    "http://the-archive.la/losangeles/services/get-youtube-url";

/// Publishing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Seconds before an event's record-in at which it is published.
    pub publish_lead_secs: u64,
    /// Seconds before an event's record-in at which its URL is resolved.
    pub resolve_lead_secs: u64,
    /// Gap between the last publish and the terminator, in seconds.
    pub terminator_delay_secs: u64,
    /// Prefix of framed record names.
    pub name_prefix: String,
    /// Freshness period attached to framed records, in milliseconds.
    pub freshness_ms: u64,
    /// Resolution service endpoint.
    pub translation_service_url: String,
    /// Prefix turning a catalog identifier into a source URL.
    pub watch_url_base: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            publish_lead_secs: 3,
            resolve_lead_secs: 60,
            terminator_delay_secs: 1,
            name_prefix: "/test/edl/".into(),
            freshness_ms: 50_000,
            translation_service_url: DEFAULT_TRANSLATION_SERVICE_URL.into(),
            watch_url_base: DEFAULT_WATCH_URL_BASE.into(),
        }
    }
}

impl PublishConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| PublishError::Config(e.to_string()))
    }

    pub fn with_publish_lead(mut self, secs: u64) -> Self {
        self.publish_lead_secs = secs;
        self
    }

    pub fn with_resolve_lead(mut self, secs: u64) -> Self {
        self.resolve_lead_secs = secs;
        self
    }

    pub fn with_terminator_delay(mut self, secs: u64) -> Self {
        self.terminator_delay_secs = secs;
        self
    }

    pub fn with_translation_service_url(mut self, url: impl Into<String>) -> Self {
        self.translation_service_url = url.into();
        self
    }

    pub fn publish_lead(&self) -> Duration {
        Duration::from_secs(self.publish_lead_secs)
    }

    pub fn resolve_lead(&self) -> Duration {
        Duration::from_secs(self.resolve_lead_secs)
    }

    pub fn terminator_delay(&self) -> Duration {
        Duration::from_secs(self.terminator_delay_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolve_lead_secs <= self.publish_lead_secs {
            return Err(PublishError::Config(format!(
                "resolve lead ({}s) must exceed publish lead ({}s)",
                self.resolve_lead_secs, self.publish_lead_secs
            )));
        }
        if self.terminator_delay_secs == 0 {
            return Err(PublishError::Config(
                "terminator delay must be at least one second".into(),
            ));
        }
        Ok(())
    }
}
