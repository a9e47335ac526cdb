//! Resolution of source URLs into deliverable URLs.

use async_trait::async_trait;
use edlcast_edl::{Event, EventId, SourceReference};
use tracing::debug;

use crate::error::{PublishError, Result};

/// A single translation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub event_id: EventId,
    /// Source URL with the in-clip start offset appended.
    pub url: String,
}

impl TranslationRequest {
    /// Build the request for an event whose source was found in the catalog.
    ///
    /// Returns `None` for unresolved events, the terminator, and events that
    /// were already translated.
    pub fn for_event(event: &Event) -> Option<Self> {
        match &event.source_reference {
            SourceReference::Source(url) => Some(Self {
                event_id: event.event_id,
                url: format!("{url}&t={}s", event.source_start.elapsed_seconds()),
            }),
            _ => None,
        }
    }
}

/// External service turning a source URL into a deliverable URL.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, request: &TranslationRequest) -> Result<String>;
}

/// Posts requests to the translation service over HTTP.
///
/// The form carries `url` and `fetchIfNotExist=true`; the response body is
/// the deliverable URL.
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    client: reqwest::Client,
    service_url: String,
}

impl HttpTranslator {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), service_url)
    }

    pub fn with_client(client: reqwest::Client, service_url: impl Into<String>) -> Self {
        Self {
            client,
            service_url: service_url.into(),
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String> {
        debug!(event_id = request.event_id, url = %request.url, "Requesting translation");

        let response = self
            .client
            .post(&self.service_url)
            .form(&[("url", request.url.as_str()), ("fetchIfNotExist", "true")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PublishError::Translation(format!(
                "service returned status {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let url = body.trim();
        if url.is_empty() {
            return Err(PublishError::Translation("empty response body".into()));
        }
        Ok(url.to_string())
    }
}

/// Returns the request URL unchanged. Used for offline runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String> {
        Ok(request.url.clone())
    }
}
