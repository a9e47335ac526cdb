//! EDL events and their resolution state machine.

use edlcast_timecode::Timecode;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// Event number from the EDL header; also the publication order.
pub type EventId = u32;

/// Where an event's media currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceReference {
    /// No clip could be matched to the event.
    Unresolved,
    /// Source URL found in the clip catalog.
    Source(String),
    /// Deliverable URL returned by the translation service.
    Deliverable(String),
    /// Marks the synthetic end-of-program event.
    EndOfProgram,
}

impl SourceReference {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unresolved => "none",
            Self::Source(url) | Self::Deliverable(url) => url,
            Self::EndOfProgram => "end",
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }
}

impl Serialize for SourceReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Resolution progress of a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionState {
    /// Resolve action has not fired yet.
    NotStarted,
    /// Translation call in flight.
    Resolving,
    /// Deliverable URL available.
    Resolved,
    /// Nothing to resolve, or translation failed.
    NonExistent,
    /// Publish fired before resolution finished; emit on completion.
    PublishRequested,
    /// Terminator; never resolved.
    NotRequired,
}

impl std::fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not-started"),
            Self::Resolving => write!(f, "resolving"),
            Self::Resolved => write!(f, "resolved"),
            Self::NonExistent => write!(f, "non-existent"),
            Self::PublishRequested => write!(f, "publish-requested"),
            Self::NotRequired => write!(f, "not-required"),
        }
    }
}

impl ResolutionState {
    /// Check if this state can transition to another state.
    pub fn can_transition_to(&self, next: ResolutionState) -> bool {
        match (self, next) {
            (Self::NotStarted, Self::Resolving) => true,
            (Self::NotStarted, Self::NonExistent) => true,
            (Self::NotStarted, Self::PublishRequested) => true,
            (Self::Resolving, Self::Resolved) => true,
            (Self::Resolving, Self::NonExistent) => true,
            (Self::Resolving, Self::PublishRequested) => true,
            (Self::PublishRequested, Self::Resolved) => true,
            (Self::PublishRequested, Self::NonExistent) => true,
            _ => false,
        }
    }

    /// Whether a publish action may emit the event right away.
    pub fn is_publishable(&self) -> bool {
        matches!(self, Self::Resolved | Self::NonExistent | Self::NotRequired)
    }
}

/// One cut entry of the program.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub event_id: EventId,
    pub reel_name: String,
    pub channel: String,
    pub transition_type: String,
    pub source_start: Timecode,
    pub source_end: Timecode,
    pub dest_start: Timecode,
    pub dest_end: Timecode,
    /// Raw `FROM CLIP NAME` value, if the event had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_name: Option<String>,
    pub source_reference: SourceReference,
    /// Source URL (with start offset) that was sent for translation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_reference: Option<String>,
    pub resolution_state: ResolutionState,
    pub payload: Vec<String>,
    #[serde(skip)]
    emitted: bool,
}

impl Event {
    pub fn new(
        event_id: EventId,
        reel_name: impl Into<String>,
        channel: impl Into<String>,
        transition_type: impl Into<String>,
        source: (Timecode, Timecode),
        dest: (Timecode, Timecode),
    ) -> Self {
        Self {
            event_id,
            reel_name: reel_name.into(),
            channel: channel.into(),
            transition_type: transition_type.into(),
            source_start: source.0,
            source_end: source.1,
            dest_start: dest.0,
            dest_end: dest.1,
            clip_name: None,
            source_reference: SourceReference::Unresolved,
            original_reference: None,
            resolution_state: ResolutionState::NotStarted,
            payload: Vec::new(),
            emitted: false,
        }
    }

    /// Synthetic end-of-program event.
    pub fn terminator(event_id: EventId) -> Self {
        Self {
            source_reference: SourceReference::EndOfProgram,
            resolution_state: ResolutionState::NotRequired,
            ..Self::new(
                event_id,
                "",
                "",
                "",
                (Timecode::default(), Timecode::default()),
                (Timecode::default(), Timecode::default()),
            )
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.source_reference == SourceReference::EndOfProgram
    }

    pub fn is_emitted(&self) -> bool {
        self.emitted
    }

    /// Transition to a new resolution state.
    pub fn transition_to(&mut self, next: ResolutionState) -> Result<()> {
        if !self.resolution_state.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                event_id: self.event_id,
                from: self.resolution_state.to_string(),
                to: next.to_string(),
            });
        }
        self.resolution_state = next;
        Ok(())
    }

    /// Start a translation call. A pending publish request is kept as-is so
    /// the completion knows to emit.
    pub fn begin_resolution(&mut self) -> Result<()> {
        match self.resolution_state {
            ResolutionState::PublishRequested => Ok(()),
            _ => self.transition_to(ResolutionState::Resolving),
        }
    }

    /// Store the deliverable URL along with the URL that was translated.
    /// Returns `true` if a publish was waiting.
    pub fn complete_resolution(&mut self, requested: String, deliverable: String) -> Result<bool> {
        let pending = self.resolution_state == ResolutionState::PublishRequested;
        self.transition_to(ResolutionState::Resolved)?;
        self.original_reference = Some(requested);
        self.source_reference = SourceReference::Deliverable(deliverable);
        Ok(pending)
    }

    /// Mark the event as having no deliverable. Returns `true` if a publish
    /// was waiting.
    pub fn mark_non_existent(&mut self) -> Result<bool> {
        let pending = self.resolution_state == ResolutionState::PublishRequested;
        self.transition_to(ResolutionState::NonExistent)?;
        Ok(pending)
    }

    /// Defer emission until resolution completes.
    pub fn request_publish(&mut self) -> Result<()> {
        self.transition_to(ResolutionState::PublishRequested)
    }

    /// Flag the event as emitted; a second call is rejected.
    pub fn mark_emitted(&mut self) -> Result<()> {
        if self.emitted {
            return Err(Error::AlreadyEmitted {
                event_id: self.event_id,
            });
        }
        self.emitted = true;
        Ok(())
    }
}
