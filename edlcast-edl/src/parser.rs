//! CMX-style EDL parser.
//!
//! Events are separated by blank lines. The first non-blank line after a
//! separator is the event header:
//!
//! ```text
//! 007  REEL1  B  C   00:01:00:00 00:01:05:00 00:02:00:00 00:02:05:00
//! * FROM CLIP NAME: My_Clip-Intro.mov
//! * COMMENT: anything else lands in the payload
//! ```
//!
//! The last four header tokens are always the timecodes, so reel names that
//! contain spaces are tolerated. Body lines up to the next blank line belong
//! to the event; the `FROM CLIP NAME` directive drives clip resolution and
//! every other line is kept verbatim in the payload.

use std::sync::OnceLock;

use edlcast_timecode::Timecode;
use regex::Regex;
use tracing::{debug, warn};

use crate::adjust::AdjustmentTable;
use crate::clips::{normalize_clip_name, ClipKey, ClipResolver};
use crate::error::{Error, Result};
use crate::event::{Event, EventId, SourceReference};
use crate::store::EventStore;

const HEADER_MIN_TOKENS: usize = 8;

fn clip_directive() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\* FROM CLIP NAME:\s*(.*?)\s*$").expect("valid directive regex"))
}

/// Result of parsing an EDL.
#[derive(Debug)]
pub struct ParsedEdl {
    pub title: Option<String>,
    pub events: EventStore,
    /// Skipped header lines and discarded events, in input order.
    pub diagnostics: Vec<Error>,
}

/// What happened to an event after its clip directive was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipOutcome {
    Kept,
    Discarded,
}

/// Converts EDL text into an [`EventStore`].
pub struct EdlParser<'a> {
    resolver: &'a dyn ClipResolver,
    adjustments: Option<&'a AdjustmentTable>,
}

impl<'a> EdlParser<'a> {
    pub fn new(resolver: &'a dyn ClipResolver) -> Self {
        Self {
            resolver,
            adjustments: None,
        }
    }

    /// Enable rebasing against `table`. An empty table leaves adjustment
    /// disabled.
    pub fn with_adjustments(mut self, table: &'a AdjustmentTable) -> Self {
        self.adjustments = (!table.is_empty()).then_some(table);
        self
    }

    pub fn parse(&self, input: &str) -> ParsedEdl {
        let mut title = None;
        let mut events = EventStore::new();
        let mut diagnostics = Vec::new();

        let mut awaiting_header = false;
        let mut current: Option<EventId> = None;
        let mut clip_seen = false;

        for (line_idx, raw_line) in input.lines().enumerate() {
            let line_no = line_idx + 1;

            if raw_line.trim().is_empty() {
                awaiting_header = true;
                continue;
            }

            if awaiting_header {
                match parse_header(raw_line, line_no) {
                    Ok(event) => {
                        let id = event.event_id;
                        match events.insert(event) {
                            Ok(()) => {
                                debug!(event_id = id, line = line_no, "Parsed event header");
                                current = Some(id);
                                clip_seen = false;
                                awaiting_header = false;
                            }
                            Err(e) => {
                                warn!(event_id = id, line = line_no, "Duplicate event id, skipping");
                                diagnostics.push(Error::parse(line_no, e.to_string()));
                            }
                        }
                    }
                    Err(e) => {
                        warn!(line = line_no, error = %e, "Skipping malformed header");
                        diagnostics.push(e);
                    }
                }
                continue;
            }

            let Some(id) = current else {
                if title.is_none() {
                    if let Some(rest) = raw_line.trim().strip_prefix("TITLE:") {
                        title = Some(rest.trim().to_string());
                    }
                }
                continue;
            };

            let directive = clip_directive()
                .captures(raw_line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string());

            match directive {
                Some(clip) if !clip_seen => {
                    clip_seen = true;
                    if self.apply_clip(&mut events, id, &clip, &mut diagnostics)
                        == ClipOutcome::Discarded
                    {
                        current = None;
                    }
                }
                Some(clip) => {
                    warn!(event_id = id, clip = %clip, "Extra clip directive kept as payload");
                    push_payload(&mut events, id, raw_line);
                }
                None => push_payload(&mut events, id, raw_line),
            }
        }

        ParsedEdl {
            title,
            events,
            diagnostics,
        }
    }

    fn apply_clip(
        &self,
        events: &mut EventStore,
        id: EventId,
        clip: &str,
        diagnostics: &mut Vec<Error>,
    ) -> ClipOutcome {
        let Ok(event) = events.get_mut(id) else {
            return ClipOutcome::Discarded;
        };
        event.clip_name = Some(clip.to_string());

        if let Some(table) = self.adjustments {
            let rebased = match table.get(clip) {
                None => Err(Error::AdjustmentMissing {
                    event_id: id,
                    clip: clip.to_string(),
                }),
                Some(reference) => reference
                    .rebase(&event.source_start)
                    .and_then(|start| Ok((start, reference.rebase(&event.source_end)?)))
                    .map_err(|source| Error::Rebase {
                        event_id: id,
                        clip: clip.to_string(),
                        source,
                    }),
            };

            match rebased {
                Ok((start, end)) => {
                    debug!(event_id = id, %start, %end, "Rebased source timecodes");
                    event.source_start = start;
                    event.source_end = end;
                }
                Err(e) => {
                    warn!(event_id = id, clip = %clip, error = %e, "Discarding event");
                    events.remove(id);
                    diagnostics.push(e);
                    return ClipOutcome::Discarded;
                }
            }
        }

        match normalize_clip_name(clip) {
            ClipKey::AudioOnly => {
                debug!(event_id = id, clip = %clip, "Audio-only clip left unresolved");
            }
            ClipKey::Name(key) => match self.resolver.lookup(&key) {
                Some(url) => event.source_reference = SourceReference::Source(url),
                None => warn!(event_id = id, clip = %clip, "Clip not found in catalog"),
            },
        }

        ClipOutcome::Kept
    }
}

fn push_payload(events: &mut EventStore, id: EventId, line: &str) {
    if let Ok(event) = events.get_mut(id) {
        event.payload.push(line.to_string());
    }
}

/// Parse an event header line.
pub fn parse_header(line: &str, line_no: usize) -> Result<Event> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < HEADER_MIN_TOKENS {
        return Err(Error::parse(
            line_no,
            format!("Expected at least {HEADER_MIN_TOKENS} fields, got {}", tokens.len()),
        ));
    }

    let event_id: EventId = tokens[0].parse().map_err(|_| {
        Error::parse(line_no, format!("Cannot parse '{}' as event id", tokens[0]))
    })?;
    if event_id == 0 {
        return Err(Error::parse(line_no, "Event id must be positive"));
    }

    let times_idx = tokens.len() - 4;
    let timecode = |offset: usize, name: &str| -> Result<Timecode> {
        let raw = tokens[times_idx + offset];
        raw.parse()
            .map_err(|e| Error::parse(line_no, format!("Invalid {name} timecode '{raw}': {e}")))
    };

    let source_start = timecode(0, "source-in")?;
    let source_end = timecode(1, "source-out")?;
    let dest_start = timecode(2, "record-in")?;
    let dest_end = timecode(3, "record-out")?;

    if dest_start > dest_end {
        return Err(Error::parse(
            line_no,
            format!("Record-in {dest_start} is after record-out {dest_end}"),
        ));
    }

    Ok(Event::new(
        event_id,
        tokens[1],
        tokens[2],
        tokens[3],
        (source_start, source_end),
        (dest_start, dest_end),
    ))
}
