//! Timed publication of parsed EDL events.
//!
//! A [`Scheduler`] takes an [`EventStore`](edlcast_edl::EventStore) and plays
//! it out against wall-clock time: each event's source URL is translated
//! ahead of its record-in point and the event is handed to a [`RecordSink`]
//! shortly before it airs. Records carry a sequence number that increases by
//! one per delivery, and a synthetic end-of-program record closes the stream.
//!
//! ```no_run
//! use std::sync::Arc;
//! use edlcast_edl::{ClipCatalog, EdlParser};
//! use edlcast_publish::{MemorySink, PassthroughTranslator, PublishConfig, Scheduler};
//!
//! # async fn run() -> edlcast_publish::Result<()> {
//! let catalog = ClipCatalog::new();
//! let parsed = EdlParser::new(&catalog).parse("\n1 AX V C 00:00:00:00 00:00:01:00 00:00:05:00 00:00:06:00\n");
//! let sink = MemorySink::new();
//!
//! let mut scheduler = Scheduler::new(
//!     parsed.events,
//!     PublishConfig::default(),
//!     Arc::new(PassthroughTranslator),
//!     sink.clone(),
//! )?;
//! let report = scheduler.run().await?;
//! assert_eq!(report.emitted, 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod scheduler;
pub mod sink;
pub mod translate;

pub use config::{PublishConfig, DEFAULT_TRANSLATION_SERVICE_URL};
pub use error::{PublishError, Result};
pub use scheduler::{lead_offset, Action, RunReport, Scheduler};
pub use sink::{JsonLinesSink, MemorySink, PublishedRecord, RecordSink};
pub use translate::{HttpTranslator, PassthroughTranslator, TranslationRequest, Translator};
