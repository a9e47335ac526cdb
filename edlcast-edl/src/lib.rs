//! Edit decision list ingestion.
//!
//! Parses CMX-style EDL text into an [`EventStore`], resolving each event's
//! `FROM CLIP NAME` directive through a [`ClipResolver`] and, optionally,
//! rebasing its source timecodes against an [`AdjustmentTable`].
//!
//! # Example
//!
//! ```
//! use edlcast_edl::{ClipCatalog, EdlParser, SourceReference};
//!
//! let catalog: ClipCatalog = [("My Clip Intro", "vid123")].into_iter().collect();
//! let edl = "TITLE: Rough Cut\n\n\
//!            7 REEL1 B C 00:01:00:00 00:01:05:00 00:02:00:00 00:02:05:00\n\
//!            * FROM CLIP NAME: My_Clip-Intro.mov\n";
//!
//! let parsed = EdlParser::new(&catalog).parse(edl);
//! let event = parsed.events.get(7).unwrap();
//! assert_eq!(
//!     event.source_reference,
//!     SourceReference::Source("https://www.youtube.com/watch?v=vid123".into())
//! );
//! ```

mod adjust;
mod clips;
mod error;
mod event;
mod parser;
mod store;

pub use adjust::AdjustmentTable;
pub use clips::{normalize_clip_name, ClipCatalog, ClipKey, ClipResolver, DEFAULT_WATCH_URL_BASE};
pub use error::{Error, Result};
pub use event::{Event, EventId, ResolutionState, SourceReference};
pub use parser::{parse_header, EdlParser, ParsedEdl};
pub use store::EventStore;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
