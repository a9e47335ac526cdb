//! Integration tests for the publish scheduler
//!
//! All tests run on a paused clock, so timer offsets are exact and a run over
//! minutes of program time finishes instantly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::time::Instant;

use edlcast_edl::{
    ClipCatalog, EdlParser, Event, EventId, EventStore, ResolutionState, SourceReference,
};
use edlcast_publish::{
    JsonLinesSink, MemorySink, PassthroughTranslator, PublishConfig, PublishError,
    PublishedRecord, RecordSink, Result, Scheduler, TranslationRequest, Translator,
};
use edlcast_timecode::Timecode;

fn tc(s: &str) -> Timecode {
    s.parse().unwrap()
}

/// Event with a catalog source and the given record-in point.
fn sourced(id: EventId, dest_start: &str) -> Event {
    let mut event = Event::new(
        id,
        "AX",
        "V",
        "C",
        (tc("00:00:10:00"), tc("00:00:20:00")),
        (tc(dest_start), tc(dest_start)),
    );
    event.source_reference =
        SourceReference::Source(format!("https://www.youtube.com/watch?v=clip{id}"));
    event
}

fn unresolved(id: EventId, dest_start: &str) -> Event {
    Event::new(
        id,
        "AX",
        "V",
        "C",
        (Timecode::default(), Timecode::default()),
        (tc(dest_start), tc(dest_start)),
    )
}

fn store(events: Vec<Event>) -> EventStore {
    let mut store = EventStore::new();
    for event in events {
        store.insert(event).unwrap();
    }
    store
}

/// Records every delivery along with the paused-clock time it happened.
#[derive(Clone)]
struct TimedSink {
    start: Instant,
    records: Arc<Mutex<Vec<(Duration, PublishedRecord)>>>,
    fail_on: Option<EventId>,
}

impl TimedSink {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            records: Arc::default(),
            fail_on: None,
        }
    }

    fn failing_on(event_id: EventId) -> Self {
        Self {
            fail_on: Some(event_id),
            ..Self::new()
        }
    }

    fn deliveries(&self) -> Vec<(Duration, PublishedRecord)> {
        self.records.lock().clone()
    }

    fn event_ids(&self) -> Vec<EventId> {
        self.records.lock().iter().map(|(_, r)| r.event.event_id).collect()
    }

    fn sequences(&self) -> Vec<u64> {
        self.records.lock().iter().map(|(_, r)| r.sequence_number).collect()
    }

    fn delivery_of(&self, event_id: EventId) -> Option<(Duration, PublishedRecord)> {
        self.records
            .lock()
            .iter()
            .find(|(_, r)| r.event.event_id == event_id)
            .cloned()
    }
}

impl RecordSink for TimedSink {
    fn publish(&mut self, record: &PublishedRecord) -> Result<()> {
        if self.fail_on == Some(record.event.event_id) {
            return Err(PublishError::Sink("connection reset".into()));
        }
        self.records
            .lock()
            .push((self.start.elapsed(), record.clone()));
        Ok(())
    }
}

enum Script {
    Answer(Duration, String),
    Fail(Duration),
    Panic,
}

/// Answers translation requests from a per-event script; unscripted events
/// pass through unchanged.
#[derive(Default)]
struct ScriptedTranslator {
    scripts: HashMap<EventId, Script>,
}

impl ScriptedTranslator {
    fn with(mut self, event_id: EventId, script: Script) -> Self {
        self.scripts.insert(event_id, script);
        self
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String> {
        match self.scripts.get(&request.event_id) {
            Some(Script::Answer(delay, url)) => {
                tokio::time::sleep(*delay).await;
                Ok(url.clone())
            }
            Some(Script::Fail(delay)) => {
                tokio::time::sleep(*delay).await;
                Err(PublishError::Translation("service unavailable".into()))
            }
            Some(Script::Panic) => panic!("translator crashed"),
            None => Ok(request.url.clone()),
        }
    }
}

async fn run_with(
    events: EventStore,
    translator: impl Translator + 'static,
    sink: TimedSink,
) -> (Scheduler<TimedSink>, edlcast_publish::RunReport) {
    let mut scheduler = Scheduler::new(
        events,
        PublishConfig::default(),
        Arc::new(translator),
        sink,
    )
    .unwrap();
    let report = scheduler.run().await.unwrap();
    (scheduler, report)
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_sequences_contiguous_with_terminator_last() {
    let sink = TimedSink::new();
    let events = store(vec![
        sourced(1, "00:00:10:00"),
        unresolved(2, "00:00:20:00"),
        sourced(3, "00:00:40:00"),
    ]);

    let (_, report) = run_with(events, PassthroughTranslator, sink.clone()).await;

    assert_eq!(sink.sequences(), vec![0, 1, 2, 3]);
    assert_eq!(sink.event_ids(), vec![1, 2, 3, 4]);

    let (_, last) = sink.deliveries().pop().unwrap();
    assert_eq!(last.event.source_reference, SourceReference::EndOfProgram);
    assert_eq!(last.event.resolution_state, ResolutionState::NotRequired);

    assert_eq!(report.events, 3);
    assert_eq!(report.emitted, 4);
    assert_eq!(report.resolved, 2);
    assert_eq!(report.non_existent, 1);
    assert_eq!(report.terminator_sequence, Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_publish_fires_lead_seconds_before_record_in() {
    let sink = TimedSink::new();
    let events = store(vec![sourced(1, "00:00:02:00"), sourced(2, "00:01:30:00")]);

    run_with(events, PassthroughTranslator, sink.clone()).await;

    // Record-in inside the lead window publishes at start.
    let (at, _) = sink.delivery_of(1).unwrap();
    assert_eq!(at, Duration::ZERO);

    let (at, _) = sink.delivery_of(2).unwrap();
    assert_eq!(at, Duration::from_secs(87));

    let (at, _) = sink.delivery_of(3).unwrap();
    assert_eq!(at, Duration::from_secs(88));
}

#[tokio::test(start_paused = true)]
async fn test_simultaneous_events_emitted_in_id_order() {
    let sink = TimedSink::new();
    let events = store(vec![
        unresolved(9, "00:00:30:00"),
        unresolved(2, "00:00:30:00"),
        unresolved(5, "00:00:30:00"),
    ]);

    run_with(events, PassthroughTranslator, sink.clone()).await;

    assert_eq!(sink.event_ids(), vec![2, 5, 9, 10]);
    assert_eq!(sink.sequences(), vec![0, 1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_earlier_record_in_waits_for_lower_id() {
    let sink = TimedSink::new();
    let events = store(vec![unresolved(1, "00:00:40:00"), unresolved(2, "00:00:20:00")]);

    run_with(events, PassthroughTranslator, sink.clone()).await;

    assert_eq!(sink.event_ids(), vec![1, 2, 3]);
    let (at, _) = sink.delivery_of(2).unwrap();
    assert_eq!(at, Duration::from_secs(37));
}

// =============================================================================
// Resolution
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_unresolved_event_published_as_non_existent() {
    let sink = TimedSink::new();
    let (scheduler, _) =
        run_with(store(vec![unresolved(1, "00:00:10:00")]), PassthroughTranslator, sink.clone())
            .await;

    let (at, record) = sink.delivery_of(1).unwrap();
    assert_eq!(at, Duration::from_secs(7));
    assert_eq!(record.event.resolution_state, ResolutionState::NonExistent);
    assert_eq!(record.event.source_reference, SourceReference::Unresolved);

    assert!(scheduler.events().get(1).unwrap().is_emitted());
}

#[tokio::test(start_paused = true)]
async fn test_resolved_event_carries_deliverable_url() {
    let sink = TimedSink::new();
    let translator = ScriptedTranslator::default().with(
        1,
        Script::Answer(Duration::from_secs(5), "https://cdn.example/clip1.mp4".into()),
    );

    run_with(store(vec![sourced(1, "00:02:00:00")]), translator, sink.clone()).await;

    let (at, record) = sink.delivery_of(1).unwrap();
    assert_eq!(at, Duration::from_secs(117));
    assert_eq!(record.event.resolution_state, ResolutionState::Resolved);
    assert_eq!(
        record.event.source_reference,
        SourceReference::Deliverable("https://cdn.example/clip1.mp4".into())
    );
    assert_eq!(
        record.event.original_reference.as_deref(),
        Some("https://www.youtube.com/watch?v=clip1&t=10s")
    );
}

#[tokio::test(start_paused = true)]
async fn test_late_resolution_emits_once_at_completion() {
    let sink = TimedSink::new();
    // Event 1 resolves at 0s, is due at 27s, and its answer arrives at 100s.
    let translator = ScriptedTranslator::default().with(
        1,
        Script::Answer(Duration::from_secs(100), "https://cdn.example/late.mp4".into()),
    );
    let events = store(vec![sourced(1, "00:00:30:00"), unresolved(2, "00:01:00:00")]);

    let (_, report) = run_with(events, translator, sink.clone()).await;

    assert_eq!(sink.event_ids(), vec![1, 2, 3]);
    assert_eq!(sink.sequences(), vec![0, 1, 2]);

    let (at, record) = sink.delivery_of(1).unwrap();
    assert_eq!(at, Duration::from_secs(100));
    assert_eq!(
        record.event.source_reference,
        SourceReference::Deliverable("https://cdn.example/late.mp4".into())
    );

    // Event 2 was due at 57s and is held behind event 1.
    let (at, record) = sink.delivery_of(2).unwrap();
    assert_eq!(at, Duration::from_secs(100));
    assert_eq!(record.event.resolution_state, ResolutionState::NonExistent);

    // The terminator was due at 58s and goes out last.
    let (at, _) = sink.delivery_of(3).unwrap();
    assert_eq!(at, Duration::from_secs(100));
    assert_eq!(report.terminator_sequence, Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_translation_failure_still_publishes() {
    let sink = TimedSink::new();
    let translator =
        ScriptedTranslator::default().with(1, Script::Fail(Duration::from_secs(2)));

    let (_, report) =
        run_with(store(vec![sourced(1, "00:01:10:00")]), translator, sink.clone()).await;

    let (at, record) = sink.delivery_of(1).unwrap();
    assert_eq!(at, Duration::from_secs(67));
    assert_eq!(record.event.resolution_state, ResolutionState::NonExistent);
    assert_eq!(report.resolved, 0);
    assert_eq!(report.non_existent, 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_failure_releases_deferred_publish() {
    let sink = TimedSink::new();
    let translator =
        ScriptedTranslator::default().with(1, Script::Fail(Duration::from_secs(30)));

    run_with(store(vec![sourced(1, "00:00:10:00")]), translator, sink.clone()).await;

    let (at, record) = sink.delivery_of(1).unwrap();
    assert_eq!(at, Duration::from_secs(30));
    assert_eq!(record.event.resolution_state, ResolutionState::NonExistent);
    assert_eq!(sink.sequences(), vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_translator_treated_as_failure() {
    let sink = TimedSink::new();
    let translator = ScriptedTranslator::default().with(2, Script::Panic);
    let events = store(vec![sourced(1, "00:00:20:00"), sourced(2, "00:00:25:00")]);

    let (_, report) = run_with(events, translator, sink.clone()).await;

    assert_eq!(sink.event_ids(), vec![1, 2, 3]);
    let (_, record) = sink.delivery_of(2).unwrap();
    assert_eq!(record.event.resolution_state, ResolutionState::NonExistent);
    assert_eq!(report.emitted, 3);
}

// =============================================================================
// Delivery
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_sink_failure_keeps_sequences_contiguous() {
    let sink = TimedSink::failing_on(2);
    let events = store(vec![
        unresolved(1, "00:00:10:00"),
        unresolved(2, "00:00:20:00"),
        unresolved(3, "00:00:30:00"),
    ]);

    let (scheduler, report) = run_with(events, PassthroughTranslator, sink.clone()).await;

    assert_eq!(sink.event_ids(), vec![1, 3, 4]);
    assert_eq!(sink.sequences(), vec![0, 1, 2]);
    assert_eq!(report.failed_deliveries, 1);
    assert_eq!(report.emitted, 3);
    assert!(scheduler.events().get(2).unwrap().is_emitted());
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_from_edl_text() {
    let edl = "TITLE: Evening Block\n\
FCM: NON-DROP FRAME\n\
\n\
007  REEL1    B     C        00:01:00:00 00:01:05:00 00:02:00:00 00:02:05:00\n\
* FROM CLIP NAME: My_Clip-Intro.mov\n\
\n\
008  REEL2    B     C        00:00:00:00 00:00:05:00 00:02:05:00 00:02:10:00\n\
* FROM CLIP NAME: score.wav\n";

    let catalog: ClipCatalog = [("My Clip Intro", "vid123")].into_iter().collect();
    let parsed = EdlParser::new(&catalog).parse(edl);
    assert!(parsed.diagnostics.is_empty());

    let sink = MemorySink::new();
    let mut scheduler = Scheduler::new(
        parsed.events,
        PublishConfig::default(),
        Arc::new(PassthroughTranslator),
        sink.clone(),
    )
    .unwrap();
    scheduler.run().await.unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].event.event_id, 7);
    assert_eq!(
        records[0].event.source_reference,
        SourceReference::Deliverable("https://www.youtube.com/watch?v=vid123&t=60s".into())
    );

    assert_eq!(records[1].event.event_id, 8);
    assert_eq!(records[1].event.resolution_state, ResolutionState::NonExistent);

    assert_eq!(records[2].event.event_id, 9);
    assert!(records[2].event.is_terminator());
}

#[tokio::test(start_paused = true)]
async fn test_json_lines_output() {
    let mut scheduler = Scheduler::new(
        store(vec![unresolved(1, "00:00:05:00")]),
        PublishConfig::default(),
        Arc::new(PassthroughTranslator),
        JsonLinesSink::new(Vec::new(), "/test/edl/", 50_000),
    )
    .unwrap();
    scheduler.run().await.unwrap();

    let output = String::from_utf8(scheduler.into_sink().into_inner()).unwrap();
    let frames: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["name"], "/test/edl/0");
    assert_eq!(frames[0]["content"]["source_reference"], "none");
    assert_eq!(frames[0]["content"]["resolution_state"], "non-existent");
    assert_eq!(frames[1]["name"], "/test/edl/1");
    assert_eq!(frames[1]["content"]["source_reference"], "end");
}
