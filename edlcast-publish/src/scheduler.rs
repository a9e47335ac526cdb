//! Two-phase resolve-then-publish scheduler.
//!
//! Every real event gets a resolve timer at `record-in - resolve_lead` and a
//! publish timer at `record-in - publish_lead`, both clamped at zero and
//! relative to the moment [`Scheduler::run`] starts. The terminator gets a
//! single publish timer one `terminator_delay` after the latest publish.
//!
//! All event state lives on the loop inside [`Scheduler::run`]. Translation
//! calls run as spawned tasks and only hand their result back to the loop,
//! so the check-then-act on an event's resolution state is never raced:
//!
//! - publish finds the event resolved: release it now
//! - publish finds resolution pending: mark `PublishRequested`, return
//! - resolution completes on a `PublishRequested` event: release it immediately
//!
//! An event that is ready to go out is released through an id-ordered gate:
//! it is emitted only once every lower event id has been emitted, otherwise
//! it is held and drained by the emission that unblocks it. A slow
//! translation therefore delays the events after it instead of letting them
//! overtake. The terminator sits behind the whole gate.
//!
//! Sequence numbers are taken at the moment of delivery, so records reach the
//! sink in strictly increasing sequence order. Timers due at the same instant
//! fire in the order they were armed (ascending event id, resolve before
//! publish).

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};
use std::sync::Arc;
use std::time::Duration;

use edlcast_edl::{EventId, EventStore, ResolutionState};
use edlcast_timecode::Timecode;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::PublishConfig;
use crate::error::{PublishError, Result};
use crate::sink::{PublishedRecord, RecordSink};
use crate::translate::{TranslationRequest, Translator};

/// Offset from scheduler start at which an action with `lead` fires.
pub fn lead_offset(dest_start: &Timecode, lead: Duration) -> Duration {
    Duration::from_secs(dest_start.elapsed_seconds()).saturating_sub(lead)
}

/// Deferred work for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Action {
    Resolve(EventId),
    Publish(EventId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Timer {
    at: Duration,
    order: u64,
    action: Action,
}

/// Min-heap of timers; ties break on arming order.
#[derive(Debug, Default)]
struct TimerQueue {
    heap: BinaryHeap<Reverse<Timer>>,
    next_order: u64,
}

impl TimerQueue {
    fn push(&mut self, at: Duration, action: Action) {
        self.heap.push(Reverse(Timer {
            at,
            order: self.next_order,
            action,
        }));
        self.next_order += 1;
    }

    fn peek_at(&self) -> Option<Duration> {
        self.heap.peek().map(|Reverse(timer)| timer.at)
    }

    fn pop(&mut self) -> Option<Timer> {
        self.heap.pop().map(|Reverse(timer)| timer)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Outcome of a translation call, delivered back to the loop.
struct Completion {
    request: TranslationRequest,
    result: Result<String>,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Real events that were scheduled.
    pub events: usize,
    /// Records delivered, terminator included.
    pub emitted: u64,
    /// Events whose translation succeeded.
    pub resolved: usize,
    /// Events delivered without a deliverable URL.
    pub non_existent: usize,
    /// Records the sink refused.
    pub failed_deliveries: usize,
    pub terminator_sequence: Option<u64>,
}

/// Arms and runs the resolve and publish actions for an event store.
pub struct Scheduler<S: RecordSink> {
    config: PublishConfig,
    translator: Arc<dyn Translator>,
    sink: S,
    events: EventStore,
    next_sequence: u64,
    started: bool,
    terminator: Option<EventId>,
    terminator_requested: bool,
    /// Real event ids in emission order.
    order: Vec<EventId>,
    /// Position in `order` of the next event allowed out.
    cursor: usize,
    /// Events ready to go out but held behind a lower id.
    held: BTreeSet<EventId>,
    report: RunReport,
}

impl<S: RecordSink> Scheduler<S> {
    pub fn new(
        events: EventStore,
        config: PublishConfig,
        translator: Arc<dyn Translator>,
        sink: S,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            translator,
            sink,
            events,
            next_sequence: 0,
            started: false,
            terminator: None,
            terminator_requested: false,
            order: Vec::new(),
            cursor: 0,
            held: BTreeSet::new(),
            report: RunReport::default(),
        })
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Arm every timer, then drive them until all have fired and every
    /// translation call has come back.
    pub async fn run(&mut self) -> Result<RunReport> {
        if self.started {
            return Err(PublishError::AlreadyStarted);
        }
        if self.events.is_empty() {
            return Err(PublishError::EmptyStore);
        }
        self.started = true;

        let mut timers = self.arm();
        let start = Instant::now();
        let mut in_flight: JoinSet<Completion> = JoinSet::new();

        info!(events = self.order.len(), timers = timers.len(), "Scheduler started");

        loop {
            let next_at = timers.peek_at();
            if next_at.is_none() && in_flight.is_empty() {
                break;
            }
            let deadline = start + next_at.unwrap_or_default();

            tokio::select! {
                biased;

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    match joined {
                        Ok(completion) => {
                            let id = completion.request.event_id;
                            if let Err(e) = self.on_resolved(completion) {
                                error!(event_id = id, error = %e, "Resolution handling failed");
                            }
                        }
                        Err(e) => error!(error = %e, "Translation task aborted"),
                    }
                }
                () = tokio::time::sleep_until(deadline), if next_at.is_some() => {
                    if let Some(timer) = timers.pop() {
                        self.fire(timer.action, &mut in_flight);
                    }
                }
                else => break,
            }
        }

        self.sink.flush()?;
        info!(
            emitted = self.report.emitted,
            non_existent = self.report.non_existent,
            failed = self.report.failed_deliveries,
            "Scheduler finished"
        );
        Ok(self.report.clone())
    }

    fn arm(&mut self) -> TimerQueue {
        let mut timers = TimerQueue::default();
        let mut latest_publish = Duration::ZERO;
        let publish_lead = self.config.publish_lead();
        let resolve_lead = self.config.resolve_lead();

        for event in self.events.sorted() {
            let publish_at = lead_offset(&event.dest_start, publish_lead);
            let resolve_at = lead_offset(&event.dest_start, resolve_lead);
            latest_publish = latest_publish.max(publish_at);

            timers.push(resolve_at, Action::Resolve(event.event_id));
            timers.push(publish_at, Action::Publish(event.event_id));
            debug!(
                event_id = event.event_id,
                resolve_at = resolve_at.as_secs(),
                publish_at = publish_at.as_secs(),
                "Armed event"
            );
        }

        self.order = self.events.sorted_ids();
        self.report.events = self.order.len();

        let terminator = self.events.push_terminator();
        let terminator_at = latest_publish + self.config.terminator_delay();
        timers.push(terminator_at, Action::Publish(terminator));
        self.terminator = Some(terminator);
        debug!(event_id = terminator, publish_at = terminator_at.as_secs(), "Armed terminator");

        timers
    }

    fn fire(&mut self, action: Action, in_flight: &mut JoinSet<Completion>) {
        let result = match action {
            Action::Resolve(id) => self.on_resolve(id, in_flight),
            Action::Publish(id) => self.on_publish(id),
        };
        if let Err(e) = result {
            error!(?action, error = %e, "Scheduled action failed");
        }
    }

    fn on_resolve(&mut self, id: EventId, in_flight: &mut JoinSet<Completion>) -> Result<()> {
        let event = self.events.get_mut(id)?;

        let Some(request) = TranslationRequest::for_event(event) else {
            debug!(event_id = id, "Nothing to resolve");
            if event.mark_non_existent()? {
                self.release(id)?;
            }
            return Ok(());
        };

        event.begin_resolution()?;
        debug!(event_id = id, url = %request.url, "Resolution started");

        let translator = Arc::clone(&self.translator);
        in_flight.spawn(async move {
            let call = {
                let request = request.clone();
                tokio::spawn(async move { translator.translate(&request).await })
            };
            let result = call.await.unwrap_or_else(|e| {
                Err(PublishError::Translation(format!("translation task failed: {e}")))
            });
            Completion { request, result }
        });
        Ok(())
    }

    fn on_resolved(&mut self, completion: Completion) -> Result<()> {
        let Completion { request, result } = completion;
        let id = request.event_id;
        let event = self.events.get_mut(id)?;

        let publish_waiting = match result {
            Ok(url) => {
                debug!(event_id = id, url = %url, "Resolved");
                self.report.resolved += 1;
                event.complete_resolution(request.url, url)?
            }
            Err(e) => {
                warn!(event_id = id, error = %e, "Resolution failed; publishing without source");
                event.mark_non_existent()?
            }
        };

        if publish_waiting {
            info!(event_id = id, "Resolution finished after publish time; releasing now");
            self.release(id)?;
        }
        Ok(())
    }

    fn on_publish(&mut self, id: EventId) -> Result<()> {
        if self.terminator == Some(id) {
            return self.release(id);
        }

        let event = self.events.get_mut(id)?;
        if event.resolution_state.is_publishable() {
            self.release(id)
        } else {
            debug!(event_id = id, state = %event.resolution_state, "Publish deferred until resolved");
            event.request_publish()?;
            Ok(())
        }
    }

    /// Mark an event ready and emit everything the id-ordered gate lets out.
    fn release(&mut self, id: EventId) -> Result<()> {
        if self.terminator == Some(id) {
            self.terminator_requested = true;
        } else {
            self.held.insert(id);
        }

        while let Some(&next) = self.order.get(self.cursor) {
            if !self.held.remove(&next) {
                if !self.held.is_empty() || self.terminator_requested {
                    debug!(waiting_on = next, held = self.held.len(), "Holding events for earlier id");
                }
                return Ok(());
            }
            self.cursor += 1;
            self.emit(next)?;
        }

        if self.terminator_requested {
            self.terminator_requested = false;
            if let Some(terminator) = self.terminator {
                self.emit(terminator)?;
            }
        }
        Ok(())
    }

    fn emit(&mut self, id: EventId) -> Result<()> {
        let event = self.events.get_mut(id)?;
        event
            .mark_emitted()
            .map_err(|_| PublishError::DoubleEmission { event_id: id })?;

        let is_terminator = event.is_terminator();
        let non_existent = event.resolution_state == ResolutionState::NonExistent;
        let record = PublishedRecord {
            sequence_number: self.next_sequence,
            event: event.clone(),
        };

        match self.sink.publish(&record) {
            Ok(()) => {
                info!(
                    event_id = id,
                    sequence = record.sequence_number,
                    source = record.event.source_reference.as_str(),
                    "Published"
                );
                if is_terminator {
                    self.report.terminator_sequence = Some(record.sequence_number);
                }
                if non_existent {
                    self.report.non_existent += 1;
                }
                self.report.emitted += 1;
                self.next_sequence += 1;
            }
            Err(e) => {
                error!(event_id = id, error = %e, "Delivery failed");
                self.report.failed_deliveries += 1;
            }
        }

        Ok(())
    }
}
