//! Authoritative event collection for one program.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::event::{Event, EventId};

/// Events keyed by id. Iteration order is arbitrary; use
/// [`EventStore::sorted_ids`] for publication order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventStore {
    events: HashMap<EventId, Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, event: Event) -> Result<()> {
        if self.events.contains_key(&event.event_id) {
            return Err(Error::DuplicateEvent(event.event_id));
        }
        self.events.insert(event.event_id, event);
        Ok(())
    }

    pub fn remove(&mut self, id: EventId) -> Option<Event> {
        self.events.remove(&id)
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    pub fn get_mut(&mut self, id: EventId) -> Result<&mut Event> {
        self.events.get_mut(&id).ok_or(Error::UnknownEvent(id))
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.events.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    /// Event ids in ascending order.
    pub fn sorted_ids(&self) -> Vec<EventId> {
        let mut ids: Vec<EventId> = self.events.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Events in ascending id order.
    pub fn sorted(&self) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.events.values().collect();
        events.sort_by_key(|e| e.event_id);
        events
    }

    pub fn max_event_id(&self) -> Option<EventId> {
        self.events.keys().copied().max()
    }

    /// Append the end-of-program event after the highest id.
    pub fn push_terminator(&mut self) -> EventId {
        let id = self.max_event_id().map_or(1, |max| max + 1);
        self.events.insert(id, Event::terminator(id));
        id
    }
}
