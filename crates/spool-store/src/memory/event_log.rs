// [crates/spool-store/src/memory/event_log.rs]
//! Adaptador de referencia en memoria para [`EventLog`]. Fragmenta en lotes
//! de [`EVENT_BATCH_CHUNK_SIZE`] tal como exige §4.6/§6.2/§8.

use std::sync::RwLock;

use spool_domain::event::Event;
use tracing::{debug, instrument};

use crate::contracts::{EventLog, EVENT_BATCH_CHUNK_SIZE};
use crate::errors::StoreError;

#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: RwLock<Vec<Event>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self { events: RwLock::new(Vec::new()) }
    }

    /// Ayuda de prueba: total de eventos persistidos, sin filtrar.
    pub fn event_count(&self) -> usize {
        self.events.read().expect("event log lock poisoned").len()
    }
}

impl EventLog for MemoryEventLog {
    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn append(&self, events: Vec<Event>) -> Result<(), StoreError> {
        for chunk in events.chunks(EVENT_BATCH_CHUNK_SIZE) {
            debug!("  ↳ [EVENT_LOG]: appending chunk of {} events", chunk.len());
            self.events.write().expect("event log lock poisoned").extend_from_slice(chunk);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read_by_tag(&self, tag: &str) -> Result<Vec<Event>, StoreError> {
        let mut matching: Vec<Event> =
            self.events.read().expect("event log lock poisoned").iter().filter(|e| e.tag == tag).cloned().collect();
        matching.sort_by_key(|e| e.timestamp);
        Ok(matching)
    }

    #[instrument(skip(self))]
    async fn last_event_for_tag(&self, tag: &str) -> Result<Option<Event>, StoreError> {
        Ok(self.read_by_tag(tag).await?.into_iter().last())
    }
}
