use std::collections::HashMap;
use std::fmt;

use log::debug;

use super::connect::CONNECT_EVENT_TYPE;
use super::event::EventData;
use super::heartbleed::HEARTBLEED_EVENT_TYPE;
use super::tls::TLS_HANDSHAKE_EVENT_TYPE;
use crate::error_handling::types::{CodecError, RegistryError};

/// Descriptor for one event kind: its wire tag and a factory for an empty,
/// decodable payload.
#[derive(Clone, Copy)]
pub struct EventType {
    pub name: &'static str,
    make_empty: fn() -> Box<dyn EventData>,
}

impl EventType {
    pub const fn new(name: &'static str, make_empty: fn() -> Box<dyn EventData>) -> Self {
        Self { name, make_empty }
    }

    pub fn empty_instance(&self) -> Box<dyn EventData> {
        (self.make_empty)()
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventType").field("name", &self.name).finish()
    }
}

/// Maps wire tags to [`EventType`] descriptors.
///
/// Populate it once during startup, then share it read-only (typically behind
/// an `Arc`) with every worker and decoder. There is no interior mutability,
/// so lookups from many tasks need no locking.
#[derive(Debug, Default, Clone)]
pub struct EventTypeRegistry {
    types: HashMap<&'static str, EventType>,
}

impl EventTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every event kind this crate ships with.
    pub fn with_defaults() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(CONNECT_EVENT_TYPE)?;
        registry.register(TLS_HANDSHAKE_EVENT_TYPE)?;
        registry.register(HEARTBLEED_EVENT_TYPE)?;
        Ok(registry)
    }

    /// Adds a descriptor. Fails if its name is already taken, or if the
    /// payload it builds reports a different tag; the registry is left
    /// untouched in both cases.
    pub fn register(&mut self, event_type: EventType) -> Result<(), RegistryError> {
        if self.types.contains_key(event_type.name) {
            return Err(RegistryError::DuplicateTypeName(event_type.name.to_string()));
        }
        let reported = event_type.empty_instance().event_type();
        if reported != event_type.name {
            return Err(RegistryError::NameMismatch {
                registered: event_type.name.to_string(),
                reported: reported.to_string(),
            });
        }
        debug!("Registered event type {}", event_type.name);
        self.types.insert(event_type.name, event_type);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&EventType, CodecError> {
        self.types
            .get(name)
            .ok_or_else(|| CodecError::UnknownEventType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.types.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
