// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Entities, event types and events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

/// Stable identity of a schedulable participant.
///
/// Ids come from a counter that survives [`EventEngine::reset`], so an id
/// from a previous run never aliases a new entity.
///
/// [`EventEngine::reset`]: super::EventEngine::reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Name and description of an event type.
#[derive(Debug)]
pub struct EventTypeInfo {
    pub name: String,
    pub description: String,
}

/// Tag classifying events.
///
/// Two event types are equal only if they are the same allocation; a
/// second `EventType::new("X", ..)` is a different type even with the same
/// name.
#[derive(Clone)]
pub struct EventType(Arc<EventTypeInfo>);

impl EventType {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self(Arc::new(EventTypeInfo {
            name: name.into(),
            description: description.into(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn description(&self) -> &str {
        &self.0.description
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventType({})", self.0.name)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Raised on a port when a message is delivered to its input.
pub static PORT_INPUT: LazyLock<EventType> =
    LazyLock::new(|| EventType::new("PORT_INPUT", "Message received on port input"));

/// Raised on a port when a message leaves through its output.
pub static PORT_OUTPUT: LazyLock<EventType> =
    LazyLock::new(|| EventType::new("PORT_OUTPUT", "Message sent on port output"));

/// Raised on a channel when a transmitted message reaches the far end.
pub static CHANNEL_DELIVERED: LazyLock<EventType> =
    LazyLock::new(|| EventType::new("CHANNEL_DELIVERED", "Channel delivered a message"));

/// An occurrence of an event type, emitted by an entity at a given time.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub source: EntityId,
    pub event_type: EventType,
    pub time: f64,
    /// Scheduling order; breaks ties between events at equal time.
    pub seq: u64,
}
