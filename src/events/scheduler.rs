// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Event queue, simulation clock and handler registry.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::fmt;
use tracing::debug;

use super::entity::{EntityId, Event, EventType};
use super::expression::{EventExpression, Trigger};
use crate::error::{Result, SchedulerError};
use crate::simulation::Simulation;

/// Callback invoked when a registered expression becomes true.
pub type Handler = Box<dyn FnMut(&mut Simulation, &Trigger) -> Result<()>>;

/// Internal work attached to a queued event. Runs before handlers see the
/// event.
pub(crate) type Action = Box<dyn FnOnce(&mut Simulation) -> Result<()>>;

/// Token returned by a wait registration; pass it to `dismiss` to cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(pub u64);

struct Registration {
    owner: EntityId,
    expression: EventExpression,
    once: bool,
    /// `None` while the handler is executing.
    handler: Option<Handler>,
}

pub(crate) struct QueueEntry {
    pub(crate) event: Event,
    pub(crate) action: Option<Action>,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Reversed: BinaryHeap is a max-heap, we pop the earliest (time, seq).
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .event
            .time
            .total_cmp(&self.event.time)
            .then_with(|| other.event.seq.cmp(&self.event.seq))
    }
}

/// Aggregate statistics of one `run` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimStats {
    /// Events popped and dispatched
    pub events_processed: u64,
    /// Handler or action failures (logged, not fatal)
    pub handler_errors: u64,
    /// Quantum state operations performed
    pub quantum_operations: u64,
    /// Largest state group observed during the run
    pub max_qstate_size: usize,
    /// Simulated time when the run started
    pub sim_start_time: f64,
    /// Simulated time when the run stopped
    pub sim_end_time: f64,
    /// Wall-clock duration in seconds
    pub wall_time_secs: f64,
}

impl SimStats {
    pub fn sim_duration(&self) -> f64 {
        self.sim_end_time - self.sim_start_time
    }
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events in sim time {}..{} ({:.3}s wall), {} handler errors, \
             {} quantum ops, max group size {}",
            self.events_processed,
            self.sim_start_time,
            self.sim_end_time,
            self.wall_time_secs,
            self.handler_errors,
            self.quantum_operations,
            self.max_qstate_size
        )
    }
}

/// Scheduler state: clock, queue, entities and handler registrations.
pub struct EventEngine {
    now: f64,
    queue: BinaryHeap<QueueEntry>,
    next_seq: u64,
    next_entity: u64,
    next_handler: u64,
    entities: BTreeMap<EntityId, String>,
    handlers: BTreeMap<HandlerId, Registration>,
    running: bool,
}

impl Default for EventEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEngine {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            queue: BinaryHeap::new(),
            next_seq: 0,
            next_entity: 0,
            next_handler: 0,
            entities: BTreeMap::new(),
            handlers: BTreeMap::new(),
            running: false,
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of queued events.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Time of the earliest queued event.
    pub fn peek_time(&self) -> Option<f64> {
        self.queue.peek().map(|e| e.event.time)
    }

    pub fn add_entity(&mut self, name: impl Into<String>) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        self.entities.insert(id, name.into());
        id
    }

    pub fn entity_name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(&id).map(String::as_str)
    }

    /// Schedule an event `delay` time units from now.
    pub fn schedule_after(
        &mut self,
        source: EntityId,
        event_type: &EventType,
        delay: f64,
    ) -> Result<Event> {
        self.push(source, event_type, delay, None)
    }

    /// Schedule an event at the current time, after every event already
    /// queued for this time.
    pub fn schedule_now(&mut self, source: EntityId, event_type: &EventType) -> Result<Event> {
        self.push(source, event_type, 0.0, None)
    }

    /// Schedule an event at an absolute time, which must not be in the past.
    pub fn schedule_at(
        &mut self,
        source: EntityId,
        event_type: &EventType,
        time: f64,
    ) -> Result<Event> {
        self.push(source, event_type, time - self.now, None)
    }

    pub(crate) fn schedule_action(
        &mut self,
        source: EntityId,
        event_type: &EventType,
        delay: f64,
        action: Action,
    ) -> Result<Event> {
        self.push(source, event_type, delay, Some(action))
    }

    fn push(
        &mut self,
        source: EntityId,
        event_type: &EventType,
        delay: f64,
        action: Option<Action>,
    ) -> Result<Event> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SchedulerError::InvalidDelay(delay).into());
        }
        let event = Event {
            source,
            event_type: event_type.clone(),
            time: self.now + delay,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        debug!(
            source = %source,
            event_type = %event_type,
            time = event.time,
            seq = event.seq,
            "Scheduled event"
        );
        self.queue.push(QueueEntry {
            event: event.clone(),
            action,
        });
        Ok(event)
    }

    /// Register `handler` to fire whenever `expression` becomes true.
    /// With `once`, the registration is consumed by its first firing;
    /// otherwise the expression re-arms after each firing.
    pub fn register(
        &mut self,
        owner: EntityId,
        expression: EventExpression,
        handler: Handler,
        once: bool,
    ) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        self.handlers.insert(
            id,
            Registration {
                owner,
                expression,
                once,
                handler: Some(handler),
            },
        );
        id
    }

    /// Cancel a registration. Returns false if it was already gone.
    pub fn dismiss(&mut self, id: HandlerId) -> bool {
        self.handlers.remove(&id).is_some()
    }

    /// Cancel every registration owned by `owner`. Returns how many were
    /// removed.
    pub fn dismiss_all(&mut self, owner: EntityId) -> usize {
        let before = self.handlers.len();
        self.handlers.retain(|_, reg| reg.owner != owner);
        before - self.handlers.len()
    }

    pub fn num_handlers(&self) -> usize {
        self.handlers.len()
    }

    /// Whether any registration could react to `event_type` from `source`.
    pub fn has_waiter_for(&self, source: EntityId, event_type: &EventType) -> bool {
        self.handlers
            .values()
            .any(|reg| reg.expression.could_match(source, event_type))
    }

    /// Clear queue, clock, entities and registrations. Entity and handler
    /// counters keep counting.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.now = 0.0;
        self.next_seq = 0;
        self.entities.clear();
        self.handlers.clear();
    }

    pub(crate) fn begin_run(&mut self) -> Result<()> {
        if self.running {
            return Err(SchedulerError::AlreadyRunning.into());
        }
        self.running = true;
        Ok(())
    }

    pub(crate) fn end_run(&mut self) {
        self.running = false;
    }

    /// Pop the earliest event if it lies within `bound`.
    pub(crate) fn pop_due(&mut self, bound: Option<f64>) -> Option<QueueEntry> {
        let next = self.queue.peek()?.event.time;
        if bound.is_some_and(|b| next > b) {
            return None;
        }
        self.queue.pop()
    }

    pub(crate) fn advance_to(&mut self, time: f64) -> Result<()> {
        if time < self.now {
            return Err(SchedulerError::ClockRollback {
                now: self.now,
                event_time: time,
            }
            .into());
        }
        self.now = time;
        Ok(())
    }

    pub(crate) fn handler_ids(&self) -> Vec<HandlerId> {
        self.handlers.keys().copied().collect()
    }

    /// Offer an event to one registration. If its expression becomes true,
    /// the handler is checked out together with the trigger; the caller
    /// must hand it back with [`restore`](Self::restore).
    pub(crate) fn offer(&mut self, id: HandlerId, event: &Event) -> Option<(Handler, Trigger)> {
        let reg = self.handlers.get_mut(&id)?;
        if !reg.expression.update(event) || !reg.expression.value() {
            return None;
        }
        let handler = reg.handler.take()?;
        let trigger = Trigger {
            handler: id,
            event: event.clone(),
            expression: reg.expression.clone(),
        };
        let once = reg.once;
        if !once {
            reg.expression.reset();
        }
        if once {
            self.handlers.remove(&id);
        }
        Some((handler, trigger))
    }

    /// Return a checked-out handler. Dropped if the registration was
    /// consumed or dismissed meanwhile.
    pub(crate) fn restore(&mut self, id: HandlerId, handler: Handler) {
        if let Some(reg) = self.handlers.get_mut(&id) {
            reg.handler = Some(handler);
        }
    }
}
