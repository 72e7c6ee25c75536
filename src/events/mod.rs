// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Discrete-event engine.
//!
//! A logical-clock scheduler over entities, event types, handlers and
//! boolean event expressions. Events are totally ordered by
//! `(time, sequence id)`, so events at equal time fire in the order they
//! were scheduled and a fixed seed replays bit-identically.
//!
//! The engine only stores state. The run loop lives on
//! [`Simulation`](crate::simulation::Simulation) because handlers receive
//! the whole simulation context mutably.

pub mod entity;
pub mod expression;
pub mod scheduler;

pub use entity::{
    EntityId, Event, EventType, EventTypeInfo, CHANNEL_DELIVERED, PORT_INPUT, PORT_OUTPUT,
};
pub use expression::{EventExpression, Evaluation, Trigger};
pub use scheduler::{EventEngine, Handler, HandlerId, SimStats};
