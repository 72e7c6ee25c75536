// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Boolean event expressions.
//!
//! An expression is a tree of atomic `(source, event type)` terms joined by
//! AND / OR. Atomic terms remember the last event that matched them. The
//! tree evaluates as:
//!
//! | node   | value           | trigger time                |
//! |--------|-----------------|-----------------------------|
//! | Atomic | matched yet?    | time of the matched event   |
//! | And    | both children   | max of the children's times |
//! | Or     | either child    | min of the triggered times  |
//!
//! `a | b` and `a & b` build `Or` and `And` nodes.

use std::ops::{BitAnd, BitOr};

use super::entity::{EntityId, Event, EventType};
use super::scheduler::HandlerId;

/// Tree of event conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum EventExpression {
    /// Matches events from `source` of `event_type`. `None` is a wildcard.
    Atomic {
        source: Option<EntityId>,
        event_type: Option<EventType>,
        triggered: Option<Event>,
    },
    And(Box<EventExpression>, Box<EventExpression>),
    Or(Box<EventExpression>, Box<EventExpression>),
}

/// Result of evaluating an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub satisfied: bool,
    pub trigger_time: Option<f64>,
    /// Events of the atomic terms that make the expression true.
    pub contributing: Vec<Event>,
}

/// Passed to a handler when its expression becomes true.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub handler: HandlerId,
    /// The event whose dispatch completed the expression.
    pub event: Event,
    /// Snapshot of the expression at the moment it fired.
    pub expression: EventExpression,
}

impl EventExpression {
    /// Term matching `event_type` events from `source`.
    pub fn atomic(source: EntityId, event_type: &EventType) -> Self {
        EventExpression::Atomic {
            source: Some(source),
            event_type: Some(event_type.clone()),
            triggered: None,
        }
    }

    /// Term matching `event_type` events from any entity.
    pub fn any_source(event_type: &EventType) -> Self {
        EventExpression::Atomic {
            source: None,
            event_type: Some(event_type.clone()),
            triggered: None,
        }
    }

    /// Term matching every event emitted by `source`.
    pub fn any_type(source: EntityId) -> Self {
        EventExpression::Atomic {
            source: Some(source),
            event_type: None,
            triggered: None,
        }
    }

    /// Whether an atomic filter accepts this source and type.
    fn filter_accepts(
        source: &Option<EntityId>,
        event_type: &Option<EventType>,
        s: EntityId,
        t: &EventType,
    ) -> bool {
        source.map_or(true, |src| src == s) && event_type.as_ref().map_or(true, |et| et == t)
    }

    /// Feed a dispatched event into the tree. Returns true if any term
    /// matched.
    pub fn update(&mut self, event: &Event) -> bool {
        match self {
            EventExpression::Atomic {
                source,
                event_type,
                triggered,
            } => {
                if Self::filter_accepts(source, event_type, event.source, &event.event_type) {
                    *triggered = Some(event.clone());
                    true
                } else {
                    false
                }
            }
            EventExpression::And(a, b) | EventExpression::Or(a, b) => {
                let left = a.update(event);
                let right = b.update(event);
                left || right
            }
        }
    }

    /// Whether some atomic term would accept an event of `event_type` from
    /// `source`.
    pub fn could_match(&self, source: EntityId, event_type: &EventType) -> bool {
        match self {
            EventExpression::Atomic {
                source: s,
                event_type: t,
                ..
            } => Self::filter_accepts(s, t, source, event_type),
            EventExpression::And(a, b) | EventExpression::Or(a, b) => {
                a.could_match(source, event_type) || b.could_match(source, event_type)
            }
        }
    }

    pub fn value(&self) -> bool {
        match self {
            EventExpression::Atomic { triggered, .. } => triggered.is_some(),
            EventExpression::And(a, b) => a.value() && b.value(),
            EventExpression::Or(a, b) => a.value() || b.value(),
        }
    }

    pub fn trigger_time(&self) -> Option<f64> {
        match self {
            EventExpression::Atomic { triggered, .. } => triggered.as_ref().map(|e| e.time),
            EventExpression::And(a, b) => match (a.trigger_time(), b.trigger_time()) {
                (Some(x), Some(y)) => Some(x.max(y)),
                _ => None,
            },
            EventExpression::Or(a, b) => match (a.trigger_time(), b.trigger_time()) {
                (Some(x), Some(y)) => Some(x.min(y)),
                (x, y) => x.or(y),
            },
        }
    }

    /// Left operand of an And / Or node.
    pub fn first_term(&self) -> Option<&EventExpression> {
        match self {
            EventExpression::And(a, _) | EventExpression::Or(a, _) => Some(a),
            EventExpression::Atomic { .. } => None,
        }
    }

    /// Right operand of an And / Or node.
    pub fn second_term(&self) -> Option<&EventExpression> {
        match self {
            EventExpression::And(_, b) | EventExpression::Or(_, b) => Some(b),
            EventExpression::Atomic { .. } => None,
        }
    }

    /// Every event currently held by an atomic term, left to right.
    pub fn triggered_events(&self) -> Vec<&Event> {
        let mut out = Vec::new();
        self.collect_triggered(&mut out);
        out
    }

    fn collect_triggered<'a>(&'a self, out: &mut Vec<&'a Event>) {
        match self {
            EventExpression::Atomic { triggered, .. } => {
                if let Some(e) = triggered {
                    out.push(e);
                }
            }
            EventExpression::And(a, b) | EventExpression::Or(a, b) => {
                a.collect_triggered(out);
                b.collect_triggered(out);
            }
        }
    }

    /// Evaluate the tree, keeping only events from satisfied branches.
    pub fn evaluate(&self) -> Evaluation {
        let mut contributing = Vec::new();
        if self.value() {
            self.collect_satisfying(&mut contributing);
        }
        Evaluation {
            satisfied: self.value(),
            trigger_time: self.trigger_time(),
            contributing,
        }
    }

    fn collect_satisfying(&self, out: &mut Vec<Event>) {
        match self {
            EventExpression::Atomic { triggered, .. } => {
                if let Some(e) = triggered {
                    out.push(e.clone());
                }
            }
            EventExpression::And(a, b) => {
                a.collect_satisfying(out);
                b.collect_satisfying(out);
            }
            EventExpression::Or(a, b) => {
                if a.value() {
                    a.collect_satisfying(out);
                }
                if b.value() {
                    b.collect_satisfying(out);
                }
            }
        }
    }

    /// Forget all matched events.
    pub fn reset(&mut self) {
        match self {
            EventExpression::Atomic { triggered, .. } => *triggered = None,
            EventExpression::And(a, b) | EventExpression::Or(a, b) => {
                a.reset();
                b.reset();
            }
        }
    }
}

impl BitOr for EventExpression {
    type Output = EventExpression;

    fn bitor(self, rhs: Self) -> Self::Output {
        EventExpression::Or(Box::new(self), Box::new(rhs))
    }
}

impl BitAnd for EventExpression {
    type Output = EventExpression;

    fn bitand(self, rhs: Self) -> Self::Output {
        EventExpression::And(Box::new(self), Box::new(rhs))
    }
}
