// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Simulation context.
//!
//! [`Simulation`] owns the event engine, the quantum state engine, the
//! component network and the single random stream. Handlers receive it
//! mutably, so everything a protocol needs is reachable from one value and
//! independent simulations never share state.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::components::Network;
use crate::config::Config;
use crate::error::{Result, SchedulerError};
use crate::events::{
    EntityId, Event, EventEngine, EventExpression, EventType, Handler, HandlerId, SimStats,
};
use crate::qubits::QuantumEngine;

pub struct Simulation {
    pub events: EventEngine,
    pub qstate: QuantumEngine,
    pub network: Network,
    pub rng: StdRng,
}

impl Simulation {
    pub fn new(config: &Config) -> Self {
        Self {
            events: EventEngine::new(),
            qstate: QuantumEngine::new(
                config.simulation.formalism,
                config.limits.max_group_qubits,
            ),
            network: Network::new(),
            rng: StdRng::seed_from_u64(config.simulation.seed),
        }
    }

    /// Default configuration with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        let mut config = Config::default();
        config.simulation.seed = seed;
        Self::new(&config)
    }

    /// Persistent handler for `expression`; it re-arms after each firing.
    pub fn wait(&mut self, owner: EntityId, expression: EventExpression, handler: Handler) -> HandlerId {
        self.events.register(owner, expression, handler, false)
    }

    /// Handler consumed by its first firing.
    pub fn wait_once(
        &mut self,
        owner: EntityId,
        expression: EventExpression,
        handler: Handler,
    ) -> HandlerId {
        self.events.register(owner, expression, handler, true)
    }

    pub fn dismiss(&mut self, id: HandlerId) -> bool {
        self.events.dismiss(id)
    }

    pub fn dismiss_all(&mut self, owner: EntityId) -> usize {
        self.events.dismiss_all(owner)
    }

    /// Drop all events, handlers, qubits and components and rewind the
    /// clock. The random stream continues where it was.
    pub fn reset(&mut self) {
        self.events.reset();
        self.qstate.reset();
        self.network.reset();
        info!("Simulation reset");
    }

    /// Process events in `(time, seq)` order. With `end_time` (absolute) or
    /// `duration` (relative to now), events after the bound stay queued and
    /// the clock finishes at the bound. Failing handlers and actions are
    /// logged and counted; only clock errors abort the run.
    #[instrument(skip(self))]
    pub fn run(&mut self, end_time: Option<f64>, duration: Option<f64>) -> Result<SimStats> {
        let start = self.events.now();
        let bound = match (end_time, duration) {
            (Some(_), Some(_)) => {
                return Err(SchedulerError::InvalidRunBound(
                    "end_time and duration are mutually exclusive".into(),
                )
                .into())
            }
            (Some(t), None) => Some(t),
            (None, Some(d)) => Some(start + d),
            (None, None) => None,
        };
        if let Some(b) = bound {
            if !b.is_finite() || b < start {
                return Err(SchedulerError::InvalidRunBound(format!(
                    "bound {} is before current time {}",
                    b, start
                ))
                .into());
            }
        }

        self.events.begin_run()?;
        let wall = Instant::now();
        let ops_before = self.qstate.operation_count();
        self.qstate.reset_peak();
        let mut stats = SimStats {
            sim_start_time: start,
            ..Default::default()
        };
        info!(start, bound = ?bound, pending = self.events.pending(), "Simulation run started");

        let outcome = self.process(bound, &mut stats);
        self.events.end_run();
        outcome?;
        if let Some(b) = bound {
            self.events.advance_to(b)?;
        }

        stats.sim_end_time = self.events.now();
        stats.wall_time_secs = wall.elapsed().as_secs_f64();
        stats.quantum_operations = self.qstate.operation_count().saturating_sub(ops_before);
        stats.max_qstate_size = self.qstate.peak_group_size();
        info!(
            events = stats.events_processed,
            handler_errors = stats.handler_errors,
            end = stats.sim_end_time,
            "Simulation run finished"
        );
        Ok(stats)
    }

    fn process(&mut self, bound: Option<f64>, stats: &mut SimStats) -> Result<()> {
        while let Some(entry) = self.events.pop_due(bound) {
            self.events.advance_to(entry.event.time)?;
            stats.events_processed += 1;
            debug!(
                source = %entry.event.source,
                event_type = %entry.event.event_type,
                time = entry.event.time,
                seq = entry.event.seq,
                "Dispatching event"
            );
            if let Some(action) = entry.action {
                if let Err(e) = action(self) {
                    stats.handler_errors += 1;
                    warn!(event_type = %entry.event.event_type, error = %e, "Event action failed");
                }
            }
            self.dispatch(&entry.event, stats);
        }
        Ok(())
    }

    /// Offer `event` to every registration present before dispatch began.
    fn dispatch(&mut self, event: &Event, stats: &mut SimStats) {
        for id in self.events.handler_ids() {
            let Some((mut handler, trigger)) = self.events.offer(id, event) else {
                continue;
            };
            if let Err(e) = handler(self, &trigger) {
                stats.handler_errors += 1;
                warn!(
                    handler = id.0,
                    event_type = %event.event_type,
                    error = %e,
                    "Event handler failed"
                );
            }
            self.events.restore(id, handler);
        }
    }

    /// Two entities bouncing `PING` and `PONG` events `delay` apart. The
    /// first `PING` fires at `delay`.
    pub fn install_ping_pong(&mut self, delay: f64) -> Result<[EntityId; 2]> {
        let ping = self.events.add_entity("ping");
        let pong = self.events.add_entity("pong");
        let ping_type = EventType::new("PING", "Ping sent");
        let pong_type = EventType::new("PONG", "Pong sent");

        let reply = pong_type.clone();
        self.wait(
            pong,
            EventExpression::atomic(ping, &ping_type),
            Box::new(move |sim, _| sim.events.schedule_after(pong, &reply, delay).map(|_| ())),
        );
        let reply = ping_type.clone();
        self.wait(
            ping,
            EventExpression::atomic(pong, &pong_type),
            Box::new(move |sim, _| sim.events.schedule_after(ping, &reply, delay).map(|_| ())),
        );
        self.events.schedule_after(ping, &ping_type, delay)?;
        Ok([ping, pong])
    }
}
