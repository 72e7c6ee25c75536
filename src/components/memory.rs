// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quantum memory with lazily applied idle noise.
//!
//! Each position remembers when its qubit was last touched. Noise for the
//! idle interval is applied on the next `put`, `pop`, `operate` or
//! `measure` of that position, never in the background. `peek` does not
//! count as a touch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::rc::Rc;
use tracing::debug;

use super::component::{ComponentId, ComponentKind};
use super::message::Message;
use super::models::{ErrorModelConfig, QuantumErrorModel};
use crate::error::{NetworkError, QStateError, Result};
use crate::qubits::{Operator, QubitId};
use crate::simulation::Simulation;

#[derive(Debug, Clone)]
pub struct MemoryPosition {
    qubit: Option<QubitId>,
    noise_model: Option<Rc<dyn QuantumErrorModel>>,
    last_access: f64,
}

impl MemoryPosition {
    pub fn qubit(&self) -> Option<QubitId> {
        self.qubit
    }

    pub fn is_empty(&self) -> bool {
        self.qubit.is_none()
    }

    /// Simulated time of the last touch.
    pub fn last_access(&self) -> f64 {
        self.last_access
    }
}

/// Runtime state of a memory component.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    positions: Vec<MemoryPosition>,
}

impl MemoryState {
    fn new(num_positions: usize, noise_model: Option<Rc<dyn QuantumErrorModel>>) -> Self {
        let positions = (0..num_positions)
            .map(|_| MemoryPosition {
                qubit: None,
                noise_model: noise_model.clone(),
                last_access: 0.0,
            })
            .collect();
        Self { positions }
    }

    pub fn num_positions(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[MemoryPosition] {
        &self.positions
    }

    /// Indices of empty positions, ascending.
    pub fn free_positions(&self) -> Vec<usize> {
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_empty())
            .map(|(i, _)| i)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub num_positions: usize,
    /// Idle noise applied to every position
    #[serde(default)]
    pub noise_model: Option<ErrorModelConfig>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            num_positions: 1,
            noise_model: None,
        }
    }
}

impl Simulation {
    /// Add a top-level quantum memory with ports `qin`, `qin0`..`qin{n-1}`
    /// and `qout`.
    pub fn add_memory(&mut self, name: impl Into<String>, config: &MemoryConfig) -> Result<ComponentId> {
        let noise = config.noise_model.as_ref().map(|m| m.build()).transpose()?;
        let state = MemoryState::new(config.num_positions, noise);
        let id = self.add_component_of_kind(name.into(), ComponentKind::Memory(state));
        self.add_ports(id, &["qin", "qout"])?;
        for i in 0..config.num_positions {
            self.add_port(id, &format!("qin{}", i))?;
        }
        Ok(id)
    }

    fn memory_state(&self, memory: ComponentId) -> Result<&MemoryState> {
        let c = self.network.component(memory)?;
        match &c.kind {
            ComponentKind::Memory(state) => Ok(state),
            _ => Err(wrong_kind(&c.name)),
        }
    }

    fn memory_state_mut(&mut self, memory: ComponentId) -> Result<&mut MemoryState> {
        let c = self.network.component_mut(memory)?;
        match &mut c.kind {
            ComponentKind::Memory(state) => Ok(state),
            _ => Err(wrong_kind(&c.name)),
        }
    }

    /// Fail unless every position exists and none repeats.
    fn check_positions(&self, memory: ComponentId, positions: &[usize]) -> Result<()> {
        let num_positions = self.memory_state(memory)?.num_positions();
        let mut seen = BTreeSet::new();
        for &position in positions {
            if position >= num_positions || !seen.insert(position) {
                return Err(NetworkError::InvalidPosition {
                    memory: self.network.component(memory)?.name.clone(),
                    position,
                    num_positions,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Qubits at `positions`, failing on the first empty one.
    fn occupied(&self, memory: ComponentId, positions: &[usize]) -> Result<Vec<QubitId>> {
        let name = &self.network.component(memory)?.name;
        let state = self.memory_state(memory)?;
        positions
            .iter()
            .map(|&position| {
                state.positions[position].qubit.ok_or_else(|| {
                    NetworkError::EmptyPosition {
                        memory: name.clone(),
                        position,
                    }
                    .into()
                })
            })
            .collect()
    }

    /// Apply idle noise due at `position` and mark it touched now.
    fn touch(&mut self, memory: ComponentId, position: usize) -> Result<()> {
        let now = self.events.now();
        let c = self.network.component(memory)?;
        let properties = c.properties.clone();
        let fallback = c.models.quantum_noise.clone();
        let slot = &self.memory_state(memory)?.positions[position];
        let elapsed = now - slot.last_access;
        if let (Some(q), Some(model)) = (slot.qubit, slot.noise_model.clone().or(fallback)) {
            if elapsed > 0.0 && self.qstate.is_assigned(q) {
                debug!(memory = %memory, position, elapsed, "Applying idle noise");
                model.error_operation(&mut self.qstate, &[q], elapsed, &properties, &mut self.rng)?;
            }
        }
        self.memory_state_mut(memory)?.positions[position].last_access = now;
        Ok(())
    }

    /// Store `qubits`, at `positions` if given or in the lowest free
    /// positions otherwise. A qubit already held at a target position is
    /// discarded.
    pub fn memory_put(
        &mut self,
        memory: ComponentId,
        qubits: &[QubitId],
        positions: Option<&[usize]>,
    ) -> Result<()> {
        let targets = match positions {
            Some(positions) => {
                if positions.len() != qubits.len() {
                    return Err(QStateError::DimensionMismatch {
                        expected: qubits.len(),
                        actual: positions.len(),
                    }
                    .into());
                }
                positions.to_vec()
            }
            None => {
                let free = self.memory_state(memory)?.free_positions();
                if free.len() < qubits.len() {
                    return Err(NetworkError::MemoryFull {
                        memory: self.network.component(memory)?.name.clone(),
                        requested: qubits.len(),
                        free: free.len(),
                    }
                    .into());
                }
                free[..qubits.len()].to_vec()
            }
        };
        self.check_positions(memory, &targets)?;

        let now = self.events.now();
        for (&q, &position) in qubits.iter().zip(&targets) {
            let old = self.memory_state(memory)?.positions[position].qubit;
            if old == Some(q) {
                self.touch(memory, position)?;
            } else if let Some(old) = old {
                if self.qstate.is_assigned(old) {
                    self.qstate.discard(old, &mut self.rng)?;
                }
                debug!(memory = %memory, position, qubit = %old, "Overwrote memory position");
            }
            let slot = &mut self.memory_state_mut(memory)?.positions[position];
            slot.qubit = Some(q);
            slot.last_access = now;
        }
        debug!(memory = %memory, positions = ?targets, "Stored qubits");
        Ok(())
    }

    /// Remove and return the qubits at `positions`, after idle noise. The
    /// qubits are also sent out through `qout`.
    pub fn memory_pop(&mut self, memory: ComponentId, positions: &[usize]) -> Result<Vec<QubitId>> {
        self.check_positions(memory, positions)?;
        let qubits = self.occupied(memory, positions)?;
        for &position in positions {
            self.touch(memory, position)?;
        }
        let state = self.memory_state_mut(memory)?;
        for &position in positions {
            state.positions[position].qubit = None;
        }
        let qout = self.network.port_of(memory, "qout")?;
        self.tx_output(qout, Message::from_qubits(&qubits))?;
        Ok(qubits)
    }

    /// Qubits at `positions` without removing them or applying noise.
    pub fn memory_peek(&self, memory: ComponentId, positions: &[usize]) -> Result<Vec<Option<QubitId>>> {
        self.check_positions(memory, positions)?;
        let state = self.memory_state(memory)?;
        Ok(positions.iter().map(|&p| state.positions[p].qubit).collect())
    }

    /// Apply `op` to the qubits at `positions`, in order.
    pub fn memory_operate(&mut self, memory: ComponentId, positions: &[usize], op: &Operator) -> Result<()> {
        self.check_positions(memory, positions)?;
        let qubits = self.occupied(memory, positions)?;
        for &position in positions {
            self.touch(memory, position)?;
        }
        self.qstate.operate(&qubits, op)
    }

    /// Measure the qubits at `positions` in the eigenbasis of `observable`.
    /// With `discard`, the measured qubits leave the memory.
    pub fn memory_measure(
        &mut self,
        memory: ComponentId,
        positions: &[usize],
        observable: &Operator,
        discard: bool,
    ) -> Result<(Vec<u8>, Vec<f64>)> {
        self.check_positions(memory, positions)?;
        let qubits = self.occupied(memory, positions)?;
        for &position in positions {
            self.touch(memory, position)?;
        }
        let result = self.qstate.measure(&qubits, observable, discard, &mut self.rng)?;
        if discard {
            let state = self.memory_state_mut(memory)?;
            for &position in positions {
                state.positions[position].qubit = None;
            }
        }
        Ok(result)
    }

    /// Replace the idle noise model of one position.
    pub fn set_position_noise(
        &mut self,
        memory: ComponentId,
        position: usize,
        model: Option<Rc<dyn QuantumErrorModel>>,
    ) -> Result<()> {
        self.check_positions(memory, &[position])?;
        if let Some(model) = &model {
            self.network
                .check_properties(memory, model.required_properties())?;
        }
        self.memory_state_mut(memory)?.positions[position].noise_model = model;
        Ok(())
    }

    /// Number of positions, failing if `memory` is not a memory.
    pub fn memory_size(&self, memory: ComponentId) -> Result<usize> {
        Ok(self.memory_state(memory)?.num_positions())
    }
}

fn wrong_kind(name: &str) -> crate::error::Error {
    NetworkError::WrongKind {
        component: name.to_string(),
        expected: "quantum memory".into(),
    }
    .into()
}
