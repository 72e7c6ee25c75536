// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Network nodes.

use super::component::{ComponentId, ComponentKind};
use super::memory::MemoryConfig;
use crate::error::{NetworkError, Result};
use crate::simulation::Simulation;

impl Simulation {
    /// Add a top-level node. With a memory config, a quantum memory named
    /// `qmemory` is attached as its subcomponent.
    pub fn add_node(&mut self, name: impl Into<String>, memory: Option<&MemoryConfig>) -> Result<ComponentId> {
        let qmemory = memory
            .map(|config| self.add_memory("qmemory", config))
            .transpose()?;
        let node = self.add_component_of_kind(name.into(), ComponentKind::Node { qmemory });
        if let Some(mem) = qmemory {
            self.network.add_subcomponent(node, mem)?;
        }
        Ok(node)
    }

    /// The designated memory of `node`.
    pub fn qmemory(&self, node: ComponentId) -> Result<ComponentId> {
        let c = self.network.component(node)?;
        match c.kind {
            ComponentKind::Node {
                qmemory: Some(mem), ..
            } => Ok(mem),
            _ => Err(NetworkError::WrongKind {
                component: c.name.clone(),
                expected: "node with a quantum memory".into(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::component::SubcomponentHost;
    use crate::components::message::Message;

    #[test]
    fn test_node_with_memory() {
        let mut sim = Simulation::with_seed(0);
        let config = MemoryConfig {
            num_positions: 2,
            noise_model: None,
        };
        let alice = sim.add_node("alice", Some(&config)).unwrap();
        let mem = sim.qmemory(alice).unwrap();
        assert_eq!(sim.memory_size(mem).unwrap(), 2);
        let node = sim.network.component(alice).unwrap();
        assert_eq!(node.subcomponent("qmemory"), Some(mem));
        assert_eq!(node.kind().label(), "node");

        let bare = sim.add_node("bob", None).unwrap();
        assert!(sim.qmemory(bare).is_err());
    }

    #[test]
    fn test_node_port_feeds_memory() {
        let mut sim = Simulation::with_seed(0);
        let alice = sim.add_node("alice", Some(&MemoryConfig::default())).unwrap();
        let mem = sim.qmemory(alice).unwrap();
        let qin = sim.add_port(alice, "qin").unwrap();
        let mem_qin = sim.network.port_of(mem, "qin").unwrap();
        sim.network.forward_input(qin, mem_qin).unwrap();

        let q = sim.qstate.create(1, true);
        sim.tx_input(qin, Message::from_qubits(&q)).unwrap();
        assert_eq!(sim.memory_peek(mem, &[0]).unwrap(), vec![Some(q[0])]);
    }
}
