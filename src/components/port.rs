// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ports and message delivery.
//!
//! `tx_input` delivers into the owning component: the message is buffered,
//! passed on to a forwarding target, handed to the component's built-in
//! behaviour (channels transmit, memories store), and announced with a
//! `PORT_INPUT` event when anyone is listening. `tx_output` sends out of
//! the component, either up to a forwarding parent port or across to the
//! connected peer, whose `tx_input` then runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::component::{ComponentId, ComponentKind};
use super::message::Message;
use crate::error::Result;
use crate::events::{EntityId, EventExpression, Handler, HandlerId, PORT_INPUT, PORT_OUTPUT};
use crate::simulation::Simulation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortId(pub usize);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Port {
    pub(crate) id: PortId,
    pub(crate) name: String,
    pub(crate) owner: ComponentId,
    pub(crate) entity: EntityId,
    pub(crate) peer: Option<PortId>,
    /// Child port that also receives this port's input.
    pub(crate) forward_input: Option<PortId>,
    /// Parent port that sends this port's output.
    pub(crate) forward_output: Option<PortId>,
    pub(crate) notify_all_input: bool,
    pub(crate) input: Option<Message>,
    pub(crate) output: Option<Message>,
}

impl Port {
    pub(crate) fn new(id: PortId, name: String, owner: ComponentId, entity: EntityId) -> Self {
        Self {
            id,
            name,
            owner,
            entity,
            peer: None,
            forward_input: None,
            forward_output: None,
            notify_all_input: false,
            input: None,
            output: None,
        }
    }

    pub fn id(&self) -> PortId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> ComponentId {
        self.owner
    }

    /// Entity that raises this port's events.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn peer(&self) -> Option<PortId> {
        self.peer
    }

    pub fn is_connected(&self) -> bool {
        self.peer.is_some()
    }

    pub fn notify_all_input(&self) -> bool {
        self.notify_all_input
    }
}

/// Built-in reaction of a component to input on one of its ports.
enum InputHook {
    Transmit,
    Store(Option<usize>),
    None,
}

impl Simulation {
    /// Raise `PORT_INPUT` on every delivery, even with no handler waiting.
    pub fn set_notify_all_input(&mut self, port: PortId, notify: bool) -> Result<()> {
        self.network.port_mut(port)?.notify_all_input = notify;
        Ok(())
    }

    /// Expression matching input events of `port`.
    pub fn port_input(&self, port: PortId) -> Result<EventExpression> {
        Ok(EventExpression::atomic(
            self.network.port(port)?.entity,
            &PORT_INPUT,
        ))
    }

    /// Persistent handler for input arriving at `port`.
    pub fn wait_port_input(
        &mut self,
        owner: EntityId,
        port: PortId,
        handler: Handler,
    ) -> Result<HandlerId> {
        let expr = self.port_input(port)?;
        Ok(self.wait(owner, expr, handler))
    }

    /// Deliver `message` into the component owning `port`.
    pub fn tx_input(&mut self, port: PortId, message: Message) -> Result<()> {
        let p = self.network.port_mut(port)?;
        p.input = Some(message.clone());
        let (entity, owner, forward, notify) =
            (p.entity, p.owner, p.forward_input, p.notify_all_input);
        let kind = &self.network.component(owner)?.kind;
        let hook = match (kind, self.network.port(port)?.name.as_str()) {
            (ComponentKind::Channel(_), "send") => InputHook::Transmit,
            (ComponentKind::Memory(_), "qin") => InputHook::Store(None),
            (ComponentKind::Memory(_), name) => {
                match name.strip_prefix("qin").map(str::parse::<usize>) {
                    Some(Ok(position)) => InputHook::Store(Some(position)),
                    _ => InputHook::None,
                }
            }
            _ => InputHook::None,
        };
        debug!(port = %port, items = message.len(), "Port input");

        if let Some(target) = forward {
            self.tx_input(target, message.clone())?;
        }
        match hook {
            InputHook::Transmit => self.channel_send(owner, message.clone(), None)?,
            InputHook::Store(position) => {
                let qubits = message.qubits();
                if !qubits.is_empty() {
                    let positions = position.map(|p| vec![p]);
                    self.memory_put(owner, &qubits, positions.as_deref())?;
                }
            }
            InputHook::None => {}
        }
        if notify || self.events.has_waiter_for(entity, &PORT_INPUT) {
            self.events.schedule_now(entity, &PORT_INPUT)?;
        }
        Ok(())
    }

    /// Send `message` out of the component owning `port`.
    pub fn tx_output(&mut self, port: PortId, message: Message) -> Result<()> {
        let p = self.network.port_mut(port)?;
        p.output = Some(message.clone());
        let (entity, forward, peer) = (p.entity, p.forward_output, p.peer);
        debug!(port = %port, items = message.len(), "Port output");

        if self.events.has_waiter_for(entity, &PORT_OUTPUT) {
            self.events.schedule_now(entity, &PORT_OUTPUT)?;
        }
        if let Some(parent_port) = forward {
            self.tx_output(parent_port, message.clone())?;
        }
        if let Some(peer) = peer {
            self.tx_input(peer, message)?;
        }
        Ok(())
    }

    /// Take the last message delivered into `port`.
    pub fn rx_input(&mut self, port: PortId) -> Result<Option<Message>> {
        Ok(self.network.port_mut(port)?.input.take())
    }

    /// Take the last message sent out of `port`.
    pub fn rx_output(&mut self, port: PortId) -> Result<Option<Message>> {
        Ok(self.network.port_mut(port)?.output.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::record_times;
    use serde_json::json;

    #[test]
    fn test_connected_ports_deliver_immediately() {
        let mut sim = Simulation::with_seed(0);
        let a = sim.add_component("a");
        let b = sim.add_component("b");
        let pa = sim.add_port(a, "out").unwrap();
        let pb = sim.add_port(b, "in").unwrap();
        sim.network.connect(pa, pb).unwrap();

        sim.tx_output(pa, Message::classical([1])).unwrap();
        let msg = sim.rx_input(pb).unwrap().unwrap();
        assert_eq!(msg.classical_values(), vec![&json!(1)]);
        // Drained
        assert!(sim.rx_input(pb).unwrap().is_none());
        assert!(sim.rx_output(pa).unwrap().is_some());
    }

    #[test]
    fn test_input_event_only_when_observed() {
        let mut sim = Simulation::with_seed(0);
        let a = sim.add_component("a");
        let p = sim.add_port(a, "in").unwrap();
        sim.tx_input(p, Message::classical([0])).unwrap();
        assert_eq!(sim.events.pending(), 0);

        sim.set_notify_all_input(p, true).unwrap();
        sim.tx_input(p, Message::classical([0])).unwrap();
        assert_eq!(sim.events.pending(), 1);
    }

    #[test]
    fn test_waiting_handler_sees_input_event() {
        let mut sim = Simulation::with_seed(0);
        let a = sim.add_component("a");
        let p = sim.add_port(a, "in").unwrap();
        let owner = sim.network.component(a).unwrap().entity;
        let entity = sim.network.port(p).unwrap().entity();
        let seen = record_times(&mut sim, owner, entity, &PORT_INPUT);

        sim.events.schedule_after(owner, &crate::events::CHANNEL_DELIVERED, 5.0).unwrap();
        sim.tx_input(p, Message::classical([0])).unwrap();
        sim.run(None, None).unwrap();
        assert_eq!(*seen.borrow(), vec![0.0]);
    }

    #[test]
    fn test_forwarding_through_parent() {
        let mut sim = Simulation::with_seed(0);
        let parent = sim.add_component("node");
        let child = sim.add_component("proc");
        sim.network.add_subcomponent(parent, child).unwrap();
        let outer_in = sim.add_port(parent, "io").unwrap();
        let inner_in = sim.add_port(child, "in").unwrap();
        let inner_out = sim.add_port(child, "out").unwrap();
        sim.network.forward_input(outer_in, inner_in).unwrap();
        sim.network.forward_output(inner_out, outer_in).unwrap();

        let peer_owner = sim.add_component("peer");
        let peer = sim.add_port(peer_owner, "p").unwrap();
        sim.network.connect(outer_in, peer).unwrap();

        sim.tx_input(outer_in, Message::classical(["hello"])).unwrap();
        assert!(sim.rx_input(inner_in).unwrap().is_some());

        sim.tx_output(inner_out, Message::classical(["reply"])).unwrap();
        let got = sim.rx_input(peer).unwrap().unwrap();
        assert_eq!(got.classical_values(), vec![&json!("reply")]);
    }
}
