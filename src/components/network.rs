// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Component tree and port wiring.

use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::info;

use super::component::{Component, ComponentId, ComponentKind, PortHost};
use super::models::{check_required, DelayModel, QuantumErrorModel, QuantumLossModel};
use super::port::{Port, PortId};
use crate::error::{NetworkError, Result};
use crate::events::EntityId;
use crate::simulation::Simulation;

/// Arena of components and ports.
#[derive(Debug, Default)]
pub struct Network {
    components: BTreeMap<ComponentId, Component>,
    ports: BTreeMap<PortId, Port>,
    next_component: usize,
    next_port: usize,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn component(&self, id: ComponentId) -> Result<&Component> {
        self.components
            .get(&id)
            .ok_or_else(|| NetworkError::ComponentNotFound(id.to_string()).into())
    }

    pub(crate) fn component_mut(&mut self, id: ComponentId) -> Result<&mut Component> {
        self.components
            .get_mut(&id)
            .ok_or_else(|| NetworkError::ComponentNotFound(id.to_string()).into())
    }

    /// First component named `name`.
    pub fn find(&self, name: &str) -> Option<ComponentId> {
        self.components
            .values()
            .find(|c| c.name == name)
            .map(|c| c.id)
    }

    pub fn port(&self, id: PortId) -> Result<&Port> {
        self.ports.get(&id).ok_or_else(|| {
            NetworkError::PortNotFound {
                component: "?".into(),
                port: id.to_string(),
            }
            .into()
        })
    }

    pub(crate) fn port_mut(&mut self, id: PortId) -> Result<&mut Port> {
        self.ports.get_mut(&id).ok_or_else(|| {
            NetworkError::PortNotFound {
                component: "?".into(),
                port: id.to_string(),
            }
            .into()
        })
    }

    /// Port `name` of `component`.
    pub fn port_of(&self, component: ComponentId, name: &str) -> Result<PortId> {
        let c = self.component(component)?;
        c.port_id(name).ok_or_else(|| {
            NetworkError::PortNotFound {
                component: c.name.clone(),
                port: name.to_string(),
            }
            .into()
        })
    }

    /// `component.port` for error messages.
    fn port_label(&self, id: PortId) -> String {
        match self.ports.get(&id) {
            Some(p) => match self.components.get(&p.owner) {
                Some(c) => format!("{}.{}", c.name, p.name),
                None => p.name.clone(),
            },
            None => id.to_string(),
        }
    }

    pub(crate) fn insert_component(
        &mut self,
        name: String,
        entity: EntityId,
        kind: ComponentKind,
    ) -> ComponentId {
        let id = ComponentId(self.next_component);
        self.next_component += 1;
        self.components
            .insert(id, Component::new(id, name, entity, kind));
        id
    }

    fn check_port_name(&self, component: ComponentId, name: &str) -> Result<()> {
        let c = self.component(component)?;
        if c.ports.contains_key(name) {
            return Err(NetworkError::DuplicateName {
                component: c.name.clone(),
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub(crate) fn insert_port(
        &mut self,
        component: ComponentId,
        name: &str,
        entity: EntityId,
    ) -> Result<PortId> {
        self.check_port_name(component, name)?;
        let id = PortId(self.next_port);
        self.next_port += 1;
        self.component_mut(component)?
            .ports
            .insert(name.to_string(), id);
        self.ports
            .insert(id, Port::new(id, name.to_string(), component, entity));
        Ok(id)
    }

    // -------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------

    /// Make `child` a subcomponent of `parent`, under the child's name.
    pub fn add_subcomponent(&mut self, parent: ComponentId, child: ComponentId) -> Result<()> {
        let child_ref = self.component(child)?;
        let child_name = child_ref.name.clone();
        if child_ref.parent.is_some() {
            return Err(NetworkError::AlreadyHasParent(child_name).into());
        }
        let parent_ref = self.component(parent)?;
        if parent_ref.subcomponents.contains_key(&child_name) {
            return Err(NetworkError::DuplicateName {
                component: parent_ref.name.clone(),
                name: child_name,
            }
            .into());
        }
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(NetworkError::InvalidHierarchy(format!(
                    "{} cannot contain itself",
                    child_name
                ))
                .into());
            }
            cursor = self.component(id)?.parent;
        }

        self.component_mut(parent)?
            .subcomponents
            .insert(child_name, child);
        self.component_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detach subcomponent `name` from `parent`. The child becomes
    /// top-level, so links to its former siblings and forwarding to or from
    /// `parent` are dropped.
    pub fn remove_subcomponent(&mut self, parent: ComponentId, name: &str) -> Result<ComponentId> {
        let p = self.component_mut(parent)?;
        let child = p.subcomponents.remove(name).ok_or_else(|| {
            NetworkError::ComponentNotFound(format!("{}.{}", p.name, name))
        })?;
        self.component_mut(child)?.parent = None;

        let child_ports: Vec<PortId> = self.component(child)?.ports.values().copied().collect();
        for port in child_ports {
            if let Some(peer) = self.port(port)?.peer {
                let peer_owner = self.port(peer)?.owner;
                if self.component(peer_owner)?.parent.is_some() {
                    info!(port = %self.port_label(port), peer = %self.port_label(peer), "Unlinking detached port");
                    self.disconnect(port)?;
                }
            }
            self.port_mut(port)?.forward_output = None;
        }
        let parent_ports: Vec<PortId> = self.component(parent)?.ports.values().copied().collect();
        for port in parent_ports {
            if let Some(target) = self.port(port)?.forward_input {
                if self.port(target)?.owner == child {
                    self.port_mut(port)?.forward_input = None;
                }
            }
        }
        Ok(child)
    }

    /// Outermost ancestor of `id`.
    pub fn top_level(&self, id: ComponentId) -> Result<ComponentId> {
        let mut current = id;
        while let Some(parent) = self.component(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    // -------------------------------------------------------------------
    // Wiring
    // -------------------------------------------------------------------

    /// Connect two ports symmetrically. Their owners must be siblings
    /// (or both top-level).
    pub fn connect(&mut self, a: PortId, b: PortId) -> Result<()> {
        let (pa, pb) = (self.port(a)?, self.port(b)?);
        for p in [pa, pb] {
            if p.peer.is_some() {
                return Err(NetworkError::PortAlreadyConnected(self.port_label(p.id)).into());
            }
        }
        let parent_a = self.component(pa.owner)?.parent;
        let parent_b = self.component(pb.owner)?.parent;
        if parent_a != parent_b {
            return Err(NetworkError::CrossHierarchy {
                port: self.port_label(a),
                other: self.port_label(b),
            }
            .into());
        }
        self.port_mut(a)?.peer = Some(b);
        self.port_mut(b)?.peer = Some(a);
        info!(port = %self.port_label(a), other = %self.port_label(b), "Connected ports");
        Ok(())
    }

    /// Break the link of `port`, if any.
    pub fn disconnect(&mut self, port: PortId) -> Result<()> {
        if let Some(peer) = self.port_mut(port)?.peer.take() {
            self.port_mut(peer)?.peer = None;
        }
        Ok(())
    }

    /// Whether `parent_port`'s owner is the direct supercomponent of
    /// `child_port`'s owner.
    fn check_direct_child(&self, parent_port: PortId, child_port: PortId) -> Result<()> {
        let parent_owner = self.port(parent_port)?.owner;
        let child_owner = self.port(child_port)?.owner;
        if self.component(child_owner)?.parent != Some(parent_owner) {
            return Err(NetworkError::CrossHierarchy {
                port: self.port_label(parent_port),
                other: self.port_label(child_port),
            }
            .into());
        }
        Ok(())
    }

    /// Pass input arriving at `port` on to `child_port` of a subcomponent.
    pub fn forward_input(&mut self, port: PortId, child_port: PortId) -> Result<()> {
        self.check_direct_child(port, child_port)?;
        self.port_mut(port)?.forward_input = Some(child_port);
        Ok(())
    }

    /// Send output of subcomponent port `port` out through `parent_port`.
    pub fn forward_output(&mut self, port: PortId, parent_port: PortId) -> Result<()> {
        self.check_direct_child(parent_port, port)?;
        self.port_mut(port)?.forward_output = Some(parent_port);
        Ok(())
    }

    // -------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------

    pub fn set_property(&mut self, component: ComponentId, key: &str, value: f64) -> Result<()> {
        self.component_mut(component)?
            .properties
            .insert(key.to_string(), value);
        Ok(())
    }

    pub(crate) fn check_properties(&self, component: ComponentId, required: &[&str]) -> Result<()> {
        let c = self.component(component)?;
        check_required(&c.name, required, &c.properties)
    }

    pub(crate) fn reset(&mut self) {
        self.components.clear();
        self.ports.clear();
    }
}

impl Simulation {
    /// Add a plain top-level component.
    pub fn add_component(&mut self, name: impl Into<String>) -> ComponentId {
        self.add_component_of_kind(name.into(), ComponentKind::Plain)
    }

    pub(crate) fn add_component_of_kind(&mut self, name: String, kind: ComponentKind) -> ComponentId {
        let entity = self.events.add_entity(name.clone());
        info!(component = %name, kind = kind.label(), "Added component");
        self.network.insert_component(name, entity, kind)
    }

    pub fn add_port(&mut self, component: ComponentId, name: &str) -> Result<PortId> {
        self.network.check_port_name(component, name)?;
        let label = format!("{}.{}", self.network.component(component)?.name, name);
        let entity = self.events.add_entity(label);
        self.network.insert_port(component, name, entity)
    }

    pub fn add_ports(&mut self, component: ComponentId, names: &[&str]) -> Result<Vec<PortId>> {
        names.iter().map(|n| self.add_port(component, n)).collect()
    }

    /// Event entity of a component.
    pub fn entity_of(&self, component: ComponentId) -> Result<EntityId> {
        Ok(self.network.component(component)?.entity)
    }

    pub fn set_delay_model(
        &mut self,
        component: ComponentId,
        model: Rc<dyn DelayModel>,
    ) -> Result<()> {
        self.network
            .check_properties(component, model.required_properties())?;
        self.network.component_mut(component)?.models.delay = Some(model);
        Ok(())
    }

    pub fn set_noise_model(
        &mut self,
        component: ComponentId,
        model: Rc<dyn QuantumErrorModel>,
    ) -> Result<()> {
        self.network
            .check_properties(component, model.required_properties())?;
        self.network.component_mut(component)?.models.quantum_noise = Some(model);
        Ok(())
    }

    pub fn set_loss_model(
        &mut self,
        component: ComponentId,
        model: Rc<dyn QuantumLossModel>,
    ) -> Result<()> {
        self.network
            .check_properties(component, model.required_properties())?;
        self.network.component_mut(component)?.models.quantum_loss = Some(model);
        Ok(())
    }
}
