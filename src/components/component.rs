// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Component records and their capability interfaces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::channel::ChannelState;
use super::memory::MemoryState;
use super::models::{Models, Properties};
use super::port::PortId;
use crate::events::EntityId;

/// Handle to a component in a [`Network`](super::Network).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Behaviour attached to a component.
#[derive(Debug, Clone)]
pub enum ComponentKind {
    Plain,
    /// Network node; `qmemory` names its designated memory subcomponent.
    Node { qmemory: Option<ComponentId> },
    Channel(ChannelState),
    Memory(MemoryState),
}

impl ComponentKind {
    pub fn label(&self) -> &'static str {
        match self {
            ComponentKind::Plain => "component",
            ComponentKind::Node { .. } => "node",
            ComponentKind::Channel(state) if state.quantum => "quantum channel",
            ComponentKind::Channel(_) => "classical channel",
            ComponentKind::Memory(_) => "quantum memory",
        }
    }
}

/// Can raise and await events.
pub trait Schedulable {
    fn entity(&self) -> EntityId;
}

/// Owns named ports.
pub trait PortHost {
    fn port_id(&self, name: &str) -> Option<PortId>;
    fn port_names(&self) -> Vec<&str>;
}

/// Sits in the component tree.
pub trait SubcomponentHost {
    fn subcomponent(&self, name: &str) -> Option<ComponentId>;
    fn subcomponent_names(&self) -> Vec<&str>;
    fn supercomponent(&self) -> Option<ComponentId>;
}

#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) id: ComponentId,
    pub(crate) name: String,
    pub(crate) entity: EntityId,
    pub(crate) properties: Properties,
    pub(crate) models: Models,
    pub(crate) ports: BTreeMap<String, PortId>,
    pub(crate) subcomponents: BTreeMap<String, ComponentId>,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) kind: ComponentKind,
}

impl Component {
    pub(crate) fn new(id: ComponentId, name: String, entity: EntityId, kind: ComponentKind) -> Self {
        Self {
            id,
            name,
            entity,
            properties: Properties::new(),
            models: Models::default(),
            ports: BTreeMap::new(),
            subcomponents: BTreeMap::new(),
            parent: None,
            kind,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).copied()
    }

    pub fn models(&self) -> &Models {
        &self.models
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }
}

impl Schedulable for Component {
    fn entity(&self) -> EntityId {
        self.entity
    }
}

impl PortHost for Component {
    fn port_id(&self, name: &str) -> Option<PortId> {
        self.ports.get(name).copied()
    }

    fn port_names(&self) -> Vec<&str> {
        self.ports.keys().map(String::as_str).collect()
    }
}

impl SubcomponentHost for Component {
    fn subcomponent(&self, name: &str) -> Option<ComponentId> {
        self.subcomponents.get(name).copied()
    }

    fn subcomponent_names(&self) -> Vec<&str> {
        self.subcomponents.keys().map(String::as_str).collect()
    }

    fn supercomponent(&self) -> Option<ComponentId> {
        self.parent
    }
}
