// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Component/port network model.
//!
//! Components form a tree and talk through ports. Every component and
//! every port is an entity of the event engine, so ports can raise
//! `PORT_INPUT`/`PORT_OUTPUT` events and components can wait on them.
//!
//! | Kind | Ports | Input behaviour |
//! |------|-------|-----------------|
//! | plain component | user-defined | buffered only |
//! | channel | `send`, `recv` | `send` transmits after the delay model |
//! | quantum memory | `qin`, `qin<i>`, `qout` | qubits are stored |
//! | node | user-defined | may own a `qmemory` subcomponent |

pub mod channel;
pub mod component;
pub mod memory;
pub mod message;
pub mod models;
pub mod network;
pub mod node;
pub mod port;

pub use channel::{ChannelConfig, ChannelState};
pub use component::{
    Component, ComponentId, ComponentKind, PortHost, Schedulable, SubcomponentHost,
};
pub use memory::{MemoryConfig, MemoryPosition, MemoryState};
pub use message::{Item, Message};
pub use models::{
    DelayModel, DelayModelConfig, ErrorModelConfig, LossModelConfig, Models, Properties,
    QuantumErrorModel, QuantumLossModel,
};
pub use network::Network;
pub use port::{Port, PortId};
