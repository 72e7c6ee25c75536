// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the simulator.
//!
//! Every error is raised synchronously at the call that violates a contract.
//! Nothing is retried; there is no notion of a transient failure.

use std::fmt;

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Simulator error types.
#[derive(Debug)]
pub enum Error {
    /// Configuration error
    Config(String),
    /// Event engine error
    Scheduler(SchedulerError),
    /// Quantum state engine error
    QState(QStateError),
    /// Component / port network error
    Network(NetworkError),
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Scheduler(e) => write!(f, "Scheduler error: {}", e),
            Error::QState(e) => write!(f, "Quantum state error: {}", e),
            Error::Network(e) => write!(f, "Network error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Scheduler(e) => Some(e),
            Error::QState(e) => Some(e),
            Error::Network(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<SchedulerError> for Error {
    fn from(e: SchedulerError) -> Self {
        Error::Scheduler(e)
    }
}

impl From<QStateError> for Error {
    fn from(e: QStateError) -> Self {
        Error::QState(e)
    }
}

impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::Network(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Event engine errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// Negative (or non-finite) scheduling delay
    InvalidDelay(f64),
    /// Bad `run` bound (both bounds given, or a bound in the past)
    InvalidRunBound(String),
    /// `run` called from inside a running simulation
    AlreadyRunning,
    /// The queue produced an event earlier than the current time
    ClockRollback { now: f64, event_time: f64 },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::InvalidDelay(delay) => {
                write!(f, "Invalid delay: {} (must be finite and >= 0)", delay)
            }
            SchedulerError::InvalidRunBound(msg) => write!(f, "Invalid run bound: {}", msg),
            SchedulerError::AlreadyRunning => write!(f, "Simulation is already running"),
            SchedulerError::ClockRollback { now, event_time } => write!(
                f,
                "Clock rollback: event at t={} but current time is t={}",
                event_time, now
            ),
        }
    }
}

impl std::error::Error for SchedulerError {}

/// Quantum state engine errors.
#[derive(Debug, Clone, PartialEq)]
pub enum QStateError {
    /// Qubit has no quantum state (never assigned, or discarded)
    UnassignedState(String),
    /// Groups use different formalisms
    IncompatibleFormalism { expected: String, found: String },
    /// Operator / state size does not match the number of qubits
    DimensionMismatch { expected: usize, actual: usize },
    /// Operation not available in the group's formalism
    UnsupportedOperation(String),
    /// Supplied state representation is not a valid quantum state
    InvalidState(String),
    /// Supplied operator is unsuitable for the requested use
    InvalidOperator(String),
    /// The same qubit appears twice in one request
    DuplicateQubit(String),
    /// A merge would exceed the configured group size limit
    GroupTooLarge { limit: usize, requested: usize },
}

impl fmt::Display for QStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QStateError::UnassignedState(qubit) => {
                write!(f, "Qubit {} has no assigned quantum state", qubit)
            }
            QStateError::IncompatibleFormalism { expected, found } => write!(
                f,
                "Incompatible formalism: expected {}, found {}",
                expected, found
            ),
            QStateError::DimensionMismatch { expected, actual } => write!(
                f,
                "Dimension mismatch: expected {}, got {}",
                expected, actual
            ),
            QStateError::UnsupportedOperation(msg) => write!(f, "Unsupported operation: {}", msg),
            QStateError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            QStateError::InvalidOperator(msg) => write!(f, "Invalid operator: {}", msg),
            QStateError::DuplicateQubit(qubit) => {
                write!(f, "Qubit {} appears more than once", qubit)
            }
            QStateError::GroupTooLarge { limit, requested } => write!(
                f,
                "State group too large: limit={}, requested={}",
                limit, requested
            ),
        }
    }
}

impl std::error::Error for QStateError {}

/// Component / port network errors.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// Ports belong to different component hierarchies
    CrossHierarchy { port: String, other: String },
    /// Memory position holds no qubit
    EmptyPosition { memory: String, position: usize },
    /// Not enough free memory positions for a put
    MemoryFull {
        memory: String,
        requested: usize,
        free: usize,
    },
    /// Memory position does not exist
    InvalidPosition {
        memory: String,
        position: usize,
        num_positions: usize,
    },
    /// No component with this id or name
    ComponentNotFound(String),
    /// No port with this name on the component
    PortNotFound { component: String, port: String },
    /// Port already has a peer
    PortAlreadyConnected(String),
    /// A model needs a property the component does not define
    MissingProperty { component: String, property: String },
    /// Component is not of the kind the operation needs
    WrongKind { component: String, expected: String },
    /// Component already belongs to another supercomponent
    AlreadyHasParent(String),
    /// A port or subcomponent with this name already exists
    DuplicateName { component: String, name: String },
    /// Subcomponent link would create a cycle or points at itself
    InvalidHierarchy(String),
    /// Model parameters are invalid
    InvalidModel(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::CrossHierarchy { port, other } => write!(
                f,
                "Cannot link port {} with {}: different component hierarchies",
                port, other
            ),
            NetworkError::EmptyPosition { memory, position } => {
                write!(f, "Memory {} position {} is empty", memory, position)
            }
            NetworkError::MemoryFull {
                memory,
                requested,
                free,
            } => write!(
                f,
                "Memory {} has {} free positions, {} requested",
                memory, free, requested
            ),
            NetworkError::InvalidPosition {
                memory,
                position,
                num_positions,
            } => write!(
                f,
                "Memory {} has no position {} (num_positions={})",
                memory, position, num_positions
            ),
            NetworkError::ComponentNotFound(component) => {
                write!(f, "Component {} not found", component)
            }
            NetworkError::PortNotFound { component, port } => {
                write!(f, "Component {} has no port '{}'", component, port)
            }
            NetworkError::PortAlreadyConnected(port) => {
                write!(f, "Port {} is already connected", port)
            }
            NetworkError::MissingProperty {
                component,
                property,
            } => write!(
                f,
                "Component {} is missing required property '{}'",
                component, property
            ),
            NetworkError::WrongKind {
                component,
                expected,
            } => write!(f, "Component {} is not a {}", component, expected),
            NetworkError::AlreadyHasParent(component) => {
                write!(f, "Component {} already has a supercomponent", component)
            }
            NetworkError::DuplicateName { component, name } => {
                write!(f, "Component {} already has a member named '{}'", component, name)
            }
            NetworkError::InvalidHierarchy(msg) => write!(f, "Invalid hierarchy: {}", msg),
            NetworkError::InvalidModel(msg) => write!(f, "Invalid model: {}", msg),
        }
    }
}

impl std::error::Error for NetworkError {}
