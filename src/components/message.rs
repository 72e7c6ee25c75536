// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Messages exchanged between ports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::qubits::QubitId;

/// One payload slot of a [`Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    Qubit(QubitId),
    Classical(serde_json::Value),
    /// Placeholder for a qubit lost in transit
    Empty,
}

/// Ordered items plus free-form metadata (e.g. a header).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, serde_json::Value>,
}

impl Message {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            meta: BTreeMap::new(),
        }
    }

    pub fn from_qubits(qubits: &[QubitId]) -> Self {
        Self::new(qubits.iter().copied().map(Item::Qubit).collect())
    }

    /// Message carrying classical values.
    pub fn classical<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<serde_json::Value>,
    {
        Self::new(
            values
                .into_iter()
                .map(|v| Item::Classical(v.into()))
                .collect(),
        )
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn header(&self) -> Option<&serde_json::Value> {
        self.meta.get("header")
    }

    /// Qubits carried, in order, skipping classical and empty items.
    pub fn qubits(&self) -> Vec<QubitId> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Item::Qubit(q) => Some(*q),
                _ => None,
            })
            .collect()
    }

    pub fn classical_values(&self) -> Vec<&serde_json::Value> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Item::Classical(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
