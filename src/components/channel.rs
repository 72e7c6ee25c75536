// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Classical and quantum channels.
//!
//! A channel has ports `send` and `recv`. Input on `send` is transmitted:
//! lost qubits are discarded and replaced by [`Item::Empty`], the delivery
//! is scheduled after the delay model's delay, and on delivery the noise
//! model runs over the delay before the message leaves through `recv`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::component::{ComponentId, ComponentKind};
use super::message::{Item, Message};
use super::models::{DelayModelConfig, ErrorModelConfig, LossModelConfig};
use crate::error::{NetworkError, Result};
use crate::events::CHANNEL_DELIVERED;
use crate::simulation::Simulation;

/// Runtime state of a channel component.
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    pub quantum: bool,
    last_delivery: Option<(Message, f64)>,
}

impl ChannelState {
    pub fn new(quantum: bool) -> Self {
        Self {
            quantum,
            last_delivery: None,
        }
    }
}

/// Declarative channel description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Length in km, stored as the `length` property
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub quantum: bool,
    #[serde(default)]
    pub delay_model: Option<DelayModelConfig>,
    #[serde(default)]
    pub quantum_noise_model: Option<ErrorModelConfig>,
    #[serde(default)]
    pub quantum_loss_model: Option<LossModelConfig>,
}

impl Simulation {
    /// Add a top-level channel with ports `send` and `recv`.
    pub fn add_channel(&mut self, name: impl Into<String>, config: &ChannelConfig) -> Result<ComponentId> {
        let name = name.into();
        if !config.quantum
            && (config.quantum_noise_model.is_some() || config.quantum_loss_model.is_some())
        {
            return Err(NetworkError::InvalidModel(format!(
                "classical channel {} cannot carry quantum noise or loss models",
                name
            ))
            .into());
        }
        if !config.length.is_finite() || config.length < 0.0 {
            return Err(NetworkError::InvalidModel(format!(
                "channel length must be >= 0, got {}",
                config.length
            ))
            .into());
        }
        // Build every model before touching the network.
        let delay = config.delay_model.as_ref().map(|m| m.build()).transpose()?;
        let noise = config
            .quantum_noise_model
            .as_ref()
            .map(|m| m.build())
            .transpose()?;
        let loss = config
            .quantum_loss_model
            .as_ref()
            .map(|m| m.build())
            .transpose()?;

        let id = self.add_component_of_kind(
            name,
            ComponentKind::Channel(ChannelState::new(config.quantum)),
        );
        self.add_ports(id, &["send", "recv"])?;
        self.network.set_property(id, "length", config.length)?;
        if let Some(model) = delay {
            self.set_delay_model(id, model)?;
        }
        if let Some(model) = noise {
            self.set_noise_model(id, model)?;
        }
        if let Some(model) = loss {
            self.set_loss_model(id, model)?;
        }
        Ok(id)
    }

    fn channel_state_mut(&mut self, channel: ComponentId) -> Result<&mut ChannelState> {
        let c = self.network.component_mut(channel)?;
        match &mut c.kind {
            ComponentKind::Channel(state) => Ok(state),
            _ => Err(NetworkError::WrongKind {
                component: c.name.clone(),
                expected: "channel".into(),
            }
            .into()),
        }
    }

    /// Transmit `message` through `channel`. `delay` overrides the delay
    /// model for this message only.
    pub fn channel_send(
        &mut self,
        channel: ComponentId,
        mut message: Message,
        delay: Option<f64>,
    ) -> Result<()> {
        self.channel_state_mut(channel)?;
        let c = self.network.component(channel)?;
        let (entity, models, properties) = (c.entity, c.models.clone(), c.properties.clone());

        if let Some(loss) = &models.quantum_loss {
            let p_loss = loss.loss_probability(&properties)?;
            for item in message.items.iter_mut() {
                let Item::Qubit(q) = *item else { continue };
                if self.rng.gen::<f64>() < p_loss {
                    if self.qstate.is_assigned(q) {
                        self.qstate.discard(q, &mut self.rng)?;
                    }
                    debug!(channel = %channel, qubit = %q, "Qubit lost in transit");
                    *item = Item::Empty;
                }
            }
        }

        let delay = match (delay, &models.delay) {
            (Some(d), _) => d,
            (None, Some(model)) => model.generate_delay(&properties, &mut self.rng)?,
            (None, None) => 0.0,
        };
        let event = self.events.schedule_action(
            entity,
            &CHANNEL_DELIVERED,
            delay,
            Box::new(move |sim: &mut Simulation| sim.channel_deliver(channel, message, delay)),
        )?;
        debug!(channel = %channel, delay, arrival = event.time, "Message in transit");
        Ok(())
    }

    fn channel_deliver(&mut self, channel: ComponentId, message: Message, delay: f64) -> Result<()> {
        let c = self.network.component(channel)?;
        let (models, properties) = (c.models.clone(), c.properties.clone());
        if let Some(noise) = &models.quantum_noise {
            let alive: Vec<_> = message
                .qubits()
                .into_iter()
                .filter(|q| self.qstate.is_assigned(*q))
                .collect();
            if !alive.is_empty() && delay > 0.0 {
                noise.error_operation(&mut self.qstate, &alive, delay, &properties, &mut self.rng)?;
            }
        }
        self.channel_state_mut(channel)?.last_delivery = Some((message.clone(), delay));
        let recv = self.network.port_of(channel, "recv")?;
        info!(channel = %channel, items = message.len(), delay, "Channel delivered");
        self.tx_output(recv, message)
    }

    /// Take the last delivered message and its delay.
    pub fn channel_receive(&mut self, channel: ComponentId) -> Result<Option<(Message, f64)>> {
        Ok(self.channel_state_mut(channel)?.last_delivery.take())
    }
}
