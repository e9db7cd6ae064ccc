// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-lifetime counter of observed Events.
//!
//! One series per distinct `(namespace, reason, type)` tuple, created on first
//! use and never reset or evicted. Cardinality grows with the number of
//! distinct tuples ever seen.

use crate::constants::{EVENTS_METRIC_HELP, EVENTS_METRIC_LABELS, EVENTS_METRIC_NAME};
use crate::errors::Creation;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Owns its own registry; share it behind an `Arc`.
#[derive(Clone)]
pub struct EventCounter {
    registry: Registry,
    events: IntCounterVec,
}

impl EventCounter {
    pub fn new() -> Result<Self, Creation> {
        let registry = Registry::new();
        let events = IntCounterVec::new(
            Opts::new(EVENTS_METRIC_NAME, EVENTS_METRIC_HELP),
            &EVENTS_METRIC_LABELS,
        )?;
        registry.register(Box::new(events.clone()))?;
        Ok(Self { registry, events })
    }

    /// Increments the series for this exact tuple by one.
    pub fn observe(&self, namespace: &str, reason: &str, event_type: &str) {
        self.events
            .with_label_values(&[namespace, reason, event_type])
            .inc();
    }

    /// Current value of a series, without creating it.
    #[must_use]
    pub fn count(&self, namespace: &str, reason: &str, event_type: &str) -> u64 {
        let wanted = [namespace, reason, event_type];
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == EVENTS_METRIC_NAME)
            .flat_map(|family| family.get_metric().iter())
            .find(|metric| {
                EVENTS_METRIC_LABELS
                    .iter()
                    .zip(wanted.iter())
                    .all(|(name, value)| {
                        metric
                            .get_label()
                            .iter()
                            .any(|pair| pair.get_name() == *name && pair.get_value() == *value)
                    })
            })
            .map_or(0, |metric| metric.get_counter().get_value() as u64)
    }

    /// Renders every series in the text exposition format.
    pub fn encode(&self) -> Result<String, Creation> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    #[must_use]
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

impl std::fmt::Debug for EventCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventCounter({EVENTS_METRIC_NAME})")
    }
}
