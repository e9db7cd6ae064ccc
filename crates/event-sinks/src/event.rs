// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The read-only view of a cluster Event consumed by both sinks.

use k8s_openapi::api::core::v1::Event;

/// Fields of a Kubernetes `Event` that the sinks care about.
///
/// Missing optional fields are carried as empty strings so that every Event
/// maps to exactly one counter series and one log stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedEvent {
    pub namespace: String,
    pub reason: String,
    /// `Normal` or `Warning` in practice, but not validated.
    pub event_type: String,
    pub message: String,
    /// Subsystem that raised the Event (`source.component`).
    pub component: String,
}

impl ObservedEvent {
    /// `[{type}] {reason}: {message}`
    #[must_use]
    pub fn log_line(&self) -> String {
        format!("[{}] {}: {}", self.event_type, self.reason, self.message)
    }
}

impl From<&Event> for ObservedEvent {
    fn from(event: &Event) -> Self {
        Self {
            namespace: event.metadata.namespace.clone().unwrap_or_default(),
            reason: event.reason.clone().unwrap_or_default(),
            event_type: event.type_.clone().unwrap_or_default(),
            message: event.message.clone().unwrap_or_default(),
            component: event
                .source
                .as_ref()
                .and_then(|source| source.component.clone())
                .unwrap_or_default(),
        }
    }
}
