// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::event::ObservedEvent;
use crate::loki::LokiClient;
use crate::metric_sink::EventCounter;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

/// Callback invoked once per Event add notification.
#[async_trait]
pub trait EventHandler {
    async fn on_add(&self, event: &ObservedEvent);
}

/// Fans one Event out to the metric sink, then the log sink.
///
/// The increment happens before the push is attempted, so nothing the log sink
/// does can affect the count.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    counter: Arc<EventCounter>,
    loki: LokiClient,
}

impl EventDispatcher {
    #[must_use]
    pub fn new(counter: Arc<EventCounter>, loki: LokiClient) -> Self {
        EventDispatcher { counter, loki }
    }

    #[cfg(test)]
    fn counter(&self) -> &Arc<EventCounter> {
        &self.counter
    }
}

#[async_trait]
impl EventHandler for EventDispatcher {
    async fn on_add(&self, event: &ObservedEvent) {
        trace!(
            namespace = %event.namespace,
            reason = %event.reason,
            "Dispatching event"
        );
        self.counter
            .observe(&event.namespace, &event.reason, &event.event_type);
        self.loki.push(event).await;
    }
}
