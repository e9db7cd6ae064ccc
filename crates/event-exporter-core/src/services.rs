// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::{
    config::ExporterConfig, error::ExporterError, server::serve_metrics, watch::run_watch,
    watch::watch_events,
};
use event_sinks::{
    dispatcher::EventDispatcher,
    loki::{LokiClient, LokiClientConfig},
    metric_sink::EventCounter,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Runs the Event watch and the metrics endpoint side by side.
#[derive(Debug)]
pub struct EventExporter {
    config: ExporterConfig,
}

impl EventExporter {
    pub fn new(config: ExporterConfig) -> Self {
        Self { config }
    }

    /// Initializes every collaborator, then runs until a task fails or the
    /// process is asked to stop. Errors before the running state are fatal
    /// startup errors; there is no draining on stop.
    pub async fn run(self) -> Result<(), ExporterError> {
        let config = self.config;
        config.validate()?;

        let counter = Arc::new(EventCounter::new()?);
        let loki = LokiClient::new(LokiClientConfig {
            base_url: config.loki_url.clone(),
            timeout: config.push_timeout,
        });
        if !loki.is_enabled() {
            info!("No Loki URL configured, event log pushes are disabled");
        }
        let dispatcher = EventDispatcher::new(Arc::clone(&counter), loki);

        debug!("Connecting to the Kubernetes API");
        let client = kube::Client::try_default().await?;

        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(|source| ExporterError::Bind {
                addr: config.listen_addr,
                source,
            })?;
        info!("Starting server on {}", config.listen_addr);

        let events = watch_events(client);

        tokio::select! {
            () = run_watch(events, &dispatcher) => Err(ExporterError::WatchEnded),
            res = serve_metrics(listener, counter) => res.map_err(ExporterError::from),
            () = shutdown_signal() => {
                info!("Received stop signal, exiting");
                Ok(())
            }
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
