// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;

/// Unrecoverable failures. Any of these ends the process.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to create Kubernetes client: {0}")]
    KubeClient(#[from] kube::Error),

    #[error("Failed to create event counter: {0}")]
    Metrics(#[from] event_sinks::errors::Creation),

    #[error("Failed to bind metrics endpoint on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Metrics server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Event watch stream ended")]
    WatchEnded,
}
