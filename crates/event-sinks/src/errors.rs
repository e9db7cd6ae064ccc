// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Failure to build or render the event counter registry.
#[derive(Debug, thiserror::Error)]
pub enum Creation {
    #[error("metric registry error: {0}")]
    Registry(#[from] prometheus::Error),

    #[error("exposition output is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Failure of a single log push. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error("failed to prepare payload: {0}")]
    Payload(String),

    #[error("destination error ({0:?}): {1}")]
    Destination(Option<StatusCode>, String),
}
