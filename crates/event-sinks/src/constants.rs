// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

pub const EVENTS_METRIC_NAME: &str = "kubernetes_events_total";
pub const EVENTS_METRIC_HELP: &str =
    "Number of Kubernetes events observed, grouped by namespace, reason, and type";
pub const EVENTS_METRIC_LABELS: [&str; 3] = ["namespace", "reason", "type"];

pub const LOKI_PUSH_PATH: &str = "/loki/api/v1/push";
pub const LOKI_PUSH_TIMEOUT: Duration = Duration::from_secs(5);
