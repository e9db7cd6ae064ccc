// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use event_exporter_core::{
    config::{normalize_loki_url, parse_listen_addr},
    EventExporter, ExporterConfig, ExporterError,
};
use event_sinks::http::prepare_client_provider;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// HTTP listen address of the metrics endpoint
    #[arg(long = "listen", env = "LISTEN_ADDR", default_value = ":8080")]
    listen: String,

    /// Loki push API base URL; event log pushes are disabled when empty
    #[arg(long = "loki-url", env = "LOKI_URL")]
    loki_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Timeout of a single log push, in seconds
    #[arg(long = "push-timeout-secs", env = "LOKI_PUSH_TIMEOUT_SECS", default_value_t = 5)]
    push_timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> Result<ExporterConfig, ExporterError> {
        let config = ExporterConfig {
            listen_addr: parse_listen_addr(&self.listen)?,
            loki_url: normalize_loki_url(self.loki_url),
            push_timeout: Duration::from_secs(self.push_timeout_secs),
            log_level: self.log_level.to_lowercase(),
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.log_level.to_lowercase();

    let config = args.into_config();
    init_logging(match &config {
        Ok(_) => log_level.as_str(),
        Err(_) => "info",
    });

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = prepare_client_provider() {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    debug!("Starting event exporter with {config:?}");

    match EventExporter::new(config).run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_level: &str) {
    let env_filter = format!("h2=off,hyper=off,rustls=off,{log_level}");

    let filter = EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
    }

    debug!("Logging subsystem enabled");
}
