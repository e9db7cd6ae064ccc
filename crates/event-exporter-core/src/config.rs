// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ExporterError;
use event_sinks::constants::LOKI_PUSH_TIMEOUT;
use std::net::SocketAddr;
use std::time::Duration;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Read-only after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    /// Address of the metrics exposition endpoint
    pub listen_addr: SocketAddr,
    /// Loki push API base URL; `None` disables event log pushes
    pub loki_url: Option<String>,
    /// Client-side timeout of a single log push
    pub push_timeout: Duration,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            loki_url: None,
            push_timeout: LOKI_PUSH_TIMEOUT,
            log_level: "info".to_string(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<(), ExporterError> {
        if self.push_timeout.is_zero() {
            return Err(ExporterError::InvalidConfig(
                "Log push timeout must be greater than 0".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ExporterError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}

/// Parses `host:port`, or `:port` to listen on every interface.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr, ExporterError> {
    let trimmed = addr.trim();
    let full = if trimmed.starts_with(':') {
        format!("0.0.0.0{trimmed}")
    } else {
        trimmed.to_string()
    };

    full.parse::<SocketAddr>().map_err(|e| {
        ExporterError::InvalidConfig(format!("Invalid listen address '{addr}': {e}"))
    })
}

/// Blank URLs disable the log sink rather than failing.
#[must_use]
pub fn normalize_loki_url(url: Option<String>) -> Option<String> {
    url.map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExporterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.push_timeout, Duration::from_secs(5));
        assert!(config.loki_url.is_none());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = ExporterConfig {
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_log_levels() {
        for level in VALID_LOG_LEVELS {
            let config = ExporterConfig {
                log_level: level.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_ok(), "level {level} should be valid");
        }
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = ExporterConfig {
            push_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_listen_addr() {
        assert_eq!(
            parse_listen_addr(":8080").expect("failed to parse"),
            SocketAddr::from(([0, 0, 0, 0], 8080))
        );
        assert_eq!(
            parse_listen_addr("127.0.0.1:9102").expect("failed to parse"),
            SocketAddr::from(([127, 0, 0, 1], 9102))
        );
        assert_eq!(
            parse_listen_addr("[::1]:8080")
                .expect("failed to parse")
                .port(),
            8080
        );
        assert!(parse_listen_addr("8080").is_err());
        assert!(parse_listen_addr("").is_err());
        assert!(parse_listen_addr(":http").is_err());
    }

    #[test]
    fn test_normalize_loki_url() {
        assert_eq!(normalize_loki_url(None), None);
        assert_eq!(normalize_loki_url(Some(String::new())), None);
        assert_eq!(normalize_loki_url(Some("  ".to_string())), None);
        assert_eq!(
            normalize_loki_url(Some(" http://loki:3100 ".to_string())),
            Some("http://loki:3100".to_string())
        );
    }
}
