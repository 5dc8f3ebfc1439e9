// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::ConfigError;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 9144;
const DEFAULT_PATH: &str = "/webhook";
const DEFAULT_LOG_LEVEL: &str = "info";
// 10MB
const DEFAULT_MAX_REQUEST_CONTENT_LENGTH: usize = 10 * 1024 * 1024;
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// How an inbound payload is split into lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookFormat {
    /// The whole body is one line.
    #[default]
    TextSingle,
    /// The body is split on a literal separator.
    TextBulk,
    /// The body is one JSON document.
    JsonSingle,
    /// One JSON document per `\n`-separated line.
    JsonLines,
    /// The body is a JSON array of documents.
    JsonBulk,
}

impl WebhookFormat {
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(
            self,
            Self::JsonSingle | Self::JsonLines | Self::JsonBulk
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextSingle => "text_single",
            Self::TextBulk => "text_bulk",
            Self::JsonSingle => "json_single",
            Self::JsonLines => "json_lines",
            Self::JsonBulk => "json_bulk",
        }
    }
}

impl fmt::Display for WebhookFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebhookFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "text_single" => Ok(Self::TextSingle),
            "text_bulk" => Ok(Self::TextBulk),
            "json_single" => Ok(Self::JsonSingle),
            "json_lines" => Ok(Self::JsonLines),
            "json_bulk" => Ok(Self::JsonBulk),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

/// Decoder settings. Read-only while decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FormatConfig {
    #[serde(rename = "webhook_format", default)]
    pub format: WebhookFormat,
    /// Required for the JSON formats, must start with `.`
    #[serde(rename = "webhook_json_selector", default)]
    pub selector: Option<String>,
    #[serde(rename = "webhook_text_bulk_separator", default)]
    pub bulk_separator: Option<String>,
}

impl FormatConfig {
    #[must_use]
    pub fn new(format: WebhookFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn with_bulk_separator(mut self, separator: impl Into<String>) -> Self {
        self.bulk_separator = Some(separator.into());
        self
    }

    /// Returns the selector when it is present and starts with `.`
    #[must_use]
    pub fn valid_selector(&self) -> Option<&str> {
        self.selector
            .as_deref()
            .filter(|selector| selector.starts_with('.'))
    }
}

/// Configuration of the webhook ingestion endpoint.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Address to bind the HTTP listener to
    pub host: String,
    pub port: u16,
    /// Request path payloads are posted to (e.g., "/webhook")
    pub path: String,
    pub format: FormatConfig,
    /// Requests announcing a larger body are rejected with 413
    pub max_request_content_length: usize,
    /// Buffered line count above which the consumer warns. Advisory only.
    pub max_lines_in_buffer: Option<usize>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            format: FormatConfig::default(),
            max_request_content_length: DEFAULT_MAX_REQUEST_CONTENT_LENGTH,
            max_lines_in_buffer: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl WebhookConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup, using the same keys as
    /// [`WebhookConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("WEBHOOK_PORT") {
            Some(port) => port.trim().parse::<u16>().map_err(|_| {
                ConfigError::InvalidConfig(format!("WEBHOOK_PORT '{port}' is not a valid port"))
            })?,
            None => defaults.port,
        };
        let format = match lookup("WEBHOOK_FORMAT") {
            Some(format) => format.parse::<WebhookFormat>()?,
            None => WebhookFormat::default(),
        };
        let max_lines_in_buffer = match lookup("WEBHOOK_MAX_LINES_IN_BUFFER") {
            Some(max) => Some(max.trim().parse::<usize>().map_err(|_| {
                ConfigError::InvalidConfig(format!(
                    "WEBHOOK_MAX_LINES_IN_BUFFER '{max}' is not a valid number"
                ))
            })?),
            None => None,
        };

        let config = Self {
            host: lookup("WEBHOOK_HOST").unwrap_or(defaults.host),
            port,
            path: lookup("WEBHOOK_PATH").unwrap_or(defaults.path),
            format: FormatConfig {
                format,
                selector: lookup("WEBHOOK_JSON_SELECTOR"),
                bulk_separator: lookup("WEBHOOK_TEXT_BULK_SEPARATOR"),
            },
            max_request_content_length: defaults.max_request_content_length,
            max_lines_in_buffer,
            log_level: lookup("WEBHOOK_LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "Webhook port must be greater than 0".to_string(),
            ));
        }

        if !self.path.starts_with('/') {
            return Err(ConfigError::InvalidConfig(format!(
                "Webhook path '{}' must start with '/'",
                self.path
            )));
        }

        if self.max_request_content_length == 0 {
            return Err(ConfigError::InvalidConfig(
                "Max request content length must be greater than 0".to_string(),
            ));
        }

        if self.format.format.is_json() && self.format.valid_selector().is_none() {
            return Err(ConfigError::InvalidConfig(format!(
                "Format {} requires a json selector starting with '.', got {:?}",
                self.format.format, self.format.selector
            )));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}
