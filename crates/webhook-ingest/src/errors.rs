// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for selector evaluation, payload decoding, configuration and hand-off.

/// Errors raised while parsing or evaluating a JSON selector such as `.a.b[2].c`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("{0:?}: invalid webhook json selector")]
    InvalidSelector(String),

    #[error("{0:?}: path not found")]
    PathNotFound(String),

    #[error("{0:?}: value is not an array")]
    NotAnArray(String),

    #[error("{field:?}: index {index} out of range for array of length {len}")]
    IndexOutOfRange {
        field: String,
        index: usize,
        len: usize,
    },
}

/// Errors raised while decoding one payload. These never escape
/// [`crate::decoder::decode`]; they are logged and the offending record is dropped.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{0:?}: invalid webhook json selector")]
    InvalidSelector(String),

    #[error("Unable to parse JSON: {0}")]
    ParseFailure(#[from] serde_json::Error),

    #[error("Expected a JSON array for bulk payload")]
    NotAnArray,

    #[error("Unable to find selector path: {0}")]
    Selector(#[from] SelectorError),
}

/// Errors in the webhook configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown webhook format '{0}'")]
    UnknownFormat(String),
}

/// Category of an ingestion error reported on the error channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestErrorKind {
    NotSpecified,
}

/// Ingestion error surfaced to the external error-reporting channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct IngestError {
    pub kind: IngestErrorKind,
    pub message: String,
}

impl IngestError {
    pub fn not_specified(message: impl Into<String>) -> Self {
        Self {
            kind: IngestErrorKind::NotSpecified,
            message: message.into(),
        }
    }
}

/// A record could not be handed off to the downstream consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandOffError {
    #[error("Downstream line channel is closed")]
    Closed,
}
