// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Webhook Ingest
//!
//! Ingestion front-end turning HTTP-delivered payloads into log lines for a downstream consumer.
//!
//! ```text
//!   HTTP body ──> decoder (+ selector) ──> LineSink ──> LineBuffer ──> consumer
//! ```
//!
//! - [`decoder`]: splits one payload into zero or more [`line::LineRecord`]s under one of five
//!   formats (`text_single`, `text_bulk`, `json_single`, `json_lines`, `json_bulk`)
//! - [`selector`]: `.a.b[2].c` selectors locating the line text inside a JSON document
//! - [`line_buffer`]: unbounded FIFO with a blocking, interruptible pop for the consumer
//! - [`endpoint`]: hyper HTTP endpoint wiring the decoder to a [`sink::LineSink`]
//! - [`config`]: environment-driven configuration

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod decoder;
pub mod endpoint;
pub mod errors;
pub mod http_utils;
pub mod line;
pub mod line_buffer;
pub mod selector;
pub mod sink;

pub use config::{FormatConfig, WebhookConfig, WebhookFormat};
pub use decoder::decode;
pub use endpoint::WebhookEndpoint;
pub use line::LineRecord;
pub use line_buffer::LineBuffer;
