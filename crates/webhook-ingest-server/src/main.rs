// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use webhook_ingest::{errors::IngestError, LineBuffer, WebhookConfig, WebhookEndpoint};

const ERROR_CHANNEL_BUFFER_SIZE: usize = 16;

#[tokio::main]
pub async fn main() {
    let config = match WebhookConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // logging is not set up yet
            eprintln!("Invalid webhook configuration: {e}");
            return;
        }
    };

    let env_filter = format!("h2=off,hyper=off,{}", config.log_level);
    let subscriber = match EnvFilter::try_new(env_filter) {
        Ok(filter) => tracing_subscriber::fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_level(true)
            .with_thread_names(false)
            .with_thread_ids(false)
            .with_line_number(false)
            .with_file(false)
            .with_target(false)
            .without_time()
            .finish(),
        Err(e) => {
            eprintln!("Could not parse log level in configuration: {e}");
            return;
        }
    };
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global tracing subscriber: {e}");
        return;
    }

    debug!(
        "Starting webhook ingestion, format {} on {}:{}{}",
        config.format.format, config.host, config.port, config.path
    );

    let config = Arc::new(config);
    let buffer = Arc::new(LineBuffer::new());
    let (errors_tx, errors_rx) = mpsc::channel(ERROR_CHANNEL_BUFFER_SIZE);
    tokio::spawn(report_ingest_errors(errors_rx));

    let consumer = {
        let buffer = Arc::clone(&buffer);
        let max_lines_in_buffer = config.max_lines_in_buffer;
        thread::Builder::new()
            .name("line-consumer".to_string())
            .spawn(move || consume_lines(&buffer, max_lines_in_buffer))
    };
    let consumer = match consumer {
        Ok(handle) => handle,
        Err(e) => {
            error!("Unable to start line consumer: {e}");
            return;
        }
    };

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down webhook ingestion");
                signal_token.cancel();
            }
            Err(e) => error!("Unable to listen for shutdown signal: {e}"),
        }
    });

    let endpoint = WebhookEndpoint::new(Arc::clone(&config), buffer.clone(), errors_tx);
    match endpoint.listen(cancel_token).await {
        Ok(()) => debug!("Webhook endpoint stopped"),
        Err(e) => error!("Webhook endpoint error: {e}"),
    }

    buffer.close();
    if consumer.join().is_err() {
        error!("Line consumer panicked");
    }
}

async fn report_ingest_errors(mut errors_rx: mpsc::Receiver<IngestError>) {
    while let Some(e) = errors_rx.recv().await {
        error!("Webhook ingestion error: {e}");
    }
}

// Stand-in for the downstream pipeline: drains the buffer until it is closed.
fn consume_lines(buffer: &LineBuffer, max_lines_in_buffer: Option<usize>) {
    let mut over_limit = false;
    while let Some(record) = buffer.blocking_pop() {
        if let Some(max) = max_lines_in_buffer {
            let buffered = buffer.len();
            if buffered > max && !over_limit {
                warn!("{buffered} lines buffered, exceeding max_lines_in_buffer of {max}");
            }
            over_limit = buffered > max;
        }
        let (line, extra) = record.into_parts();
        info!(extra = ?extra, "{line}");
    }
    debug!("Line consumer stopped");
}
