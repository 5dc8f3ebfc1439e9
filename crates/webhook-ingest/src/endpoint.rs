// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP ingestion endpoint.
//!
//! Each request body on the configured path is decoded with [`crate::decoder::decode`] and every
//! resulting record is handed off, in order, to a [`LineSink`]. Failures to read the body are
//! answered to the caller and also reported as [`IngestError`]s on the error channel.

use std::io;
use std::sync::Arc;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::service::service_fn;
use hyper::{http, Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::WebhookConfig;
use crate::decoder::decode;
use crate::errors::IngestError;
use crate::http_utils::{log_and_create_http_response, verify_request_content_length, HttpResponse};
use crate::sink::LineSink;

const INGEST_ERROR_PREFIX: &str = "Error ingesting webhook payload";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Webhook ingestion endpoint. Cheap to clone; clones share the sink and error channel.
#[derive(Clone)]
pub struct WebhookEndpoint {
    config: Arc<WebhookConfig>,
    sink: Arc<dyn LineSink>,
    errors: Sender<IngestError>,
}

impl WebhookEndpoint {
    #[must_use]
    pub fn new(
        config: Arc<WebhookConfig>,
        sink: Arc<dyn LineSink>,
        errors: Sender<IngestError>,
    ) -> Self {
        Self {
            config,
            sink,
            errors,
        }
    }

    /// Binds the configured host and port and serves until `cancel_token` fires.
    pub async fn listen(self, cancel_token: CancellationToken) -> Result<(), BoxError> {
        let listener =
            TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        self.serve(listener, cancel_token).await
    }

    /// Serves HTTP/1 connections accepted on `listener` until `cancel_token` fires.
    pub async fn serve(
        self,
        listener: TcpListener,
        cancel_token: CancellationToken,
    ) -> Result<(), BoxError> {
        let server = hyper::server::conn::http1::Builder::new();
        let mut joinset = JoinSet::new();

        debug!(
            "Webhook endpoint started: listening on {} path {}",
            listener.local_addr()?,
            self.config.path
        );

        loop {
            let conn = tokio::select! {
                () = cancel_token.cancelled() => {
                    debug!("Webhook endpoint shutting down");
                    break;
                },
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Server error: {e}");
                        return Err(e.into());
                    }
                    Ok((conn, _)) => conn,
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        // Don't kill server on panic - log and continue
                        error!("Connection handler panicked: {:?}", e);
                        continue;
                    },
                    Ok(()) | Err(_) => continue,
                },
            };

            let conn = TokioIo::new(conn);
            let server = server.clone();
            let endpoint = self.clone();
            let service = service_fn(move |req| {
                let endpoint = endpoint.clone();
                async move { endpoint.handle(req).await }
            });
            joinset.spawn(async move {
                if let Err(e) = server.serve_connection(conn, service).await {
                    error!("Connection error: {e}");
                }
            });
        }

        joinset.shutdown().await;
        Ok(())
    }

    /// Routes one request. Only `POST` and `PUT` on the configured path are ingested.
    pub async fn handle<B>(&self, req: Request<B>) -> http::Result<HttpResponse>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        if req.uri().path() != self.config.path {
            return log_and_create_http_response(
                &format!("No webhook at {}", req.uri().path()),
                StatusCode::NOT_FOUND,
            );
        }

        match req.method() {
            &Method::POST | &Method::PUT => self.ingest(req).await,
            method => log_and_create_http_response(
                &format!("{INGEST_ERROR_PREFIX}: method {method} not allowed"),
                StatusCode::METHOD_NOT_ALLOWED,
            ),
        }
    }

    async fn ingest<B>(&self, req: Request<B>) -> http::Result<HttpResponse>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        if let Some(response) = verify_request_content_length(
            &parts.headers,
            self.config.max_request_content_length,
            INGEST_ERROR_PREFIX,
        ) {
            return response;
        }

        let body = match Limited::new(body, self.config.max_request_content_length)
            .collect()
            .await
        {
            Ok(collected) => collected.to_bytes(),
            // Chunked bodies carry no Content-Length, so the limit is only hit while reading.
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                return log_and_create_http_response(
                    &format!("{INGEST_ERROR_PREFIX}: Payload too large"),
                    StatusCode::PAYLOAD_TOO_LARGE,
                );
            }
            Err(e) => {
                let message = format!("{INGEST_ERROR_PREFIX}: unable to read request body: {e}");
                self.report(IngestError::not_specified(message.clone())).await;
                return log_and_create_http_response(&message, StatusCode::BAD_REQUEST);
            }
        };

        let records = decode(&self.config.format, &body);
        let count = records.len();
        for record in records {
            debug!(line = record.line(), extra = ?record.extra(), "Handing off line");
            if let Err(e) = self.sink.hand_off(record).await {
                return log_and_create_http_response(
                    &format!("{INGEST_ERROR_PREFIX}: {e}"),
                    StatusCode::SERVICE_UNAVAILABLE,
                );
            }
        }

        log_and_create_http_response(&format!("Ingested {count} lines"), StatusCode::OK)
    }

    async fn report(&self, error: IngestError) {
        if let Err(e) = self.errors.send(error).await {
            warn!("Unable to report ingestion error, receiver dropped: {}", e.0);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{FormatConfig, WebhookFormat};
    use crate::errors::IngestErrorKind;
    use crate::line::LineRecord;
    use crate::line_buffer::LineBuffer;
    use http_body_util::Full;
    use hyper::body::Frame;
    use hyper::header;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::sync::mpsc::{self, Receiver};

    struct FailingBody;

    impl Body for FailingBody {
        type Data = Bytes;
        type Error = io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
            Poll::Ready(Some(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))))
        }
    }

    fn endpoint(format: FormatConfig) -> (WebhookEndpoint, Arc<LineBuffer>, Receiver<IngestError>) {
        let config = WebhookConfig {
            format,
            max_request_content_length: 1024,
            ..Default::default()
        };
        let buffer = Arc::new(LineBuffer::new());
        let (errors_tx, errors_rx) = mpsc::channel(8);
        let endpoint = WebhookEndpoint::new(Arc::new(config), buffer.clone(), errors_tx);
        (endpoint, buffer, errors_rx)
    }

    fn post(path: &str, body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_LENGTH, body.len())
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    fn drain(buffer: &LineBuffer) -> Vec<String> {
        buffer.close();
        std::iter::from_fn(|| buffer.blocking_pop())
            .map(|record| record.line().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_text_bulk_lines_are_handed_off_in_order() {
        let (endpoint, buffer, _errors) =
            endpoint(FormatConfig::new(WebhookFormat::TextBulk).with_bulk_separator("\n"));

        let response = endpoint.handle(post("/webhook", "one\ntwo\nthree")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(drain(&buffer), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_json_single_carries_extra() {
        let (endpoint, buffer, _errors) = endpoint(
            FormatConfig::new(WebhookFormat::JsonSingle).with_selector(".message"),
        );

        let response = endpoint
            .handle(post("/webhook", r#"{"message":"X","host":"1.1.1.1"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let record = buffer.blocking_pop().unwrap();
        assert_eq!(record.line(), "X");
        assert_eq!(record.extra().unwrap()["host"], "1.1.1.1");
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_accepted_without_lines() {
        let (endpoint, buffer, mut errors) = endpoint(
            FormatConfig::new(WebhookFormat::JsonSingle).with_selector(".message"),
        );

        let response = endpoint.handle(post("/webhook", "not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(buffer.is_empty());
        assert!(errors.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unreadable_body_reports_not_specified_error() {
        let (endpoint, buffer, mut errors) = endpoint(FormatConfig::default());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/webhook")
            .header(header::TRANSFER_ENCODING, "chunked")
            .body(FailingBody)
            .unwrap();
        let response = endpoint.handle(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(buffer.is_empty());
        let error = errors.recv().await.unwrap();
        assert_eq!(error.kind, IngestErrorKind::NotSpecified);
        assert!(error.message.contains("connection reset by peer"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (endpoint, _buffer, _errors) = endpoint(FormatConfig::default());
        let response = endpoint.handle(post("/other", "line")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_is_not_allowed() {
        let (endpoint, buffer, _errors) = endpoint(FormatConfig::default());
        let request = Request::builder()
            .method(Method::GET)
            .uri("/webhook")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = endpoint.handle(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_payload_too_large() {
        let (endpoint, buffer, _errors) = endpoint(FormatConfig::default());
        let body: &'static str = Box::leak("x".repeat(2048).into_boxed_str());

        let response = endpoint.handle(post("/webhook", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_chunked_payload_too_large_is_not_reported() {
        let (endpoint, buffer, mut errors) = endpoint(FormatConfig::default());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/webhook")
            .header(header::TRANSFER_ENCODING, "chunked")
            .body(Full::new(Bytes::from("x".repeat(2048))))
            .unwrap();

        let response = endpoint.handle(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(buffer.is_empty());
        assert!(errors.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_channel_sink_is_unavailable() {
        let (lines_tx, lines_rx) = mpsc::channel::<LineRecord>(1);
        drop(lines_rx);
        let (errors_tx, _errors_rx) = mpsc::channel(1);
        let endpoint = WebhookEndpoint::new(
            Arc::new(WebhookConfig::default()),
            Arc::new(lines_tx),
            errors_tx,
        );

        let response = endpoint.handle(post("/webhook", "line")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
