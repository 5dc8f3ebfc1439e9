// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use http_body_util::Full;
use hyper::{
    body::Bytes,
    header,
    http::{self, HeaderMap},
    Response, StatusCode,
};
use serde_json::json;
use tracing::{debug, error};

pub type HttpResponse = Response<Full<Bytes>>;

/// Builds an `application/json` response of the form `{"message": <message>}`.
///
/// The message is also logged, at debug level for 2xx statuses and at error level otherwise.
pub fn log_and_create_http_response(
    message: &str,
    status: StatusCode,
) -> http::Result<HttpResponse> {
    if status.is_success() {
        debug!("{message}");
    } else {
        error!("{message}");
    }
    let body = json!({ "message": message }).to_string();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
}

/// Checks the declared size of a webhook delivery before its body is read.
///
/// Chunked deliveries (`Transfer-Encoding` without `Content-Length`) pass here; their size is
/// enforced while the body is collected. Otherwise the response to send back is returned:
/// 411 when neither header is present, 400 for an unparsable `Content-Length` and 413 when it
/// exceeds `max_content_length`. Each message starts with `error_message_prefix`.
pub fn verify_request_content_length(
    headers: &HeaderMap,
    max_content_length: usize,
    error_message_prefix: &str,
) -> Option<http::Result<HttpResponse>> {
    let (message, status) = match headers.get(header::CONTENT_LENGTH) {
        None if headers.contains_key(header::TRANSFER_ENCODING) => {
            debug!("Chunked webhook delivery, size checked while reading the body");
            return None;
        }
        None => (
            "Missing Content-Length and Transfer-Encoding header",
            StatusCode::LENGTH_REQUIRED,
        ),
        Some(value) => match value.to_str().ok().and_then(|v| v.parse::<usize>().ok()) {
            None => ("Invalid Content-Length header", StatusCode::BAD_REQUEST),
            Some(length) if length > max_content_length => {
                ("Payload too large", StatusCode::PAYLOAD_TOO_LARGE)
            }
            Some(_) => return None,
        },
    };
    Some(log_and_create_http_response(
        &format!("{error_message_prefix}: {message}"),
        status,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;
    use hyper::header;
    use hyper::HeaderMap;
    use hyper::StatusCode;

    use super::{log_and_create_http_response, verify_request_content_length, HttpResponse};

    fn content_length(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, value.parse().unwrap());
        headers
    }

    async fn message(response: HttpResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["message"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_response_is_json_message() {
        let response = log_and_create_http_response("Ingested 3 lines", StatusCode::OK).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(message(response).await, "Ingested 3 lines");
    }

    #[tokio::test]
    async fn test_rejected_deliveries() {
        let cases = [
            (
                HeaderMap::new(),
                StatusCode::LENGTH_REQUIRED,
                "Webhook: Missing Content-Length and Transfer-Encoding header",
            ),
            (
                content_length("not_an_int"),
                StatusCode::BAD_REQUEST,
                "Webhook: Invalid Content-Length header",
            ),
            (
                content_length("100"),
                StatusCode::PAYLOAD_TOO_LARGE,
                "Webhook: Payload too large",
            ),
        ];

        for (headers, status, expected) in cases {
            let response = verify_request_content_length(&headers, 10, "Webhook")
                .unwrap()
                .unwrap();
            assert_eq!(response.status(), status);
            assert_eq!(message(response).await, expected);
        }
    }

    #[test]
    fn test_accepted_deliveries() {
        let mut chunked = HeaderMap::new();
        chunked.insert(header::TRANSFER_ENCODING, "chunked".parse().unwrap());

        assert!(verify_request_content_length(&chunked, 10, "Webhook").is_none());
        assert!(verify_request_content_length(&content_length("10"), 10, "Webhook").is_none());
        assert!(verify_request_content_length(&content_length("0"), 10, "Webhook").is_none());
    }
}
