// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Splits an inbound payload into [`LineRecord`]s according to a [`FormatConfig`].
//!
//! Decoding never fails towards the caller. Malformed payloads produce fewer (or zero)
//! records and a log entry, so one bad request cannot stall ingestion.
//!
//! | format        | records                                                        |
//! |---------------|----------------------------------------------------------------|
//! | `text_single` | the trimmed body                                               |
//! | `text_bulk`   | the trimmed body split on the bulk separator                   |
//! | `json_single` | the selector applied to the document, extra = document fields  |
//! | `json_lines`  | `json_single` applied to every non-empty `\n` separated line   |
//! | `json_bulk`   | the selector applied to every element of a top-level array     |
//!
//! `json_lines` and `json_bulk` stop at the first line or element that fails to parse or
//! match the selector; records decoded before it are kept.

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::{FormatConfig, WebhookFormat};
use crate::errors::DecodeError;
use crate::line::LineRecord;
use crate::selector::ParsedPath;

/// Decodes `body` into zero or more records. Every returned line is whitespace-trimmed.
#[must_use]
pub fn decode(config: &FormatConfig, body: &[u8]) -> Vec<LineRecord> {
    let mut records = Vec::new();

    let result = match config.format {
        WebhookFormat::TextSingle => {
            records.push(LineRecord::new(String::from_utf8_lossy(body).trim()));
            Ok(())
        }
        WebhookFormat::TextBulk => {
            decode_text_bulk(config.bulk_separator.as_deref(), body, &mut records);
            Ok(())
        }
        WebhookFormat::JsonSingle => {
            json_path(config).and_then(|path| decode_json_single(&path, body, &mut records))
        }
        WebhookFormat::JsonLines => {
            json_path(config).and_then(|path| decode_json_lines(&path, body, &mut records))
        }
        WebhookFormat::JsonBulk => {
            json_path(config).and_then(|path| decode_json_bulk(&path, body, &mut records))
        }
    };

    if let Err(e) = result {
        log_decode_error(&e, config, body);
    }

    records.into_iter().map(LineRecord::trimmed).collect()
}

fn json_path(config: &FormatConfig) -> Result<ParsedPath, DecodeError> {
    let selector = config
        .valid_selector()
        .ok_or_else(|| DecodeError::InvalidSelector(config.selector.clone().unwrap_or_default()))?;
    ParsedPath::parse(selector).map_err(|_| DecodeError::InvalidSelector(selector.to_string()))
}

fn decode_text_bulk(separator: Option<&str>, body: &[u8], records: &mut Vec<LineRecord>) {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match separator.filter(|s| !s.is_empty()) {
        Some(separator) => records.extend(text.split(separator).map(LineRecord::new)),
        None => {
            debug!("No text bulk separator configured, treating payload as a single line");
            records.push(LineRecord::new(text));
        }
    }
}

fn decode_json_single(
    path: &ParsedPath,
    body: &[u8],
    records: &mut Vec<LineRecord>,
) -> Result<(), DecodeError> {
    let document: Value = serde_json::from_slice(body)?;
    records.push(select_record(path, document)?);
    Ok(())
}

fn decode_json_lines(
    path: &ParsedPath,
    body: &[u8],
    records: &mut Vec<LineRecord>,
) -> Result<(), DecodeError> {
    for line in body.split(|b| *b == b'\n').filter(|line| !line.is_empty()) {
        let document: Value = serde_json::from_slice(line)?;
        records.push(select_record(path, document)?);
    }
    Ok(())
}

fn decode_json_bulk(
    path: &ParsedPath,
    body: &[u8],
    records: &mut Vec<LineRecord>,
) -> Result<(), DecodeError> {
    let Value::Array(elements) = serde_json::from_slice::<Value>(body)? else {
        return Err(DecodeError::NotAnArray);
    };
    for element in elements {
        records.push(select_record(path, element)?);
    }
    Ok(())
}

// The document's own top-level fields become the record's extra context.
fn select_record(path: &ParsedPath, document: Value) -> Result<LineRecord, DecodeError> {
    let line = path.evaluate(&document)?;
    Ok(match document {
        Value::Object(fields) => LineRecord::with_extra(line, fields),
        _ => LineRecord::new(line),
    })
}

fn log_decode_error(e: &DecodeError, config: &FormatConfig, body: &[u8]) {
    match e {
        DecodeError::InvalidSelector(_) => error!("{}", e),
        DecodeError::ParseFailure(_) | DecodeError::NotAnArray => warn!(
            post_body = %String::from_utf8_lossy(body),
            webhook_format = %config.format,
            "{}",
            e
        ),
        DecodeError::Selector(_) => warn!(
            post_body = %String::from_utf8_lossy(body),
            webhook_json_selector = config.selector.as_deref().unwrap_or_default(),
            "{}",
            e
        ),
    }
}
