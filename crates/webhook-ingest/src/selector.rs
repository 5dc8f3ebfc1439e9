// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Dotted-path selectors with optional array indices, e.g. `.transaction.messages[0].details.info`.
//!
//! A selector starts with `.` and is split on `.` into segments. A segment ending in `]`
//! that is at least four characters long is an indexed segment `name[<digits>]`: the
//! named field must hold an array and the element at the 0-based index is selected.
//! Every other segment is a bare field name.

use serde_json::Value;

use crate::errors::SelectorError;

/// Minimum length of a segment to be considered indexed, e.g. `a[0]`.
const MIN_INDEXED_SEGMENT_LEN: usize = 4;

/// One step of a [`ParsedPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Indexed { field: String, index: usize },
}

/// A parsed selector, evaluated against a JSON document with [`ParsedPath::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    segments: Vec<Segment>,
}

impl ParsedPath {
    /// Parses a selector such as `.message` or `.transaction.messages[1].details.info`.
    ///
    /// Fails with [`SelectorError::InvalidSelector`] when the selector is empty, does not
    /// start with `.`, has nothing after the leading `.`, or contains an indexed segment
    /// that is not of the form `name[<digits>]`.
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let invalid = || SelectorError::InvalidSelector(selector.to_string());

        let path = selector.strip_prefix('.').ok_or_else(invalid)?;
        if path.is_empty() {
            return Err(invalid());
        }

        let segments = path
            .split('.')
            .map(|element| {
                if element.len() >= MIN_INDEXED_SEGMENT_LEN && element.ends_with(']') {
                    parse_indexed_segment(element).ok_or_else(invalid)
                } else {
                    Ok(Segment::Field(element.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walks `root` one segment at a time and returns the terminal value as text.
    ///
    /// A JSON string terminal is returned without quotes; any other terminal is returned
    /// in its serialized JSON form.
    pub fn evaluate(&self, root: &Value) -> Result<String, SelectorError> {
        let mut current = root;
        for segment in &self.segments {
            current = match segment {
                Segment::Field(field) => field_of(current, field)?,
                Segment::Indexed { field, index } => match field_of(current, field)? {
                    Value::Array(elements) => {
                        elements
                            .get(*index)
                            .ok_or_else(|| SelectorError::IndexOutOfRange {
                                field: field.clone(),
                                index: *index,
                                len: elements.len(),
                            })?
                    }
                    Value::Null
                    | Value::Bool(_)
                    | Value::Number(_)
                    | Value::String(_)
                    | Value::Object(_) => return Err(SelectorError::NotAnArray(field.clone())),
                },
            };
        }

        Ok(render(current))
    }
}

/// Parses and evaluates `selector` against `root` in one step.
pub fn select(selector: &str, root: &Value) -> Result<String, SelectorError> {
    ParsedPath::parse(selector)?.evaluate(root)
}

fn field_of<'a>(value: &'a Value, field: &str) -> Result<&'a Value, SelectorError> {
    match value {
        Value::Object(map) => map
            .get(field)
            .ok_or_else(|| SelectorError::PathNotFound(field.to_string())),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Array(_) => {
            Err(SelectorError::PathNotFound(field.to_string()))
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// `element` ends with ']'. Digits are scanned backwards from the character before ']'
// up to the nearest '['.
fn parse_indexed_segment(element: &str) -> Option<Segment> {
    let inner = &element[..element.len() - 1];
    let open = inner.rfind('[')?;
    let (field, digits) = (&inner[..open], &inner[open + 1..]);
    if field.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index = digits.parse::<usize>().ok()?;
    Some(Segment::Indexed {
        field: field.to_string(),
        index,
    })
}
