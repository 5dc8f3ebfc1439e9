// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde_json::{Map, Value};

/// Structured context attached to a line, keyed by top-level field name.
pub type Extra = Map<String, Value>;

/// One decoded log line plus optional structured context.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    line: String,
    extra: Option<Extra>,
}

impl LineRecord {
    #[must_use]
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            extra: None,
        }
    }

    #[must_use]
    pub fn with_extra(line: impl Into<String>, extra: Extra) -> Self {
        Self {
            line: line.into(),
            extra: Some(extra),
        }
    }

    #[must_use]
    pub fn line(&self) -> &str {
        &self.line
    }

    #[must_use]
    pub fn extra(&self) -> Option<&Extra> {
        self.extra.as_ref()
    }

    #[must_use]
    pub fn into_parts(self) -> (String, Option<Extra>) {
        (self.line, self.extra)
    }

    pub(crate) fn trimmed(self) -> Self {
        let trimmed = self.line.trim();
        if trimmed.len() == self.line.len() {
            return self;
        }
        Self {
            line: trimmed.to_string(),
            extra: self.extra,
        }
    }
}
