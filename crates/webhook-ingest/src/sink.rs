// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::errors::HandOffError;
use crate::line::LineRecord;
use crate::line_buffer::LineBuffer;

/// Downstream destination of decoded lines.
#[async_trait]
pub trait LineSink: Send + Sync {
    /// Hands `record` to the consumer, waiting if the destination applies backpressure.
    async fn hand_off(&self, record: LineRecord) -> Result<(), HandOffError>;
}

#[async_trait]
impl LineSink for LineBuffer {
    /// Never waits. Records pushed after the buffer is closed are dropped silently.
    async fn hand_off(&self, record: LineRecord) -> Result<(), HandOffError> {
        self.push(record);
        Ok(())
    }
}

#[async_trait]
impl LineSink for Sender<LineRecord> {
    async fn hand_off(&self, record: LineRecord) -> Result<(), HandOffError> {
        self.send(record).await.map_err(|_| HandOffError::Closed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_line_buffer_sink() {
        let buffer = LineBuffer::new();
        buffer.hand_off(LineRecord::new("a")).await.unwrap();
        assert_eq!(buffer.len(), 1);

        buffer.close();
        buffer.hand_off(LineRecord::new("b")).await.unwrap();
        assert_eq!(buffer.len(), 1);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.hand_off(LineRecord::new("a")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().line(), "a");

        drop(rx);
        assert_eq!(
            tx.hand_off(LineRecord::new("b")).await,
            Err(HandOffError::Closed)
        );
    }
}
