//! Topic subscriber for the distance telemetry broker.
//!
//! # Wire Format
//!
//! Newline-delimited JSON in both directions:
//!
//! ```text
//! -> {"subscribe":"uwb/distance"}
//! <- {"topic":"uwb/distance","payload":{"distance1":"2.4","distance2":3.1,"obstacle_distance":40}}
//! ```
//!
//! Frames for other topics are ignored, as are lines longer than
//! [`MAX_FRAME_BYTES`]. A dropped connection is retried after a fixed delay
//! and the subscription is re-sent on every connect.

use crate::workflow::config::RelayConfig;
use crate::workflow::runner::RelayEvent;
use anchorcore::diagnostics::{LogManager, MetricsRecorder};
use anchorcore::prelude::{RelayError, RelayResult};
use anchorcore::wire::TelemetryPayload;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Longest broker line accepted, newline included.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

#[derive(Serialize)]
struct SubscribeRequest<'a> {
    subscribe: &'a str,
}

#[derive(Deserialize)]
struct BrokerFrame {
    topic: String,
    payload: serde_json::Value,
}

/// How a broker session ended without an I/O error.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    BrokerClosed,
    QueueClosed,
}

/// Result of reading one newline-terminated frame.
#[derive(Debug, PartialEq, Eq)]
enum FrameRead {
    Line,
    TooLong,
    Eof,
}

/// Reads one line into `buf`, never buffering more than `MAX_FRAME_BYTES`.
/// An over-long line is consumed up to its newline and reported as `TooLong`.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<FrameRead>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let read = (&mut *reader)
        .take(MAX_FRAME_BYTES as u64)
        .read_until(b'\n', buf)
        .await?;
    if read == 0 {
        return Ok(FrameRead::Eof);
    }
    if buf.last() == Some(&b'\n') || buf.len() < MAX_FRAME_BYTES {
        return Ok(FrameRead::Line);
    }

    loop {
        buf.clear();
        let skipped = (&mut *reader)
            .take(MAX_FRAME_BYTES as u64)
            .read_until(b'\n', buf)
            .await?;
        if skipped == 0 || buf.last() == Some(&b'\n') {
            buf.clear();
            return Ok(FrameRead::TooLong);
        }
    }
}

/// Decodes one broker line. `Ok(None)` means the frame was for another topic.
pub fn parse_frame(line: &str, topic: &str) -> RelayResult<Option<TelemetryPayload>> {
    let frame: BrokerFrame = serde_json::from_str(line)
        .map_err(|err| RelayError::MalformedTelemetry(format!("bad frame: {}", err)))?;
    if frame.topic != topic {
        return Ok(None);
    }
    TelemetryPayload::from_value(frame.payload).map(Some)
}

pub struct BrokerSubscriber {
    addr: String,
    topic: String,
    reconnect_delay: Duration,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl BrokerSubscriber {
    pub fn new(
        addr: impl Into<String>,
        topic: impl Into<String>,
        reconnect_delay: Duration,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            addr: addr.into(),
            topic: topic.into(),
            reconnect_delay,
            metrics,
            logger: LogManager::new("subscriber"),
        }
    }

    pub fn from_config(config: &RelayConfig, metrics: Arc<MetricsRecorder>) -> Self {
        Self::new(
            config.broker_addr.clone(),
            config.topic.clone(),
            config.reconnect_delay(),
            metrics,
        )
    }

    /// Streams telemetry into `events` until the receiving side goes away.
    pub async fn run<C>(self, events: mpsc::UnboundedSender<RelayEvent<C>>) {
        loop {
            match self.session(&events).await {
                Ok(SessionEnd::QueueClosed) => break,
                Ok(SessionEnd::BrokerClosed) => self
                    .logger
                    .warn(&self.disconnect("closed the stream".into()).to_string()),
                Err(err) => self.logger.warn(&err.to_string()),
            }
            if events.is_closed() {
                break;
            }
            self.metrics.record_reconnect();
            tokio::time::sleep(self.reconnect_delay).await;
        }
        self.logger.record("event queue closed; subscriber stopping");
    }

    async fn session<C>(
        &self,
        events: &mpsc::UnboundedSender<RelayEvent<C>>,
    ) -> RelayResult<SessionEnd> {
        let stream = TcpStream::connect(self.addr.as_str())
            .await
            .map_err(|err| self.disconnect(format!("connect: {}", err)))?;
        let (reader, mut writer) = stream.into_split();

        let mut request = serde_json::to_string(&SubscribeRequest {
            subscribe: &self.topic,
        })
        .map_err(|err| self.disconnect(format!("encoding subscribe: {}", err)))?;
        request.push('\n');
        writer
            .write_all(request.as_bytes())
            .await
            .map_err(|err| self.disconnect(format!("subscribe: {}", err)))?;
        self.logger
            .record(&format!("subscribed to {} on {}", self.topic, self.addr));

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(1024);
        loop {
            let frame = match read_frame(&mut reader, &mut buf).await {
                Ok(FrameRead::Line) => std::str::from_utf8(&buf).map_err(|err| {
                    RelayError::MalformedTelemetry(format!("frame is not UTF-8: {}", err))
                }),
                Ok(FrameRead::TooLong) => Err(RelayError::MalformedTelemetry(format!(
                    "frame exceeds {} bytes",
                    MAX_FRAME_BYTES
                ))),
                Ok(FrameRead::Eof) => return Ok(SessionEnd::BrokerClosed),
                Err(err) => return Err(self.disconnect(format!("read: {}", err))),
            };
            let parsed = match frame {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => parse_frame(line, &self.topic),
                Err(err) => Err(err),
            };
            match parsed {
                Ok(Some(payload)) => {
                    if events.send(RelayEvent::Telemetry(payload)).is_err() {
                        return Ok(SessionEnd::QueueClosed);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    self.metrics.record_dropped();
                    self.logger.warn(&format!("dropping frame: {}", err));
                }
            }
        }
    }

    fn disconnect(&self, detail: String) -> RelayError {
        RelayError::BrokerDisconnect(format!("{} {}", self.addr, detail))
    }
}
