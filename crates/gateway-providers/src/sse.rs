//! Server-sent event multiplexing.
//!
//! A background task scans the upstream byte stream line by line, renders
//! every `data:` frame through the provider's response template and offers
//! the result on a bounded channel. A full channel blocks the task. The
//! task owns the upstream stream and the sender, and drops each exactly once
//! when it exits.

use crate::template::CompiledTemplates;
use crate::transport::ByteStream;
use futures::Stream;
use futures_util::StreamExt;
use gateway_core::{DecodeStage, GatewayError, GatewayResponse, GatewayResult};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

const DATA_PREFIX: &str = "data:";
const DONE_PAYLOAD: &str = "[DONE]";

/// Longest line accepted from an upstream event stream
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Default output channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Why a stream task stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTermination {
    /// Terminator frame received
    Done,
    /// Upstream closed without a terminator
    UpstreamClosed,
    /// Reading the upstream body failed
    ReadError(String),
    /// Caller cancelled
    Cancelled,
    /// Output receiver was dropped
    ConsumerGone,
}

impl StreamTermination {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::UpstreamClosed => "upstream_closed",
            Self::ReadError(_) => "read_error",
            Self::Cancelled => "cancelled",
            Self::ConsumerGone => "consumer_gone",
        }
    }
}

/// What a finished stream task did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    /// Chunks delivered to the channel
    pub chunks_emitted: u64,
    /// Frames skipped because they failed to decode or render
    pub frames_dropped: u64,
    /// Exit reason
    pub termination: StreamTermination,
}

/// A line-oriented view over an SSE frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SseLine<'a> {
    Ignored,
    Data(&'a str),
    Done,
}

fn classify(line: &str) -> SseLine<'_> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Ignored;
    }
    match line.strip_prefix(DATA_PREFIX) {
        Some(payload) => {
            let payload = payload.trim_start();
            if payload == DONE_PAYLOAD {
                SseLine::Done
            } else {
                SseLine::Data(payload)
            }
        }
        None => SseLine::Ignored,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineTooLong;

/// Splits raw bytes into lines; tolerates lines spanning chunk boundaries
#[derive(Debug)]
struct LineDecoder {
    buffer: Vec<u8>,
    max_line: usize,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineDecoder {
    fn with_limit(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete line; a line, or a pending tail, longer than the limit
    /// is an error
    fn next_line(&mut self) -> Result<Option<String>, LineTooLong> {
        let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') else {
            return if self.buffer.len() > self.max_line {
                Err(LineTooLong)
            } else {
                Ok(None)
            };
        };
        if pos > self.max_line {
            return Err(LineTooLong);
        }
        let line: Vec<u8> = self.buffer.drain(..=pos).collect();
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    /// Trailing bytes without a final newline
    fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

/// Spawns stream tasks with a fixed channel capacity
#[derive(Debug, Clone, Copy)]
pub struct StreamMultiplexer {
    channel_capacity: usize,
}

impl Default for StreamMultiplexer {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl StreamMultiplexer {
    /// Create a multiplexer; capacity is at least one
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Output channel capacity
    #[must_use]
    pub const fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Start the background task for one upstream stream.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn(
        &self,
        upstream: ByteStream,
        templates: Arc<CompiledTemplates>,
        cancel: CancellationToken,
        provider: impl Into<String>,
    ) -> ResponseStream {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let pump = FramePump {
            templates,
            tx,
            cancel,
            provider: provider.into(),
            chunks_emitted: 0,
            frames_dropped: 0,
        };
        let task = tokio::spawn(pump.run(upstream));
        ResponseStream { rx, task }
    }
}

struct FramePump {
    templates: Arc<CompiledTemplates>,
    tx: mpsc::Sender<GatewayResponse>,
    cancel: CancellationToken,
    provider: String,
    chunks_emitted: u64,
    frames_dropped: u64,
}

impl FramePump {
    async fn run(mut self, mut upstream: ByteStream) -> StreamSummary {
        let mut decoder = LineDecoder::default();

        let termination = 'scan: loop {
            let item = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break 'scan StreamTermination::Cancelled,
                () = self.tx.closed() => break 'scan StreamTermination::ConsumerGone,
                item = upstream.next() => item,
            };

            match item {
                Some(Ok(bytes)) => {
                    decoder.push(&bytes);
                    loop {
                        match decoder.next_line() {
                            Ok(Some(line)) => {
                                if let Some(termination) = self.handle_line(&line).await {
                                    break 'scan termination;
                                }
                            }
                            Ok(None) => break,
                            Err(LineTooLong) => {
                                warn!(
                                    provider = %self.provider,
                                    limit = decoder.max_line,
                                    "Upstream stream line exceeds limit"
                                );
                                break 'scan StreamTermination::ReadError("line too long".to_string());
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!(provider = %self.provider, error = %e, "Upstream stream read failed");
                    break 'scan StreamTermination::ReadError(e.to_string());
                }
                None => {
                    if let Some(line) = decoder.finish() {
                        if let Some(termination) = self.handle_line(&line).await {
                            break 'scan termination;
                        }
                    }
                    break 'scan StreamTermination::UpstreamClosed;
                }
            }
        };

        drop(upstream);
        let Self {
            tx,
            provider,
            chunks_emitted,
            frames_dropped,
            ..
        } = self;
        drop(tx);

        debug!(
            provider = %provider,
            chunks = chunks_emitted,
            dropped = frames_dropped,
            reason = termination.label(),
            "Stream finished"
        );

        StreamSummary {
            chunks_emitted,
            frames_dropped,
            termination,
        }
    }

    async fn handle_line(&mut self, line: &str) -> Option<StreamTermination> {
        let payload = match classify(line) {
            SseLine::Ignored => return None,
            SseLine::Done => return Some(StreamTermination::Done),
            SseLine::Data(payload) => payload,
        };

        let chunk = match self.render_frame(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.frames_dropped += 1;
                warn!(provider = %self.provider, error = %e, "Dropping stream frame");
                return None;
            }
        };

        trace!(provider = %self.provider, "Emitting stream chunk");
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Some(StreamTermination::Cancelled),
            sent = self.tx.send(chunk) => match sent {
                Ok(()) => {
                    self.chunks_emitted += 1;
                    None
                }
                Err(_) => Some(StreamTermination::ConsumerGone),
            },
        }
    }

    fn render_frame(&self, payload: &str) -> GatewayResult<GatewayResponse> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| GatewayError::decode(DecodeStage::StreamFrame, e.to_string()))?;
        self.templates.render_response(&value)
    }
}

/// Consumer side of a streaming dispatch.
///
/// Yields canonical chunks until the task stops. The channel carries no
/// errors; call [`ResponseStream::finish`] for the exit reason.
#[derive(Debug)]
pub struct ResponseStream {
    rx: mpsc::Receiver<GatewayResponse>,
    task: JoinHandle<StreamSummary>,
}

impl ResponseStream {
    /// Next chunk, or `None` once the task has closed the channel
    pub async fn recv(&mut self) -> Option<GatewayResponse> {
        self.rx.recv().await
    }

    /// Stop consuming and wait for the task's summary
    pub async fn finish(self) -> StreamSummary {
        let Self { rx, task } = self;
        drop(rx);
        match task.await {
            Ok(summary) => summary,
            Err(e) => StreamSummary {
                chunks_emitted: 0,
                frames_dropped: 0,
                termination: StreamTermination::ReadError(format!("stream task failed: {e}")),
            },
        }
    }

    /// Split into the receiver and the task handle
    #[must_use]
    pub fn into_parts(self) -> (mpsc::Receiver<GatewayResponse>, JoinHandle<StreamSummary>) {
        (self.rx, self.task)
    }
}

impl Stream for ResponseStream {
    type Item = GatewayResponse;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
