//! Server-sent events client for the live feed.
//!
//! Each SSE `data` field carries a JSON object whose `str` member is the
//! event text. The transport id (the SSE `id` field, or the payload's `id`
//! member) is passed along for duplicate suppression.

use std::collections::VecDeque;

use futures::StreamExt;
use futures::stream::BoxStream;
use rwa_core::config::FeedConfig;
use rwa_core::stream::FeedMessage;
use serde::Deserialize;

use crate::error::ConsumerError;

/// One dispatched SSE event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Last `id` field seen in the event block.
    pub id: Option<String>,
    /// `event` field, if any.
    pub event: Option<String>,
    /// `data` lines joined with `\n`.
    pub data: String,
}

/// Longest SSE line kept in memory. Happenings are far shorter.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Incremental SSE framing over arbitrary byte chunks.
///
/// A line longer than [`MAX_LINE_BYTES`] is discarded up to its newline,
/// together with the event it belongs to.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    current: SseEvent,
    has_data: bool,
    discarding: bool,
}

impl SseDecoder {
    /// Feed a chunk, returning every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if self.discarding {
                self.discarding = false;
                continue;
            }
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.handle_line(line) {
                events.push(event);
            }
        }
        if self.buffer.len() > MAX_LINE_BYTES {
            tracing::warn!(bytes = self.buffer.len(), "Discarding oversized SSE line");
            self.buffer.clear();
            self.current = SseEvent::default();
            self.has_data = false;
            self.discarding = true;
        }
        events
    }

    fn handle_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            if !self.has_data {
                self.current = SseEvent::default();
                return None;
            }
            self.has_data = false;
            return Some(std::mem::take(&mut self.current));
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "data" => {
                if self.has_data {
                    self.current.data.push('\n');
                }
                self.current.data.push_str(value);
                self.has_data = true;
            }
            "id" => self.current.id = Some(value.to_owned()),
            "event" => self.current.event = Some(value.to_owned()),
            _ => {}
        }
        None
    }
}

#[derive(Debug, Deserialize)]
struct Happening {
    #[serde(rename = "str")]
    text: String,
    #[serde(default)]
    id: Option<serde_json::Value>,
}

/// Turn an SSE event into a feed message. Events whose data is not a
/// happening payload are logged and dropped.
pub fn to_feed_message(event: &SseEvent) -> Option<FeedMessage> {
    let happening: Happening = match serde_json::from_str(&event.data) {
        Ok(happening) => happening,
        Err(e) => {
            tracing::warn!(error = %e, kind = ?event.event, data = %event.data, "Ignoring non-happening SSE data");
            return None;
        }
    };
    let payload_id = happening.id.and_then(|id| match id {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    Some(FeedMessage {
        id: event.id.clone().filter(|id| !id.is_empty()).or(payload_id),
        text: happening.text,
    })
}

/// Connects to the live feed.
pub struct FeedClient {
    client: reqwest::Client,
    url: String,
}

impl FeedClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &FeedConfig) -> Result<Self, ConsumerError> {
        if config.user_agent.is_empty() {
            tracing::warn!("No user agent configured; set NS_USER_AGENT");
        }
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ConsumerError::Http(format!("failed to build feed client: {e}")))?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// Open the feed and return its messages.
    ///
    /// The stream ends when the server closes the connection or a read
    /// fails; the caller reconnects.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Http`] if the request fails and
    /// [`ConsumerError::FeedStatus`] on a non-success status.
    pub async fn connect(&self) -> Result<BoxStream<'static, FeedMessage>, ConsumerError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| ConsumerError::Http(format!("feed request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConsumerError::FeedStatus(status.as_u16()));
        }
        tracing::info!(url = %self.url, "Connected to feed");

        let state = (
            Box::pin(response.bytes_stream()),
            SseDecoder::default(),
            VecDeque::<FeedMessage>::new(),
        );
        Ok(futures::stream::unfold(
            state,
            |(mut bytes, mut decoder, mut pending)| async move {
                loop {
                    if let Some(message) = pending.pop_front() {
                        return Some((message, (bytes, decoder, pending)));
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => {
                            pending.extend(decoder.push(&chunk).iter().filter_map(to_feed_message));
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Feed read failed");
                            return None;
                        }
                        None => return None,
                    }
                }
            },
        )
        .boxed())
    }
}
