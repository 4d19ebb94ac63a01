use super::reassembler::LineReassembler;
use super::record::{truncate_for_log, StreamRecord};
use super::validate::is_complete_json_object;
use crate::conversation::{ConversationUpdate, UpdateKind, UpdateSink};
use crate::error::{ChatError, Result};
use crate::models::Message;
use crate::text::decode_text;
use crate::trace::classify;
use futures::{Stream, StreamExt};
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Assistant content recorded when a turn fails.
pub const FAILURE_MESSAGE: &str = "죄송합니다. 오류가 발생했습니다.";

/// How much of a bad payload is written to the log.
const LOG_PAYLOAD_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
    Streaming,
    Finalizing,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing was sent because the input was blank.
    Skipped,
    /// The service sent its terminal record.
    Completed,
    /// The stream closed before the terminal record; whatever arrived was kept.
    Incomplete,
}

/// Drives one request/response turn and turns stream records into conversation updates.
pub struct TurnProcessor {
    generation: u64,
    started: Instant,
    state: TurnState,
    reassembler: LineReassembler,
    accumulated: String,
    message: Option<Message>,
}

impl TurnProcessor {
    /// A processor whose updates target the given conversation generation.
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            started: Instant::now(),
            state: TurnState::Idle,
            reassembler: LineReassembler::new(),
            accumulated: String::new(),
            message: None,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Record the user's input and start the clock.
    pub fn submit<S: UpdateSink + ?Sized>(&mut self, text: &str, sink: &mut S) {
        self.started = Instant::now();
        self.state = TurnState::Sending;
        self.emit(sink, UpdateKind::Append(Message::user(text)));
    }

    /// Response headers were accepted: open an empty assistant message.
    pub fn begin_streaming<S: UpdateSink + ?Sized>(&mut self, sink: &mut S) {
        self.state = TurnState::Streaming;
        let message = Message::assistant("");
        self.emit(sink, UpdateKind::InFlight(message.clone()));
        self.message = Some(message);
    }

    /// Feed one network chunk. An `Err` means the service reported an error and the turn
    /// must be failed with [`TurnProcessor::fail`].
    pub fn feed<S: UpdateSink + ?Sized>(&mut self, chunk: &[u8], sink: &mut S) -> Result<()> {
        for payload in self.reassembler.push(chunk) {
            self.handle_payload(&payload, sink)?;
        }
        Ok(())
    }

    /// Handle one `data:` payload.
    pub fn handle_payload<S: UpdateSink + ?Sized>(
        &mut self,
        payload: &str,
        sink: &mut S,
    ) -> Result<()> {
        if self.state == TurnState::Finalizing {
            tracing::debug!("ignoring record after terminal record");
            return Ok(());
        }

        let Some(record) = parse_payload(payload) else {
            return Ok(());
        };

        if let Some(error) = record.error_message() {
            return Err(ChatError::ServiceError(error.to_string()));
        }

        let mut updated = false;

        if let Some(chunk) = record.content_chunk() {
            self.accumulated.push_str(&decode_text(chunk));
            let elapsed = self.started.elapsed();
            if let Some(message) = self.message.as_mut() {
                message.response_start_time.get_or_insert(elapsed);
                message.content = self.accumulated.clone();
                updated = true;
            }
        }

        if let Some(trace) = &record.trace {
            match classify(trace) {
                Some(event) => {
                    if let Some(message) = self.message.as_mut() {
                        message.traces.push(event);
                        updated = true;
                    }
                }
                None => tracing::debug!("unrecognized trace payload skipped"),
            }
        }

        if record.done {
            let content = match record.final_response() {
                Some(full) => decode_text(full),
                None => self.accumulated.clone(),
            };
            self.finalize(content);
            updated = true;
        }

        if updated {
            if let Some(message) = &self.message {
                self.emit(sink, UpdateKind::InFlight(message.clone()));
            }
        }
        Ok(())
    }

    /// The stream is exhausted: flush the trailing buffer and commit the message.
    pub fn finish<S: UpdateSink + ?Sized>(mut self, sink: &mut S) -> TurnOutcome {
        if let Some(payload) = self.reassembler.finish() {
            self.handle_trailing(&payload);
        }

        let outcome = if self.state == TurnState::Finalizing {
            TurnOutcome::Completed
        } else {
            tracing::warn!("stream ended without a terminal record");
            TurnOutcome::Incomplete
        };

        if let Some(message) = self.message.take() {
            self.emit(sink, UpdateKind::Commit(message));
        }
        self.state = TurnState::Idle;
        outcome
    }

    /// Abort the turn: the assistant message becomes the failure text and is committed.
    pub fn fail<S: UpdateSink + ?Sized>(mut self, error: ChatError, sink: &mut S) -> ChatError {
        tracing::error!(error = %error, "chat turn failed");

        if self.is_finalized() {
            // A finalized message is never replaced.
            if let Some(message) = self.message.take() {
                self.emit(sink, UpdateKind::Commit(message));
            }
            return error;
        }

        self.state = TurnState::Error;
        let mut failure = Message::assistant(FAILURE_MESSAGE);
        failure.response_time = Some(self.started.elapsed());
        self.message = None;
        self.emit(sink, UpdateKind::Commit(failure));
        error
    }

    /// Pull the byte stream to completion, one chunk at a time.
    ///
    /// Each wait for the next chunk is bounded by `chunk_timeout`.
    pub async fn run<St, B, E, S>(
        mut self,
        mut stream: St,
        chunk_timeout: Duration,
        sink: &mut S,
    ) -> Result<TurnOutcome>
    where
        St: Stream<Item = std::result::Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        ChatError: From<E>,
        S: UpdateSink + ?Sized,
    {
        if self.state != TurnState::Streaming {
            self.begin_streaming(sink);
        }

        loop {
            let chunk = match timeout(chunk_timeout, stream.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => return self.fail_or_keep(ChatError::from(e), sink),
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        timeout_secs = chunk_timeout.as_secs(),
                        "no data received before the stream timeout"
                    );
                    return self.fail_or_keep(ChatError::Timeout, sink);
                }
            };

            if let Err(e) = self.feed(chunk.as_ref(), sink) {
                return Err(self.fail(e, sink));
            }
        }

        Ok(self.finish(sink))
    }

    fn fail_or_keep<S: UpdateSink + ?Sized>(
        self,
        error: ChatError,
        sink: &mut S,
    ) -> Result<TurnOutcome> {
        if self.is_finalized() {
            tracing::warn!(error = %error, "transport error after terminal record ignored");
            return Ok(self.finish(sink));
        }
        Err(self.fail(error, sink))
    }

    fn is_finalized(&self) -> bool {
        self.state == TurnState::Finalizing
    }

    /// Only a terminal record with a full response is honored after the stream ends.
    fn handle_trailing(&mut self, payload: &str) {
        if self.is_finalized() {
            return;
        }
        let Some(record) = parse_payload(payload) else {
            return;
        };
        match (record.done, record.final_response()) {
            (true, Some(full)) => self.finalize(decode_text(full)),
            _ => tracing::debug!(
                payload = %truncate_for_log(payload, LOG_PAYLOAD_CHARS),
                "trailing record without final response dropped"
            ),
        }
    }

    fn finalize(&mut self, content: String) {
        self.state = TurnState::Finalizing;
        let elapsed = self.started.elapsed();
        if let Some(message) = self.message.as_mut() {
            message.content = content;
            message.response_time = Some(elapsed);
        }
    }

    fn emit<S: UpdateSink + ?Sized>(&self, sink: &mut S, kind: UpdateKind) {
        sink.apply(ConversationUpdate {
            generation: self.generation,
            kind,
        });
    }
}

/// Gate a payload through the completeness check, then parse it.
fn parse_payload(payload: &str) -> Option<StreamRecord> {
    if !is_complete_json_object(payload) {
        tracing::debug!(
            payload = %truncate_for_log(payload, LOG_PAYLOAD_CHARS),
            "incomplete record skipped"
        );
        return None;
    }
    match StreamRecord::parse(payload) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(
                error = %e,
                payload = %truncate_for_log(payload, LOG_PAYLOAD_CHARS),
                "could not parse stream record"
            );
            None
        }
    }
}
