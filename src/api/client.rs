use super::models::{ChatRequest, SessionRequest};
use super::response::api_error;
use crate::config::ClientConfig;
use crate::conversation::UpdateSink;
use crate::error::Result;
use crate::report::ReportStatus;
use crate::stream::{TurnOutcome, TurnProcessor};
use bytes::Bytes;
use futures::Stream;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use std::pin::Pin;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const EVENT_STREAM_ACCEPT: &str = "text/event-stream; charset=utf-8";

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// HTTP side of the chat: one streaming request per turn plus the session/report endpoints.
#[derive(Clone)]
pub struct ChatClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one turn: post the message and stream the answer into `sink`.
    ///
    /// Blank input is ignored. A failed turn has already been recorded in `sink` as the
    /// failure message when the error is returned.
    pub async fn send_message<S: UpdateSink + ?Sized>(
        &self,
        session_id: &str,
        generation: u64,
        text: &str,
        sink: &mut S,
    ) -> Result<TurnOutcome> {
        if text.trim().is_empty() {
            return Ok(TurnOutcome::Skipped);
        }

        let mut turn = TurnProcessor::new(generation);
        turn.submit(text, sink);

        let response = match self.post_chat(session_id, text).await {
            Ok(response) => response,
            Err(e) => return Err(turn.fail(e, sink)),
        };

        turn.begin_streaming(sink);
        let stream: ByteStream = Box::pin(response.bytes_stream());
        turn.run(stream, self.config.stream_timeout, sink).await
    }

    async fn post_chat(&self, session_id: &str, text: &str) -> Result<reqwest::Response> {
        let url = self.config.endpoint("/chat");
        tracing::info!(%url, %session_id, "sending chat message");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
            .header(ACCEPT, HeaderValue::from_static(EVENT_STREAM_ACCEPT))
            .json(&ChatRequest {
                message: text,
                session_id,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response)
    }

    /// Register a freshly minted session with the service.
    pub async fn init_session(&self, session_id: &str) -> Result<()> {
        let response = self
            .http
            .post(self.config.endpoint("/init-session"))
            .json(&SessionRequest { session_id })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    /// Ask whether the report for this session has been generated.
    pub async fn check_report(&self, session_id: &str) -> Result<ReportStatus> {
        let response = self
            .http
            .post(self.config.endpoint("/check-report"))
            .json(&SessionRequest { session_id })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json::<ReportStatus>().await?)
    }
}
