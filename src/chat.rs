//! Front door for a view: one conversation, one session, one turn at a time.

use crate::api::ChatClient;
use crate::config::ClientConfig;
use crate::conversation::Conversation;
use crate::error::Result;
use crate::models::Session;
use crate::report::ReportStatus;
use crate::session::{restore_or_create, rotate_session, SessionStore};
use crate::stream::TurnOutcome;

pub struct ChatSession {
    client: ChatClient,
    store: Box<dyn SessionStore>,
    session: Session,
    conversation: Conversation,
}

impl ChatSession {
    /// Restore the stored session (or mint one) and start from the greeting.
    pub fn start(config: ClientConfig, store: Box<dyn SessionStore>) -> Result<Self> {
        let session = restore_or_create(store.as_ref(), config.session_ttl)?;
        let conversation = Conversation::new(config.initial_greeting.clone());
        let client = ChatClient::new(config)?;
        Ok(Self {
            client,
            store,
            session,
            conversation,
        })
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    /// Send one message and stream the answer into the conversation.
    ///
    /// On error the conversation already holds the failure message and the next call can
    /// retry right away.
    pub async fn send(&mut self, text: &str) -> Result<TurnOutcome> {
        if !self.session.is_valid(self.client.config().session_ttl) {
            self.session = rotate_session(self.store.as_ref())?;
        }

        let generation = self.conversation.generation();
        self.client
            .send_message(
                &self.session.session_id,
                generation,
                text,
                &mut self.conversation,
            )
            .await
    }

    /// Start over: new session id, conversation back to the greeting.
    pub fn reset(&mut self) -> Result<()> {
        self.session = rotate_session(self.store.as_ref())?;
        self.conversation.reset();
        Ok(())
    }

    pub async fn check_report(&self) -> Result<ReportStatus> {
        self.client.check_report(&self.session.session_id).await
    }
}
