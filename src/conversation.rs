//! Conversation state: an append-only log plus at most one in-flight assistant message.
//!
//! All changes arrive as [`ConversationUpdate`] values through an [`UpdateSink`], so a single
//! writer owns the state. Each update is stamped with the generation it was produced for;
//! after a reset, updates from the superseded generation are dropped.

use crate::models::Message;
use std::collections::VecDeque;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateKind {
    /// Append a finished message (the user's input) to the log.
    Append(Message),
    /// Replace the in-flight assistant message.
    InFlight(Message),
    /// Replace the in-flight message one last time and move it to the log.
    Commit(Message),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationUpdate {
    pub generation: u64,
    pub kind: UpdateKind,
}

/// Receiver of conversation updates produced by a streaming turn.
pub trait UpdateSink {
    fn apply(&mut self, update: ConversationUpdate);
}

#[derive(Debug, Clone)]
pub struct Conversation {
    greeting: String,
    log: Vec<Message>,
    in_flight: Option<Message>,
    generation: u64,
}

impl Conversation {
    pub fn new(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            log: vec![Message::assistant(greeting.clone())],
            greeting,
            in_flight: None,
            generation: 0,
        }
    }

    /// Committed messages, oldest first. Never includes the in-flight message.
    pub fn log(&self) -> &[Message] {
        &self.log
    }

    pub fn in_flight(&self) -> Option<&Message> {
        self.in_flight.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Everything the view should render: the log followed by the in-flight message.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.log.iter().chain(self.in_flight.iter())
    }

    pub fn len(&self) -> usize {
        self.log.len() + usize::from(self.in_flight.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drop everything back to the greeting. Updates still in transit for the old
    /// generation are ignored from now on.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.in_flight = None;
        self.log = vec![Message::assistant(self.greeting.clone())];
    }

    /// Apply an update, returning whether it took effect.
    pub fn apply_update(&mut self, update: ConversationUpdate) -> bool {
        if update.generation != self.generation {
            tracing::debug!(
                update_generation = update.generation,
                current_generation = self.generation,
                "dropping update from superseded conversation"
            );
            return false;
        }

        match update.kind {
            UpdateKind::Append(message) => {
                if let Some(stale) = self.in_flight.take() {
                    // A new turn cannot start while another is streaming; keep what we had.
                    tracing::warn!("committing unfinished in-flight message before append");
                    self.log.push(stale);
                }
                self.log.push(message);
            }
            UpdateKind::InFlight(message) => {
                self.in_flight = Some(message);
            }
            UpdateKind::Commit(message) => {
                self.in_flight = None;
                self.log.push(message);
            }
        }
        true
    }
}

impl UpdateSink for Conversation {
    fn apply(&mut self, update: ConversationUpdate) {
        self.apply_update(update);
    }
}

/// Forward updates to the task that owns the conversation.
impl UpdateSink for mpsc::UnboundedSender<ConversationUpdate> {
    fn apply(&mut self, update: ConversationUpdate) {
        if self.send(update).is_err() {
            tracing::debug!("conversation owner is gone; update discarded");
        }
    }
}

/// Records updates in order. Mostly useful for tests and replay.
impl UpdateSink for VecDeque<ConversationUpdate> {
    fn apply(&mut self, update: ConversationUpdate) {
        self.push_back(update);
    }
}
