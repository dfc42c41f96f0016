use futures::StreamExt;
use log::{ debug, error, info };
use std::time::Duration;
use uuid::Uuid;

use super::{ ChatView, ConsumerError, FrameDecoder, RelayTransport };
use crate::config::{ ConsumerConfig, DEFAULT_MAX_FRAME_RETRIES };
use crate::models::chat::{ ChatMessage, Conversation };

pub const FALLBACK_REPLY: &str = "Sorry, I'm having a moment. Try again? 🤖";
pub const FAILURE_TITLE: &str = "Oops!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingFirstByte,
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("input is blank")]
    Blank,
    #[error("a reply is already in progress")]
    Busy,
}

/// One conversation and its turn-taking state. At most one reply is in
/// flight; while it streams, only the last message changes.
pub struct ChatSession {
    id: Uuid,
    conversation: Conversation,
    state: TurnState,
    reply: String,
    max_frame_retries: u32,
    timeout: Option<Duration>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_RETRIES)
    }
}

impl ChatSession {
    pub fn new(max_frame_retries: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation: Conversation::new(),
            state: TurnState::Idle,
            reply: String::new(),
            max_frame_retries,
            timeout: None,
        }
    }

    pub fn from_config(config: &ConsumerConfig) -> Self {
        let mut session = Self::new(config.max_frame_retries).with_timeout(config.timeout);
        if let Some(greeting) = &config.greeting {
            session = session.with_greeting(greeting.clone());
        }
        session
    }

    /// Seeds an opening assistant message. Only applies to an empty session.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        if self.conversation.is_empty() {
            self.conversation.push(ChatMessage::assistant(greeting));
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == TurnState::Idle
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Records the user's turn and returns the transcript to send.
    pub fn begin_turn<V: ChatView + ?Sized>(
        &mut self,
        input: &str,
        view: &mut V
    ) -> Result<Vec<ChatMessage>, SubmitRejected> {
        let text = input.trim();
        if text.is_empty() {
            return Err(SubmitRejected::Blank);
        }
        if !self.is_idle() {
            debug!("Session {} busy, ignoring submit", self.id);
            return Err(SubmitRejected::Busy);
        }

        let message = ChatMessage::user(text);
        let index = self.conversation.push(message.clone());
        view.render(index, &message);

        self.reply.clear();
        self.state = TurnState::AwaitingFirstByte;
        view.set_busy(true);

        Ok(self.conversation.messages().to_vec())
    }

    pub fn apply_delta<V: ChatView + ?Sized>(&mut self, delta: &str, view: &mut V) {
        if self.is_idle() {
            debug!("Session {} got a delta with no turn in flight", self.id);
            return;
        }

        self.reply.push_str(delta);
        let message = ChatMessage::assistant(self.reply.as_str());

        let index = match self.state {
            TurnState::AwaitingFirstByte => {
                self.state = TurnState::Streaming;
                self.conversation.push(message.clone())
            }
            _ => {
                match self.conversation.replace_last(message.clone()) {
                    Some(index) => index,
                    None => self.conversation.push(message.clone()),
                }
            }
        };

        view.render(index, &message);
    }

    pub fn complete_turn<V: ChatView + ?Sized>(&mut self, view: &mut V) {
        if self.state == TurnState::AwaitingFirstByte {
            let message = ChatMessage::assistant("");
            let index = self.conversation.push(message.clone());
            view.render(index, &message);
        }
        info!("Session {} reply complete ({} chars)", self.id, self.reply.chars().count());
        self.finish(view);
    }

    pub fn fail_turn<V: ChatView + ?Sized>(&mut self, err: &ConsumerError, view: &mut V) {
        error!("Chat error in session {}: {}", self.id, err);
        view.notify_error(FAILURE_TITLE, &err.to_string());

        let message = ChatMessage::assistant(FALLBACK_REPLY);
        let index = self.conversation.push(message.clone());
        view.render(index, &message);
        self.finish(view);
    }

    /// Gives up on the reply in flight without recording anything further.
    pub fn abandon_turn<V: ChatView + ?Sized>(&mut self, view: &mut V) {
        if !self.is_idle() {
            info!("Session {} abandoned its reply", self.id);
            self.finish(view);
        }
    }

    fn finish<V: ChatView + ?Sized>(&mut self, view: &mut V) {
        self.state = TurnState::Idle;
        self.reply.clear();
        view.set_busy(false);
    }

    /// Runs one full turn: send, stream the reply into the view, settle.
    pub async fn submit<T, V>(
        &mut self,
        input: &str,
        transport: &T,
        view: &mut V
    ) -> Result<TurnOutcome, SubmitRejected>
        where T: RelayTransport + ?Sized, V: ChatView + ?Sized
    {
        let messages = self.begin_turn(input, view)?;

        match self.stream_reply(&messages, transport, view).await {
            Ok(()) => {
                self.complete_turn(view);
                Ok(TurnOutcome::Completed)
            }
            Err(e) => {
                self.fail_turn(&e, view);
                Ok(TurnOutcome::Failed)
            }
        }
    }

    async fn stream_reply<T, V>(
        &mut self,
        messages: &[ChatMessage],
        transport: &T,
        view: &mut V
    ) -> Result<(), ConsumerError>
        where T: RelayTransport + ?Sized, V: ChatView + ?Sized
    {
        let mut stream = match self.timeout {
            Some(limit) =>
                tokio::time
                    ::timeout(limit, transport.send(messages)).await
                    .map_err(|_| ConsumerError::Timeout(limit))??,
            None => transport.send(messages).await?,
        };

        let mut decoder = FrameDecoder::new(self.max_frame_retries);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ConsumerError::Body)?;
            for delta in decoder.push(&chunk)? {
                self.apply_delta(&delta, view);
            }
            if decoder.is_done() {
                break;
            }
        }
        decoder.finish()?;

        Ok(())
    }
}
