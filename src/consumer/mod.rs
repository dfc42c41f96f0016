pub mod client;
pub mod composer;
pub mod decoder;
pub mod session;
pub mod terminal;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::time::Duration;

use crate::llm::{ BoxError, ByteStream };
use crate::models::chat::ChatMessage;

pub use self::client::RelayClient;
pub use self::composer::{ Composer, Key };
pub use self::decoder::{ DecodeError, FrameDecoder };
pub use self::session::{ ChatSession, SubmitRejected, TurnOutcome, TurnState };

pub const DEFAULT_FAILURE_MESSAGE: &str = "Failed to get response";

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
    },
    #[error("failed to reach relay: {0}")]
    Transport(#[source] BoxError),
    #[error("failed to read response body: {0}")]
    Body(#[source] BoxError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("relay did not answer within {0:?}")]
    Timeout(Duration),
}

/// Sends a transcript to the relay and yields the raw reply body.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn send(&self, messages: &[ChatMessage]) -> Result<ByteStream, ConsumerError>;
}

/// Rendering surface for one chat session.
pub trait ChatView {
    /// Draws the message at `index` with its full current content.
    fn render(&mut self, index: usize, message: &ChatMessage);

    fn notify_error(&mut self, title: &str, description: &str);

    fn set_busy(&mut self, _busy: bool) {}
}
