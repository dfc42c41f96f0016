pub mod gateway;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use super::{ BoxError, ByteStream };
use crate::models::chat::ChatMessage;

pub use self::gateway::GatewayClient;

/// Outbound body for an OpenAI-compatible chat-completions endpoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// What the upstream provider answered, before any status mapping.
pub enum UpstreamResponse {
    Stream(ByteStream),
    Rejected {
        status: u16,
        body: String,
    },
}

impl fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamResponse::Stream(_) => f.write_str("Stream(..)"),
            UpstreamResponse::Rejected { status, body } =>
                f.debug_struct("Rejected").field("status", status).field("body", body).finish(),
        }
    }
}

#[async_trait]
pub trait ChatUpstream: Send + Sync {
    /// Issues one streaming completion call. `Err` means the provider could
    /// not be reached at all; any HTTP answer comes back as `Ok`.
    async fn stream_chat(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest
    ) -> Result<UpstreamResponse, BoxError>;
}
