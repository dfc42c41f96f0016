pub mod error;
#[cfg(test)]
pub(crate) mod testing;

use log::{ error, info, warn };
use std::sync::Arc;

use crate::config::RelayConfig;
use crate::llm::chat::{ ChatCompletionRequest, ChatUpstream, GatewayClient, UpstreamResponse };
use crate::llm::{ BoxError, ByteStream };
use crate::models::chat::{ ChatMessage, Role };
use crate::models::relay::RelayRequest;

pub use self::error::RelayError;

/// Stateless bridge between callers and the upstream chat provider. Each
/// call prepends the persona, requests streaming and hands back the
/// provider's body untouched.
#[derive(Clone)]
pub struct RelayHandler {
    config: Arc<RelayConfig>,
    upstream: Arc<dyn ChatUpstream>,
}

impl RelayHandler {
    pub fn new(config: Arc<RelayConfig>, upstream: Arc<dyn ChatUpstream>) -> Self {
        Self { config, upstream }
    }

    pub fn from_config(config: RelayConfig) -> Result<Self, BoxError> {
        let upstream = GatewayClient::new(config.upstream_url.clone())?;
        Ok(Self::new(Arc::new(config), Arc::new(upstream)))
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Decodes and validates a raw request body.
    pub fn parse_request(body: &[u8]) -> Result<Vec<ChatMessage>, RelayError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(RelayError::BadRequest("Request body is required".to_string()));
        }

        let request: RelayRequest = serde_json
            ::from_slice(body)
            .map_err(|e| RelayError::BadRequest(format!("Invalid request body: {}", e)))?;

        if request.messages.is_empty() {
            return Err(RelayError::BadRequest("messages must not be empty".to_string()));
        }
        if request.messages.iter().any(|m| m.role == Role::System) {
            return Err(RelayError::BadRequest("system messages are not accepted".to_string()));
        }

        Ok(request.messages)
    }

    pub fn build_payload(&self, messages: Vec<ChatMessage>) -> ChatCompletionRequest {
        let mut outbound = Vec::with_capacity(messages.len() + 1);
        outbound.push(ChatMessage::system(self.config.persona.as_ref()));
        outbound.extend(messages);

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: outbound,
            stream: true,
        }
    }

    pub async fn handle(&self, body: &[u8]) -> Result<ByteStream, RelayError> {
        let messages = Self::parse_request(body)?;
        self.relay(messages).await
    }

    pub async fn relay(&self, messages: Vec<ChatMessage>) -> Result<ByteStream, RelayError> {
        let api_key = self.config.api_key().map_err(|e| {
            error!("Chat relay misconfigured: {}", e);
            RelayError::from(e)
        })?;

        info!("Relaying conversation of {} messages", messages.len());
        let payload = self.build_payload(messages);

        match self.upstream.stream_chat(api_key, &payload).await {
            Ok(UpstreamResponse::Stream(stream)) => Ok(stream),
            Ok(UpstreamResponse::Rejected { status: 429, .. }) => {
                warn!("Upstream rate limit hit");
                Err(RelayError::RateLimited)
            }
            Ok(UpstreamResponse::Rejected { status: 402, .. }) => {
                warn!("Upstream credits exhausted");
                Err(RelayError::QuotaExhausted)
            }
            Ok(UpstreamResponse::Rejected { status, body }) => {
                error!("AI gateway error: {} {}", status, body);
                Err(RelayError::Upstream { status, body })
            }
            Err(e) => {
                error!("Chat error: failed to reach upstream: {}", e);
                Err(RelayError::Transport(e))
            }
        }
    }
}
