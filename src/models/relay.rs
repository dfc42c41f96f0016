use serde::{ Serialize, Deserialize };

use super::chat::ChatMessage;

/// Body of a `POST` to the relay route.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Body of every non-streaming relay response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}
