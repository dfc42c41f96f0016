use async_trait::async_trait;
use futures::{ StreamExt, TryStreamExt };
use log::{ debug, info };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE } };
use url::Url;

use super::{ ConsumerError, RelayTransport, DEFAULT_FAILURE_MESSAGE };
use crate::config::ConsumerConfig;
use crate::llm::{ BoxError, ByteStream };
use crate::models::chat::ChatMessage;
use crate::models::relay::{ ErrorBody, RelayRequest };

/// HTTP transport to a running relay.
pub struct RelayClient {
    http: HttpClient,
    url: Url,
    token: Option<String>,
}

impl RelayClient {
    pub fn new(url: Url, token: Option<String>) -> Result<Self, BoxError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as BoxError)?;

        Ok(Self { http, url, token })
    }

    pub fn from_config(config: &ConsumerConfig) -> Result<Self, BoxError> {
        Self::new(config.relay_url.clone(), config.relay_token.clone())
    }
}

#[async_trait]
impl RelayTransport for RelayClient {
    async fn send(&self, messages: &[ChatMessage]) -> Result<ByteStream, ConsumerError> {
        let body = RelayRequest { messages: messages.to_vec() };
        debug!("Sending {} messages to {}", messages.len(), self.url);

        let mut req = self.http.post(self.url.clone()).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| ConsumerError::Transport(Box::new(e)))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorBody>().await
                .ok()
                .map(|b| b.error)
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
            info!("Relay answered {}: {}", status, message);
            return Err(ConsumerError::Rejected { status: status.as_u16(), message });
        }

        let stream = resp.bytes_stream().map_err(|e| Box::new(e) as BoxError);
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::testing::RecordingView;
    use crate::consumer::{ ChatSession, TurnOutcome };
    use crate::consumer::session::FALLBACK_REPLY;
    use wiremock::matchers::{ body_json, header, method, path };
    use wiremock::{ Mock, MockServer, ResponseTemplate };

    fn client_for(server: &MockServer, token: Option<&str>) -> RelayClient {
        let url = Url::parse(&format!("{}/ai-chat", server.uri())).unwrap();
        RelayClient::new(url, token.map(str::to_string)).unwrap()
    }

    #[tokio::test]
    async fn test_streams_reply_from_relay() {
        let server = MockServer::start().await;
        let sse = concat!(
            ": keepalive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n"
        );
        Mock::given(method("POST"))
            .and(path("/ai-chat"))
            .and(header("authorization", "Bearer publishable"))
            .and(body_json(serde_json::json!({ "messages": [{ "role": "user", "content": "hi" }] })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .expect(1)
            .mount(&server).await;

        let client = client_for(&server, Some("publishable"));
        let mut session = ChatSession::default();
        let mut view = RecordingView::default();

        let outcome = session.submit("hi", &client, &mut view).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(session.conversation().last(), Some(&ChatMessage::assistant("Hello")));
    }

    #[tokio::test]
    async fn test_error_body_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(402).set_body_json(
                    serde_json::json!({ "error": "AI credits exhausted. Contact support." })
                )
            )
            .mount(&server).await;

        let client = client_for(&server, None);
        let err = client.send(&[ChatMessage::user("hi")]).await.err().unwrap();

        match err {
            ConsumerError::Rejected { status, message } => {
                assert_eq!(status, 402);
                assert_eq!(message, "AI credits exhausted. Contact support.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreadable_error_body_uses_default_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&server).await;

        let client = client_for(&server, None);
        let mut session = ChatSession::default();
        let mut view = RecordingView::default();

        let outcome = session.submit("hi", &client, &mut view).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Failed);
        assert_eq!(view.notifications[0].1, DEFAULT_FAILURE_MESSAGE);
        assert_eq!(session.conversation().last(), Some(&ChatMessage::assistant(FALLBACK_REPLY)));
    }
}
