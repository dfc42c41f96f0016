use async_trait::async_trait;
use bytes::Bytes;
use futures::{ stream, StreamExt };
use std::sync::Mutex;
use url::Url;

use crate::config::RelayConfig;
use crate::llm::chat::{ ChatCompletionRequest, ChatUpstream, UpstreamResponse };
use crate::llm::{ BoxError, ByteStream };

#[derive(Clone)]
pub enum Reply {
    Stream(Vec<&'static str>),
    Status(u16, &'static str),
    Unreachable,
}

/// Scripted upstream that records every call it receives.
pub struct FakeUpstream {
    reply: Reply,
    calls: Mutex<Vec<(String, ChatCompletionRequest)>>,
}

impl FakeUpstream {
    pub fn new(reply: Reply) -> Self {
        Self { reply, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<(String, ChatCompletionRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatUpstream for FakeUpstream {
    async fn stream_chat(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest
    ) -> Result<UpstreamResponse, BoxError> {
        self.calls.lock().unwrap().push((api_key.to_string(), request.clone()));

        match &self.reply {
            Reply::Stream(chunks) => {
                let items: Vec<Result<Bytes, BoxError>> = chunks
                    .iter()
                    .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                    .collect();
                Ok(UpstreamResponse::Stream(stream::iter(items).boxed()))
            }
            Reply::Status(status, body) =>
                Ok(UpstreamResponse::Rejected { status: *status, body: body.to_string() }),
            Reply::Unreachable => Err("connection refused".into()),
        }
    }
}

pub fn relay_config(api_key: Option<&str>) -> RelayConfig {
    let url = Url::parse("http://upstream.invalid/v1/chat/completions").unwrap();
    RelayConfig::new(url, "test-model", api_key.map(str::to_string))
        .with_persona("You are a test persona.")
}

pub async fn collect_body(mut stream: ByteStream) -> String {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    String::from_utf8(out).unwrap()
}
