use async_trait::async_trait;
use bytes::Bytes;
use futures::{ stream, StreamExt };
use std::sync::Mutex;

use super::{ ChatView, ConsumerError, RelayTransport };
use crate::llm::{ BoxError, ByteStream };
use crate::models::chat::ChatMessage;

pub enum Script {
    Chunks(Vec<String>),
    /// Yields the chunks, then a read error.
    BrokenAfter(Vec<String>),
    Rejected(u16, &'static str),
    Unreachable,
    Hang,
}

pub struct FakeTransport {
    script: Script,
    sent: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeTransport {
    pub fn new(script: Script) -> Self {
        Self { script, sent: Mutex::new(Vec::new()) }
    }

    pub fn sent(&self) -> Vec<Vec<ChatMessage>> {
        self.sent.lock().unwrap().clone()
    }
}

fn chunk_stream(chunks: &[String], broken: bool) -> ByteStream {
    let mut items: Vec<Result<Bytes, BoxError>> = chunks
        .iter()
        .map(|c| Ok(Bytes::from(c.clone())))
        .collect();
    if broken {
        items.push(Err("connection reset".into()));
    }
    stream::iter(items).boxed()
}

#[async_trait]
impl RelayTransport for FakeTransport {
    async fn send(&self, messages: &[ChatMessage]) -> Result<ByteStream, ConsumerError> {
        self.sent.lock().unwrap().push(messages.to_vec());

        match &self.script {
            Script::Chunks(chunks) => Ok(chunk_stream(chunks, false)),
            Script::BrokenAfter(chunks) => Ok(chunk_stream(chunks, true)),
            Script::Rejected(status, message) =>
                Err(ConsumerError::Rejected { status: *status, message: message.to_string() }),
            Script::Unreachable => Err(ConsumerError::Transport("connection refused".into())),
            Script::Hang => futures::future::pending().await,
        }
    }
}

#[derive(Default)]
pub struct RecordingView {
    pub renders: Vec<(usize, ChatMessage)>,
    pub notifications: Vec<(String, String)>,
    pub busy: Vec<bool>,
}

impl ChatView for RecordingView {
    fn render(&mut self, index: usize, message: &ChatMessage) {
        self.renders.push((index, message.clone()));
    }

    fn notify_error(&mut self, title: &str, description: &str) {
        self.notifications.push((title.to_string(), description.to_string()));
    }

    fn set_busy(&mut self, busy: bool) {
        self.busy.push(busy);
    }
}
