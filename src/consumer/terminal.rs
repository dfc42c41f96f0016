use futures::{ Stream, StreamExt };
use log::{ debug, info };
use std::error::Error;
use std::future::Future;
use std::io::{ self, Write };
use tokio::io::{ AsyncBufReadExt, BufReader };
use tokio_stream::wrappers::LinesStream;

use super::{ ChatSession, ChatView, Composer, Key, RelayClient };
use crate::config::ConsumerConfig;
use crate::models::chat::{ ChatMessage, Role };

const EXTEND_LINE_MARKER: char = '\\';
const PROMPT: &str = "you> ";

/// Writes a session to a terminal. Because replies are rendered as full
/// replacements, only the part not already on screen is printed.
pub struct TerminalView<W: Write> {
    out: W,
    open_line: Option<(usize, String)>,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out, open_line: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn prompt(&mut self) {
        self.close_line();
        self.write(&format!("\n{}", PROMPT));
    }

    fn close_line(&mut self) {
        if self.open_line.take().is_some() {
            self.write("\n");
        }
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            debug!("Terminal write failed: {}", e);
        }
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn render(&mut self, index: usize, message: &ChatMessage) {
        // The terminal already echoed what the user typed.
        if message.role == Role::User {
            self.open_line = None;
            return;
        }

        let shown = match &self.open_line {
            Some((i, shown)) if *i == index && message.content.starts_with(shown.as_str()) =>
                Some(shown.len()),
            _ => None,
        };

        match shown {
            Some(len) => {
                let rest = message.content[len..].to_string();
                self.write(&rest);
            }
            None => {
                self.close_line();
                self.write(&format!("assistant> {}", message.content));
            }
        }
        self.open_line = Some((index, message.content.clone()));
    }

    fn notify_error(&mut self, title: &str, description: &str) {
        self.close_line();
        self.write(&format!("[{}] {}\n", title, description));
    }
}

/// Maps one terminal line onto composer keys. A trailing `\` continues the
/// message on the next line.
pub fn line_to_keys(line: &str) -> Vec<Key> {
    let (body, extend_line) = match line.strip_suffix(EXTEND_LINE_MARKER) {
        Some(body) => (body, true),
        None => (line, false),
    };

    body.chars()
        .map(Key::Char)
        .chain(std::iter::once(Key::Enter { extend_line }))
        .collect()
}

/// Waits for the next input line. `None` when input ends or `interrupt`
/// fires first.
pub async fn read_input<S, F>(lines: &mut S, interrupt: F) -> Option<io::Result<String>>
    where S: Stream<Item = io::Result<String>> + Unpin, F: Future
{
    tokio::select! {
        biased;
        _ = interrupt => {
            info!("Interrupted, leaving chat");
            None
        }
        line = lines.next() => line,
    }
}

pub async fn run_chat(config: ConsumerConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let client = RelayClient::from_config(&config)?;
    let mut session = ChatSession::from_config(&config);
    let mut composer = Composer::new();
    let mut view = TerminalView::new(io::stdout());

    info!("Chat session {} connected to {}", session.id(), config.relay_url);

    for (index, message) in session.conversation().messages().iter().enumerate() {
        view.render(index, message);
    }
    view.prompt();

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    while let Some(line) = read_input(&mut lines, tokio::signal::ctrl_c()).await {
        let line = line?;
        let submitted = line_to_keys(&line)
            .into_iter()
            .filter_map(|key| composer.handle(key))
            .last();

        let Some(text) = submitted else {
            if !composer.text().is_empty() {
                view.write("... ");
            } else {
                view.prompt();
            }
            continue;
        };

        composer.set_enabled(false);
        let interrupted = {
            let turn = session.submit(&text, &client, &mut view);
            tokio::pin!(turn);
            let mut stdin_open = true;

            loop {
                tokio::select! {
                    result = &mut turn => {
                        if let Err(rejected) = result {
                            debug!("Submit rejected: {}", rejected);
                        }
                        break false;
                    }
                    _ = tokio::signal::ctrl_c() => break true,
                    line = lines.next(), if stdin_open => match line {
                        Some(Ok(line)) => {
                            for key in line_to_keys(&line) {
                                composer.handle(key);
                            }
                            debug!("Input ignored while a reply is streaming");
                        }
                        _ => {
                            stdin_open = false;
                        }
                    },
                }
            }
        };

        if interrupted {
            session.abandon_turn(&mut view);
        }
        composer.set_enabled(true);
        view.prompt();
    }

    info!("Chat session {} closed", session.id());
    Ok(())
}
