/// Keyboard input relevant to composing a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    /// `extend_line` is the modifier (Shift in a browser, a trailing `\` in
    /// the terminal) that asks for a newline instead of a submit.
    Enter {
        extend_line: bool,
    },
}

/// Input box state. Plain Enter submits; Enter with the extend-line
/// modifier always inserts a newline.
#[derive(Debug, Clone)]
pub struct Composer {
    text: String,
    enabled: bool,
}

impl Default for Composer {
    fn default() -> Self {
        Self { text: String::new(), enabled: true }
    }
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Applies a key. Returns the text to send when the key submits.
    pub fn handle(&mut self, key: Key) -> Option<String> {
        if !self.enabled {
            return None;
        }

        match key {
            Key::Char(c) => self.text.push(c),
            Key::Backspace => {
                self.text.pop();
            }
            Key::Enter { extend_line: true } => self.text.push('\n'),
            Key::Enter { extend_line: false } => {
                if self.text.trim().is_empty() {
                    return None;
                }
                return Some(std::mem::take(&mut self.text));
            }
        }
        None
    }

    #[cfg(test)]
    pub fn type_str(&mut self, s: &str) {
        for c in s.chars() {
            self.handle(Key::Char(c));
        }
    }
}
