//! Keyword chatbot session.
//!
//! A [`ChatSession`] owns the transcript and the random source. Replies are
//! not delivered immediately: [`ChatSession::send_message`] returns a
//! [`PendingReply`] carrying the simulated typing delay, and the caller
//! delivers it once the delay has elapsed.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::schema::ChatConfig;
use crate::render::escape_html;

pub mod history;
pub mod knowledge;

pub use history::{HistoryStore, Navigation};
pub use knowledge::{Topic, classify, generate_response, quick_replies};

/// Placeholder shown while the transcript is empty.
pub const WELCOME_TEXT: &str =
    "Здравствуйте! Можете задать любой интересующий Вас вопрос по анализу и я постараюсь Вам помочь!";

/// Welcome placeholder markup.
pub fn welcome_html() -> String {
    format!(
        "<div class=\"welcome-message\"><p>{}</p></div>",
        escape_html(WELCOME_TEXT)
    )
}

/// Bot notice shown after the history is cleared.
pub const CLEARED_TEXT: &str = "История диалога очищена. Чем еще могу помочь?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    /// Local `HH:MM` label.
    pub fn time_label(&self) -> String {
        self.timestamp.with_timezone(&Local).format("%H:%M").to_string()
    }

    /// Message bubble markup. The text is escaped.
    pub fn to_html(&self) -> String {
        let class = match self.sender {
            Sender::User => "user-message",
            Sender::Bot => "bot-message",
        };
        format!(
            "<div class=\"message {class}\"><div class=\"message-content\">{}</div><div class=\"message-time\">{}</div></div>",
            escape_html(&self.text),
            self.time_label()
        )
    }
}

/// A bot reply waiting for its typing delay to pass.
#[derive(Debug, Clone)]
pub struct PendingReply {
    pub delay: Duration,
    pub text: String,
    /// Matched topic, `None` for a default response.
    pub topic: Option<&'static str>,
}

pub struct ChatSession<R: Rng = StdRng> {
    history: Vec<ChatMessage>,
    rng: R,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl ChatSession<StdRng> {
    pub fn new(config: &ChatConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> ChatSession<R> {
    pub fn with_rng(config: &ChatConfig, rng: R) -> Self {
        Self {
            history: Vec::new(),
            rng,
            min_delay_ms: config.min_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Replace the transcript with a restored one.
    pub fn restore(&mut self, history: Vec<ChatMessage>) {
        self.history = history;
    }

    /// Record the user's message and prepare the bot's answer.
    ///
    /// Blank input is ignored and returns `None`.
    pub fn send_message(&mut self, input: &str) -> Option<PendingReply> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        self.history.push(ChatMessage::new(Sender::User, text));

        let delay_ms = if self.max_delay_ms > self.min_delay_ms {
            self.rng.gen_range(self.min_delay_ms..self.max_delay_ms)
        } else {
            self.min_delay_ms
        };
        let topic = classify(text).map(|t| t.name);
        let reply = generate_response(text, &mut self.rng);

        Some(PendingReply {
            delay: Duration::from_millis(delay_ms),
            text: reply.to_string(),
            topic,
        })
    }

    /// Append the bot's answer to the transcript.
    pub fn deliver(&mut self, reply: PendingReply) -> &ChatMessage {
        self.history.push(ChatMessage::new(Sender::Bot, reply.text));
        &self.history[self.history.len() - 1]
    }

    /// Empty the transcript. Returns the notice to display under the
    /// welcome placeholder; the notice itself is not kept in history.
    pub fn clear(&mut self) -> ChatMessage {
        self.history.clear();
        ChatMessage::new(Sender::Bot, CLEARED_TEXT)
    }

    /// Transcript markup, or the welcome placeholder when empty.
    pub fn render_html(&self) -> String {
        if self.history.is_empty() {
            return welcome_html();
        }
        self.history.iter().map(ChatMessage::to_html).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn session(seed: u64) -> ChatSession<StdRng> {
        ChatSession::with_rng(&ChatConfig::default(), StdRng::seed_from_u64(seed))
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut chat = session(1);
        assert!(chat.send_message("").is_none());
        assert!(chat.send_message("   \n\t").is_none());
        assert!(chat.history().is_empty());
    }

    #[test]
    fn reply_delay_is_within_bounds() {
        let mut chat = session(2);
        for _ in 0..50 {
            let reply = chat.send_message("abc").unwrap();
            assert!(reply.delay >= Duration::from_millis(1000));
            assert!(reply.delay < Duration::from_millis(2000));
        }
    }

    #[test]
    fn user_then_bot_in_history() {
        let mut chat = session(3);
        let reply = chat.send_message("  Привет!  ").unwrap();
        assert_eq!(reply.topic, Some("привет"));
        assert_eq!(chat.history().len(), 1);
        assert_eq!(chat.history()[0].text, "Привет!");

        let delivered = chat.deliver(reply).clone();
        assert_eq!(delivered.sender, Sender::Bot);
        assert_eq!(chat.history().len(), 2);
    }

    #[test]
    fn clear_empties_history() {
        let mut chat = session(4);
        let reply = chat.send_message("xyz").unwrap();
        chat.deliver(reply);
        let notice = chat.clear();
        assert!(chat.history().is_empty());
        assert_eq!(notice.text, CLEARED_TEXT);
        assert!(chat.render_html().contains("welcome-message"));
    }

    #[test]
    fn transcript_markup_is_escaped() {
        let mut chat = session(5);
        chat.send_message("<b>bold</b> & <script>x</script>");
        let html = chat.render_html();
        assert!(!html.contains("<b>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn zero_width_delay_range_uses_minimum() {
        let config = ChatConfig {
            min_delay_ms: 10,
            max_delay_ms: 10,
            ..ChatConfig::default()
        };
        let mut chat = ChatSession::with_rng(&config, StdRng::seed_from_u64(6));
        assert_eq!(
            chat.send_message("hi").unwrap().delay,
            Duration::from_millis(10)
        );
    }
}
