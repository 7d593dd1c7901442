//! Open/close state of the info panel and the chat window.
//!
//! The dashboard builds the page's initial overlay state from this model,
//! and the page script applies the same transitions client-side.

use std::time::Duration;

/// What a click landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    InfoToggle,
    InfoClose,
    InfoPanel,
    ChatButton,
    ChatWindow,
    Elsewhere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

/// Follow-up the page must perform after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Focus the chat input after the delay.
    FocusInput(Duration),
}

#[derive(Debug, Clone)]
pub struct Overlays {
    info_open: bool,
    chat_open: bool,
    focus_delay: Duration,
}

impl Overlays {
    pub fn new(focus_delay: Duration) -> Self {
        Self {
            info_open: false,
            chat_open: false,
            focus_delay,
        }
    }

    pub fn info_open(&self) -> bool {
        self.info_open
    }

    pub fn chat_open(&self) -> bool {
        self.chat_open
    }

    pub fn focus_delay(&self) -> Duration {
        self.focus_delay
    }

    pub fn toggle_info(&mut self) {
        self.info_open = !self.info_open;
    }

    /// Opening the chat asks for the input to be focused.
    pub fn toggle_chat(&mut self) -> Effect {
        self.chat_open = !self.chat_open;
        if self.chat_open {
            Effect::FocusInput(self.focus_delay)
        } else {
            Effect::None
        }
    }

    /// Handle a click anywhere on the page.
    pub fn click(&mut self, target: ClickTarget) -> Effect {
        match target {
            ClickTarget::InfoToggle => {
                self.toggle_info();
                Effect::None
            }
            ClickTarget::ChatButton => self.toggle_chat(),
            ClickTarget::InfoClose => {
                self.info_open = false;
                Effect::None
            }
            // clicks inside either overlay leave both alone
            ClickTarget::InfoPanel | ClickTarget::ChatWindow => Effect::None,
            ClickTarget::Elsewhere => {
                self.info_open = false;
                self.chat_open = false;
                Effect::None
            }
        }
    }

    /// Escape closes the chat if open, otherwise the info panel.
    pub fn key(&mut self, key: Key) {
        if key != Key::Escape {
            return;
        }
        if self.chat_open {
            self.chat_open = false;
        } else {
            self.info_open = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlays() -> Overlays {
        Overlays::new(Duration::from_millis(300))
    }

    #[test]
    fn opening_chat_focuses_input() {
        let mut o = overlays();
        assert_eq!(o.toggle_chat(), Effect::FocusInput(Duration::from_millis(300)));
        assert!(o.chat_open());
        assert_eq!(o.toggle_chat(), Effect::None);
        assert!(!o.chat_open());
    }

    #[test]
    fn outside_click_closes_both() {
        let mut o = overlays();
        o.click(ClickTarget::InfoToggle);
        o.click(ClickTarget::ChatButton);
        assert!(o.info_open() && o.chat_open());
        o.click(ClickTarget::Elsewhere);
        assert!(!o.info_open() && !o.chat_open());
    }

    #[test]
    fn clicks_inside_overlays_keep_them_open() {
        let mut o = overlays();
        o.click(ClickTarget::InfoToggle);
        o.click(ClickTarget::ChatButton);
        o.click(ClickTarget::ChatWindow);
        o.click(ClickTarget::InfoPanel);
        assert!(o.info_open() && o.chat_open());
    }

    #[test]
    fn close_button_closes_info_only() {
        let mut o = overlays();
        o.click(ClickTarget::InfoToggle);
        o.click(ClickTarget::ChatButton);
        o.click(ClickTarget::InfoClose);
        assert!(!o.info_open());
        assert!(o.chat_open());
    }

    #[test]
    fn escape_closes_chat_first() {
        let mut o = overlays();
        o.toggle_info();
        o.toggle_chat();
        o.key(Key::Escape);
        assert!(!o.chat_open());
        assert!(o.info_open());
        o.key(Key::Other);
        assert!(o.info_open());
        o.key(Key::Escape);
        assert!(!o.info_open());
    }
}
