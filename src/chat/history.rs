//! Session-scoped chat transcript storage.
//!
//! The transcript survives normal navigation (a new `abcxyz chat` in the
//! same login session) and is dropped on a full reload (`--fresh`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::ChatMessage;

/// Storage key of the persisted transcript.
pub const HISTORY_KEY: &str = "chat_history_v1";

/// How the chat was (re)opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Navigate,
    Reload,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore {
    /// Store under the system temp directory.
    pub fn new() -> Self {
        Self::at(std::env::temp_dir().join(format!("abcxyz_{HISTORY_KEY}.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, history: &[ChatMessage]) -> Result<()> {
        let json = serde_json::to_string(history).context("failed to serialize chat history")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }

    /// Stored transcript. Missing or unreadable storage yields nothing.
    pub fn load(&self) -> Vec<ChatMessage> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to remove {}", self.path.display()))
            }
        }
    }

    /// Transcript to start with: the stored one after navigation, nothing
    /// after a reload (which also wipes storage).
    pub fn restore(&self, navigation: Navigation) -> Vec<ChatMessage> {
        match navigation {
            Navigation::Navigate => self.load(),
            Navigation::Reload => {
                let _ = self.clear();
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Sender;

    fn temp_store(tag: &str) -> HistoryStore {
        let dir = std::env::temp_dir().join(format!("abcxyz-history-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        HistoryStore::at(dir.join(format!("{HISTORY_KEY}.json")))
    }

    #[test]
    fn navigation_keeps_history() {
        let store = temp_store("nav");
        let msgs = vec![
            ChatMessage::new(Sender::User, "abc?"),
            ChatMessage::new(Sender::Bot, "ABC анализ"),
        ];
        store.save(&msgs).unwrap();
        assert_eq!(store.restore(Navigation::Navigate), msgs);
        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }

    #[test]
    fn reload_clears_history() {
        let store = temp_store("reload");
        store.save(&[ChatMessage::new(Sender::User, "hi")]).unwrap();
        assert!(store.restore(Navigation::Reload).is_empty());
        assert!(!store.path().exists());
        assert!(store.restore(Navigation::Navigate).is_empty());
        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }

    #[test]
    fn corrupt_storage_loads_empty() {
        let store = temp_store("corrupt");
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_empty());
        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }
}
