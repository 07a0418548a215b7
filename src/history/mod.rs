//! Conversation history for the loaded document
//!
//! Turns are kept in memory and, when a file is configured, mirrored to a
//! pretty-printed JSON array after every change. Sequence numbers are
//! assigned by the store and never reused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// A question as asked by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub model: String,
    pub asked_at: DateTime<Utc>,
}

/// Reference from an answer back to a chunk that was in its prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub chunk_id: String,
    pub ordinal: usize,
    pub score: f32,
}

/// A model's answer to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub model: String,
    pub citations: Vec<Citation>,
    /// False when no document text made it into the prompt
    pub grounded: bool,
    pub latency_ms: u64,
    pub answered_at: DateTime<Utc>,
}

/// One recorded question/answer exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub sequence: u64,
    /// File name of the document the question was asked against
    pub document: String,
    pub query: Query,
    pub answer: Answer,
}

/// Storage for conversation turns
pub trait ConversationHistory: Send + Sync {
    /// All turns, oldest first
    fn get_history(&self) -> Vec<ConversationTurn>;

    /// Record a turn, returning the sequence number assigned to it
    fn add_entry(&self, turn: ConversationTurn) -> u64;

    /// The last `count` turns, oldest first
    fn recent(&self, count: usize) -> Vec<ConversationTurn>;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct Turns {
    entries: Vec<ConversationTurn>,
    next_sequence: u64,
}

/// In-memory history with optional JSON file mirroring
#[derive(Debug)]
pub struct ConversationStore {
    turns: RwLock<Turns>,
    file: Option<PathBuf>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    /// Create an empty store that lives in memory only
    pub fn new() -> Self {
        Self {
            turns: RwLock::new(Turns {
                entries: Vec::new(),
                next_sequence: 1,
            }),
            file: None,
        }
    }

    /// Open a store mirrored to `path`, loading any turns already there.
    ///
    /// A missing file starts empty; an unreadable one is logged and ignored.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<ConversationTurn>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Ignoring corrupt history file {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Could not read history file {}: {}", path.display(), e);
                Vec::new()
            }
        };

        let next_sequence = entries.iter().map(|t| t.sequence).max().unwrap_or(0) + 1;
        debug!("Loaded {} history entries from {}", entries.len(), path.display());

        Self {
            turns: RwLock::new(Turns {
                entries,
                next_sequence,
            }),
            file: Some(path),
        }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, Turns> {
        self.turns.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Turns> {
        self.turns.write().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, entries: &[ConversationTurn]) {
        let Some(path) = &self.file else {
            return;
        };
        let result = serde_json::to_string_pretty(entries)
            .map_err(std::io::Error::other)
            .and_then(|json| {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, json)
            });
        if let Err(e) = result {
            warn!("Failed to save history to {}: {}", path.display(), e);
        }
    }
}

impl ConversationHistory for ConversationStore {
    fn get_history(&self) -> Vec<ConversationTurn> {
        self.read().entries.clone()
    }

    fn add_entry(&self, mut turn: ConversationTurn) -> u64 {
        let mut turns = self.write();
        let sequence = turns.next_sequence;
        turns.next_sequence += 1;
        turn.sequence = sequence;
        turns.entries.push(turn);
        self.persist(&turns.entries);
        sequence
    }

    fn recent(&self, count: usize) -> Vec<ConversationTurn> {
        let turns = self.read();
        let skip = turns.entries.len().saturating_sub(count);
        turns.entries[skip..].to_vec()
    }

    fn clear(&self) {
        let mut turns = self.write();
        turns.entries.clear();
        if let Some(path) = &self.file {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove history file {}: {}", path.display(), e),
            }
        }
    }

    fn len(&self) -> usize {
        self.read().entries.len()
    }
}

#[cfg(test)]
pub(crate) fn sample_turn(question: &str, answer: &str, model: &str) -> ConversationTurn {
    let now = Utc::now();
    ConversationTurn {
        sequence: 0,
        document: "sample.pdf".to_string(),
        query: Query {
            text: question.to_string(),
            model: model.to_string(),
            asked_at: now,
        },
        answer: Answer {
            text: answer.to_string(),
            model: model.to_string(),
            citations: Vec::new(),
            grounded: false,
            latency_ms: 0,
            answered_at: now,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sequences_increase() {
        let store = ConversationStore::new();
        assert_eq!(store.add_entry(sample_turn("q1", "a1", "llama2")), 1);
        assert_eq!(store.add_entry(sample_turn("q2", "a2", "phi")), 2);

        let history = store.get_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].query.text, "q1");
        assert_eq!(history[1].sequence, 2);
    }

    #[test]
    fn test_sequences_not_reused_after_clear() {
        let store = ConversationStore::new();
        store.add_entry(sample_turn("q1", "a1", "llama2"));
        store.add_entry(sample_turn("q2", "a2", "llama2"));
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.add_entry(sample_turn("q3", "a3", "llama2")), 3);
    }

    #[test]
    fn test_recent_returns_tail_oldest_first() {
        let store = ConversationStore::new();
        for i in 0..5 {
            store.add_entry(sample_turn(&format!("q{}", i), "a", "llama2"));
        }

        let recent = store.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].query.text, "q3");
        assert_eq!(recent[1].query.text, "q4");
        assert_eq!(store.recent(10).len(), 5);
        assert!(store.recent(0).is_empty());
    }

    #[test]
    fn test_snapshot_is_owned() {
        let store = ConversationStore::new();
        store.add_entry(sample_turn("q1", "a1", "llama2"));
        let snapshot = store.get_history();
        store.add_entry(sample_turn("q2", "a2", "llama2"));

        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_file_persistence_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");

        let store = ConversationStore::open(&path);
        store.add_entry(sample_turn("q1", "a1", "llama2"));
        store.add_entry(sample_turn("q2", "a2", "mistral"));
        assert!(path.exists());

        let reopened = ConversationStore::open(&path);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get_history()[1].answer.model, "mistral");
        assert_eq!(reopened.add_entry(sample_turn("q3", "a3", "phi")), 3);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = ConversationStore::open(&path);
        assert!(store.is_empty());
        assert_eq!(store.add_entry(sample_turn("q", "a", "llama2")), 1);
    }

    #[test]
    fn test_clear_removes_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");

        let store = ConversationStore::open(&path);
        store.add_entry(sample_turn("q", "a", "llama2"));
        store.clear();

        assert!(!path.exists());
        assert!(store.is_empty());
    }
}
