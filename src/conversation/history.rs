//! History persistence: a versioned JSON snapshot of a conversation's
//! message records.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use super::Message;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported history snapshot version {version} (expected {SNAPSHOT_VERSION})")]
    UnsupportedVersion { version: u32 },
}

/// On-disk form of a conversation's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    pub messages: Vec<Message>,
}

impl HistorySnapshot {
    pub fn new(task_name: Option<String>, messages: Vec<Message>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            task_name,
            messages,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), HistoryError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        let json = fs::read_to_string(path)?;
        let snapshot: HistorySnapshot = serde_json::from_str(&json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(HistoryError::UnsupportedVersion {
                version: snapshot.version,
            });
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::MessageKind;
    use chrono::Utc;

    fn message(kind: MessageKind, text: &str) -> Message {
        Message {
            ts: Utc::now().timestamp_millis(),
            kind,
            text: text.to_string(),
            images: None,
        }
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let snapshot = HistorySnapshot::new(
            Some("fix the bug".to_string()),
            vec![
                message(MessageKind::UserInput, "please fix it"),
                message(MessageKind::AssistantText, "on it"),
            ],
        );
        snapshot.save(&path).unwrap();

        let loaded = HistorySnapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut snapshot = HistorySnapshot::new(None, Vec::new());
        snapshot.version = 99;
        snapshot.save(&path).unwrap();

        let err = HistorySnapshot::load(&path).unwrap_err();
        assert!(matches!(err, HistoryError::UnsupportedVersion { version: 99 }));
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let err = HistorySnapshot::load(Path::new("/nonexistent/history.json")).unwrap_err();
        assert!(matches!(err, HistoryError::Io(_)));
    }
}
