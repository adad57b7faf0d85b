//! Two-party chat sessions and their message log.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError, ValidationError};
use crate::files::{record_path, write_private};

/// A single chat message. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub sender: String,
    pub body: String,
    pub time: DateTime<Utc>,
}

/// The session id for an unordered pair of users: `"<lesser>-<greater>"`.
///
/// Returns `None` when both ids are the same.
pub fn canonical_id(user1: &str, user2: &str) -> Option<String> {
    match user1.cmp(user2) {
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Less => Some(format!("{user1}-{user2}")),
        std::cmp::Ordering::Greater => Some(format!("{user2}-{user1}")),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user1: String,
    pub user2: String,
    pub start_time: DateTime<Utc>,
    pub last_msg: DateTime<Utc>,
    #[serde(default)]
    messages: Vec<Message>,
}

impl Session {
    /// Start an empty session between two distinct users.
    pub fn new(user1: impl Into<String>, user2: impl Into<String>) -> Option<Self> {
        let (user1, user2) = (user1.into(), user2.into());
        let id = canonical_id(&user1, &user2)?;
        let now = Utc::now();

        Some(Self {
            id,
            user1,
            user2,
            start_time: now,
            last_msg: now,
            messages: Vec::new(),
        })
    }

    /// Append a message and bump the last-activity time. Nothing is written
    /// to disk.
    pub fn add_message(&mut self, sender: impl Into<String>, body: impl Into<String>) {
        self.last_msg = Utc::now();
        self.messages.push(Message {
            sender: sender.into(),
            body: body.into(),
            time: self.last_msg,
        });
    }

    /// Drop the most recent message and restore the previous activity time.
    pub(crate) fn undo_last_message(&mut self, last_msg: DateTime<Utc>) {
        self.messages.pop();
        self.last_msg = last_msg;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages from `index` onwards; empty once `index` passes the end.
    pub fn messages_since(&self, index: usize) -> &[Message] {
        self.messages.get(index..).unwrap_or_default()
    }

    pub fn last_n_messages(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn participants(&self) -> (&str, &str) {
        (&self.user1, &self.user2)
    }

    pub fn has_participant(&self, user: &str) -> bool {
        self.user1 == user || self.user2 == user
    }

    /// Whether both sessions are between the same two users, in any order.
    pub fn same_participants(&self, other: &Session) -> bool {
        self.has_participant(&other.user1) && self.has_participant(&other.user2)
    }

    /// The other participant, if `user` is in this session.
    pub fn peer_of(&self, user: &str) -> Option<&str> {
        if self.user1 == user {
            Some(&self.user2)
        } else if self.user2 == user {
            Some(&self.user1)
        } else {
            None
        }
    }

    /// A loaded session must name two distinct users and carry their
    /// canonical id.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.user1.is_empty() || self.user2.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        let expected = canonical_id(&self.user1, &self.user2).ok_or(ValidationError::SelfSession)?;
        if expected != self.id {
            return Err(ValidationError::SessionIdMismatch {
                expected,
                found: self.id.clone(),
            });
        }
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        serde_json::from_slice(&data).map_err(StoreError::Decode)
    }

    /// Write the session to `dir/<id>` with owner-only access.
    pub async fn save(&self, dir: &Path) -> Result<()> {
        let path = record_path(dir, &self.id)?;
        let data = serde_json::to_vec_pretty(self).map_err(StoreError::Encode)?;
        write_private(&path, &data).await
    }

    pub async fn delete(&self, dir: &Path) -> Result<()> {
        let path = record_path(dir, &self.id)?;
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }
}
