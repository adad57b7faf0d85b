use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::files::check_record_name;
use crate::loader::{load_dir, LoadObserver};
use crate::session::Session;

/// Sessions keyed by id, plus a participant -> peer -> session index.
///
/// Every session is reachable from three slots: its id, and each
/// participant's entry for the other. All mutations go through
/// [`SessionIndex::insert`] and [`SessionIndex::remove`], which keep the
/// three in step.
#[derive(Debug, Default)]
pub struct SessionIndex {
    sessions: HashMap<String, Arc<Session>>,
    by_user: HashMap<String, HashMap<String, Arc<Session>>>,
}

impl SessionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `session` under its id and both participants, replacing any
    /// session between the same two users.
    ///
    /// Fails without touching the index when the id or the pair is already
    /// taken by a different session.
    pub fn insert(&mut self, session: Arc<Session>) -> Result<()> {
        self.check_vacant(&session)?;

        let (user1, user2) = session.participants();
        let (user1, user2) = (user1.to_string(), user2.to_string());

        self.by_user
            .entry(user1.clone())
            .or_default()
            .insert(user2.clone(), Arc::clone(&session));
        self.by_user
            .entry(user2)
            .or_default()
            .insert(user1, Arc::clone(&session));
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    /// Whether `session` may be inserted: its id is free or held by the same
    /// pair, and its pair is free or held under the same id.
    pub fn check_vacant(&self, session: &Session) -> Result<()> {
        let (user1, user2) = session.participants();
        let id_taken = self
            .sessions
            .get(&session.id)
            .is_some_and(|existing| !existing.same_participants(session));
        let pair_taken = self
            .get(user1, user2)
            .is_some_and(|existing| existing.id != session.id);

        if id_taken || pair_taken {
            return Err(StoreError::SessionExists(session.id.clone()));
        }
        Ok(())
    }

    /// Order-independent lookup.
    pub fn get(&self, user1: &str, user2: &str) -> Option<&Arc<Session>> {
        self.by_user.get(user1)?.get(user2)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Arc<Session>> {
        self.sessions.get(id)
    }

    /// Every session `user` takes part in; empty for unknown users.
    pub fn sessions_of(&self, user: &str) -> Vec<Arc<Session>> {
        self.by_user
            .get(user)
            .map(|peers| peers.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn remove(&mut self, user1: &str, user2: &str) -> Option<Arc<Session>> {
        let session = self.get(user1, user2).cloned()?;
        self.sessions.remove(&session.id);
        self.unlink(user1, user2);
        self.unlink(user2, user1);
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn unlink(&mut self, user: &str, peer: &str) {
        if let Some(peers) = self.by_user.get_mut(user) {
            peers.remove(peer);
            if peers.is_empty() {
                self.by_user.remove(user);
            }
        }
    }
}

/// File-backed chat session repository, one file per session id.
#[derive(Debug)]
pub struct ChatStore {
    dir: PathBuf,
    index: RwLock<SessionIndex>,
}

impl ChatStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index: RwLock::new(SessionIndex::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn init(&self) -> Result<()> {
        let _guard = self.index.write().await;
        fs::create_dir_all(&self.dir).await?;
        info!(path = %self.dir.display(), "Chat store initialized");
        Ok(())
    }

    /// Rebuild both indices from the session files on disk. Sessions that
    /// parse are kept even when others fail.
    pub async fn load(&self, observer: &dyn LoadObserver) -> Result<()> {
        let mut index = self.index.write().await;
        let outcome = load_dir(&self.dir, observer, load_valid_session).await?;
        let (records, result) = outcome.into_parts();

        let mut rebuilt = SessionIndex::new();
        for session in records {
            if let Err(e) = rebuilt.insert(Arc::new(session)) {
                warn!(error = %e, "Skipping conflicting session");
            }
        }
        *index = rebuilt;

        info!(count = index.len(), path = %self.dir.display(), "Loaded sessions");
        result
    }

    /// Validate and persist `session`, then index it. Re-adding a session
    /// between the same users overwrites it; an id already used by another
    /// pair is a conflict.
    pub async fn add(&self, session: Session) -> Result<Arc<Session>> {
        session.validate()?;
        let mut index = self.index.write().await;
        index.check_vacant(&session)?;
        session.save(&self.dir).await?;

        let session = Arc::new(session);
        index.insert(Arc::clone(&session))?;
        debug!(id = %session.id, "Stored session");
        Ok(session)
    }

    /// Append a message to the session between `user1` and `user2` and
    /// persist it, as one step under the store lock.
    ///
    /// The session is updated in place unless a caller still holds an
    /// earlier snapshot of it, in which case that snapshot is left as it was.
    /// A failed write leaves the session without the new message.
    pub async fn append_message(
        &self,
        user1: &str,
        user2: &str,
        sender: &str,
        body: &str,
    ) -> Result<Arc<Session>> {
        let mut index = self.index.write().await;
        let mut session = index
            .remove(user1, user2)
            .ok_or_else(|| StoreError::SessionNotFound(user1.to_string(), user2.to_string()))?;

        let entry = Arc::make_mut(&mut session);
        let previous = entry.last_msg;
        entry.add_message(sender, body);
        let saved = entry.save(&self.dir).await;
        if saved.is_err() {
            entry.undo_last_message(previous);
        }

        index.insert(Arc::clone(&session))?;
        saved?;
        debug!(id = %session.id, count = session.messages().len(), "Appended message");
        Ok(session)
    }

    pub async fn get(&self, user1: &str, user2: &str) -> Option<Arc<Session>> {
        self.index.read().await.get(user1, user2).cloned()
    }

    pub async fn get_by_id(&self, id: &str) -> Option<Arc<Session>> {
        self.index.read().await.get_by_id(id).cloned()
    }

    pub async fn get_sessions_by_user(&self, user: &str) -> Vec<Arc<Session>> {
        self.index.read().await.sessions_of(user)
    }

    /// Remove the session file, then every index slot. A failed removal
    /// leaves the indices untouched.
    pub async fn delete(&self, user1: &str, user2: &str) -> Result<()> {
        let mut index = self.index.write().await;
        let session = index
            .get(user1, user2)
            .cloned()
            .ok_or_else(|| StoreError::SessionNotFound(user1.to_string(), user2.to_string()))?;

        session.delete(&self.dir).await?;
        index.remove(user1, user2);
        debug!(id = %session.id, "Deleted session");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.read().await.is_empty()
    }

    /// Empty the indices and remove the directory with everything in it.
    pub async fn destroy(&self) -> Result<()> {
        let mut index = self.index.write().await;
        *index = SessionIndex::new();
        fs::remove_dir_all(&self.dir).await?;
        Ok(())
    }
}

async fn load_valid_session(path: PathBuf) -> Result<Session> {
    let session = Session::load(&path).await?;
    session.validate()?;
    check_record_name(&path, &session.id)?;
    Ok(session)
}
