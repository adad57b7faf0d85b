//! Request-level operations on top of the user and chat stores.
//!
//! The stores know nothing about each other. Anything that needs both, such
//! as checking that chat participants are registered, is sequenced here.

use std::path::Path;
use std::sync::Arc;

use chata_store::{
    ChatStore, Session, StoreError, TracingObserver, User, UserStore, Users,
};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ServiceError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Clone)]
pub struct ChatService {
    users: Arc<UserStore>,
    chats: Arc<ChatStore>,
}

impl ChatService {
    pub fn new(users: Arc<UserStore>, chats: Arc<ChatStore>) -> Self {
        Self { users, chats }
    }

    /// Create both store directories and load them.
    ///
    /// Records that fail to load are logged and skipped; only a store that
    /// cannot be read at all is an error.
    pub async fn open(config: &ServerConfig) -> ServiceResult<Self> {
        let users = Arc::new(UserStore::new(&config.users_dir));
        let chats = Arc::new(ChatStore::new(&config.chats_dir));

        users.init().await?;
        chats.init().await?;

        tolerate_partial_load(users.load(&TracingObserver::new("user")).await)?;
        tolerate_partial_load(chats.load(&TracingObserver::new("session")).await)?;

        info!(
            users = users.len().await,
            sessions = chats.len().await,
            "Stores ready"
        );
        Ok(Self::new(users, chats))
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn chats(&self) -> &ChatStore {
        &self.chats
    }

    // ─── Users ───

    pub async fn register(&self, user: User) -> ServiceResult<Arc<User>> {
        Ok(self.users.register_user(user).await?)
    }

    pub async fn update(&self, user: User) -> ServiceResult<Arc<User>> {
        Ok(self.users.update_user(user).await?)
    }

    pub async fn unregister(&self, id: &str) -> ServiceResult<()> {
        if !self.users.has_user(id).await {
            return Err(StoreError::UserNotFound(id.to_string()).into());
        }
        Ok(self.users.delete_user(id).await?)
    }

    pub async fn user(&self, id: &str) -> ServiceResult<Arc<User>> {
        self.users
            .get_user(id)
            .await
            .ok_or_else(|| StoreError::UserNotFound(id.to_string()).into())
    }

    pub async fn all_users(&self) -> Users {
        self.users.get_all_users().await
    }

    /// Register `id` as the first admin if nobody is registered yet.
    ///
    /// The private key is written to `key_file`; the store only keeps the
    /// public half.
    pub async fn bootstrap_admin(
        &self,
        id: &str,
        key_file: &Path,
    ) -> ServiceResult<Option<Arc<User>>> {
        if !self.users.is_empty().await {
            return Ok(None);
        }

        let mut user = User::new(id, id, []);
        if let Some(key) = user.key.as_mut() {
            key.save_to_file(key_file).map_err(StoreError::from)?;
            key.downgrade();
        }

        let user = self.register(user).await?;
        info!(id = %user.id, key_file = %key_file.display(), "Bootstrapped admin user");
        Ok(Some(user))
    }

    // ─── Chats ───

    /// Return the session between `from` and `to`, creating it if needed.
    /// The flag is `true` when a new session was created.
    pub async fn open_chat(&self, from: &str, to: &str) -> ServiceResult<(Arc<Session>, bool)> {
        require_pair(from, to)?;
        if from == to {
            return Err(ServiceError::BadRequest("cannot chat with yourself".into()));
        }
        for id in [from, to] {
            if !self.users.has_user(id).await {
                return Err(ServiceError::UnknownUser(id.to_string()));
            }
        }

        if let Some(session) = self.chats.get(from, to).await {
            return Ok((session, false));
        }

        let session = Session::new(from, to)
            .ok_or_else(|| ServiceError::BadRequest("cannot chat with yourself".into()))?;
        let session = self.chats.add(session).await?;
        info!(id = %session.id, "Opened chat");
        Ok((session, true))
    }

    pub async fn chat(&self, from: &str, to: &str) -> ServiceResult<Arc<Session>> {
        require_pair(from, to)?;
        self.chats
            .get(from, to)
            .await
            .ok_or(ServiceError::ChatNotFound)
    }

    pub async fn chats_of(&self, user: &str) -> ServiceResult<Vec<Arc<Session>>> {
        if user.is_empty() {
            return Err(ServiceError::BadRequest("from is not specified".into()));
        }
        Ok(self.chats.get_sessions_by_user(user).await)
    }

    pub async fn send_message(&self, from: &str, to: &str, text: &str) -> ServiceResult<Arc<Session>> {
        require_pair(from, to)?;
        if text.is_empty() {
            return Err(ServiceError::BadRequest("message is not specified".into()));
        }

        match self.chats.append_message(from, to, from, text).await {
            Ok(session) => Ok(session),
            Err(StoreError::SessionNotFound(..)) => Err(ServiceError::ChatNotFound),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn close_chat(&self, from: &str, to: &str) -> ServiceResult<()> {
        require_pair(from, to)?;
        Ok(self.chats.delete(from, to).await?)
    }
}

fn require_pair(from: &str, to: &str) -> ServiceResult<()> {
    if from.is_empty() || to.is_empty() {
        return Err(ServiceError::BadRequest("from or to is not specified".into()));
    }
    Ok(())
}

fn tolerate_partial_load(result: chata_store::Result<()>) -> ServiceResult<()> {
    match result {
        Err(StoreError::Load { failures, last }) => {
            warn!(failures, error = %last, "Some records could not be loaded");
            Ok(())
        }
        other => Ok(other?),
    }
}

#[cfg(test)]
mod tests {
    use chata_shared::{Identity, Role};
    use chata_store::ErrorKind;
    use tempfile::TempDir;

    use super::*;

    async fn test_service() -> (ChatService, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            users_dir: dir.path().join("users"),
            chats_dir: dir.path().join("chats"),
            ..ServerConfig::default()
        };
        let service = ChatService::open(&config).await.unwrap();
        (service, dir)
    }

    #[tokio::test]
    async fn test_register_flow() {
        let (service, _dir) = test_service().await;

        let admin = service.register(User::new("Root", "root", [])).await.unwrap();
        assert!(admin.has_role(Role::ADMIN));

        let bob = service.register(User::new("Bob", "bob", [])).await.unwrap();
        assert!(bob.has_role(Role::CHATTER));
        assert!(!bob.has_role(Role::ADMIN));

        let dup = service.register(User::new("Bob", "bob", [])).await.unwrap_err();
        assert_eq!(dup.status_code(), 409);

        let invalid = service.register(User::new("", "carol", [])).await.unwrap_err();
        assert_eq!(invalid.status_code(), 400);

        assert_eq!(service.all_users().await.len(), 2);
        assert_eq!(service.user("bob").await.unwrap().name, "Bob");
        assert_eq!(service.user("nobody").await.unwrap_err().status_code(), 404);

        service.unregister("bob").await.unwrap();
        assert_eq!(service.unregister("bob").await.unwrap_err().status_code(), 404);
    }

    #[tokio::test]
    async fn test_chat_flow() {
        let (service, _dir) = test_service().await;
        service.register(User::new("Alice", "alice", [])).await.unwrap();
        service.register(User::new("Bob", "bob", [])).await.unwrap();

        let err = service.open_chat("alice", "alice").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        let err = service.open_chat("alice", "carol").await.unwrap_err();
        assert!(matches!(err, ServiceError::UnknownUser(id) if id == "carol"));

        let (session, created) = service.open_chat("alice", "bob").await.unwrap();
        assert!(created);
        let (again, created) = service.open_chat("bob", "alice").await.unwrap();
        assert!(!created);
        assert_eq!(session.id, again.id);

        let err = service.send_message("alice", "bob", "").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        service.send_message("alice", "bob", "hello").await.unwrap();
        service.send_message("bob", "alice", "hi").await.unwrap();

        let chat = service.chat("bob", "alice").await.unwrap();
        let senders: Vec<_> = chat.messages().iter().map(|m| m.sender.as_str()).collect();
        assert_eq!(senders, ["alice", "bob"]);

        assert_eq!(service.chats_of("alice").await.unwrap().len(), 1);
        assert!(service.chats_of("carol").await.unwrap().is_empty());

        service.close_chat("alice", "bob").await.unwrap();
        assert_eq!(service.chat("alice", "bob").await.unwrap_err().status_code(), 404);
        assert_eq!(
            service.send_message("alice", "bob", "hello?").await.unwrap_err().status_code(),
            404
        );
        assert_eq!(service.close_chat("alice", "bob").await.unwrap_err().status_code(), 404);
    }

    #[tokio::test]
    async fn test_open_chat_colliding_ids() {
        let (service, _dir) = test_service().await;
        for id in ["a", "a-b", "b-c", "c"] {
            service.register(User::new(id, id, [])).await.unwrap();
        }

        let (first, _) = service.open_chat("a-b", "c").await.unwrap();
        let err = service.open_chat("a", "b-c").await.unwrap_err();
        assert_eq!(err.status_code(), 409);

        assert_eq!(service.chat("c", "a-b").await.unwrap().id, first.id);
        assert_eq!(service.chat("a", "b-c").await.unwrap_err().status_code(), 404);
        assert!(service.chats_of("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_admin() {
        let (service, dir) = test_service().await;
        let key_file = dir.path().join("admin.pem");

        let admin = service
            .bootstrap_admin("root", &key_file)
            .await
            .unwrap()
            .unwrap();
        assert!(admin.has_role(Role::ADMIN));
        assert!(!admin.key.as_ref().unwrap().has_private_key());

        let private = Identity::load_from_file(&key_file).unwrap();
        assert!(private.has_private_key());
        assert_eq!(admin.key.as_ref(), Some(&private));

        let signature = private.sign(b"login").unwrap();
        assert!(admin.key.as_ref().unwrap().verify(b"login", &signature, None).is_ok());

        // Only ever runs against an empty store
        assert!(service
            .bootstrap_admin("other", &dir.path().join("other.pem"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_open_tolerates_bad_records() {
        let (service, dir) = test_service().await;
        service.register(User::new("Alice", "alice", [])).await.unwrap();
        std::fs::write(dir.path().join("users").join("broken"), "{").unwrap();

        let config = ServerConfig {
            users_dir: dir.path().join("users"),
            chats_dir: dir.path().join("chats"),
            ..ServerConfig::default()
        };
        let reopened = ChatService::open(&config).await.unwrap();
        assert_eq!(reopened.all_users().await.len(), 1);
    }
}
