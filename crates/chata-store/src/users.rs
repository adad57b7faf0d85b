use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chata_shared::Role;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::files::{check_record_name, record_path};
use crate::loader::{load_dir, LoadObserver};
use crate::user::User;

/// Point-in-time copy of the user index.
pub type Users = HashMap<String, Arc<User>>;

/// File-backed user repository.
///
/// The directory is the source of truth; the in-memory index is rebuilt by
/// [`UserStore::load`]. One lock guards the index and is held across each
/// disk write and its index update, so the two never disagree.
#[derive(Debug)]
pub struct UserStore {
    dir: PathBuf,
    users: RwLock<Users>,
}

impl UserStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            users: RwLock::new(Users::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the backing directory if it is missing.
    pub async fn init(&self) -> Result<()> {
        let _guard = self.users.write().await;
        fs::create_dir_all(&self.dir).await?;
        info!(path = %self.dir.display(), "User store initialized");
        Ok(())
    }

    /// Rebuild the index from every record file in the directory.
    ///
    /// Records that fail to decode or validate are reported to `observer`
    /// and skipped; all others are committed. Any failure is returned as
    /// [`StoreError::Load`] after the scan completes.
    pub async fn load(&self, observer: &dyn LoadObserver) -> Result<()> {
        let mut users = self.users.write().await;
        let outcome = load_dir(&self.dir, observer, load_valid_user).await?;
        let (records, result) = outcome.into_parts();

        *users = records
            .into_iter()
            .map(|user| (user.id.clone(), Arc::new(user)))
            .collect();

        info!(count = users.len(), path = %self.dir.display(), "Loaded users");
        result
    }

    /// Validate, persist and index `user`, replacing any record with the
    /// same id.
    pub async fn add_user(&self, user: User) -> Result<Arc<User>> {
        let mut users = self.users.write().await;
        user.save(&self.dir).await?;

        let user = Arc::new(user);
        users.insert(user.id.clone(), Arc::clone(&user));
        debug!(id = %user.id, "Stored user");
        Ok(user)
    }

    /// Add a user that does not exist yet.
    ///
    /// The first user of an empty store becomes an admin; every registered
    /// user is a chatter and holds the self role.
    pub async fn register_user(&self, mut user: User) -> Result<Arc<User>> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::UserExists(user.id));
        }

        if users.is_empty() {
            user.roles.insert(Role::ADMIN);
        }
        user.roles.insert(Role::CHATTER);
        user.roles.insert(Role::SELF);

        user.save(&self.dir).await?;

        let user = Arc::new(user);
        users.insert(user.id.clone(), Arc::clone(&user));
        info!(id = %user.id, admin = user.has_role(Role::ADMIN), "Registered user");
        Ok(user)
    }

    /// Replace an existing user.
    pub async fn update_user(&self, user: User) -> Result<Arc<User>> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(StoreError::UserNotFound(user.id));
        }

        user.save(&self.dir).await?;

        let user = Arc::new(user);
        users.insert(user.id.clone(), Arc::clone(&user));
        debug!(id = %user.id, "Updated user");
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Option<Arc<User>> {
        self.users.read().await.get(id).cloned()
    }

    pub async fn get_all_users(&self) -> Users {
        self.users.read().await.clone()
    }

    /// Remove the record file, then the index entry. A failed removal
    /// leaves the index untouched.
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let path = record_path(&self.dir, id)?;
        fs::remove_file(&path).await?;

        users.remove(id);
        debug!(id = %id, "Deleted user");
        Ok(())
    }

    pub async fn has_user(&self, id: &str) -> bool {
        self.users.read().await.contains_key(id)
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Empty the index and remove the directory with everything in it.
    pub async fn destroy(&self) -> Result<()> {
        let mut users = self.users.write().await;
        users.clear();
        fs::remove_dir_all(&self.dir).await?;
        Ok(())
    }
}

async fn load_valid_user(path: PathBuf) -> Result<User> {
    let user = User::load(&path).await?;
    user.validate()?;
    check_record_name(&path, &user.id)?;
    Ok(user)
}
