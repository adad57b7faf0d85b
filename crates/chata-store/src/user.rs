//! The persisted user record.

use std::path::Path;

use chata_shared::{Identity, Role, RoleSet};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError, ValidationError};
use crate::files::{record_path, write_private};

/// A registered user. The `id` is chosen by the client and doubles as the
/// file name of the record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Public key at minimum; a private-bearing identity is persisted as such.
    #[serde(default)]
    pub key: Option<Identity>,
    #[serde(default)]
    pub roles: RoleSet,
}

impl User {
    /// Build a user with a fresh identity. The self role is always added.
    ///
    /// Nothing is validated here; call [`User::validate`] before trusting it.
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        let mut roles = RoleSet::with_roles(roles);
        roles.insert(Role::SELF);

        Self {
            id: id.into(),
            name: name.into(),
            key: Some(Identity::generate()),
            roles,
        }
    }

    /// Checks id, name and key, in that order. Roles are only checked when
    /// the record is encoded.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.key.is_none() {
            return Err(ValidationError::MissingKey);
        }
        Ok(())
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.has(role)
    }

    /// Read and decode a record file. The result is not validated.
    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        serde_json::from_slice(&data).map_err(StoreError::Decode)
    }

    /// Validate, then write the record to `dir/<id>` with owner-only access.
    pub async fn save(&self, dir: &Path) -> Result<()> {
        self.validate()?;

        let path = record_path(dir, &self.id)?;
        let data = serde_json::to_vec_pretty(self).map_err(StoreError::Encode)?;
        write_private(&path, &data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user() {
        let user = User::new("user1", "user1", []);
        assert_eq!(user.id, "user1");
        assert_eq!(user.name, "user1");
        assert!(user.key.as_ref().is_some_and(Identity::has_private_key));
        assert!(user.has_role(Role::SELF));
        assert_eq!(user.roles.len(), 1);
        assert!(user.validate().is_ok());

        let admin = User::new("root", "root", [Role::ADMIN]);
        assert!(admin.has_role(Role::ADMIN));
        assert!(admin.has_role(Role::SELF));
    }

    #[test]
    fn test_validate_order() {
        let mut user = User::new("", "", []);
        user.key = None;
        assert_eq!(user.validate(), Err(ValidationError::EmptyId));

        user.id = "user1".into();
        assert_eq!(user.validate(), Err(ValidationError::EmptyName));

        user.name = "user1".into();
        assert_eq!(user.validate(), Err(ValidationError::MissingKey));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let user = User::new("Alice", "alice", [Role::CHATTER]);
        user.save(dir.path()).await.unwrap();

        let loaded = User::load(&dir.path().join("alice")).await.unwrap();
        assert_eq!(loaded.id, user.id);
        assert_eq!(loaded.name, user.name);
        assert_eq!(loaded.key, user.key);
        assert!(loaded.roles.equal(&user.roles));
    }

    #[tokio::test]
    async fn test_document_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut user = User::new("Bob", "bob", []);
        user.key = user.key.map(|k| k.public_view());
        user.save(dir.path()).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join("bob")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["id"], "bob");
        assert_eq!(doc["name"], "Bob");
        assert_eq!(doc["roles"], "self");
        assert!(doc["key"].as_str().unwrap().contains("RSA PUBLIC KEY"));
    }

    #[tokio::test]
    async fn test_save_refuses_invalid() {
        let dir = tempfile::tempdir().unwrap();

        let user = User::new("", "", []);
        assert!(matches!(
            user.save(dir.path()).await,
            Err(StoreError::Validation(ValidationError::EmptyId))
        ));

        let mut user = User::new("user1", "user1", []);
        user.roles.insert(Role(200));
        assert!(matches!(
            user.save(dir.path()).await,
            Err(StoreError::Encode(_))
        ));
        assert!(!dir.path().join("user1").exists());

        let user = User::new("user1", "../user1", []);
        assert!(matches!(
            user.save(dir.path()).await,
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_save_into_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let user = User::new("user1", "user1", []);
        assert!(matches!(
            user.save(&dir.path().join("missing")).await,
            Err(StoreError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            User::load(&dir.path().join("missing")).await,
            Err(StoreError::Io(_))
        ));

        let path = dir.path().join("blah");
        std::fs::write(&path, "blah").unwrap();
        assert!(matches!(
            User::load(&path).await,
            Err(StoreError::Decode(_))
        ));

        // Decodes, but is not a valid user
        std::fs::write(&path, r#"{"name": "blah"}"#).unwrap();
        let user = User::load(&path).await.unwrap();
        assert_eq!(user.validate(), Err(ValidationError::EmptyId));
    }
}
