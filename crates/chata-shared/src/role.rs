//! Authorization roles attached to every user.
//!
//! [`Role`] is a closed set of three tags. It is a thin wrapper around the
//! raw tag number so that values read from untrusted sources can exist in
//! memory and still be rejected when they are encoded.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::ROLE_DELIMITER;
use crate::error::RoleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Role(pub u8);

impl Role {
    /// Every user owns their own record.
    pub const SELF: Role = Role(0);
    pub const ADMIN: Role = Role(1);
    pub const CHATTER: Role = Role(2);

    pub const ALL: [Role; 3] = [Role::SELF, Role::ADMIN, Role::CHATTER];

    pub fn is_valid(self) -> bool {
        Self::ALL.contains(&self)
    }

    /// The lowercase token for this role.
    pub fn marshal(self) -> Result<&'static str, RoleError> {
        match self {
            Role::SELF => Ok("self"),
            Role::ADMIN => Ok("admin"),
            Role::CHATTER => Ok("chatter"),
            Role(other) => Err(RoleError::Invalid(other)),
        }
    }

    /// Exact token match; case folding happens in [`RoleSet`].
    pub fn unmarshal(token: &str) -> Result<Role, RoleError> {
        match token {
            "self" => Ok(Role::SELF),
            "admin" => Ok(Role::ADMIN),
            "chatter" => Ok(Role::CHATTER),
            other => Err(RoleError::UnknownToken(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.marshal() {
            Ok(token) => f.write_str(token),
            Err(_) => write!(f, "role({})", self.0),
        }
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::unmarshal(s)
    }
}

/// A unique, unordered collection of roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet {
    roles: BTreeSet<Role>,
}

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, role: Role) -> bool {
        self.roles.insert(role)
    }

    pub fn remove(&mut self, role: Role) -> bool {
        self.roles.remove(&role)
    }

    pub fn has(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().copied()
    }

    /// Same cardinality and same members, regardless of insertion order.
    pub fn equal(&self, other: &RoleSet) -> bool {
        self.len() == other.len() && other.iter().all(|role| self.has(role))
    }

    /// Comma-joined tokens. Fails as a whole if any member is invalid.
    pub fn marshal(&self) -> Result<String, RoleError> {
        let tokens = self
            .iter()
            .map(Role::marshal)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tokens.join(ROLE_DELIMITER))
    }

    /// Parse comma-separated tokens, trimming and lower-casing each one.
    ///
    /// On failure the set holds whatever parsed before the bad token and
    /// should be discarded. Blank text yields the empty set.
    pub fn unmarshal(&mut self, text: &str) -> Result<(), RoleError> {
        self.roles.clear();
        if text.trim().is_empty() {
            return Ok(());
        }

        for token in text.split(ROLE_DELIMITER) {
            let token = token.trim().to_lowercase();
            self.insert(Role::unmarshal(&token)?);
        }
        Ok(())
    }
}

impl FromStr for RoleSet {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut roles = RoleSet::new();
        roles.unmarshal(s)?;
        Ok(roles)
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self::with_roles(iter)
    }
}

impl Serialize for RoleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.marshal().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for RoleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in Role::ALL {
            let token = role.marshal().unwrap();
            assert_eq!(Role::unmarshal(token).unwrap(), role);
        }
    }

    #[test]
    fn test_invalid_role() {
        let role = Role(200);
        assert!(!role.is_valid());
        assert_eq!(role.marshal(), Err(RoleError::Invalid(200)));
        assert_eq!(role.to_string(), "role(200)");

        let err = Role::unmarshal("blah").unwrap_err();
        assert_eq!(err.to_string(), "unknown role: blah");
    }

    #[test]
    fn test_role_matching_is_exact() {
        assert!(Role::unmarshal("Admin").is_err());
        assert!(Role::unmarshal(" admin").is_err());
    }

    #[test]
    fn test_set_equality_ignores_order() {
        let a = RoleSet::with_roles([Role::ADMIN, Role::CHATTER]);
        let b = RoleSet::with_roles([Role::CHATTER, Role::ADMIN, Role::ADMIN]);
        assert_eq!(b.len(), 2);
        assert!(a.equal(&b));

        let c = RoleSet::with_roles([Role::ADMIN]);
        assert!(!a.equal(&c));
        assert!(!c.equal(&a));
    }

    #[test]
    fn test_set_roundtrip() {
        let sets = [
            RoleSet::new(),
            RoleSet::with_roles([Role::SELF]),
            RoleSet::with_roles([Role::CHATTER, Role::SELF]),
            RoleSet::with_roles(Role::ALL),
        ];
        for set in sets {
            let text = set.marshal().unwrap();
            let parsed: RoleSet = text.parse().unwrap();
            assert!(parsed.equal(&set), "{text}");
        }
    }

    #[test]
    fn test_set_marshal_order_is_stable() {
        let set = RoleSet::with_roles([Role::CHATTER, Role::ADMIN, Role::SELF]);
        assert_eq!(set.marshal().unwrap(), "self,admin,chatter");
    }

    #[test]
    fn test_one_bad_role_poisons_set() {
        let mut set = RoleSet::with_roles([Role::SELF, Role::ADMIN]);
        set.insert(Role(200));
        assert_eq!(set.len(), 3);
        assert!(set.marshal().is_err());
        assert!(serde_json::to_string(&set).is_err());
    }

    #[test]
    fn test_set_unmarshal_normalizes_tokens() {
        let set: RoleSet = " Admin , CHATTER,self ".parse().unwrap();
        assert!(set.equal(&RoleSet::with_roles(Role::ALL)));
    }

    #[test]
    fn test_set_unmarshal_stops_at_bad_token() {
        let mut set = RoleSet::new();
        let err = set.unmarshal("admin,bogus,chatter").unwrap_err();
        assert_eq!(err, RoleError::UnknownToken("bogus".into()));
        assert!(set.has(Role::ADMIN));
        assert!(!set.has(Role::CHATTER));

        assert!(set.unmarshal("admin,,chatter").is_err());
    }

    #[test]
    fn test_set_remove() {
        let mut set = RoleSet::with_roles([Role::SELF, Role::ADMIN]);
        assert!(set.remove(Role::ADMIN));
        assert!(!set.remove(Role::ADMIN));
        assert!(!set.has(Role::ADMIN));
        assert!(set.has(Role::SELF));
    }

    #[test]
    fn test_set_serde() {
        let set = RoleSet::with_roles([Role::SELF, Role::CHATTER]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "\"self,chatter\"");
        let restored: RoleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, set);
    }
}
