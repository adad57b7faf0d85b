//! # chata-shared
//!
//! Identity and authorization primitives shared by the chata store and
//! server: RSA-backed [`Identity`] keypairs and the [`RoleSet`] attached to
//! every user.

pub mod constants;
pub mod error;
pub mod identity;
pub mod role;

pub use error::{IdentityError, RoleError};
pub use identity::Identity;
pub use role::{Role, RoleSet};
