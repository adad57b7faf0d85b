//! # chata-store
//!
//! File-backed stores for chata users and chat sessions.
//!
//! Each record lives in its own owner-readable JSON file named after its key.
//! The directory on disk is authoritative; [`UserStore`] and [`ChatStore`]
//! keep an in-memory index over it, guarded by a single reader/writer lock
//! per store and rebuilt by a concurrent bulk load.

pub mod loader;
pub mod session;
pub mod sessions;
pub mod user;
pub mod users;

mod error;
mod files;

pub use error::{ErrorKind, Result, StoreError, ValidationError};
pub use loader::{LoadObserver, NoopObserver, TracingObserver};
pub use session::{canonical_id, Message, Session};
pub use sessions::{ChatStore, SessionIndex};
pub use user::User;
pub use users::{UserStore, Users};
