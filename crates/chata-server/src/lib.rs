//! Configuration and the service layer of the chata server.
//!
//! HTTP routing lives outside this crate; it drives [`ChatService`] and maps
//! [`ServiceError::kind`] onto response statuses.

pub mod config;
pub mod error;
pub mod service;

pub use config::{ConfigError, ServerConfig};
pub use error::ServiceError;
pub use service::{ChatService, ServiceResult};
