//! Shared configuration, errors, domain documents and protocol types for the
//! lettings assistant.

pub mod config;
pub mod error;
pub mod filters;
pub mod protocol;
pub mod types;

pub use config::LettingsConfig;
pub use error::{LettingsError, Result};
pub use filters::{FilterError, PropertyFilter, ResidentFilter};
pub use protocol::{Method, RequestEnvelope, ResponseEnvelope, RpcError};
pub use types::*;
