//! Shared types for the registry discovery workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
