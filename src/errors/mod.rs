//! Typed errors for delivery, directory lookup, callbacks and configuration
//!
//! Library code returns [`AppResult`]; the binary wraps these in `anyhow` at
//! the command boundary.

pub mod context;
pub mod types;

pub use context::ErrorContextExt;
pub use types::{AppError, AppResult};
