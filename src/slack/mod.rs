//! Slack message model, delivery client and interactive callbacks
//!
//! ## Architecture
//!
//! - **message**: outbound payload (attachments, fields, buttons) and its wire forms
//! - **directory**: bounded, expiring display name to user id cache
//! - **client**: webhook / bearer-token delivery and paginated user lookup
//! - **interaction**: stateless handling of button clicks

pub mod client;
pub mod directory;
pub mod interaction;
pub mod message;
pub mod traits;

pub use client::{DeliveryClient, DeliveryConfig, DeliveryMode};
pub use directory::UserDirectoryCache;
pub use interaction::{InteractionHandler, EPHEMERAL_ERROR_RESPONSE};
pub use message::{Action, Attachment, Field, Message, MessageIcon};
pub use traits::SlackClient;
