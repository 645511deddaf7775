//! Slack notifications for alert events
//!
//! Messages are composed from alert events and delivered through an incoming
//! webhook or the bearer-token Web API. The callback server handles the
//! *Acknowledge* / *It is not me!!* buttons attached to them.

pub mod cli;
pub mod composer;
pub mod config;
pub mod errors;
pub mod event;
pub mod notifier;
pub mod server;
pub mod slack;
pub mod templates;

// Re-export commonly used types for convenience
pub use composer::MessageComposer;
pub use config::{Config, ConfigManager};
pub use errors::{AppError, AppResult};
pub use event::EventContext;
pub use notifier::{NotificationError, SlackNotification};
pub use slack::{DeliveryClient, InteractionHandler, Message};
