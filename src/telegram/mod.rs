//! Telegram bot integration and handlers

pub mod admin;
pub mod bot;
pub mod registration;
pub mod schema;
pub mod session;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use schema::{schema, HandlerDeps, HandlerError};
pub use session::{RegistrationState, SessionStore};
