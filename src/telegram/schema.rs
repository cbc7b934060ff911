//! Dispatcher schema and handler dependencies

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use crate::config::AppConfig;
use crate::storage::db::DbPool;

use super::admin::handle_admin_command;
use super::bot::Command;
use super::registration::{handle_register_command, handle_registration_message};
use super::session::SessionStore;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<AppConfig>,
}

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Commands take priority: a `/register` in the middle of a conversation
/// restarts the flow instead of being swallowed as a password attempt.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_registration = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(registration_message_handler(deps_registration))
}

/// Handler for bot commands (/register, /admin)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);

                let result = match cmd {
                    Command::Register => handle_register_command(&bot, &msg, &deps).await,
                    Command::Admin(password) => handle_admin_command(&bot, &msg, &password, &deps).await,
                };
                if let Err(e) = result {
                    log::error!("Command handler failed for chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        },
    ))
}

/// Handler for plain messages that belong to an in-flight registration
/// conversation. Messages from chats with no session fall through.
fn registration_message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let sessions = deps.sessions.clone();

    Update::filter_message()
        .filter(move |msg: Message| sessions.is_active(msg.chat.id.0))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_registration_message(&bot, &msg, &deps).await {
                    log::error!("Registration handler failed for chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}
