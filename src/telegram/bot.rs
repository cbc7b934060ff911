//! Bot instance creation and command definitions

use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::config::AppConfig;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Commands:")]
pub enum Command {
    #[command(description = "apply for an account")]
    Register,
    /// `/admin <password>` — deliberately absent from the command list so
    /// the bot UI doesn't advertise the admin entry point.
    #[command(hide)]
    Admin(String),
}

/// Creates a Bot instance from the configured token.
pub fn create_bot(config: &AppConfig) -> Bot {
    Bot::new(config.bot_token.expose_secret())
}

/// Sets up the visible bot commands in the Telegram UI
///
/// # Returns
/// * `Ok(())` - Commands set successfully
/// * `Err(RequestError)` - Failed to set commands
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![BotCommand::new("register", "apply for an account")])
        .await?;

    Ok(())
}
