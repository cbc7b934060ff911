//! The `/register` conversation: collect a password and a city, file a
//! registration request for admin approval.
//!
//! State machine: AwaitingPassword → AwaitingPasswordConfirm → AwaitingCity
//! → terminal (request submitted, or aborted when no cities exist). State
//! lives in [`super::session::SessionStore`], keyed by chat id, and is
//! cleared on every terminal transition.

use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, Message, KeyboardMarkup, KeyboardRemove};

use crate::auth::hash_password;
use crate::errors::AppResult;
use crate::storage::db::{
    create_registration_request, get_active_cities, get_active_city_by_name, get_active_user_by_tg_id,
    has_pending_request, City,
};
use crate::storage::get_connection;

use super::schema::HandlerDeps;
use super::session::RegistrationState;

/// Minimum password length, in characters (not bytes).
const MIN_PASSWORD_CHARS: usize = 6;

/// Handle `/register`: run the entry guard and open a session.
pub async fn handle_register_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    let Some(tg_id) = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()) else {
        return Ok(());
    };

    let conn = get_connection(&deps.db_pool)?;

    if get_active_user_by_tg_id(&conn, tg_id)?.is_some() {
        bot.send_message(msg.chat.id, "You are already registered.").await?;
        return Ok(());
    }

    if has_pending_request(&conn, tg_id)? {
        bot.send_message(
            msg.chat.id,
            "Your registration request is already in review. Please wait for an administrator to confirm it.",
        )
        .await?;
        return Ok(());
    }

    let username = msg
        .from
        .as_ref()
        .and_then(|u| u.username.clone())
        .unwrap_or_else(|| format!("user_{}", tg_id));

    bot.send_message(
        msg.chat.id,
        format!(
            "Registration\n\nYour username @{} will be used as the login.\n\nEnter a password (minimum {} characters):",
            username, MIN_PASSWORD_CHARS
        ),
    )
    .reply_markup(KeyboardRemove::new())
    .await?;

    deps.sessions.begin(msg.chat.id.0, username);
    Ok(())
}

/// Route a plain message into the active registration conversation.
pub async fn handle_registration_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let Some(session) = deps.sessions.get(chat_id.0) else {
        return Ok(());
    };
    let Some(text) = msg.text().map(str::to_string) else {
        // Stickers, photos etc. — not an answer; the prompt stands.
        return Ok(());
    };

    match session.state {
        RegistrationState::AwaitingPassword => {
            delete_sensitive_message(bot, msg).await;

            if text.chars().count() < MIN_PASSWORD_CHARS {
                bot.send_message(
                    chat_id,
                    format!("Password must be at least {} characters. Try again:", MIN_PASSWORD_CHARS),
                )
                .await?;
                return Ok(());
            }

            deps.sessions
                .set_state(chat_id.0, RegistrationState::AwaitingPasswordConfirm { password: text });
            bot.send_message(chat_id, "Repeat the password to confirm:").await?;
        }

        RegistrationState::AwaitingPasswordConfirm { password } => {
            delete_sensitive_message(bot, msg).await;

            if text != password {
                deps.sessions.set_state(chat_id.0, RegistrationState::AwaitingPassword);
                bot.send_message(chat_id, "Passwords do not match. Enter the password again:")
                    .await?;
                return Ok(());
            }

            let conn = get_connection(&deps.db_pool)?;
            let cities = get_active_cities(&conn)?;
            if cities.is_empty() {
                deps.sessions.clear(chat_id.0);
                bot.send_message(
                    chat_id,
                    "No cities are available right now. Please contact an administrator.",
                )
                .await?;
                return Ok(());
            }

            deps.sessions
                .set_state(chat_id.0, RegistrationState::AwaitingCity { password });
            bot.send_message(chat_id, "Choose your city:")
                .reply_markup(city_keyboard(&cities))
                .await?;
        }

        RegistrationState::AwaitingCity { password } => {
            let conn = get_connection(&deps.db_pool)?;
            let Some(city) = get_active_city_by_name(&conn, &text)? else {
                bot.send_message(chat_id, "Unknown city. Pick one from the keyboard.").await?;
                return Ok(());
            };

            let tg_id = msg
                .from
                .as_ref()
                .and_then(|u| i64::try_from(u.id.0).ok())
                .unwrap_or(chat_id.0);
            let password_hash = hash_password(&password)?;
            create_registration_request(&conn, tg_id, Some(&session.username), &password_hash, city.id)?;

            log::info!("Registration request filed by {} for city {}", tg_id, city.name);

            bot.send_message(
                chat_id,
                format!(
                    "Your registration request has been submitted.\n\nCity: {}\nUsername: @{}\n\nWait for an administrator to confirm it.",
                    city.name, session.username
                ),
            )
            .reply_markup(KeyboardRemove::new())
            .await?;

            deps.sessions.clear(chat_id.0);
        }
    }

    Ok(())
}

/// Delete a message that carried a plaintext password, best-effort. A
/// deletion failure (old message, missing rights) is swallowed on purpose:
/// the flow must not stall over transport housekeeping.
async fn delete_sensitive_message(bot: &Bot, msg: &Message) {
    if let Err(e) = bot.delete_message(msg.chat.id, msg.id).await {
        log::debug!("Could not delete password message in chat {}: {}", msg.chat.id, e);
    }
}

/// City choice keyboard: two buttons per row, resized, one-time.
fn city_keyboard(cities: &[City]) -> KeyboardMarkup {
    let mut rows: Vec<Vec<KeyboardButton>> = Vec::new();
    let mut row: Vec<KeyboardButton> = Vec::new();
    for city in cities {
        row.push(KeyboardButton::new(city.name.clone()));
        if row.len() == 2 {
            rows.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }

    KeyboardMarkup::new(rows).resize_keyboard().one_time_keyboard()
}
