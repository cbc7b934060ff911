//! The `/admin <password>` command: admin session bootstrap
//!
//! One-shot, stateless. On success the admin receives a personal panel URL
//! with a signed token in the query string — the only bridge between the
//! bot and the web panel.

use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::types::Message;

use crate::auth::{issue_admin_token, verify_password};
use crate::errors::AppResult;
use crate::storage::db::get_active_admin;
use crate::storage::get_connection;

use super::schema::HandlerDeps;

/// Handle `/admin <password>`.
///
/// Unknown or inactive admin identities get no reply at all — the command
/// must not reveal which identities are admins. A wrong password gets a
/// generic rejection with no hint about which factor failed.
pub async fn handle_admin_command(
    bot: &Bot,
    msg: &Message,
    password: &str,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let Some(tg_id) = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()) else {
        return Ok(());
    };

    let conn = get_connection(&deps.db_pool)?;
    let Some(admin) = get_active_admin(&conn, tg_id)? else {
        log::debug!("/admin from non-admin {}, ignoring", tg_id);
        return Ok(());
    };

    let password = password.trim();
    if password.is_empty() {
        bot.send_message(
            msg.chat.id,
            "Admin panel login\n\nSend the password with the command:\n/admin your_password",
        )
        .await?;
        return Ok(());
    }

    if !verify_password(password, &admin.password_hash) {
        bot.send_message(msg.chat.id, "Wrong password.").await?;
        return Ok(());
    }

    let token = issue_admin_token(
        tg_id,
        deps.config.token_secret.expose_secret(),
        deps.config.token_expires_min,
    )?;
    let url = format!("{}?token={}", deps.config.panel_base_url.trim_end_matches('/'), token);

    log::info!("Issued admin token for {}", tg_id);

    bot.send_message(
        msg.chat.id,
        format!(
            "Access granted.\n\nOpen the admin panel:\n{}\n\nThe link is personal; the token is valid for {}.",
            url,
            deps.config.token_lifetime_human(),
        ),
    )
    .await?;

    Ok(())
}
