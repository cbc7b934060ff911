//! Admin-token check for panel routes
//!
//! Every page and API route carries the token minted by the bot's `/admin`
//! command as a `?token=` query parameter. Any failure — missing, garbled,
//! forged, expired — collapses into the same 401.

use serde::Deserialize;

use crate::auth::verify_admin_token;
use crate::errors::{AppError, AppResult};

use super::server::PanelState;

/// Query parameters shared by every route that only needs the token.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Verify the token and return the admin's Telegram id.
pub fn require_admin(state: &PanelState, token: Option<&str>) -> AppResult<i64> {
    use secrecy::ExposeSecret;

    let token = token.ok_or(AppError::InvalidToken)?;
    verify_admin_token(token, state.config.token_secret.expose_secret())
}
