//! Web admin panel: token-guarded pages and JSON API

pub mod api;
pub mod auth;
pub mod pages;
pub mod server;

// Re-exports for convenience
pub use server::{create_panel_router, run_panel_server, PanelState};
