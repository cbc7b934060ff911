//! Server-rendered panel pages
//!
//! Plain HTML assembled with `format!` — the panel is an internal tool for
//! a handful of admins, not a storefront. The dashboard and the
//! registration-requests page embed the pending request list; the other
//! pages are navigation shells whose data comes from the JSON API.

use axum::extract::{Query, State};
use axum::response::Html;

use crate::errors::AppResult;
use crate::storage::db::{display_name, list_pending_requests, PendingRequest};
use crate::storage::get_connection;

use super::auth::{require_admin, TokenQuery};
use super::server::PanelState;

/// GET / — dashboard with the pending registration requests.
pub async fn index(State(state): State<PanelState>, Query(q): Query<TokenQuery>) -> AppResult<Html<String>> {
    requests_view(&state, q, "Dashboard").await
}

/// GET /registration-requests
pub async fn registration_requests(
    State(state): State<PanelState>,
    Query(q): Query<TokenQuery>,
) -> AppResult<Html<String>> {
    requests_view(&state, q, "Registration requests").await
}

pub async fn cities(State(state): State<PanelState>, Query(q): Query<TokenQuery>) -> AppResult<Html<String>> {
    shell_view(&state, q, "Cities")
}

pub async fn order_tips(State(state): State<PanelState>, Query(q): Query<TokenQuery>) -> AppResult<Html<String>> {
    shell_view(&state, q, "Order tips")
}

pub async fn assign_order(State(state): State<PanelState>, Query(q): Query<TokenQuery>) -> AppResult<Html<String>> {
    shell_view(&state, q, "Assign order")
}

pub async fn statements(State(state): State<PanelState>, Query(q): Query<TokenQuery>) -> AppResult<Html<String>> {
    shell_view(&state, q, "Statements")
}

pub async fn users_database(State(state): State<PanelState>, Query(q): Query<TokenQuery>) -> AppResult<Html<String>> {
    shell_view(&state, q, "Users database")
}

pub async fn expenses(State(state): State<PanelState>, Query(q): Query<TokenQuery>) -> AppResult<Html<String>> {
    shell_view(&state, q, "Expenses")
}

async fn requests_view(state: &PanelState, q: TokenQuery, title: &str) -> AppResult<Html<String>> {
    require_admin(state, q.token.as_deref())?;
    let conn = get_connection(&state.db)?;
    let pending = list_pending_requests(&conn)?;
    let token = q.token.unwrap_or_default();

    Ok(Html(render_page(title, &token, &render_requests_table(&pending))))
}

fn shell_view(state: &PanelState, q: TokenQuery, title: &str) -> AppResult<Html<String>> {
    require_admin(state, q.token.as_deref())?;
    let token = q.token.unwrap_or_default();
    let body = r#"<p class="hint">Data for this view is served by the JSON API (see the <code>/api</code> routes).</p>"#;
    Ok(Html(render_page(title, &token, body)))
}

fn render_requests_table(pending: &[PendingRequest]) -> String {
    if pending.is_empty() {
        return r#"<p class="hint">No pending registration requests.</p>"#.to_string();
    }

    let mut rows = String::new();
    for request in pending {
        rows.push_str(&format!(
            r#"<tr>
<td>{id}</td>
<td>@{name}</td>
<td>{city}</td>
<td>{created}</td>
<td>
<button onclick="moderate({id}, 'approve')">Approve</button>
<button class="danger" onclick="moderate({id}, 'reject')">Reject</button>
</td>
</tr>"#,
            id = request.id,
            name = html_escape(&display_name(request.tg_id, request.username.as_deref())),
            city = html_escape(&request.city),
            created = html_escape(&request.created_at),
        ));
    }

    format!(
        r#"<table>
<thead><tr><th>#</th><th>Username</th><th>City</th><th>Filed</th><th></th></tr></thead>
<tbody>{rows}</tbody>
</table>"#
    )
}

/// Render a page in the shared layout: nav with the token threaded through
/// every link, then the body.
fn render_page(title: &str, token: &str, body: &str) -> String {
    let nav_items = [
        ("/", "Dashboard"),
        ("/registration-requests", "Requests"),
        ("/cities", "Cities"),
        ("/assign-order", "Assign order"),
        ("/order-tips", "Order tips"),
        ("/statements", "Statements"),
        ("/users-database", "Users"),
        ("/expenses", "Expenses"),
    ];
    let nav = nav_items
        .iter()
        .map(|(href, label)| format!(r#"<a href="{}?token={}">{}</a>"#, href, token, label))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title} — Admin</title>
<style>
body{{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',sans-serif;margin:0;background:#f5f5f7;color:#1b1b1f}}
nav{{background:#1b1b1f;padding:10px 16px;display:flex;gap:14px;flex-wrap:wrap}}
nav a{{color:#d8d8de;text-decoration:none;font-size:.9rem}}
nav a:hover{{color:#fff}}
main{{max-width:960px;margin:24px auto;padding:0 16px}}
table{{width:100%;border-collapse:collapse;background:#fff;border-radius:8px;overflow:hidden}}
th,td{{padding:10px 12px;text-align:left;border-bottom:1px solid #ececf0;font-size:.92rem}}
button{{padding:6px 14px;border:0;border-radius:6px;background:#1f7a3d;color:#fff;cursor:pointer}}
button.danger{{background:#a52834}}
.hint{{color:#6a6a72}}
</style>
</head>
<body>
<nav>
{nav}
</nav>
<main>
<h1>{title}</h1>
{body}
</main>
<script>
const TOKEN = {token_json};
function moderate(id, action) {{
  fetch(`/api/registration-requests/${{id}}/${{action}}?token=${{encodeURIComponent(TOKEN)}}`, {{method: 'POST'}})
    .then(r => r.json())
    .then(data => {{ if (data.status !== 'ok') alert(data.message); location.reload(); }})
    .catch(err => alert(err));
}}
</script>
</body>
</html>"#,
        title = html_escape(title),
        nav = nav,
        body = body,
        token_json = serde_json::json!(token),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
    }

    #[test]
    fn test_requests_table_escapes_names() {
        let pending = vec![PendingRequest {
            id: 1,
            tg_id: 7,
            username: Some("<script>".to_string()),
            city: "Dresden".to_string(),
            created_at: "2026-08-06T10:00:00Z".to_string(),
        }];
        let html = render_requests_table(&pending);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_empty_table_hint() {
        assert!(render_requests_table(&[]).contains("No pending registration requests"));
    }
}
