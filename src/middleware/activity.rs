use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::bearer_token;
use crate::db;
use crate::extract::ClientIp;
use crate::models::NewActivity;
use crate::state::AppState;

const ANONYMOUS: &str = "Anonymous";

/// Records account events and every admin request in the activity log.
///
/// Runs after the handler. A failure to record is logged and the response
/// is returned unchanged.
pub async fn record_activity(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = ClientIp::from_parts(req.headers(), peer);
    let caller = bearer_token(req.headers())
        .and_then(|token| state.keys.verify(token).ok())
        .map(|claims| claims.id);

    let response = next.run(req).await;

    let account_event = account_action(&method, &path);
    if account_event.is_none() && caller.is_none() {
        return response;
    }

    let account = match caller {
        Some(id) => match db::accounts::find_by_id(&state.pool, id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to look up account for activity log");
                None
            }
        },
        None => None,
    };
    let is_admin = account.as_ref().is_some_and(|a| a.is_admin());
    if account_event.is_none() && !is_admin {
        return response;
    }

    let entry = NewActivity {
        user_id: account.as_ref().map(|a| a.id),
        username: account
            .as_ref()
            .map_or_else(|| ANONYMOUS.to_string(), |a| a.full_name()),
        action: account_event
            .map(str::to_string)
            .unwrap_or_else(|| format!("{method} {path}")),
        ip_address: ip.to_string_opt(),
    };

    if let Err(e) = db::activity::insert(&state.pool, &entry).await {
        tracing::warn!(error = %e, action = %entry.action, "Failed to record activity");
    }

    response
}

/// Name of the account event a request represents, if any.
fn account_action(method: &Method, path: &str) -> Option<&'static str> {
    let rest = path.strip_prefix("/accounts")?;
    match (method, rest) {
        (&Method::POST, "/authenticate") => Some("Login attempt"),
        (&Method::POST, "/register") => Some("Registration"),
        (&Method::POST, "/verify-email") => Some("Email verification"),
        (&Method::POST, "/reset-password") => Some("Password reset"),
        (&Method::POST, "/revoke-token") => Some("Logout"),
        (&Method::PUT, id) if is_id_segment(id) => Some("Account update"),
        (&Method::DELETE, id) if is_id_segment(id) => Some("Account deletion"),
        _ => None,
    }
}

fn is_id_segment(rest: &str) -> bool {
    rest.strip_prefix('/')
        .is_some_and(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
}
