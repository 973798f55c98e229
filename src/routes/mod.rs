pub mod accounts;
pub mod activity;
pub mod chat;
pub mod feedback;
pub mod items;
pub mod rentals;
pub mod reports;
pub mod subscriptions;

use axum::{
    body::Bytes,
    http::{header, Method},
    middleware,
    routing::get,
    Router,
};
use serde::de::DeserializeOwned;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db;
use crate::error::{AppError, AppResult};
use crate::mail;
use crate::middleware::record_activity;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .nest("/accounts", accounts::routes())
        .nest("/items", items::routes())
        .nest("/rentals", rentals::routes())
        .nest("/chat", chat::routes())
        .nest("/subscriptions", subscriptions::routes())
        .nest("/feedback", feedback::routes())
        .nest("/reports", reports::routes())
        .nest("/activity-logs", activity::routes())
        // Health check
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            record_activity,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Parse an optional JSON body. An empty body yields the default value.
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> AppResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request(format!("Invalid request body: {e}")))
}

/// Email an account by id, greeting it by first name. Missing accounts are
/// skipped.
pub(crate) async fn notify_account(
    state: &AppState,
    acc_id: i64,
    subject: &str,
    lines: &[String],
) -> AppResult<()> {
    let Some(account) = db::accounts::find_by_id(&state.pool, acc_id).await? else {
        return Ok(());
    };

    let mut body = Vec::with_capacity(lines.len() + 1);
    body.push(format!("Hi {},", account.first_name));
    body.extend_from_slice(lines);

    mail::notify(
        state.mailer.as_ref(),
        mail::notice(&account.email, subject, &body),
    )
    .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModerateItemRequest;

    #[test]
    fn test_optional_json_empty_body() {
        let req: ModerateItemRequest = optional_json(&Bytes::new()).unwrap();
        assert!(req.notes.is_none());

        let req: ModerateItemRequest = optional_json(&Bytes::from_static(b"  \n")).unwrap();
        assert!(req.notes.is_none());
    }

    #[test]
    fn test_optional_json_parses_and_rejects() {
        let req: ModerateItemRequest =
            optional_json(&Bytes::from_static(br#"{"notes":"blurry photo"}"#)).unwrap();
        assert_eq!(req.notes.as_deref(), Some("blurry photo"));

        let err = optional_json::<ModerateItemRequest>(&Bytes::from_static(b"{nope"));
        assert!(matches!(err, Err(AppError::BadRequest(_))));
    }
}
