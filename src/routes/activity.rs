use axum::{
    extract::State,
    routing::get,
    Router,
};

use crate::db::{self, activity::ActivityFilter};
use crate::error::AppResult;
use crate::extract::{AdminUser, Json, Path, Query};
use crate::models::{ActivityLogPage, DateRangeQuery, PageQuery};
use crate::state::AppState;
use crate::validation::ValidationError;

/// Activity log browsing. Every route requires an admin.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(all_logs))
        .route("/user/{id}", get(logs_by_user))
        .route("/action/{action}", get(logs_by_action))
        .route("/ip/{ip}", get(logs_by_ip))
        .route("/date-range", get(logs_by_date_range))
}

async fn page(
    state: &AppState,
    filter: ActivityFilter,
    paging: PageQuery,
) -> AppResult<Json<ActivityLogPage>> {
    let (logs, total) = db::activity::page(&state.pool, &filter, paging).await?;
    Ok(Json(ActivityLogPage {
        logs,
        meta: paging.meta(total),
    }))
}

async fn all_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(paging): Query<PageQuery>,
) -> AppResult<Json<ActivityLogPage>> {
    page(&state, ActivityFilter::All, paging).await
}

async fn logs_by_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i64>,
    Query(paging): Query<PageQuery>,
) -> AppResult<Json<ActivityLogPage>> {
    page(&state, ActivityFilter::User(user_id), paging).await
}

async fn logs_by_action(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(action): Path<String>,
    Query(paging): Query<PageQuery>,
) -> AppResult<Json<ActivityLogPage>> {
    page(&state, ActivityFilter::Action(action), paging).await
}

async fn logs_by_ip(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(ip): Path<String>,
    Query(paging): Query<PageQuery>,
) -> AppResult<Json<ActivityLogPage>> {
    page(&state, ActivityFilter::Ip(ip), paging).await
}

async fn logs_by_date_range(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<ActivityLogPage>> {
    if query.end_date < query.start_date {
        return Err(ValidationError::InvalidRange {
            start: "start_date",
            end: "end_date",
        }
        .into());
    }
    let filter = ActivityFilter::Between(query.start_date, query.end_date);
    page(&state, filter, query.paging()).await
}
