use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};

use crate::db::{
    self,
    reports::{Order, ReportFilter},
};
use crate::error::{AppError, AppResult};
use crate::extract::{AdminUser, AuthUser, Json, Path, Query};
use crate::models::{
    CreateReportRequest, MessageResponse, PageQuery, ReportDetails, ReportPage, ReportStatus,
    ReportsQuery, ReviewReportRequest, UpdateReportStatusRequest, UserReport,
};
use crate::state::AppState;
use crate::validation::ValidationError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reports).post(create_report))
        .route("/pending", get(pending_reports))
        .route("/by-reporter/{id}", get(reports_by_reporter))
        .route("/against-user/{id}", get(reports_against_user))
        .route("/{id}", get(get_report).delete(delete_report))
        .route("/{id}/status", put(update_status))
        .route("/{id}/review", put(review_report))
}

async fn load(state: &AppState, id: i64) -> AppResult<UserReport> {
    db::reports::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Report not found"))
}

async fn details(state: &AppState, report: UserReport) -> AppResult<ReportDetails> {
    db::reports::with_details(&state.pool, vec![report])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Report not found"))
}

async fn page(
    state: &AppState,
    filter: ReportFilter,
    order: Order,
    paging: PageQuery,
) -> AppResult<Json<ReportPage>> {
    let (reports, total) = db::reports::page(&state.pool, filter, order, paging).await?;
    Ok(Json(ReportPage {
        reports: db::reports::with_details(&state.pool, reports).await?,
        meta: paging.meta(total),
    }))
}

async fn create_report(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateReportRequest>,
) -> AppResult<(StatusCode, Json<ReportDetails>)> {
    if req.reported_id == user.id {
        return Err(AppError::bad_request("You cannot report yourself"));
    }
    if !db::accounts::exists(&state.pool, req.reported_id).await? {
        return Err(AppError::not_found("Reported user not found"));
    }

    let report = db::reports::insert(&state.pool, user.id, &req).await?;
    tracing::info!(
        report_id = report.id,
        reporter_id = user.id,
        reported_id = req.reported_id,
        reason = report.reason_type.display(),
        "User reported"
    );

    Ok((StatusCode::CREATED, Json(details(&state, report).await?)))
}

async fn list_reports(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ReportsQuery>,
) -> AppResult<Json<ReportPage>> {
    let filter = ReportFilter {
        status: query.status,
        reason_type: query.reason_type,
        ..ReportFilter::default()
    };
    page(&state, filter, Order::NewestFirst, query.paging()).await
}

async fn pending_reports(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(paging): Query<PageQuery>,
) -> AppResult<Json<ReportPage>> {
    let filter = ReportFilter {
        status: Some(ReportStatus::Pending),
        ..ReportFilter::default()
    };
    page(&state, filter, Order::OldestFirst, paging).await
}

async fn reports_by_reporter(
    State(state): State<AppState>,
    user: AuthUser,
    Path(reporter_id): Path<i64>,
    Query(paging): Query<PageQuery>,
) -> AppResult<Json<ReportPage>> {
    user.require_owner_or_admin(reporter_id)?;
    let filter = ReportFilter {
        reporter_id: Some(reporter_id),
        ..ReportFilter::default()
    };
    page(&state, filter, Order::NewestFirst, paging).await
}

async fn reports_against_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(reported_id): Path<i64>,
    Query(paging): Query<PageQuery>,
) -> AppResult<Json<ReportPage>> {
    let filter = ReportFilter {
        reported_id: Some(reported_id),
        ..ReportFilter::default()
    };
    page(&state, filter, Order::NewestFirst, paging).await
}

async fn get_report(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ReportDetails>> {
    let report = load(&state, id).await?;
    user.require_owner_or_admin(report.reporter_id)?;
    Ok(Json(details(&state, report).await?))
}

async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateReportStatusRequest>,
) -> AppResult<Json<ReportDetails>> {
    let report = db::reports::set_status(&state.pool, id, req.status)
        .await?
        .ok_or_else(|| AppError::not_found("Report not found"))?;
    tracing::info!(report_id = id, admin_id = admin.id, status = ?req.status, "Report status changed");
    Ok(Json(details(&state, report).await?))
}

async fn review_report(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<ReviewReportRequest>,
) -> AppResult<Json<ReportDetails>> {
    if req.status == ReportStatus::Pending {
        return Err(ValidationError::InvalidValue("status").into());
    }

    let report = db::reports::review(
        &state.pool,
        id,
        admin.id,
        req.status,
        req.reviewer_comments.as_deref(),
        req.action_taken.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Report not found"))?;

    tracing::info!(
        report_id = id,
        reviewer_id = admin.id,
        status = ?report.status,
        "Report reviewed"
    );
    Ok(Json(details(&state, report).await?))
}

async fn delete_report(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    if !db::reports::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Report not found"));
    }
    Ok(Json(MessageResponse::new("Report deleted successfully")))
}
