use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};
use chrono::{DateTime, Utc};

use crate::db::{self, subscriptions::SubscriptionTerms};
use crate::error::{AppError, AppResult};
use crate::extract::{AdminUser, AuthUser, Json, Path};
use crate::models::{
    CreateSubscriptionRequest, MessageResponse, ReviewSubscriptionRequest, Subscriber,
    Subscription, SubscriptionDetails, SubscriptionPlan, SubscriptionStatus,
    UpdateSubscriptionRequest,
};
use crate::routes::notify_account;
use crate::state::AppState;
use crate::validation::{ValidationError, Validator};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscriptions).post(create_subscription))
        .route("/approved", get(approved_subscribers))
        .route(
            "/{id}",
            get(get_subscription)
                .put(update_subscription)
                .delete(delete_subscription),
        )
        .route("/{id}/review", put(review_subscription))
}

async fn load(state: &AppState, id: i64) -> AppResult<Subscription> {
    db::subscriptions::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Subscription not found"))
}

fn terms(
    start_date: DateTime<Utc>,
    plan: SubscriptionPlan,
    receipt: String,
) -> AppResult<SubscriptionTerms> {
    let end_date = plan
        .end_date(start_date)
        .ok_or(ValidationError::InvalidValue("start_date"))?;
    Ok(SubscriptionTerms {
        start_date,
        end_date,
        plan,
        receipt,
    })
}

async fn approved_subscribers(State(state): State<AppState>) -> AppResult<Json<Vec<Subscriber>>> {
    Ok(Json(
        db::subscriptions::active_subscribers(&state.pool, db::now()).await?,
    ))
}

async fn list_subscriptions(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<SubscriptionDetails>>> {
    Ok(Json(db::subscriptions::list_all(&state.pool).await?))
}

async fn get_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Subscription>> {
    let subscription = load(&state, id).await?;
    user.require_owner_or_admin(subscription.acc_id)?;
    Ok(Json(subscription))
}

async fn create_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateSubscriptionRequest>,
) -> AppResult<(StatusCode, Json<Subscription>)> {
    let receipt = req.subscription_receipt.unwrap_or_default();
    Validator::required("subscription_receipt", &receipt)?;

    let terms = terms(req.start_date, req.subscription_plan, receipt)?;
    let subscription = db::subscriptions::insert(&state.pool, user.id, &terms).await?;

    tracing::info!(
        subscription_id = subscription.id,
        acc_id = user.id,
        plan = subscription.plan_duration,
        "Subscription submitted"
    );
    Ok((StatusCode::CREATED, Json(subscription)))
}

async fn update_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSubscriptionRequest>,
) -> AppResult<Json<Subscription>> {
    let current = load(&state, id).await?;
    user.require_owner_or_admin(current.acc_id)?;
    if !user.is_admin() && current.status != SubscriptionStatus::Pending {
        return Err(AppError::conflict(
            "Only pending subscriptions can be changed",
        ));
    }

    Validator::not_blank("subscription_receipt", &req.subscription_receipt)?;
    let terms = terms(
        req.start_date.unwrap_or(current.start_date),
        req.subscription_plan.unwrap_or(current.subscription_plan),
        req.subscription_receipt
            .unwrap_or(current.subscription_receipt),
    )?;

    db::subscriptions::update_terms(&state.pool, id, &terms)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Subscription not found"))
}

async fn review_subscription(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<ReviewSubscriptionRequest>,
) -> AppResult<Json<Subscription>> {
    if req.status == SubscriptionStatus::Pending {
        return Err(ValidationError::InvalidValue("status").into());
    }

    let current = load(&state, id).await?;
    if current.status != SubscriptionStatus::Pending {
        return Err(AppError::conflict("Subscription has already been reviewed"));
    }

    let remarks = req.admin_remarks.as_deref().map(str::trim);
    let reviewed = db::subscriptions::review(&state.pool, id, req.status, remarks, admin.id)
        .await?
        .ok_or_else(|| AppError::conflict("Subscription has already been reviewed"))?;

    let outcome = match reviewed.status {
        SubscriptionStatus::Approved => "approved",
        _ => "rejected",
    };
    tracing::info!(subscription_id = id, admin_id = admin.id, outcome, "Subscription reviewed");

    let mut lines = vec![format!(
        "Your subscription running {} to {} has been {}.",
        reviewed.start_date.format("%Y-%m-%d"),
        reviewed.end_date.format("%Y-%m-%d"),
        outcome
    )];
    if let Some(remarks) = remarks.filter(|r| !r.is_empty()) {
        lines.push(format!("Remarks: {remarks}"));
    }
    notify_account(
        &state,
        reviewed.acc_id,
        &format!("Subscription {outcome}"),
        &lines,
    )
    .await?;

    Ok(Json(reviewed))
}

async fn delete_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    let subscription = load(&state, id).await?;
    user.require_owner_or_admin(subscription.acc_id)?;

    if !db::subscriptions::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Subscription not found"));
    }
    Ok(Json(MessageResponse::new("Subscription deleted successfully")))
}
