use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};

use crate::db;
use crate::error::{AppError, AppResult};
use crate::extract::{AuthUser, Json, Path};
use crate::models::{
    CreateFeedbackRequest, Feedback, FeedbackDetails, MessageResponse, RatingSummary,
    RentalStatus, UpdateFeedbackRequest,
};
use crate::routes::notify_account;
use crate::state::AppState;
use crate::validation::Validator;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_feedback).post(create_feedback))
        .route("/rentitem/{rental_id}", get(feedback_for_rental))
        .route("/item/{item_id}", get(feedback_for_item))
        .route("/account/{acc_id}", get(feedback_by_account))
        .route("/rating/{item_id}", get(item_rating))
        .route(
            "/{id}",
            get(get_feedback).put(update_feedback).delete(delete_feedback),
        )
}

async fn load(state: &AppState, id: i64) -> AppResult<Feedback> {
    db::feedback::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Feedback not found"))
}

async fn detailed(state: &AppState, entries: Vec<Feedback>) -> AppResult<Vec<FeedbackDetails>> {
    Ok(db::feedback::with_details(&state.pool, entries).await?)
}

async fn list_feedback(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<Vec<FeedbackDetails>>> {
    let entries = db::feedback::list_all(&state.pool).await?;
    Ok(Json(detailed(&state, entries).await?))
}

async fn get_feedback(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<FeedbackDetails>> {
    let feedback = load(&state, id).await?;
    detailed(&state, vec![feedback])
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::not_found("Feedback not found"))
}

async fn feedback_for_rental(
    State(state): State<AppState>,
    Path(rental_id): Path<i64>,
) -> AppResult<Json<Option<FeedbackDetails>>> {
    let Some(feedback) = db::feedback::find_active_by_rental(&state.pool, rental_id).await? else {
        return Ok(Json(None));
    };
    Ok(Json(detailed(&state, vec![feedback]).await?.pop()))
}

async fn feedback_for_item(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> AppResult<Json<Vec<FeedbackDetails>>> {
    let entries = db::feedback::list_active_for_item(&state.pool, item_id).await?;
    Ok(Json(detailed(&state, entries).await?))
}

async fn feedback_by_account(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(acc_id): Path<i64>,
) -> AppResult<Json<Vec<FeedbackDetails>>> {
    let entries = db::feedback::list_by_author(&state.pool, acc_id).await?;
    Ok(Json(detailed(&state, entries).await?))
}

async fn item_rating(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> AppResult<Json<RatingSummary>> {
    Ok(Json(db::feedback::rating_summary(&state.pool, item_id).await?))
}

async fn create_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateFeedbackRequest>,
) -> AppResult<(StatusCode, Json<Feedback>)> {
    Validator::rating(req.rating)?;

    let rental = db::rentals::find_by_id(&state.pool, req.rent_item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Rental not found"))?;
    if rental.rental_status != RentalStatus::Completed {
        return Err(AppError::bad_request(
            "Feedback can only be left for completed rentals",
        ));
    }
    if rental.renter_acc_id != user.id {
        return Err(AppError::forbidden(
            "Only the renter can leave feedback for this rental",
        ));
    }
    if db::feedback::find_by_rental(&state.pool, rental.id)
        .await?
        .is_some()
    {
        return Err(AppError::conflict(
            "Feedback has already been submitted for this rental",
        ));
    }

    let comment = req
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let feedback = match db::feedback::insert(
        &state.pool,
        rental.id,
        user.id,
        req.rating,
        comment,
    )
    .await
    {
        Ok(feedback) => feedback,
        Err(e) if db::is_unique_violation(&e) => {
            return Err(AppError::conflict(
                "Feedback has already been submitted for this rental",
            ))
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        feedback_id = feedback.id,
        rental_id = rental.id,
        rating = feedback.rating,
        "Feedback submitted"
    );

    if let Some(item) = db::items::find_by_id(&state.pool, rental.item_id).await? {
        let mut lines = vec![format!(
            "Your item \"{}\" received a {}-star rating.",
            item.name, feedback.rating
        )];
        if let Some(comment) = comment {
            lines.push(format!("Comment: {comment}"));
        }
        notify_account(&state, item.acc_id, "New feedback on your item", &lines).await?;
    }

    Ok((StatusCode::CREATED, Json(feedback)))
}

async fn update_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateFeedbackRequest>,
) -> AppResult<Json<Feedback>> {
    let feedback = load(&state, id).await?;
    user.require_owner_or_admin(feedback.acc_id)?;
    if let Some(rating) = req.rating {
        Validator::rating(rating)?;
    }

    db::feedback::update(&state.pool, id, &req)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Feedback not found"))
}

async fn delete_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    let feedback = load(&state, id).await?;
    user.require_owner_or_admin(feedback.acc_id)?;

    if !db::feedback::deactivate(&state.pool, id).await? {
        return Err(AppError::not_found("Feedback not found"));
    }
    Ok(Json(MessageResponse::new("Feedback deleted successfully")))
}
