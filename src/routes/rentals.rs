use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};

use crate::db;
use crate::error::{AppError, AppResult};
use crate::extract::{AuthUser, Json, Path};
use crate::models::{
    total_price, CreateRentalRequest, Item, MessageResponse, RejectRentalRequest, Rental,
    RentalDetails, RentalStatus, UpdateRentalRequest, VerificationStatus,
};
use crate::routes::{notify_account, optional_json};
use crate::state::AppState;
use crate::validation::Validator;

const CONFLICT_MESSAGE: &str = "Item is already rented for the selected dates";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rentals).post(create_rental))
        .route("/item/{id}", get(rentals_by_item))
        .route("/account/{acc_id}", get(rentals_by_account))
        .route(
            "/{id}",
            get(get_rental).put(update_rental).delete(delete_rental),
        )
        .route("/{id}/approve", put(approve_rental))
        .route("/{id}/reject", put(reject_rental))
        .route("/{id}/return", put(return_rental))
        .route("/{id}/cancel", put(cancel_rental))
}

async fn load(state: &AppState, id: i64) -> AppResult<Rental> {
    db::rentals::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Rental not found"))
}

async fn load_item(state: &AppState, item_id: i64) -> AppResult<Item> {
    db::items::find_by_id(&state.pool, item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Item not found"))
}

/// Load a rental together with its item and require the caller to own the
/// item or be an admin.
async fn load_as_owner(state: &AppState, user: &AuthUser, id: i64) -> AppResult<(Rental, Item)> {
    let rental = load(state, id).await?;
    let item = load_item(state, rental.item_id).await?;
    user.require_owner_or_admin(item.acc_id)?;
    Ok((rental, item))
}

fn period(rental: &Rental) -> String {
    format!(
        "{} to {}",
        rental.rental_start_date.format("%Y-%m-%d"),
        rental.rental_end_date.format("%Y-%m-%d")
    )
}

async fn list_rentals(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<Vec<RentalDetails>>> {
    let rentals = db::rentals::list_all(&state.pool).await?;
    Ok(Json(db::rentals::with_details(&state.pool, rentals).await?))
}

async fn rentals_by_item(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> AppResult<Json<Vec<RentalDetails>>> {
    let rentals = db::rentals::list_by_item(&state.pool, item_id).await?;
    Ok(Json(db::rentals::with_details(&state.pool, rentals).await?))
}

async fn rentals_by_account(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(acc_id): Path<i64>,
) -> AppResult<Json<Vec<RentalDetails>>> {
    let rentals = db::rentals::list_by_renter(&state.pool, acc_id).await?;
    Ok(Json(db::rentals::with_details(&state.pool, rentals).await?))
}

async fn get_rental(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<RentalDetails>> {
    let rental = load(&state, id).await?;
    db::rentals::with_details(&state.pool, vec![rental])
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::not_found("Rental not found"))
}

async fn create_rental(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateRentalRequest>,
) -> AppResult<(StatusCode, Json<Rental>)> {
    let (start, end) = (req.rental_start_date, req.rental_end_date);
    Validator::date_range("rental_start_date", start, "rental_end_date", end)?;

    let item = load_item(&state, req.item_id).await?;
    if !item.is_rentable() {
        return Err(AppError::bad_request("Item is not available for rent"));
    }
    if item.acc_id == user.id {
        return Err(AppError::bad_request("You cannot rent your own item"));
    }

    let renter = db::accounts::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Unauthorized"))?;
    if renter.verification_status != VerificationStatus::Approved {
        return Err(AppError::bad_request(
            "Your identity must be verified before renting",
        ));
    }

    let price = total_price(item.price, start, end);
    let rental = db::rentals::create(&state.pool, item.id, user.id, start, end, price)
        .await?
        .ok_or_else(|| AppError::conflict(CONFLICT_MESSAGE))?;

    tracing::info!(
        rental_id = rental.id,
        item_id = item.id,
        renter = user.id,
        "Rental requested"
    );

    notify_account(
        &state,
        item.acc_id,
        "New rental request",
        &[
            format!(
                "{} would like to rent \"{}\" from {}.",
                renter.full_name(),
                item.name,
                period(&rental)
            ),
            format!("Total price: {:.2}", rental.total_rental_price),
        ],
    )
    .await?;

    Ok((StatusCode::CREATED, Json(rental)))
}

async fn update_rental(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRentalRequest>,
) -> AppResult<Json<Rental>> {
    let rental = load(&state, id).await?;
    user.require_owner_or_admin(rental.renter_acc_id)?;
    if rental.rental_status != RentalStatus::Pending {
        return Err(AppError::conflict("Only pending rentals can be changed"));
    }

    let start = req.rental_start_date.unwrap_or(rental.rental_start_date);
    let end = req.rental_end_date.unwrap_or(rental.rental_end_date);
    Validator::date_range("rental_start_date", start, "rental_end_date", end)?;

    let item = load_item(&state, rental.item_id).await?;
    let price = total_price(item.price, start, end);

    db::rentals::reschedule(&state.pool, &rental, start, end, price)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::conflict(CONFLICT_MESSAGE))
}

async fn approve_rental(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Rental>> {
    let (rental, item) = load_as_owner(&state, &user, id).await?;
    if rental.rental_status != RentalStatus::Pending {
        return Err(AppError::conflict("Rental is not pending"));
    }

    let approved = db::rentals::approve(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::conflict("Rental is not pending"))?;

    tracing::info!(rental_id = id, item_id = item.id, by = user.id, "Rental approved");

    notify_account(
        &state,
        approved.renter_acc_id,
        "Rental approved",
        &[format!(
            "Your rental of \"{}\" for {} has been approved.",
            item.name,
            period(&approved)
        )],
    )
    .await?;

    Ok(Json(approved))
}

async fn reject_rental(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    body: Bytes,
) -> AppResult<Json<Rental>> {
    let req: RejectRentalRequest = optional_json(&body)?;
    let (rental, item) = load_as_owner(&state, &user, id).await?;
    if rental.rental_status != RentalStatus::Pending {
        return Err(AppError::conflict("Rental is not pending"));
    }

    let reason = req
        .rejection_reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let rejected = db::rentals::reject(&state.pool, id, reason.as_deref())
        .await?
        .ok_or_else(|| AppError::conflict("Rental is not pending"))?;

    tracing::info!(rental_id = id, item_id = item.id, by = user.id, "Rental rejected");

    let mut lines = vec![format!(
        "Your rental request for \"{}\" for {} has been rejected.",
        item.name,
        period(&rejected)
    )];
    if let Some(reason) = reason {
        lines.push(format!("Reason: {reason}"));
    }
    notify_account(&state, rejected.renter_acc_id, "Rental rejected", &lines).await?;

    Ok(Json(rejected))
}

async fn return_rental(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Rental>> {
    let (rental, item) = load_as_owner(&state, &user, id).await?;
    if !matches!(
        rental.rental_status,
        RentalStatus::Approved | RentalStatus::Active
    ) {
        return Err(AppError::conflict("Rental is not in progress"));
    }

    let completed = db::rentals::complete(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::conflict("Rental is not in progress"))?;

    tracing::info!(rental_id = id, item_id = item.id, by = user.id, "Rental returned");

    notify_account(
        &state,
        completed.renter_acc_id,
        "Rental completed",
        &[
            format!("Your rental of \"{}\" has been marked as returned.", item.name),
            "We would love to hear how it went. Please leave feedback for this rental."
                .to_string(),
        ],
    )
    .await?;

    Ok(Json(completed))
}

async fn cancel_rental(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Rental>> {
    let rental = load(&state, id).await?;
    if rental.renter_acc_id != user.id {
        return Err(AppError::forbidden("Only the renter can cancel a rental"));
    }
    if rental.rental_status != RentalStatus::Pending {
        return Err(AppError::conflict("Only pending rentals can be cancelled"));
    }

    db::rentals::cancel(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::conflict("Only pending rentals can be cancelled"))
}

async fn delete_rental(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    let rental = load(&state, id).await?;
    user.require_owner_or_admin(rental.renter_acc_id)?;

    if !db::rentals::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Rental not found"));
    }
    Ok(Json(MessageResponse::new("Rental deleted successfully")))
}
