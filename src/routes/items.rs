use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};

use crate::db::{self, items::ItemDeletion};
use crate::error::{AppError, AppResult};
use crate::extract::{AdminUser, AuthUser, Json, Path, Query};
use crate::models::{
    CreateItemRequest, Item, ItemStatus, ItemTracking, ItemWithOwner, ItemsQuery,
    MessageResponse, ModerateItemRequest, ModerationDecision, UpdateItemRequest,
};
use crate::routes::{notify_account, optional_json};
use crate::state::AppState;
use crate::validation::{ValidationError, Validator};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/pending", get(pending_items))
        .route("/account/{acc_id}", get(items_by_account))
        .route(
            "/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/{id}/approve", put(approve_item))
        .route("/{id}/reject", put(reject_item))
        .route("/{id}/history", get(item_history))
}

async fn load(state: &AppState, id: i64) -> AppResult<Item> {
    db::items::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Item not found"))
}

async fn list_items(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(filter): Query<ItemsQuery>,
) -> AppResult<Json<Vec<Item>>> {
    Ok(Json(db::items::list(&state.pool, &filter).await?))
}

async fn pending_items(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<Item>>> {
    Ok(Json(db::items::list_pending(&state.pool).await?))
}

async fn items_by_account(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(acc_id): Path<i64>,
) -> AppResult<Json<Vec<Item>>> {
    Ok(Json(db::items::list_by_owner(&state.pool, acc_id).await?))
}

async fn get_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ItemWithOwner>> {
    db::items::find_with_owner(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Item not found"))
}

async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<Item>)> {
    Validator::required("name", &req.name)?;
    Validator::price(req.price)?;

    let owner = match req.acc_id {
        Some(acc_id) if acc_id != user.id => {
            if !user.is_admin() {
                return Err(AppError::forbidden(
                    "Only admins can list items for another account",
                ));
            }
            if !db::accounts::exists(&state.pool, acc_id).await? {
                return Err(AppError::not_found("Account not found"));
            }
            acc_id
        }
        _ => user.id,
    };

    let item = db::items::create(
        &state.pool,
        owner,
        req.name.trim(),
        req.description.as_deref(),
        req.price,
        req.image.as_deref(),
    )
    .await?;

    tracing::info!(item_id = item.id, owner, "Item listed, awaiting approval");
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateItemRequest>,
) -> AppResult<Json<Item>> {
    let item = load(&state, id).await?;
    user.require_owner_or_admin(item.acc_id)?;

    Validator::not_blank("name", &req.name)?;
    if let Some(price) = req.price {
        Validator::price(price)?;
    }
    if req.status == Some(ItemStatus::Rented) {
        return Err(ValidationError::InvalidValue("status").into());
    }
    if item.status == ItemStatus::Rented && req.status.is_some_and(|s| s != item.status) {
        return Err(AppError::conflict(
            "Item is currently rented and its status cannot be changed",
        ));
    }

    let changes = UpdateItemRequest {
        name: req.name.map(|n| n.trim().to_string()),
        ..req
    };
    db::items::update(&state.pool, id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Item not found"))
}

async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    let item = load(&state, id).await?;
    user.require_owner_or_admin(item.acc_id)?;

    let acting_admin = (user.is_admin() && user.id != item.acc_id).then_some(user.id);
    match db::items::delete(&state.pool, id, acting_admin).await? {
        ItemDeletion::Deleted => Ok(Json(MessageResponse::new("Item deleted successfully"))),
        ItemDeletion::NotFound => Err(AppError::not_found("Item not found")),
        ItemDeletion::Blocked => Err(AppError::conflict(
            "Item has pending or active rentals and cannot be deleted",
        )),
    }
}

async fn approve_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    body: Bytes,
) -> AppResult<Json<Item>> {
    let req = optional_json(&body)?;
    moderate(state, admin.id, id, ModerationDecision::Approve, req).await
}

async fn reject_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    body: Bytes,
) -> AppResult<Json<Item>> {
    let req = optional_json(&body)?;
    moderate(state, admin.id, id, ModerationDecision::Reject, req).await
}

async fn moderate(
    state: AppState,
    admin_id: i64,
    id: i64,
    decision: ModerationDecision,
    req: ModerateItemRequest,
) -> AppResult<Json<Item>> {
    let target = decision.approval_status();
    let notes = req.notes;
    let item = load(&state, id).await?;
    if item.approval_status == target {
        return Err(AppError::conflict(format!(
            "Item is already {}",
            target.as_str()
        )));
    }

    let updated = db::items::moderate(&state.pool, id, decision, admin_id, notes.as_deref())
        .await?
        .ok_or_else(|| AppError::conflict(format!("Item is already {}", target.as_str())))?;

    tracing::info!(item_id = id, admin_id, outcome = target.as_str(), "Item moderated");

    let mut lines = vec![format!(
        "Your item \"{}\" has been {}.",
        updated.name,
        target.as_str()
    )];
    if let Some(notes) = notes {
        lines.push(format!("Notes: {notes}"));
    }
    notify_account(
        &state,
        updated.acc_id,
        &format!("Item listing {}", target.as_str()),
        &lines,
    )
    .await?;

    Ok(Json(updated))
}

async fn item_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<ItemTracking>>> {
    let rows = db::items::history(&state.pool, id).await?;

    // Deleted items are only reachable through their history rows.
    let owner = match db::items::find_by_id(&state.pool, id).await? {
        Some(item) => item.acc_id,
        None => rows
            .first()
            .map(|r| r.acc_id)
            .ok_or_else(|| AppError::not_found("Item not found"))?,
    };
    user.require_owner_or_admin(owner)?;

    Ok(Json(rows))
}
