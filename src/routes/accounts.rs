use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Duration;

use crate::auth::{self, REFRESH_COOKIE};
use crate::db::{self, accounts::NewAccount, now};
use crate::error::{AppError, AppResult};
use crate::extract::{AdminUser, AuthUser, ClientIp, Json, Path};
use crate::mail;
use crate::models::{
    Account, AccountChanges, AccountDetails, AccountStatus, AuthResponse, AuthenticateRequest,
    CreateAccountRequest, ForgotPasswordRequest, MessageResponse, RegisterRequest,
    ResetPasswordRequest, ReviewVerificationRequest, RevokeTokenRequest,
    SubmitVerificationRequest, TokenRequest, UpdateAccountRequest, VerificationStatus,
};
use crate::routes::optional_json;
use crate::state::AppState;
use crate::validation::{ValidationError, Validator};

const BAD_CREDENTIALS: &str = "Email or password is incorrect";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/authenticate", post(authenticate))
        .route("/refresh-token", post(refresh_token))
        .route("/revoke-token", post(revoke_token))
        .route("/register", post(register))
        .route("/verify-email", post(verify_email))
        .route("/forgot-password", post(forgot_password))
        .route("/validate-reset-token", post(validate_reset_token))
        .route("/reset-password", post(reset_password))
        .route("/", get(list_accounts).post(create_account))
        .route(
            "/{id}",
            get(get_account).put(update_account).delete(delete_account),
        )
        .route(
            "/{id}/verification",
            post(submit_verification).put(review_verification),
        )
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn origin(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Issue an access token and a fresh refresh token, and build the response
/// that carries both.
async fn sign_in(
    state: &AppState,
    account: &Account,
    ip: ClientIp,
) -> AppResult<impl IntoResponse> {
    let jwt_token = state.keys.issue(account.id)?;
    let refresh = auth::random_token();
    let expires_at = now() + Duration::days(state.config.refresh_token_ttl_days);
    let ip = ip.to_string_opt();
    db::tokens::insert(&state.pool, account.id, &refresh, expires_at, ip.as_deref()).await?;

    with_refresh_cookie(state, account, jwt_token, refresh)
}

fn with_refresh_cookie(
    state: &AppState,
    account: &Account,
    jwt_token: String,
    refresh: String,
) -> AppResult<impl IntoResponse> {
    let cookie = auth::refresh_cookie(&refresh, state.config.refresh_token_ttl_days)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            account: account.into(),
            jwt_token,
            refresh_token: Some(refresh),
        }),
    ))
}

async fn authenticate(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(req): Json<AuthenticateRequest>,
) -> AppResult<impl IntoResponse> {
    if let Some(addr) = ip.0 {
        state
            .login_limiter
            .check(addr)
            .map_err(AppError::RateLimited)?;
    }

    let email = normalize_email(&req.email);
    let account = db::accounts::find_by_email(&state.pool, &email)
        .await?
        .filter(|a| auth::verify_password(&req.password, &a.password_hash))
        .ok_or_else(|| AppError::bad_request(BAD_CREDENTIALS))?;

    if !account.is_verified() {
        return Err(AppError::forbidden(
            "Please verify your email before logging in",
        ));
    }
    if account.status == AccountStatus::Inactive {
        return Err(AppError::forbidden("Account is inactive"));
    }

    tracing::info!(account_id = account.id, "Account authenticated");
    sign_in(&state, &account, ip).await
}

async fn refresh_token(
    State(state): State<AppState>,
    ip: ClientIp,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let presented = auth::cookie(&headers, REFRESH_COOKIE)
        .ok_or_else(|| AppError::bad_request("Invalid token"))?;

    let stored = db::tokens::find(&state.pool, presented)
        .await?
        .filter(|t| t.is_active_at(now()))
        .ok_or_else(|| AppError::bad_request("Invalid token"))?;

    let account = db::accounts::find_by_id(&state.pool, stored.account_id)
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid token"))?;

    let replacement = auth::random_token();
    let expires_at = now() + Duration::days(state.config.refresh_token_ttl_days);
    let ip = ip.to_string_opt();
    let issued = db::tokens::rotate(&state.pool, &stored, &replacement, expires_at, ip.as_deref())
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid token"))?;

    let jwt_token = state.keys.issue(account.id)?;
    with_refresh_cookie(&state, &account, jwt_token, issued.token)
}

async fn revoke_token(
    State(state): State<AppState>,
    user: AuthUser,
    ip: ClientIp,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<MessageResponse>> {
    let req: RevokeTokenRequest = optional_json(&body)?;

    let token = req
        .token
        .filter(|t| !t.is_empty())
        .or_else(|| auth::cookie(&headers, REFRESH_COOKIE).map(str::to_string))
        .ok_or_else(|| AppError::bad_request("Token is required"))?;

    let stored = db::tokens::find(&state.pool, &token)
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid token"))?;
    user.require_self_or_admin(stored.account_id)?;

    let ip = ip.to_string_opt();
    db::tokens::revoke(&state.pool, &token, ip.as_deref()).await?;
    Ok(Json(MessageResponse::new("Token revoked")))
}

async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<MessageResponse>> {
    Validator::required("first_name", &req.first_name)?;
    Validator::required("last_name", &req.last_name)?;
    Validator::required("address", &req.address)?;
    Validator::email("email", &req.email)?;
    Validator::password(&req.password, &req.confirm_password)?;
    if !req.accept_terms {
        return Err(ValidationError::TermsNotAccepted.into());
    }

    let response = MessageResponse::new(
        "Registration successful, please check your email for verification instructions",
    );
    let email = normalize_email(&req.email);
    let origin = origin(&headers);

    if db::accounts::email_exists(&state.pool, &email).await? {
        mail::notify(
            state.mailer.as_ref(),
            mail::already_registered_email(&email, origin),
        )
        .await;
        return Ok(Json(response));
    }

    let verification_token = auth::random_token();
    let new = NewAccount {
        email: email.clone(),
        password_hash: auth::hash_password(&req.password, state.config.bcrypt_cost)?,
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        image: req.image,
        address: req.address.trim().to_string(),
        accept_terms: true,
        role: None,
        verification_token: Some(verification_token.clone()),
        verified: false,
    };

    match db::accounts::insert(&state.pool, &new).await {
        Ok(account) => {
            tracing::info!(account_id = account.id, role = ?account.role, "Account registered");
            mail::notify(
                state.mailer.as_ref(),
                mail::verification_email(&email, &verification_token, origin),
            )
            .await;
        }
        // Lost a race with a concurrent registration of the same email.
        Err(e) if db::is_unique_violation(&e) => {
            mail::notify(
                state.mailer.as_ref(),
                mail::already_registered_email(&email, origin),
            )
            .await;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Json(response))
}

async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> AppResult<Json<MessageResponse>> {
    let account = db::accounts::find_by_verification_token(&state.pool, &req.token)
        .await?
        .ok_or_else(|| AppError::bad_request("Verification failed"))?;

    db::accounts::mark_verified(&state.pool, account.id).await?;
    Ok(Json(MessageResponse::new(
        "Verification successful, you can now login",
    )))
}

async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = normalize_email(&req.email);

    // Unknown addresses get the same answer.
    if let Some(account) = db::accounts::find_by_email(&state.pool, &email).await? {
        let token = auth::random_token();
        let expires_at = now() + Duration::hours(state.config.reset_token_ttl_hours);
        db::accounts::set_reset_token(&state.pool, account.id, &token, expires_at).await?;
        mail::notify(
            state.mailer.as_ref(),
            mail::password_reset_email(&account.email, &token, origin(&headers)),
        )
        .await;
    }

    Ok(Json(MessageResponse::new(
        "Please check your email for password reset instructions",
    )))
}

async fn validate_reset_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> AppResult<Json<MessageResponse>> {
    db::accounts::find_by_reset_token(&state.pool, &req.token, now())
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid token"))?;
    Ok(Json(MessageResponse::new("Token is valid")))
}

async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    Validator::password(&req.password, &req.confirm_password)?;

    let account = db::accounts::find_by_reset_token(&state.pool, &req.token, now())
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid token"))?;

    let hash = auth::hash_password(&req.password, state.config.bcrypt_cost)?;
    db::accounts::reset_password(&state.pool, account.id, &hash).await?;

    Ok(Json(MessageResponse::new(
        "Password reset successful, you can now login",
    )))
}

async fn list_accounts(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<AccountDetails>>> {
    let accounts = db::accounts::list_all(&state.pool).await?;
    Ok(Json(accounts.iter().map(AccountDetails::from).collect()))
}

async fn get_account(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<AccountDetails>> {
    user.require_self_or_admin(id)?;
    let account = db::accounts::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found"))?;
    Ok(Json(account.into()))
}

async fn create_account(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<CreateAccountRequest>,
) -> AppResult<(StatusCode, Json<AccountDetails>)> {
    Validator::required("first_name", &req.first_name)?;
    Validator::required("last_name", &req.last_name)?;
    Validator::required("address", &req.address)?;
    Validator::email("email", &req.email)?;
    Validator::password(&req.password, &req.confirm_password)?;

    let email = normalize_email(&req.email);
    let taken = || AppError::bad_request(format!("Email \"{email}\" is already registered"));
    if db::accounts::email_exists(&state.pool, &email).await? {
        return Err(taken());
    }

    let new = NewAccount {
        email: email.clone(),
        password_hash: auth::hash_password(&req.password, state.config.bcrypt_cost)?,
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        image: req.image,
        address: req.address.trim().to_string(),
        accept_terms: true,
        role: Some(req.role),
        verification_token: None,
        verified: true,
    };

    let account = db::accounts::insert(&state.pool, &new)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                taken()
            } else {
                e.into()
            }
        })?;

    Ok((StatusCode::CREATED, Json(account.into())))
}

async fn update_account(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAccountRequest>,
) -> AppResult<Json<AccountDetails>> {
    user.require_self_or_admin(id)?;
    let existing = db::accounts::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found"))?;

    Validator::not_blank("first_name", &req.first_name)?;
    Validator::not_blank("last_name", &req.last_name)?;
    Validator::not_blank("address", &req.address)?;

    let email = match req.email.as_deref() {
        Some(raw) => {
            Validator::email("email", raw)?;
            let email = normalize_email(raw);
            if email != existing.email && db::accounts::email_exists(&state.pool, &email).await? {
                return Err(AppError::bad_request(format!(
                    "Email \"{email}\" is already registered"
                )));
            }
            Some(email)
        }
        None => None,
    };

    let password_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => {
            Validator::password(password, req.confirm_password.as_deref().unwrap_or_default())?;
            Some(auth::hash_password(password, state.config.bcrypt_cost)?)
        }
        None => None,
    };

    // Role and status are silently kept for non-admin callers.
    let (role, status) = if user.is_admin() {
        (req.role, req.status)
    } else {
        (None, None)
    };

    let changes = AccountChanges {
        first_name: req.first_name.map(|s| s.trim().to_string()),
        last_name: req.last_name.map(|s| s.trim().to_string()),
        email,
        address: req.address.map(|s| s.trim().to_string()),
        image: req.image,
        password_hash,
        role,
        status,
    };

    let account = db::accounts::update(&state.pool, id, &changes)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                AppError::bad_request("Email is already registered")
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| AppError::not_found("Account not found"))?;

    Ok(Json(account.into()))
}

async fn delete_account(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    user.require_self_or_admin(id)?;
    if !db::accounts::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Account not found"));
    }
    tracing::info!(account_id = id, deleted_by = user.id, "Account deleted");
    Ok(Json(MessageResponse::new("Account deleted successfully")))
}

async fn submit_verification(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<SubmitVerificationRequest>,
) -> AppResult<Json<AccountDetails>> {
    if user.id != id {
        return Err(AppError::unauthorized("Unauthorized"));
    }
    Validator::required("image", &req.image)?;

    let existing = db::accounts::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found"))?;
    if existing.verification_status == VerificationStatus::Approved {
        return Err(AppError::conflict("Account is already verified"));
    }

    let account = db::accounts::submit_verification(&state.pool, id, req.image.trim())
        .await?
        .ok_or_else(|| AppError::not_found("Account not found"))?;
    Ok(Json(account.into()))
}

async fn review_verification(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<ReviewVerificationRequest>,
) -> AppResult<Json<AccountDetails>> {
    let outcome = match req.status {
        VerificationStatus::Approved => "approved",
        VerificationStatus::Rejected => "rejected",
        _ => return Err(ValidationError::InvalidValue("status").into()),
    };

    let existing = db::accounts::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found"))?;
    if existing.verification_status != VerificationStatus::Pending {
        return Err(AppError::conflict("No pending verification for this account"));
    }

    let account = db::accounts::set_verification_status(&state.pool, id, req.status)
        .await?
        .ok_or_else(|| AppError::not_found("Account not found"))?;

    tracing::info!(account_id = id, admin_id = admin.id, outcome, "Identity verification reviewed");
    mail::notify(
        state.mailer.as_ref(),
        mail::notice(
            &account.email,
            &format!("Identity verification {outcome}"),
            &[
                format!("Hi {},", account.first_name),
                format!("Your identity verification has been {outcome}."),
            ],
        ),
    )
    .await;

    Ok(Json(account.into()))
}
