//! Request extractors for the authenticated caller, the client address and
//! request input.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::bearer_token;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::Role;
use crate::state::AppState;

/// Caller identified by a valid access token whose account still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True for the account itself and for admins.
    pub fn can_act_for(&self, acc_id: i64) -> bool {
        self.id == acc_id || self.is_admin()
    }

    /// Err(401) unless [`AuthUser::can_act_for`] holds. Used for account
    /// resources.
    pub fn require_self_or_admin(&self, acc_id: i64) -> AppResult<()> {
        if self.can_act_for(acc_id) {
            Ok(())
        } else {
            Err(AppError::unauthorized("Unauthorized"))
        }
    }

    /// Err(403) unless the caller owns the resource or is an admin.
    pub fn require_owner_or_admin(&self, owner_id: i64) -> AppResult<()> {
        if self.can_act_for(owner_id) {
            Ok(())
        } else {
            Err(AppError::forbidden("Forbidden"))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token =
            bearer_token(&parts.headers).ok_or_else(|| AppError::unauthorized("Unauthorized"))?;
        let claims = state
            .keys
            .verify(token)
            .map_err(|_| AppError::unauthorized("Unauthorized"))?;

        let account = db::accounts::find_by_id(&state.pool, claims.id)
            .await?
            .ok_or_else(|| AppError::unauthorized("Unauthorized"))?;

        Ok(AuthUser {
            id: account.id,
            role: account.role,
        })
    }
}

/// Caller with the Admin role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::unauthorized(
                "Unauthorized - Insufficient permissions",
            ));
        }
        Ok(AdminUser(user))
    }
}

/// Client address: first `X-Forwarded-For` hop, else the peer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

impl ClientIp {
    pub fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        ClientIp(forwarded.or(peer.map(|addr| addr.ip())))
    }

    pub fn to_string_opt(self) -> Option<String> {
        self.0.map(|ip| ip.to_string())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp::from_parts(&parts.headers, peer))
    }
}

/// JSON body extractor and response. Malformed or incomplete bodies are
/// rejected with a 400 `{"message": ...}` like every other error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, AppError> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Json(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string extractor with `AppError` rejections.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, AppError> {
        let axum::extract::Query(value) =
            axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(Query(value))
    }
}

/// Path parameter extractor with `AppError` rejections.
#[derive(Debug, Clone, Copy)]
pub struct Path<T>(pub T);

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, AppError> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Path(value))
    }
}
