use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum AccountStatus {
    Active,
    Inactive,
}

/// Identity verification state. Only `Approved` accounts may rent items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum VerificationStatus {
    Unverified,
    Pending,
    Approved,
    Rejected,
}

/// Full account row, including secrets. Never serialized directly.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
    pub address: String,
    pub accept_terms: bool,
    pub role: Role,
    pub status: AccountStatus,
    pub verification_status: VerificationStatus,
    pub verification_image: Option<String>,
    pub verification_token: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub password_reset_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Account {
    /// An account counts as verified once the email was confirmed or a
    /// password reset went through (both prove mailbox ownership).
    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some() || self.password_reset_at.is_some()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountDetails {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub verification_status: VerificationStatus,
    pub image: Option<String>,
    pub address: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountDetails {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id,
            first_name: a.first_name.clone(),
            last_name: a.last_name.clone(),
            email: a.email.clone(),
            role: a.role,
            status: a.status,
            verification_status: a.verification_status,
            image: a.image.clone(),
            address: a.address.clone(),
            is_verified: a.is_verified(),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

impl From<Account> for AccountDetails {
    fn from(a: Account) -> Self {
        (&a).into()
    }
}

/// Name and avatar, embedded in other resources.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AccountBrief {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub image: Option<String>,
}

/// Brief plus email, for admin-facing listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AccountContact {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub image: Option<String>,
}

impl AccountContact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Stored refresh token.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub account_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub created_by_ip: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by_ip: Option<String>,
    pub replaced_by_token: Option<String>,
}

impl RefreshToken {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthenticateRequest {
    pub email: String,
    pub password: String,
}

/// Response for authenticate and refresh-token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub account: AccountDetails,
    pub jwt_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub accept_terms: bool,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RevokeTokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

/// Admin-side account creation.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAccountRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub image: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

/// Fields written by an account update, already validated and hashed.
#[derive(Debug, Default)]
pub struct AccountChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub image: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitVerificationRequest {
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewVerificationRequest {
    pub status: VerificationStatus,
}
