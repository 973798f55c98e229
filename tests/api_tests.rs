use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;

use rentwise::{create_router, init_pool, run_migrations, AppState, Config, MemoryMailer};

const PASSWORD: &str = "secret123";
const CLIENT_IP: &str = "198.51.100.7";

struct TestApp {
    router: Router,
    mailer: Arc<MemoryMailer>,
    pool: SqlitePool,
}

/// Create a test app with in-memory database and a capturing mailer.
async fn create_test_app() -> TestApp {
    let pool = init_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();

    let mailer = Arc::new(MemoryMailer::new());
    let state = AppState::new(pool.clone(), Config::for_testing(), mailer.clone());

    TestApp {
        router: create_router(state),
        mailer,
        pool,
    }
}

impl TestApp {
    async fn raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        extra: &[(header::HeaderName, &str)],
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", CLIENT_IP);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in extra {
            builder = builder.header(name.clone(), *value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.raw(method, uri, token, body, &[]).await;
        let status = response.status();
        (status, body_json(response.into_body()).await)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    async fn put(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, token, body).await
    }
}

/// Helper to get response body as string.
async fn body_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Response body as JSON; `Null` for an empty body.
async fn body_json(body: Body) -> Value {
    let text = body_string(body).await;
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

fn registration(email: &str, last_name: &str) -> Value {
    json!({
        "first_name": "Test",
        "last_name": last_name,
        "email": email,
        "address": "1 Main Street",
        "password": PASSWORD,
        "confirm_password": PASSWORD,
        "accept_terms": true
    })
}

async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value) {
    app.post(
        "/accounts/authenticate",
        None,
        json!({ "email": email, "password": password }),
    )
    .await
}

/// Register, verify and log in. Returns (account id, access token).
async fn signup(app: &TestApp, email: &str, last_name: &str) -> (i64, String) {
    let (status, _) = app
        .post("/accounts/register", None, registration(email, last_name))
        .await;
    assert_eq!(status, StatusCode::OK);

    let token: String =
        sqlx::query_scalar("SELECT verification_token FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    let (status, _) = app
        .post("/accounts/verify-email", None, json!({ "token": token }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = login(app, email, PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    (
        json["id"].as_i64().unwrap(),
        json["jwt_token"].as_str().unwrap().to_string(),
    )
}

/// Submit an identity document and have the admin approve it.
async fn verify_identity(app: &TestApp, admin_token: &str, id: i64, token: &str) {
    let (status, _) = app
        .post(
            &format!("/accounts/{id}/verification"),
            Some(token),
            json!({ "image": "uploads/id-card.png" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app
        .put(
            &format!("/accounts/{id}/verification"),
            Some(admin_token),
            Some(json!({ "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["verification_status"], "approved");
}

/// List an item and have the admin approve it. Returns the item id.
async fn approved_item(app: &TestApp, owner_token: &str, admin_token: &str, price: f64) -> i64 {
    let (status, json) = app
        .post(
            "/items",
            Some(owner_token),
            json!({ "name": "Camping tent", "description": "Sleeps four", "price": price }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json["id"].as_i64().unwrap();

    let (status, _) = app
        .put(&format!("/items/{id}/approve"), Some(admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    id
}

struct Marketplace {
    admin: String,
    owner_id: i64,
    owner: String,
    renter_id: i64,
    renter: String,
    item_id: i64,
}

/// Admin, an owner with one approved item, and an identity-verified renter.
async fn marketplace(app: &TestApp) -> Marketplace {
    let (_, admin) = signup(app, "admin@example.com", "Admin").await;
    let (owner_id, owner) = signup(app, "owner@example.com", "Owner").await;
    let (renter_id, renter) = signup(app, "renter@example.com", "Renter").await;
    verify_identity(app, &admin, renter_id, &renter).await;
    let item_id = approved_item(app, &owner, &admin, 25.0).await;

    Marketplace {
        admin,
        owner_id,
        owner,
        renter_id,
        renter,
        item_id,
    }
}

async fn request_rental(
    app: &TestApp,
    token: &str,
    item_id: i64,
    start: &str,
    end: &str,
) -> (StatusCode, Value) {
    app.post(
        "/rentals",
        Some(token),
        json!({ "item_id": item_id, "rental_start_date": start, "rental_end_date": end }),
    )
    .await
}

// ============================================================================
// Health endpoint tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;

    let response = app.raw(Method::GET, "/health", None, None, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response.into_body()).await;
    assert_eq!(body, "OK");
}

// ============================================================================
// Account tests
// ============================================================================

#[tokio::test]
async fn test_first_account_becomes_admin() {
    let app = create_test_app().await;
    let (admin_id, admin) = signup(&app, "first@example.com", "First").await;
    let (user_id, user) = signup(&app, "second@example.com", "Second").await;

    let (status, json) = app.get(&format!("/accounts/{admin_id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["role"], "Admin");

    let (status, json) = app.get(&format!("/accounts/{user_id}"), Some(&user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["role"], "User");
    assert_eq!(json["is_verified"], true);
    assert!(json.get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_requires_verified_email() {
    let app = create_test_app().await;
    let (status, _) = app
        .post(
            "/accounts/register",
            None,
            registration("ada@example.com", "Lovelace"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = login(&app, "ada@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["message"], "Please verify your email before logging in");

    let (status, json) = login(&app, "ada@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Email or password is incorrect");
}

#[tokio::test]
async fn test_register_validation() {
    let app = create_test_app().await;

    let mut body = registration("ada@example.com", "Lovelace");
    body["confirm_password"] = json!("different");
    let (status, json) = app.post("/accounts/register", None, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Passwords do not match");

    let mut body = registration("not-an-email", "Lovelace");
    body["accept_terms"] = json!(true);
    let (status, _) = app.post("/accounts/register", None, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = registration("ada@example.com", "Lovelace");
    body["accept_terms"] = json!(false);
    let (status, _) = app.post("/accounts/register", None, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_registration_sends_notice() {
    let app = create_test_app().await;
    signup(&app, "ada@example.com", "Lovelace").await;

    let (status, json) = app
        .post(
            "/accounts/register",
            None,
            registration("  ADA@example.com ", "Lovelace"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["message"],
        "Registration successful, please check your email for verification instructions"
    );

    let sent = app.mailer.sent_to("ada@example.com");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].subject, "Verify your email");
    assert_eq!(sent[1].subject, "Email already registered");
}

#[tokio::test]
async fn test_refresh_token_rotation() {
    let app = create_test_app().await;
    signup(&app, "ada@example.com", "Lovelace").await;

    let response = app
        .raw(
            Method::POST,
            "/accounts/authenticate",
            None,
            Some(json!({ "email": "ada@example.com", "password": PASSWORD })),
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    assert!(cookie.starts_with("refreshToken="));

    let response = app
        .raw(
            Method::POST,
            "/accounts/refresh-token",
            None,
            None,
            &[(header::COOKIE, cookie.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert_ne!(rotated, cookie);
    let json = body_json(response.into_body()).await;
    assert!(json["jwt_token"].is_string());

    // The replaced token is no longer accepted.
    let response = app
        .raw(
            Method::POST,
            "/accounts/refresh-token",
            None,
            None,
            &[(header::COOKIE, cookie.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["message"], "Invalid token");
}

#[tokio::test]
async fn test_revoke_token() {
    let app = create_test_app().await;
    signup(&app, "ada@example.com", "Lovelace").await;
    let (_, json) = login(&app, "ada@example.com", PASSWORD).await;
    let jwt = json["jwt_token"].as_str().unwrap().to_string();
    let refresh = json["refresh_token"].as_str().unwrap().to_string();

    let (status, json) = app
        .post("/accounts/revoke-token", Some(&jwt), json!({ "token": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Token revoked");

    let cookie = format!("refreshToken={refresh}");
    let response = app
        .raw(
            Method::POST,
            "/accounts/refresh-token",
            None,
            None,
            &[(header::COOKIE, cookie.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = create_test_app().await;
    signup(&app, "ada@example.com", "Lovelace").await;

    let (status, _) = app
        .post(
            "/accounts/forgot-password",
            None,
            json!({ "email": "ada@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.mailer.sent_to("ada@example.com").last().unwrap().subject,
        "Reset your password"
    );

    // Unknown addresses get the same answer and no mail.
    let (status, _) = app
        .post(
            "/accounts/forgot-password",
            None,
            json!({ "email": "nobody@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.mailer.sent_to("nobody@example.com").is_empty());

    let token: String = sqlx::query_scalar("SELECT reset_token FROM accounts WHERE email = ?")
        .bind("ada@example.com")
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let (status, json) = app
        .post("/accounts/validate-reset-token", None, json!({ "token": token }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Token is valid");

    let (status, _) = app
        .post(
            "/accounts/reset-password",
            None,
            json!({ "token": token, "password": "newpass99", "confirm_password": "newpass99" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = login(&app, "ada@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = login(&app, "ada@example.com", "newpass99").await;
    assert_eq!(status, StatusCode::OK);

    // Reset tokens are single use.
    let (status, _) = app
        .post("/accounts/validate-reset-token", None, json!({ "token": token }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_account_access_rules() {
    let app = create_test_app().await;
    let (admin_id, admin) = signup(&app, "admin@example.com", "Admin").await;
    let (user_id, user) = signup(&app, "user@example.com", "User").await;

    let (status, json) = app.get("/accounts", Some(&user)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Unauthorized - Insufficient permissions");

    let (status, json) = app.get("/accounts", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, _) = app.get(&format!("/accounts/{admin_id}"), Some(&user)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/accounts/1", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A user cannot promote themselves; the rest of the update applies.
    let (status, json) = app
        .put(
            &format!("/accounts/{user_id}"),
            Some(&user),
            Some(json!({ "first_name": "Grace", "role": "Admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["first_name"], "Grace");
    assert_eq!(json["role"], "User");

    let (status, json) = app
        .put(
            &format!("/accounts/{user_id}"),
            Some(&admin),
            Some(json!({ "status": "Inactive" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Inactive");

    let (status, json) = login(&app, "user@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["message"], "Account is inactive");
}

#[tokio::test]
async fn test_admin_creates_and_deletes_account() {
    let app = create_test_app().await;
    let (_, admin) = signup(&app, "admin@example.com", "Admin").await;

    let body = json!({
        "first_name": "Grace",
        "last_name": "Hopper",
        "email": "grace@example.com",
        "address": "2 Navy Yard",
        "password": PASSWORD,
        "confirm_password": PASSWORD,
        "role": "User"
    });
    let (status, json) = app.post("/accounts", Some(&admin), body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json["id"].as_i64().unwrap();

    let (status, json) = app.post("/accounts", Some(&admin), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["message"],
        "Email \"grace@example.com\" is already registered"
    );

    // Created accounts are verified already.
    let (status, _) = login(&app, "grace@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app
        .call(Method::DELETE, &format!("/accounts/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Account deleted successfully");

    let (status, _) = app.get(&format!("/accounts/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_rate_limit() {
    let app = create_test_app().await;

    for _ in 0..Config::for_testing().login_attempts_per_minute {
        let (status, _) = login(&app, "ghost@example.com", "nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let (status, json) = login(&app, "ghost@example.com", "nope").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(json["message"].as_str().unwrap().starts_with("Too many requests"));
}

// ============================================================================
// Item tests
// ============================================================================

#[tokio::test]
async fn test_item_moderation() {
    let app = create_test_app().await;
    let (_, admin) = signup(&app, "admin@example.com", "Admin").await;
    let (_, owner) = signup(&app, "owner@example.com", "Owner").await;

    let (status, json) = app
        .post("/items", Some(&owner), json!({ "name": "Kayak", "price": 40.0 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["approval_status"], "pending");
    assert_eq!(json["status"], "Available");
    let id = json["id"].as_i64().unwrap();

    let (status, _) = app.get("/items/pending", Some(&owner)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = app.get("/items/pending", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, json) = app
        .put(
            &format!("/items/{id}/approve"),
            Some(&admin),
            Some(json!({ "notes": "Looks good" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["approval_status"], "approved");

    let (status, json) = app
        .put(&format!("/items/{id}/approve"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["message"], "Item is already approved");

    let notices = app.mailer.sent_to("owner@example.com");
    assert_eq!(notices.last().unwrap().subject, "Item listing approved");
    assert!(notices.last().unwrap().html.contains("Looks good"));

    let (status, json) = app
        .get("/items?approval_status=approved", Some(&owner))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, json) = app.get(&format!("/items/{id}"), Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["owner_address"], "1 Main Street");

    let (status, json) = app
        .get(&format!("/items/{id}/history"), Some(&owner))
        .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["approved", "created"]);
}

#[tokio::test]
async fn test_item_update_and_delete_permissions() {
    let app = create_test_app().await;
    let (_, admin) = signup(&app, "admin@example.com", "Admin").await;
    let (_, owner) = signup(&app, "owner@example.com", "Owner").await;
    let (_, other) = signup(&app, "other@example.com", "Other").await;
    let id = approved_item(&app, &owner, &admin, 10.0).await;

    let (status, _) = app
        .put(
            &format!("/items/{id}"),
            Some(&other),
            Some(json!({ "name": "Mine now" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app
        .put(
            &format!("/items/{id}"),
            Some(&owner),
            Some(json!({ "price": 12.5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["price"], 12.5);

    let (status, _) = app
        .put(
            &format!("/items/{id}"),
            Some(&owner),
            Some(json!({ "price": -1.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = app
        .call(Method::DELETE, &format!("/items/{id}"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Item deleted successfully");

    let (status, _) = app.get(&format!("/items/{id}"), Some(&owner)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // History outlives the item.
    let (status, json) = app
        .get(&format!("/items/{id}/history"), Some(&owner))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["action"], "deleted");
}

// ============================================================================
// Rental tests
// ============================================================================

#[tokio::test]
async fn test_rental_lifecycle() {
    let app = create_test_app().await;
    let m = marketplace(&app).await;

    let (status, json) = request_rental(
        &app,
        &m.renter,
        m.item_id,
        "2030-01-01T00:00:00Z",
        "2030-01-04T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["rental_status"], "Pending");
    assert_eq!(json["total_rental_price"], 75.0);
    assert_eq!(json["renter_acc_id"], m.renter_id);
    let rental_id = json["id"].as_i64().unwrap();
    assert_eq!(
        app.mailer.sent_to("owner@example.com").last().unwrap().subject,
        "New rental request"
    );

    // Overlap is refused; touching periods are not.
    let (status, json) = request_rental(
        &app,
        &m.renter,
        m.item_id,
        "2030-01-03T00:00:00Z",
        "2030-01-05T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["message"], "Item is already rented for the selected dates");

    let (status, _) = request_rental(
        &app,
        &m.renter,
        m.item_id,
        "2030-01-04T00:00:00Z",
        "2030-01-06T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Only the owner or an admin may decide.
    let (status, _) = app
        .put(&format!("/rentals/{rental_id}/approve"), Some(&m.renter), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app
        .put(&format!("/rentals/{rental_id}/approve"), Some(&m.owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rental_status"], "Approved");
    assert_eq!(
        app.mailer.sent_to("renter@example.com").last().unwrap().subject,
        "Rental approved"
    );

    let (_, item) = app.get(&format!("/items/{}", m.item_id), Some(&m.owner)).await;
    assert_eq!(item["status"], "Rented");

    let (status, json) = request_rental(
        &app,
        &m.renter,
        m.item_id,
        "2030-03-01T00:00:00Z",
        "2030-03-02T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Item is not available for rent");

    let (status, json) = app
        .put(&format!("/rentals/{rental_id}/return"), Some(&m.owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rental_status"], "Completed");
    assert!(app
        .mailer
        .sent_to("renter@example.com")
        .last()
        .unwrap()
        .html
        .contains("feedback"));

    let (_, item) = app.get(&format!("/items/{}", m.item_id), Some(&m.owner)).await;
    assert_eq!(item["status"], "Available");

    let (status, _) = app
        .put(&format!("/rentals/{rental_id}/return"), Some(&m.owner), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = app.get(&format!("/rentals/{rental_id}"), Some(&m.admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["item"]["name"], "Camping tent");
    assert_eq!(json["item"]["acc_id"], m.owner_id);
    assert_eq!(json["renter"]["last_name"], "Renter");

    let (status, json) = app.get(&format!("/rentals/item/{}", m.item_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (status, json) = app
        .get(&format!("/rentals/account/{}", m.renter_id), Some(&m.renter))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_rental_preconditions() {
    let app = create_test_app().await;
    let m = marketplace(&app).await;
    let (_, unverified) = signup(&app, "new@example.com", "Newcomer").await;

    let (status, _) = request_rental(
        &app,
        &unverified,
        m.item_id,
        "2030-01-01T00:00:00Z",
        "2030-01-02T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = request_rental(
        &app,
        &m.owner,
        m.item_id,
        "2030-01-01T00:00:00Z",
        "2030-01-02T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "You cannot rent your own item");

    let (status, _) = request_rental(
        &app,
        &m.renter,
        m.item_id,
        "2030-01-02T00:00:00Z",
        "2030-01-01T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request_rental(
        &app,
        &m.renter,
        9999,
        "2030-01-01T00:00:00Z",
        "2030-01-02T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rental_reject_reschedule_and_cancel() {
    let app = create_test_app().await;
    let m = marketplace(&app).await;

    let (_, first) = request_rental(
        &app,
        &m.renter,
        m.item_id,
        "2030-02-01T00:00:00Z",
        "2030-02-03T00:00:00Z",
    )
    .await;
    let first_id = first["id"].as_i64().unwrap();

    let (status, json) = app
        .put(
            &format!("/rentals/{first_id}/reject"),
            Some(&m.owner),
            Some(json!({ "rejection_reason": "Away that week" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rental_status"], "Rejected");
    assert_eq!(json["rejection_reason"], "Away that week");
    assert!(app
        .mailer
        .sent_to("renter@example.com")
        .last()
        .unwrap()
        .html
        .contains("Away that week"));

    // Rejected rentals no longer hold their dates.
    let (status, second) = request_rental(
        &app,
        &m.renter,
        m.item_id,
        "2030-02-01T00:00:00Z",
        "2030-02-03T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let second_id = second["id"].as_i64().unwrap();

    // Moving within its own period is not a conflict.
    let (status, json) = app
        .put(
            &format!("/rentals/{second_id}"),
            Some(&m.renter),
            Some(json!({ "rental_end_date": "2030-02-05T00:00:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_rental_price"], 100.0);

    let (status, _) = app
        .put(&format!("/rentals/{second_id}/cancel"), Some(&m.owner), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app
        .put(&format!("/rentals/{second_id}/cancel"), Some(&m.renter), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rental_status"], "Cancelled");

    let (status, _) = app
        .put(&format!("/rentals/{second_id}/cancel"), Some(&m.renter), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/rentals/{second_id}"),
            Some(&m.renter),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/rentals/{second_id}"), Some(&m.renter)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Feedback tests
// ============================================================================

#[tokio::test]
async fn test_feedback_flow() {
    let app = create_test_app().await;
    let m = marketplace(&app).await;

    let (_, rental) = request_rental(
        &app,
        &m.renter,
        m.item_id,
        "2030-01-01T00:00:00Z",
        "2030-01-02T00:00:00Z",
    )
    .await;
    let rental_id = rental["id"].as_i64().unwrap();
    let feedback = json!({ "rent_item_id": rental_id, "rating": 4, "comment": "Dry all night" });

    // Not completed yet.
    let (status, _) = app.post("/feedback", Some(&m.renter), feedback.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.put(&format!("/rentals/{rental_id}/approve"), Some(&m.owner), None)
        .await;
    app.put(&format!("/rentals/{rental_id}/return"), Some(&m.owner), None)
        .await;

    let (status, _) = app.post("/feedback", Some(&m.owner), feedback.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/feedback",
            Some(&m.renter),
            json!({ "rent_item_id": rental_id, "rating": 6 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = app.post("/feedback", Some(&m.renter), feedback.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let feedback_id = json["id"].as_i64().unwrap();
    assert_eq!(
        app.mailer.sent_to("owner@example.com").last().unwrap().subject,
        "New feedback on your item"
    );

    let (status, _) = app.post("/feedback", Some(&m.renter), feedback).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = app.get(&format!("/feedback/rating/{}", m.item_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["average_rating"], 4.0);
    assert_eq!(json["total_reviews"], 1);

    let (status, json) = app.get(&format!("/feedback/item/{}", m.item_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["author"]["last_name"], "Renter");
    assert_eq!(json[0]["item"]["name"], "Camping tent");

    let (status, _) = app
        .put(
            &format!("/feedback/{feedback_id}"),
            Some(&m.owner),
            Some(json!({ "rating": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app
        .put(
            &format!("/feedback/{feedback_id}"),
            Some(&m.renter),
            Some(json!({ "rating": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rating"], 5);
    assert_eq!(json["comment"], "Dry all night");

    let (status, json) = app
        .get(&format!("/feedback/account/{}", m.renter_id), Some(&m.admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/feedback/{feedback_id}"),
            Some(&m.renter),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app.get(&format!("/feedback/rating/{}", m.item_id), None).await;
    assert_eq!(json["average_rating"], 0.0);
    assert_eq!(json["total_reviews"], 0);

    let (status, json) = app
        .get(&format!("/feedback/rentitem/{rental_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.is_null());

    let (status, json) = app.get(&format!("/feedback/{feedback_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Inactive");
}

// ============================================================================
// Chat tests
// ============================================================================

#[tokio::test]
async fn test_chat_flow() {
    let app = create_test_app().await;
    let (ada_id, ada) = signup(&app, "ada@example.com", "Lovelace").await;
    let (grace_id, grace) = signup(&app, "grace@example.com", "Hopper").await;

    let (status, _) = app
        .post(
            "/chat/send",
            Some(&ada),
            json!({ "receiver_id": grace_id, "message": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/chat/send",
            Some(&ada),
            json!({ "receiver_id": 9999, "message": "hello?" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = app
        .post(
            "/chat/send",
            Some(&ada),
            json!({ "receiver_id": grace_id, "message": "Is the tent free?" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["read"], false);
    let message_id = json["id"].as_i64().unwrap();

    let (status, _) = app
        .post(
            "/chat/send",
            Some(&grace),
            json!({ "receiver_id": ada_id, "image": "uploads/tent.jpg" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, json) = app.get("/chat/unread", Some(&grace)).await;
    assert_eq!(json["unread_count"], 1);

    // Only the receiver can mark a message read.
    let (status, _) = app
        .put(&format!("/chat/read/{message_id}"), Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = app
        .put(&format!("/chat/read/{message_id}"), Some(&grace), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["read"], true);

    let (_, json) = app.get("/chat/unread", Some(&grace)).await;
    assert_eq!(json["unread_count"], 0);

    let (status, json) = app
        .get(&format!("/chat/conversation/{grace_id}"), Some(&ada))
        .await;
    assert_eq!(status, StatusCode::OK);
    let messages = json.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["message"], "Is the tent free?");
    assert_eq!(messages[0]["sender"]["last_name"], "Lovelace");
    assert_eq!(messages[1]["image"], "uploads/tent.jpg");

    let (status, json) = app.get("/chat/participants", Some(&ada)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], grace_id);
}

// ============================================================================
// Subscription tests
// ============================================================================

#[tokio::test]
async fn test_subscription_review() {
    let app = create_test_app().await;
    let (_, admin) = signup(&app, "admin@example.com", "Admin").await;
    let (_, user) = signup(&app, "user@example.com", "User").await;

    let (status, _) = app
        .post(
            "/subscriptions",
            Some(&user),
            json!({ "start_date": "2099-01-31T00:00:00Z", "subscription_plan": "1_month" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = app
        .post(
            "/subscriptions",
            Some(&user),
            json!({
                "start_date": "2099-01-31T00:00:00Z",
                "subscription_plan": "1_month",
                "subscription_receipt": "uploads/receipt.png"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["plan_duration"], 1);
    assert_eq!(json["end_date"], "2099-02-28T00:00:00Z");
    let id = json["id"].as_i64().unwrap();

    let (_, json) = app.get("/subscriptions/approved", None).await;
    assert!(json.as_array().unwrap().is_empty());

    let (status, _) = app
        .put(
            &format!("/subscriptions/{id}/review"),
            Some(&user),
            Some(json!({ "status": "approved" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = app
        .put(
            &format!("/subscriptions/{id}/review"),
            Some(&admin),
            Some(json!({ "status": "approved", "admin_remarks": "Receipt checks out" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "approved");
    assert!(json["reviewed_by"].is_i64());
    assert_eq!(
        app.mailer.sent_to("user@example.com").last().unwrap().subject,
        "Subscription approved"
    );

    let (status, _) = app
        .put(
            &format!("/subscriptions/{id}/review"),
            Some(&admin),
            Some(json!({ "status": "rejected" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, json) = app.get("/subscriptions/approved", None).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["email"], "user@example.com");

    // Owners can only change pending subscriptions.
    let (status, _) = app
        .put(
            &format!("/subscriptions/{id}"),
            Some(&user),
            Some(json!({ "subscription_plan": "6_months" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = app
        .put(
            &format!("/subscriptions/{id}"),
            Some(&admin),
            Some(json!({ "subscription_plan": "3_months" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["end_date"], "2099-04-30T00:00:00Z");

    let (status, json) = app.get("/subscriptions", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["account"]["email"], "user@example.com");

    let (status, _) = app
        .call(Method::DELETE, &format!("/subscriptions/{id}"), Some(&user), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Report tests
// ============================================================================

#[tokio::test]
async fn test_report_moderation() {
    let app = create_test_app().await;
    let (admin_id, admin) = signup(&app, "admin@example.com", "Admin").await;
    let (reporter_id, reporter) = signup(&app, "reporter@example.com", "Reporter").await;
    let (target_id, target) = signup(&app, "target@example.com", "Target").await;

    let (status, json) = app
        .post(
            "/reports",
            Some(&reporter),
            json!({ "reported_id": reporter_id, "reason_type": "spam" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "You cannot report yourself");

    let (status, _) = app
        .post(
            "/reports",
            Some(&reporter),
            json!({ "reported_id": 9999, "reason_type": "spam" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = app
        .post(
            "/reports",
            Some(&reporter),
            json!({
                "reported_id": target_id,
                "reason_type": "harassment",
                "description": "Rude messages"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["reason_display"], "Harassment or Bullying");
    assert_eq!(json["reported_user"]["full_name"], "Test Target");
    let id = json["id"].as_i64().unwrap();

    let (status, _) = app.get("/reports", Some(&reporter)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = app
        .get("/reports?status=pending&reason_type=harassment", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_count"], 1);
    assert_eq!(json["current_page"], 1);
    assert_eq!(json["total_pages"], 1);

    let (status, _) = app
        .get(&format!("/reports/by-reporter/{reporter_id}"), Some(&target))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&format!("/reports/{id}"), Some(&target)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app
        .get(&format!("/reports/by-reporter/{reporter_id}"), Some(&reporter))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reports"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .put(
            &format!("/reports/{id}/review"),
            Some(&admin),
            Some(json!({ "status": "pending" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = app
        .put(
            &format!("/reports/{id}/review"),
            Some(&admin),
            Some(json!({
                "status": "resolved",
                "reviewer_comments": "Confirmed",
                "action_taken": "Warning sent"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "resolved");
    assert_eq!(json["reviewer_id"], admin_id);
    assert_eq!(json["reviewer"]["email"], "admin@example.com");

    let (_, json) = app.get("/reports/pending", Some(&admin)).await;
    assert_eq!(json["total_count"], 0);

    let (_, json) = app
        .get(&format!("/reports/against-user/{target_id}"), Some(&admin))
        .await;
    assert_eq!(json["total_count"], 1);

    let (status, json) = app
        .put(
            &format!("/reports/{id}/status"),
            Some(&admin),
            Some(json!({ "status": "dismissed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "dismissed");

    let (status, _) = app
        .call(Method::DELETE, &format!("/reports/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/reports/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Activity log tests
// ============================================================================

#[tokio::test]
async fn test_activity_logs() {
    let app = create_test_app().await;
    let (admin_id, admin) = signup(&app, "admin@example.com", "Admin").await;
    let (_, user) = signup(&app, "user@example.com", "User").await;

    let (status, _) = app.get("/activity-logs", Some(&user)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = app
        .get("/activity-logs/action/Login%20attempt", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_count"], 2);
    assert_eq!(json["logs"][0]["ip_address"], CLIENT_IP);

    let (status, json) = app.get("/activity-logs/action/Registration", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_count"], 2);
    assert_eq!(json["logs"][0]["username"], "Anonymous");

    // Requests made by an admin are recorded under their name.
    let (status, json) = app
        .get(&format!("/activity-logs/user/{admin_id}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["total_count"].as_i64().unwrap() >= 1);
    assert_eq!(json["logs"][0]["username"], "Test Admin");

    let (status, json) = app
        .get(&format!("/activity-logs/ip/{CLIENT_IP}?limit=2"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["logs"].as_array().unwrap().len(), 2);

    let (status, json) = app
        .get(
            "/activity-logs/date-range?start_date=2000-01-01T00:00:00Z&end_date=2999-01-01T00:00:00Z",
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["total_count"].as_i64().unwrap() >= 4);

    let (status, _) = app
        .get(
            "/activity-logs/date-range?start_date=2030-01-02T00:00:00Z&end_date=2030-01-01T00:00:00Z",
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rented_item_status_is_locked() {
    let app = create_test_app().await;
    let m = marketplace(&app).await;

    let (status, json) =
        request_rental(&app, &m.renter, m.item_id, "2030-05-01", "2030-05-03").await;
    assert_eq!(status, StatusCode::CREATED);
    let rental_id = json["id"].as_i64().unwrap();
    let (status, _) = app
        .put(&format!("/rentals/{rental_id}/approve"), Some(&m.owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    for next in ["Available", "Unavailable"] {
        let (status, json) = app
            .put(
                &format!("/items/{}", m.item_id),
                Some(&m.owner),
                Some(json!({ "status": next })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            json["message"],
            "Item is currently rented and its status cannot be changed"
        );
    }

    // Other fields stay editable.
    let (status, json) = app
        .put(
            &format!("/items/{}", m.item_id),
            Some(&m.owner),
            Some(json!({ "description": "Sleeps six" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Rented");

    let (status, json) =
        request_rental(&app, &m.renter, m.item_id, "2030-06-01", "2030-06-03").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Item is not available for rent");

    // Once returned, the owner controls the status again.
    let (status, _) = app
        .put(&format!("/rentals/{rental_id}/return"), Some(&m.owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = app
        .put(
            &format!("/items/{}", m.item_id),
            Some(&m.owner),
            Some(json!({ "status": "Unavailable" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Unavailable");
}

// ============================================================================
// Input handling tests
// ============================================================================

#[tokio::test]
async fn test_plain_dates_are_accepted() {
    let app = create_test_app().await;
    let m = marketplace(&app).await;

    let (status, json) =
        request_rental(&app, &m.renter, m.item_id, "2030-03-10", "2030-03-12").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["rental_start_date"], "2030-03-10T00:00:00Z");
    assert_eq!(json["rental_end_date"], "2030-03-12T00:00:00Z");
    assert_eq!(json["total_rental_price"], 50.0);
    let rental_id = json["id"].as_i64().unwrap();

    let (status, _) = request_rental(&app, &m.renter, m.item_id, "2030-03-11", "2030-03-13").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = app
        .put(
            &format!("/rentals/{rental_id}"),
            Some(&m.renter),
            Some(json!({ "rental_end_date": "2030-03-14" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rental_end_date"], "2030-03-14T00:00:00Z");
    assert_eq!(json["total_rental_price"], 100.0);

    let (status, json) =
        request_rental(&app, &m.renter, m.item_id, "10/03/2031", "2031-03-12").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("rental_start_date"));

    let (status, json) = app
        .post(
            "/subscriptions",
            Some(&m.renter),
            json!({
                "start_date": "2099-01-31",
                "subscription_plan": "1_month",
                "subscription_receipt": "uploads/receipt.png"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["start_date"], "2099-01-31T00:00:00Z");
    assert_eq!(json["end_date"], "2099-02-28T00:00:00Z");

    // A plain end date covers the whole day.
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let (status, json) = app
        .get(
            &format!("/activity-logs/date-range?start_date={today}&end_date={today}"),
            Some(&m.admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["total_count"].as_i64().unwrap() >= 3);

    let (status, json) = app
        .get(
            "/activity-logs/date-range?start_date=2000-01-01&end_date=2000-01-02",
            Some(&m.admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_count"], 0);
}

#[tokio::test]
async fn test_malformed_input_answers_bad_request() {
    let app = create_test_app().await;
    let (_, admin) = signup(&app, "admin@example.com", "Admin").await;

    let (status, json) = app
        .post("/items", Some(&admin), json!({ "name": "Tent" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("price"));

    let (status, json) = app
        .post(
            "/accounts/register",
            None,
            json!({ "email": "someone@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].is_string());

    let (status, json) = app
        .post("/items", Some(&admin), json!({ "name": "Tent", "price": "cheap" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].is_string());

    let (status, json) = app.get("/items/not-a-number", Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].is_string());

    let (status, json) = app.get("/activity-logs?page=first", Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn test_huge_page_numbers_return_empty_pages() {
    let app = create_test_app().await;
    let (_, admin) = signup(&app, "admin@example.com", "Admin").await;
    let (user_id, user) = signup(&app, "user@example.com", "User").await;

    let (status, json) = app
        .get("/activity-logs?page=9223372036854775807&limit=10", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["logs"].as_array().unwrap().is_empty());
    assert_eq!(json["current_page"], i64::MAX);

    let (status, json) = app
        .get(
            &format!("/reports/by-reporter/{user_id}?page=9223372036854775807"),
            Some(&user),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["reports"].as_array().unwrap().is_empty());
}
