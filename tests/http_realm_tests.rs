/// HTTP-level tests for realm resolution and the request pipeline:
/// secrets are chosen by path prefix before any token is opened, the
/// account-state guard runs after authentication, and authorization
/// is enforced per route.
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use fitarena_backend::{
    admins::NewAdmin,
    auth::{access, realm::Realm},
    config::{
        AppConfig, AuthConfig, BootstrapConfig, DatabaseConfig, LoggingConfig, RealmTokenConfig,
        ServiceConfig,
    },
    context::AppContext,
    db,
    roles::{GrantRequest, NewRole},
    server::build_router,
    users::NewUser,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;

fn realm_config(secret_tag: &str) -> RealmTokenConfig {
    RealmTokenConfig {
        access_secret: format!("{}-access-secret", secret_tag),
        access_ttl_secs: 3600,
        refresh_secret: format!("{}-refresh-secret", secret_tag),
        refresh_ttl_secs: 604800,
    }
}

async fn test_app() -> (Router, AppContext) {
    let config = AppConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            path: ":memory:".into(),
        },
        auth: AuthConfig {
            admin: realm_config("admin"),
            user: realm_config("user"),
            google_client_id: String::new(),
            facebook_app_id: String::new(),
        },
        bootstrap: BootstrapConfig {
            super_admin_email: Some("root@fitarena.app".to_string()),
            super_admin_password: Some("RootPassw0rd".to_string()),
        },
        email: None,
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    };

    let pool = SqlitePool::connect(":memory:").await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    let ctx = AppContext::from_parts(Arc::new(config), pool).await.unwrap();

    (build_router(ctx.clone()), ctx)
}

async fn seed_user(ctx: &AppContext) -> String {
    ctx.users
        .create(NewUser {
            email: "a@x.com".to_string(),
            password: "Sup3rSecret".to_string(),
            name: "Alex".to_string(),
            username: "alex".to_string(),
            phone: None,
            dob: None,
            gender: None,
            height_cm: None,
            weight_kg: None,
            address: None,
            role: None,
        })
        .await
        .unwrap();

    let (_, pair) = ctx
        .auth
        .login(Realm::User, "a@x.com", "Sup3rSecret")
        .await
        .unwrap();
    pair.access_token
}

/// Admin in a role granted READ (only) on "users"
async fn seed_limited_admin(ctx: &AppContext) -> String {
    let users_permission = ctx
        .roles
        .resources()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.resource == "users")
        .unwrap();
    let viewer = ctx
        .roles
        .create(NewRole {
            name: "viewer".to_string(),
            permissions: vec![GrantRequest {
                permission_id: users_permission.id,
                access_level: access::READ,
            }],
        })
        .await
        .unwrap();
    ctx.admins
        .create(NewAdmin {
            name: "Viewer".to_string(),
            email: "viewer@fitarena.app".to_string(),
            password: "Sup3rSecret".to_string(),
            role_id: viewer.id,
            is_active: None,
        })
        .await
        .unwrap();

    let (_, pair) = ctx
        .auth
        .login(Realm::Admin, "viewer@fitarena.app", "Sup3rSecret")
        .await
        .unwrap();
    pair.access_token
}

async fn super_admin_token(ctx: &AppContext) -> String {
    let (_, pair) = ctx
        .auth
        .login(Realm::Admin, "root@fitarena.app", "RootPassw0rd")
        .await
        .unwrap();
    pair.access_token
}

fn get(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn request_with_json(method: &str, path: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/users/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_token_works_in_user_realm_only() {
    let (app, ctx) = test_app().await;
    let user_token = seed_user(&ctx).await;

    let response = app
        .clone()
        .oneshot(get("/users/me", Some(&user_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "a@x.com");

    // Same token on an /admin path: the admin secret is selected by
    // the path prefix, so verification fails outright
    let response = app
        .oneshot(get("/admin/admins/me", Some(&user_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_token_reaches_admin_routes() {
    let (app, ctx) = test_app().await;
    let token = super_admin_token(&ctx).await;

    let response = app
        .clone()
        .oneshot(get("/admin/admins/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["role"], "super-admin");

    // But the same token dies on user-realm routes
    let response = app.oneshot(get("/users/me", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bitmask_gate_on_admin_routes() {
    let (app, ctx) = test_app().await;
    let token = seed_limited_admin(&ctx).await;

    // READ on users: listing works
    let response = app
        .clone()
        .oneshot(get("/admin/users", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // But WRITE-gated and DELETE-gated operations are forbidden
    let response = app
        .clone()
        .oneshot(request_with_json(
            "DELETE",
            "/admin/users/some-id",
            Some(&token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // And resources without any binding deny READ too
    let response = app
        .oneshot(get("/admin/roles", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deactivated_admin_is_cut_off_post_authentication() {
    let (app, ctx) = test_app().await;
    let token = seed_limited_admin(&ctx).await;

    // Works while active
    let response = app
        .clone()
        .oneshot(get("/admin/users", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Deactivate; the still-valid token is now rejected by the guard
    let viewer = ctx
        .admins
        .find_all(&fitarena_backend::pagination::ListQuery {
            search: Some("viewer@fitarena.app".to_string()),
            role: None,
            page: None,
            limit: None,
            sort_by: None,
            sort_field: None,
        })
        .await
        .unwrap()
        .data
        .remove(0);
    ctx.admins
        .update(
            &viewer.id,
            fitarena_backend::admins::UpdateAdmin {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let response = app
        .oneshot(get("/admin/users", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_settings_require_super_admin_role_identity() {
    let (app, ctx) = test_app().await;
    let limited = seed_limited_admin(&ctx).await;
    let root = super_admin_token(&ctx).await;

    // A permissioned-but-ordinary admin is rejected by role identity
    let response = app
        .clone()
        .oneshot(get("/admin/settings", Some(&limited)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The super-admin reads and toggles maintenance mode
    let response = app
        .clone()
        .oneshot(get("/admin/settings", Some(&root)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request_with_json(
            "PUT",
            "/admin/settings/maintenance/enable",
            Some(&root),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["maintenanceMode"], true);
}

#[tokio::test]
async fn test_signup_login_and_refresh_over_http() {
    let (app, _) = test_app().await;

    let response = app
        .clone()
        .oneshot(request_with_json(
            "POST",
            "/auth/signup",
            None,
            json!({
                "email": "b@x.com",
                "password": "Sup3rSecret",
                "name": "Bee",
                "username": "bee"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Duplicate email over HTTP
    let response = app
        .clone()
        .oneshot(request_with_json(
            "POST",
            "/auth/signup",
            None,
            json!({
                "email": "b@x.com",
                "password": "Sup3rSecret",
                "name": "Bee",
                "username": "bee2"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(request_with_json(
            "POST",
            "/auth/login",
            None,
            json!({ "email": "b@x.com", "password": "Sup3rSecret" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let refresh_token = body["tokens"]["refreshToken"].as_str().unwrap().to_string();

    let response = app
        .oneshot(request_with_json(
            "POST",
            "/auth/refresh",
            Some(&refresh_token),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["accessToken"].as_str().is_some());
}

#[tokio::test]
async fn test_login_failures_are_enumeration_safe_over_http() {
    let (app, ctx) = test_app().await;
    seed_user(&ctx).await;

    let missing = app
        .clone()
        .oneshot(request_with_json(
            "POST",
            "/auth/login",
            None,
            json!({ "email": "ghost@x.com", "password": "Sup3rSecret" }),
        ))
        .await
        .unwrap();
    let wrong = app
        .oneshot(request_with_json(
            "POST",
            "/auth/login",
            None,
            json!({ "email": "a@x.com", "password": "wrong" }),
        ))
        .await
        .unwrap();

    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(missing).await, body_json(wrong).await);
}
