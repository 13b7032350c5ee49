/// Authentication endpoints for both realms
///
/// Admin login/refresh/logout live under /admin/auth so the realm
/// resolver picks the admin secrets; everything else is user-realm.
use crate::{
    api::middleware::{authenticate, enforce_account_state, extract_bearer_token, AuthSession},
    auth::{Principal, Provider, Realm, TokenPair},
    context::AppContext,
    error::{AppError, AppResult},
    users::{NewUser, UpdateUser, UserProfile},
};
use axum::{
    extract::State,
    http::HeaderMap,
    middleware,
    routing::{patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

pub fn routes(ctx: AppContext) -> Router<AppContext> {
    let public = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(user_login))
        .route("/auth/refresh", post(user_refresh))
        .route("/auth/google", post(google_login))
        .route("/auth/facebook", post(facebook_login))
        .route("/auth/password/reset", post(request_reset))
        .route("/auth/password/verify-code", post(verify_reset_code))
        .route("/auth/password/confirm", post(complete_reset))
        .route("/admin/auth/login", post(admin_login))
        .route("/admin/auth/refresh", post(admin_refresh));

    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/complete-profile", patch(complete_profile))
        .route("/admin/auth/logout", post(logout))
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            enforce_account_state,
        ))
        .layer(middleware::from_fn_with_state(ctx, authenticate));

    public.merge(protected)
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub tokens: TokenPair,
    pub principal: Principal,
}

/// End-user sign-up
async fn signup(
    State(ctx): State<AppContext>,
    Json(req): Json<NewUser>,
) -> AppResult<Json<UserProfile>> {
    let user = ctx.users.create(req).await?;
    Ok(Json(user))
}

async fn user_login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    login(ctx, Realm::User, req).await
}

async fn admin_login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    login(ctx, Realm::Admin, req).await
}

async fn login(ctx: AppContext, realm: Realm, req: LoginRequest) -> AppResult<Json<LoginResponse>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let (principal, tokens) = ctx.auth.login(realm, &req.email, &req.password).await?;

    Ok(Json(LoginResponse { tokens, principal }))
}

/// Exchange a bearer refresh token for a rotated pair
async fn user_refresh(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> AppResult<Json<TokenPair>> {
    refresh(ctx, Realm::User, &headers).await
}

async fn admin_refresh(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> AppResult<Json<TokenPair>> {
    refresh(ctx, Realm::Admin, &headers).await
}

async fn refresh(ctx: AppContext, realm: Realm, headers: &HeaderMap) -> AppResult<Json<TokenPair>> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let pair = ctx.auth.refresh(realm, &token).await?;
    Ok(Json(pair))
}

/// Revoke the caller's sessions; works in whichever realm the path
/// resolved
async fn logout(
    State(ctx): State<AppContext>,
    session: AuthSession,
) -> AppResult<Json<serde_json::Value>> {
    ctx.auth.logout(session.realm, &session.principal_id).await?;
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    pub google_id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacebookLoginRequest {
    pub facebook_id: String,
    /// Absent when the Facebook account exposes no public email;
    /// such logins are rejected
    pub email: Option<String>,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedLoginResponse {
    pub tokens: TokenPair,
    pub user: UserProfile,
    pub is_new_user: bool,
}

/// Google sign-in with a provider-verified profile
async fn google_login(
    State(ctx): State<AppContext>,
    Json(req): Json<GoogleLoginRequest>,
) -> AppResult<Json<FederatedLoginResponse>> {
    let (user, is_new_user) = ctx
        .linker
        .link_or_create(Provider::Google, &req.google_id, Some(&req.email), &req.name)
        .await?;

    federated_session(&ctx, user, is_new_user).await
}

/// Facebook sign-in with a provider-verified profile
async fn facebook_login(
    State(ctx): State<AppContext>,
    Json(req): Json<FacebookLoginRequest>,
) -> AppResult<Json<FederatedLoginResponse>> {
    let (user, is_new_user) = ctx
        .linker
        .link_or_create(
            Provider::Facebook,
            &req.facebook_id,
            req.email.as_deref(),
            &req.name,
        )
        .await?;

    federated_session(&ctx, user, is_new_user).await
}

async fn federated_session(
    ctx: &AppContext,
    user: UserProfile,
    is_new_user: bool,
) -> AppResult<Json<FederatedLoginResponse>> {
    let tokens = ctx
        .auth
        .establish_session(Realm::User, &user.id, &user.email)
        .await?;

    Ok(Json(FederatedLoginResponse {
        tokens,
        user,
        is_new_user,
    }))
}

/// Finish a pending federated profile
async fn complete_profile(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Json(req): Json<UpdateUser>,
) -> AppResult<Json<UserProfile>> {
    // Users cannot change their own role tag
    let req = UpdateUser { role: None, ..req };
    let user = ctx
        .users
        .complete_profile(&session.principal_id, req)
        .await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RequestResetRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
}

async fn request_reset(
    State(ctx): State<AppContext>,
    Json(req): Json<RequestResetRequest>,
) -> AppResult<Json<serde_json::Value>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    ctx.reset.request_reset(&req.email).await?;

    Ok(Json(json!({
        "message": "A password reset code has been sent to your email"
    })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResponse {
    pub reset_token: String,
}

async fn verify_reset_code(
    State(ctx): State<AppContext>,
    Json(req): Json<VerifyCodeRequest>,
) -> AppResult<Json<VerifyCodeResponse>> {
    let reset_token = ctx.reset.verify_code(&req.email, &req.code).await?;
    Ok(Json(VerifyCodeResponse { reset_token }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResetRequest {
    pub reset_token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
}

async fn complete_reset(
    State(ctx): State<AppContext>,
    Json(req): Json<CompleteResetRequest>,
) -> AppResult<Json<serde_json::Value>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    ctx.reset.complete_reset(&req.reset_token, &req.password).await?;

    Ok(Json(json!({
        "message": "Your password has been reset successfully"
    })))
}
