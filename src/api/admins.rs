/// Admin console account management endpoints
use crate::{
    admins::{AdminProfile, AdminProfileWithPermissions, NewAdmin, UpdateAdmin},
    api::middleware::{
        authenticate, enforce_account_state, require_access, AuthSession,
    },
    auth::access,
    context::AppContext,
    error::{AppError, AppResult},
    pagination::{ListQuery, Paginated},
};
use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

pub fn routes(ctx: AppContext) -> Router<AppContext> {
    Router::new()
        .route("/admin/admins", get(list_admins).post(create_admin))
        .route("/admin/admins/me", get(my_profile).patch(update_my_profile))
        .route(
            "/admin/admins/:id",
            get(get_admin).patch(update_admin).delete(delete_admin),
        )
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            enforce_account_state,
        ))
        .layer(middleware::from_fn_with_state(ctx, authenticate))
}

async fn list_admins(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Paginated<AdminProfile>>> {
    require_access(&ctx, &session, "admins", access::READ).await?;

    let page = ctx.admins.find_all(&query).await?;
    Ok(Json(page))
}

async fn create_admin(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Json(req): Json<NewAdmin>,
) -> AppResult<Json<AdminProfile>> {
    require_access(&ctx, &session, "admins", access::WRITE).await?;

    let admin = ctx.admins.create(req).await?;
    Ok(Json(admin))
}

/// The caller's own profile, permission bindings included
async fn my_profile(
    State(ctx): State<AppContext>,
    session: AuthSession,
) -> AppResult<Json<AdminProfileWithPermissions>> {
    let profile = ctx.admins.my_profile(&session.principal_id).await?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMyProfileRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: Option<String>,
}

/// Self-service profile update; role and active flag stay out of reach
async fn update_my_profile(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Json(req): Json<UpdateMyProfileRequest>,
) -> AppResult<Json<AdminProfile>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let update = UpdateAdmin {
        name: req.name,
        email: req.email,
        password: req.password,
        role_id: None,
        is_active: None,
    };
    let admin = ctx.admins.update(&session.principal_id, update).await?;
    Ok(Json(admin))
}

async fn get_admin(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Path(id): Path<String>,
) -> AppResult<Json<AdminProfile>> {
    require_access(&ctx, &session, "admins", access::READ).await?;

    let admin = ctx.admins.find_one(&id).await?;
    Ok(Json(admin))
}

async fn update_admin(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateAdmin>,
) -> AppResult<Json<AdminProfile>> {
    require_access(&ctx, &session, "admins", access::WRITE).await?;

    let admin = ctx.admins.update(&id, req).await?;
    Ok(Json(admin))
}

async fn delete_admin(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_access(&ctx, &session, "admins", access::DELETE).await?;

    ctx.admins.remove(&id).await?;
    Ok(Json(json!({ "message": "Admin has been deleted successfully" })))
}
