/// End-user profile endpoints and the admin console's user management
use crate::{
    api::middleware::{
        authenticate, enforce_account_state, require_access, AuthSession,
    },
    auth::access,
    context::AppContext,
    error::AppResult,
    pagination::{ListQuery, Paginated},
    users::{UpdateUser, UserProfile},
};
use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

pub fn routes(ctx: AppContext) -> Router<AppContext> {
    Router::new()
        .route("/users/me", get(my_profile).patch(update_my_profile))
        .route("/users/me/password", patch(update_my_password))
        .route("/admin/users", get(list_users))
        .route(
            "/admin/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            enforce_account_state,
        ))
        .layer(middleware::from_fn_with_state(ctx, authenticate))
}

async fn my_profile(
    State(ctx): State<AppContext>,
    session: AuthSession,
) -> AppResult<Json<UserProfile>> {
    let user = ctx.users.find_one(&session.principal_id).await?;
    Ok(Json(user))
}

async fn update_my_profile(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Json(req): Json<UpdateUser>,
) -> AppResult<Json<UserProfile>> {
    // Users cannot change their own role tag
    let req = UpdateUser { role: None, ..req };
    let user = ctx.users.update(&session.principal_id, req).await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

async fn update_my_password(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Json(req): Json<UpdatePasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    ctx.users
        .update_password(&session.principal_id, &req.current_password, &req.new_password)
        .await?;
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

async fn list_users(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Paginated<UserProfile>>> {
    require_access(&ctx, &session, "users", access::READ).await?;

    let page = ctx.users.find_all(&query).await?;
    Ok(Json(page))
}

async fn get_user(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Path(id): Path<String>,
) -> AppResult<Json<UserProfile>> {
    require_access(&ctx, &session, "users", access::READ).await?;

    let user = ctx.users.find_one(&id).await?;
    Ok(Json(user))
}

async fn update_user(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateUser>,
) -> AppResult<Json<UserProfile>> {
    require_access(&ctx, &session, "users", access::WRITE).await?;

    let user = ctx.users.update(&id, req).await?;
    Ok(Json(user))
}

async fn delete_user(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    require_access(&ctx, &session, "users", access::DELETE).await?;

    ctx.users.remove(&id).await?;
    Ok(Json(json!({ "message": "User has been deleted successfully" })))
}
