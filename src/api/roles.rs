/// Role management endpoints for the admin console
use crate::{
    api::middleware::{
        authenticate, enforce_account_state, require_access, AuthSession,
    },
    auth::access,
    context::AppContext,
    error::AppResult,
    roles::{NewRole, Resource, RoleView, UpdateRole},
};
use axum::{
    extract::{Path, State},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::json;

pub fn routes(ctx: AppContext) -> Router<AppContext> {
    Router::new()
        .route("/admin/roles", get(list_roles).post(create_role))
        .route("/admin/roles/resources", get(list_resources))
        .route(
            "/admin/roles/:id",
            get(get_role).patch(update_role).delete(delete_role),
        )
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            enforce_account_state,
        ))
        .layer(middleware::from_fn_with_state(ctx, authenticate))
}

async fn list_roles(
    State(ctx): State<AppContext>,
    session: AuthSession,
) -> AppResult<Json<Vec<RoleView>>> {
    require_access(&ctx, &session, "roles", access::READ).await?;

    let roles = ctx.roles.find_all().await?;
    Ok(Json(roles))
}

/// The resource catalogue roles can be granted over
async fn list_resources(
    State(ctx): State<AppContext>,
    session: AuthSession,
) -> AppResult<Json<Vec<Resource>>> {
    require_access(&ctx, &session, "roles", access::READ).await?;

    let resources = ctx.roles.resources().await?;
    Ok(Json(resources))
}

async fn create_role(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Json(req): Json<NewRole>,
) -> AppResult<Json<RoleView>> {
    require_access(&ctx, &session, "roles", access::WRITE).await?;

    let role = ctx.roles.create(req).await?;
    Ok(Json(role))
}

async fn get_role(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Path(id): Path<i64>,
) -> AppResult<Json<RoleView>> {
    require_access(&ctx, &session, "roles", access::READ).await?;

    let role = ctx.roles.find_one(id).await?;
    Ok(Json(role))
}

async fn update_role(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRole>,
) -> AppResult<Json<RoleView>> {
    require_access(&ctx, &session, "roles", access::WRITE).await?;

    let role = ctx.roles.update(id, req).await?;
    Ok(Json(role))
}

async fn delete_role(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Path(id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    require_access(&ctx, &session, "roles", access::DELETE).await?;

    ctx.roles.remove(id).await?;
    Ok(Json(json!({ "message": "Role has been deleted successfully" })))
}
