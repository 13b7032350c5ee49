/// App-wide settings endpoints
///
/// Irreversible/global operations: gated by super-admin role identity
/// rather than the permission bitmask.
use crate::{
    api::middleware::{
        authenticate, enforce_account_state, require_super_admin, AuthSession,
    },
    context::AppContext,
    error::{AppError, AppResult},
    settings::{AppSettings, UpdateAppSettings},
};
use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, put},
    Json, Router,
};

pub fn routes(ctx: AppContext) -> Router<AppContext> {
    Router::new()
        .route("/admin/settings", get(get_settings).put(update_settings))
        .route("/admin/settings/maintenance/:state", put(set_maintenance))
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            enforce_account_state,
        ))
        .layer(middleware::from_fn_with_state(ctx, authenticate))
}

async fn get_settings(
    State(ctx): State<AppContext>,
    session: AuthSession,
) -> AppResult<Json<AppSettings>> {
    require_super_admin(&ctx, &session).await?;

    let settings = ctx.settings.get().await?;
    Ok(Json(settings))
}

async fn update_settings(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Json(req): Json<UpdateAppSettings>,
) -> AppResult<Json<AppSettings>> {
    require_super_admin(&ctx, &session).await?;

    let settings = ctx.settings.update(req).await?;
    Ok(Json(settings))
}

async fn set_maintenance(
    State(ctx): State<AppContext>,
    session: AuthSession,
    Path(state): Path<String>,
) -> AppResult<Json<AppSettings>> {
    require_super_admin(&ctx, &session).await?;

    let enabled = match state.as_str() {
        "enable" => true,
        "disable" => false,
        other => {
            return Err(AppError::BadRequest(format!(
                "Unknown maintenance state: {}",
                other
            )))
        }
    };

    let settings = ctx.settings.set_maintenance_mode(enabled).await?;
    Ok(Json(settings))
}
