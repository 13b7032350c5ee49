/// API routes and handlers
pub mod admins;
pub mod auth;
pub mod health;
pub mod middleware;
pub mod roles;
pub mod settings;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes(ctx: AppContext) -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes(ctx.clone()))
        .merge(users::routes(ctx.clone()))
        .merge(admins::routes(ctx.clone()))
        .merge(roles::routes(ctx.clone()))
        .merge(settings::routes(ctx))
}
