/// FitArena backend library
///
/// Multi-tenant REST service for the FitArena fitness platform:
/// admin console and end-user API with dual-realm JWT authentication,
/// bitmask role permissions, and a mail-backed password-reset flow.
pub mod admins;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod mailer;
pub mod pagination;
pub mod roles;
pub mod server;
pub mod settings;
pub mod users;
