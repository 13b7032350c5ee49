/// Configuration management for the FitArena backend
use crate::auth::realm::Realm;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub bootstrap: BootstrapConfig,
    pub email: Option<EmailConfig>,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Authentication configuration: one token config per realm plus the
/// OAuth client identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub admin: RealmTokenConfig,
    pub user: RealmTokenConfig,
    pub google_client_id: String,
    pub facebook_app_id: String,
}

/// Signing parameters for one realm: independent secrets and
/// lifetimes for access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealmTokenConfig {
    pub access_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_secret: String,
    pub refresh_ttl_secs: i64,
}

/// Bootstrap super-admin account, seeded at startup when both values
/// are present
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub super_admin_email: Option<String>,
    pub super_admin_password: Option<String>,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
    /// Template identifier for the password-reset mail
    pub reset_template: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl AuthConfig {
    /// Token configuration governing a realm
    pub fn realm(&self, realm: Realm) -> &RealmTokenConfig {
        match realm {
            Realm::Admin => &self.admin,
            Realm::User => &self.user,
        }
    }
}

/// Read a required secret; missing value is a fatal startup condition
fn require_secret(var: &str) -> AppResult<String> {
    env::var(var).map_err(|_| AppError::Config(format!("{} is required", var)))
}

fn ttl_from_env(var: &str, default_secs: i64) -> i64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default_secs)
}

fn realm_token_config(prefix: &str) -> AppResult<RealmTokenConfig> {
    Ok(RealmTokenConfig {
        access_secret: require_secret(&format!("{}_JWT_SECRET", prefix))?,
        access_ttl_secs: ttl_from_env(&format!("{}_JWT_TTL_SECS", prefix), 3600),
        refresh_secret: require_secret(&format!("{}_REFRESH_SECRET", prefix))?,
        refresh_ttl_secs: ttl_from_env(&format!("{}_REFRESH_TTL_SECS", prefix), 604800),
    })
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("FITARENA_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("FITARENA_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| AppError::Config("Invalid port number".to_string()))?;

        let database_path: PathBuf = env::var("FITARENA_DATABASE")
            .unwrap_or_else(|_| "./data/fitarena.sqlite".to_string())
            .into();

        let auth = AuthConfig {
            admin: realm_token_config("ADMIN")?,
            user: realm_token_config("USER")?,
            google_client_id: env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            facebook_app_id: env::var("FACEBOOK_APP_ID").unwrap_or_default(),
        };

        let bootstrap = BootstrapConfig {
            super_admin_email: env::var("SUPER_ADMIN_EMAIL").ok(),
            super_admin_password: env::var("SUPER_ADMIN_PASSWORD").ok(),
        };

        let email = if let Ok(smtp_url) = env::var("SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "noreply@fitarena.app".to_string()),
                reset_template: env::var("RESET_MAIL_TEMPLATE")
                    .unwrap_or_else(|_| "password-reset".to_string()),
            })
        } else {
            None
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(AppConfig {
            service: ServiceConfig { hostname, port },
            database: DatabaseConfig {
                path: database_path,
            },
            auth,
            bootstrap,
            email,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration; all four secret/ttl pairs must be
    /// usable or the corresponding realm's auth flow cannot start
    pub fn validate(&self) -> AppResult<()> {
        for (name, cfg) in [("admin", &self.auth.admin), ("user", &self.auth.user)] {
            if cfg.access_secret.is_empty() || cfg.refresh_secret.is_empty() {
                return Err(AppError::Config(format!(
                    "{} realm token secrets cannot be empty",
                    name
                )));
            }
            if cfg.access_ttl_secs <= 0 || cfg.refresh_ttl_secs <= 0 {
                return Err(AppError::Config(format!(
                    "{} realm token lifetimes must be positive",
                    name
                )));
            }
        }

        Ok(())
    }
}
