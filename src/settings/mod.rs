/// App-wide settings
///
/// A single row of platform configuration, created lazily with
/// defaults on first read. All writes sit behind the super-admin
/// role-identity gate at the API layer.
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub id: i64,
    pub app_name: String,
    pub commission_rate: f64,
    pub currency: String,
    pub support_email: String,
    pub support_phone: String,
    pub app_version: String,
    pub maintenance_mode: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppSettings {
    pub app_name: Option<String>,
    #[validate(range(min = 0.0, max = 1.0, message = "Commission rate must be between 0 and 1"))]
    pub commission_rate: Option<f64>,
    pub currency: Option<String>,
    #[validate(email(message = "Please provide a valid support email"))]
    pub support_email: Option<String>,
    pub support_phone: Option<String>,
    pub app_version: Option<String>,
    pub maintenance_mode: Option<bool>,
}

fn settings_from_row(row: &sqlx::sqlite::SqliteRow) -> AppSettings {
    AppSettings {
        id: row.get("id"),
        app_name: row.get("app_name"),
        commission_rate: row.get("commission_rate"),
        currency: row.get("currency"),
        support_email: row.get("support_email"),
        support_phone: row.get("support_phone"),
        app_version: row.get("app_version"),
        maintenance_mode: row.get("maintenance_mode"),
    }
}

#[derive(Clone)]
pub struct SettingsService {
    db: SqlitePool,
}

impl SettingsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Fetch the settings row, creating the defaults when absent
    pub async fn get(&self) -> AppResult<AppSettings> {
        if let Some(row) = sqlx::query(
            "SELECT id, app_name, commission_rate, currency, support_email, support_phone, \
             app_version, maintenance_mode FROM app_settings LIMIT 1",
        )
        .fetch_optional(&self.db)
        .await?
        {
            return Ok(settings_from_row(&row));
        }

        sqlx::query(
            "INSERT INTO app_settings (app_name, commission_rate, currency, support_email, \
             support_phone, app_version, maintenance_mode)
             VALUES ('FitArena', 0.1, 'EGP', 'support@fitarena.app', '+201000000000', '1.0.0', 0)",
        )
        .execute(&self.db)
        .await?;

        self.get_existing().await
    }

    pub async fn update(&self, data: UpdateAppSettings) -> AppResult<AppSettings> {
        data.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let current = self.get().await?;

        sqlx::query(
            "UPDATE app_settings SET
                app_name = COALESCE(?2, app_name),
                commission_rate = COALESCE(?3, commission_rate),
                currency = COALESCE(?4, currency),
                support_email = COALESCE(?5, support_email),
                support_phone = COALESCE(?6, support_phone),
                app_version = COALESCE(?7, app_version),
                maintenance_mode = COALESCE(?8, maintenance_mode)
             WHERE id = ?1",
        )
        .bind(current.id)
        .bind(&data.app_name)
        .bind(data.commission_rate)
        .bind(&data.currency)
        .bind(&data.support_email)
        .bind(&data.support_phone)
        .bind(&data.app_version)
        .bind(data.maintenance_mode)
        .execute(&self.db)
        .await?;

        self.get_existing().await
    }

    pub async fn set_maintenance_mode(&self, enabled: bool) -> AppResult<AppSettings> {
        let current = self.get().await?;

        sqlx::query("UPDATE app_settings SET maintenance_mode = ?2 WHERE id = ?1")
            .bind(current.id)
            .bind(enabled)
            .execute(&self.db)
            .await?;

        self.get_existing().await
    }

    async fn get_existing(&self) -> AppResult<AppSettings> {
        let row = sqlx::query(
            "SELECT id, app_name, commission_rate, currency, support_email, support_phone, \
             app_version, maintenance_mode FROM app_settings LIMIT 1",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(settings_from_row(&row))
    }
}
