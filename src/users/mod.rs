/// End-user account management
///
/// Handles sign-up, profile CRUD for the admin console and the users
/// themselves, soft deletion, password changes, refresh-token storage,
/// federated identity columns, and the ephemeral password-reset code.
use crate::auth::password;
use crate::auth::principal::{Principal, PrincipalLookup, StoredCredentials};
use crate::auth::realm::Realm;
use crate::error::{AppError, AppResult};
use crate::pagination::{ListQuery, Paginated};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use validator::Validate;

/// Account status; federated sign-ins start as `pending` until the
/// profile is completed
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_PENDING: &str = "pending";

/// Default role tag for new accounts
pub const DEFAULT_ROLE: &str = "member";

/// Full user row, internal to the service layer
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: String,
    pub status: String,
    pub google_id: Option<String>,
    pub facebook_id: Option<String>,
    pub reset_code: Option<String>,
    pub reset_code_expires_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Public-safe projection returned from every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub username: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub status: String,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sign-up / admin-create payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    pub username: String,
    pub phone: Option<String>,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub address: Option<String>,
    pub role: Option<String>,
}

/// Partial profile update; email and password change through their
/// own flows
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub address: Option<String>,
    pub role: Option<String>,
}

const PROFILE_COLUMNS: &str = "id, name, username, email, phone, role, status, dob, gender, \
     height_cm, weight_kg, address, created_at, updated_at";

fn profile_from_row(row: &sqlx::sqlite::SqliteRow) -> UserProfile {
    UserProfile {
        id: row.get("id"),
        name: row.get("name"),
        username: row.get("username"),
        email: row.get("email"),
        phone: row.get("phone"),
        role: row.get("role"),
        status: row.get("status"),
        dob: row.get("dob"),
        gender: row.get("gender"),
        height_cm: row.get("height_cm"),
        weight_kg: row.get("weight_kg"),
        address: row.get("address"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[derive(Clone)]
pub struct UsersService {
    db: SqlitePool,
}

impl UsersService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a user with a local password
    pub async fn create(&self, data: NewUser) -> AppResult<UserProfile> {
        data.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if self.email_exists(&data.email).await? {
            return Err(AppError::BadRequest(
                "User with this email already exists".to_string(),
            ));
        }
        if self.username_taken(&data.username, None).await? {
            return Err(AppError::BadRequest("Username is already taken".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let password_hash = password::hash(&data.password)?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, name, username, email, password_hash, role, status, phone, \
             dob, gender, height_cm, weight_kg, address, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .bind(&id)
        .bind(&data.name)
        .bind(&data.username)
        .bind(&data.email)
        .bind(&password_hash)
        .bind(data.role.as_deref().unwrap_or(DEFAULT_ROLE))
        .bind(STATUS_ACTIVE)
        .bind(&data.phone)
        .bind(&data.dob)
        .bind(&data.gender)
        .bind(data.height_cm)
        .bind(data.weight_kg)
        .bind(&data.address)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        self.find_one(&id).await
    }

    /// Create a user from a federated identity; no local password,
    /// profile left pending
    pub async fn create_federated(
        &self,
        email: &str,
        name: &str,
        google_id: Option<&str>,
        facebook_id: Option<&str>,
    ) -> AppResult<UserProfile> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, name, email, role, status, google_id, facebook_id, \
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&id)
        .bind(name)
        .bind(email)
        .bind(DEFAULT_ROLE)
        .bind(STATUS_PENDING)
        .bind(google_id)
        .bind(facebook_id)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        self.find_one(&id).await
    }

    /// Paginated listing for the admin console; excludes soft-deleted
    /// rows
    pub async fn find_all(&self, query: &ListQuery) -> AppResult<Paginated<UserProfile>> {
        // Empty bindings disable a filter so list and count share one
        // WHERE clause and one bind order
        let where_sql = "WHERE deleted_at IS NULL
             AND (?1 = '' OR name LIKE ?1 OR email LIKE ?1)
             AND (?2 = '' OR role = ?2)";

        let pattern = query
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s))
            .unwrap_or_default();
        let role = query.role.clone().unwrap_or_default();

        let sort = query.sort_column(&["created_at", "name", "email", "username"], "created_at");
        let list_sql = format!(
            "SELECT {} FROM users {} ORDER BY {} {} LIMIT ?3 OFFSET ?4",
            PROFILE_COLUMNS,
            where_sql,
            sort,
            query.order().as_sql()
        );
        let count_sql = format!("SELECT COUNT(*) FROM users {}", where_sql);

        let rows = sqlx::query(&list_sql)
            .bind(&pattern)
            .bind(&role)
            .bind(query.limit())
            .bind(query.offset())
            .fetch_all(&self.db)
            .await?;
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&pattern)
            .bind(&role)
            .fetch_one(&self.db)
            .await?;

        let data = rows.iter().map(profile_from_row).collect();
        Ok(Paginated::new(data, total, query.page(), query.limit()))
    }

    /// Public projection by id; soft-deleted rows do not match
    pub async fn find_one(&self, id: &str) -> AppResult<UserProfile> {
        let sql = format!(
            "SELECT {} FROM users WHERE id = ?1 AND deleted_at IS NULL",
            PROFILE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        Ok(profile_from_row(&row))
    }

    /// Full row by email, reset fields and hash included; used by the
    /// auth core only
    pub async fn find_record_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT id, name, username, email, password_hash, role, status, google_id, \
             facebook_id, reset_code, reset_code_expires_at, deleted_at
             FROM users WHERE email = ?1 AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|row| UserRecord {
            id: row.get("id"),
            name: row.get("name"),
            username: row.get("username"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            role: row.get("role"),
            status: row.get("status"),
            google_id: row.get("google_id"),
            facebook_id: row.get("facebook_id"),
            reset_code: row.get("reset_code"),
            reset_code_expires_at: row.get("reset_code_expires_at"),
            deleted_at: row.get("deleted_at"),
        }))
    }

    /// Profile update; username stays unique
    pub async fn update(&self, id: &str, data: UpdateUser) -> AppResult<UserProfile> {
        data.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        // Existence check first so a missing id reads as NotFound
        self.find_one(id).await?;

        if let Some(ref username) = data.username {
            if self.username_taken(username, Some(id)).await? {
                return Err(AppError::BadRequest("Username is already taken".to_string()));
            }
        }

        sqlx::query(
            "UPDATE users SET
                name = COALESCE(?2, name),
                username = COALESCE(?3, username),
                phone = COALESCE(?4, phone),
                dob = COALESCE(?5, dob),
                gender = COALESCE(?6, gender),
                height_cm = COALESCE(?7, height_cm),
                weight_kg = COALESCE(?8, weight_kg),
                address = COALESCE(?9, address),
                role = COALESCE(?10, role),
                updated_at = ?11
             WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.username)
        .bind(&data.phone)
        .bind(&data.dob)
        .bind(&data.gender)
        .bind(data.height_cm)
        .bind(data.weight_kg)
        .bind(&data.address)
        .bind(&data.role)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        self.find_one(id).await
    }

    /// Complete a pending federated profile and activate the account
    pub async fn complete_profile(&self, id: &str, data: UpdateUser) -> AppResult<UserProfile> {
        let updated = self.update(id, data).await?;

        sqlx::query("UPDATE users SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(STATUS_ACTIVE)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(UserProfile {
            status: STATUS_ACTIVE.to_string(),
            ..updated
        })
    }

    /// Change password after re-proving the current one
    pub async fn update_password(
        &self,
        id: &str,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let stored: Option<Option<String>> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        let digest = stored
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?
            .ok_or_else(|| {
                AppError::BadRequest("Account has no local password set".to_string())
            })?;

        if !password::verify(current_password, &digest) {
            return Err(AppError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }
        if password::verify(new_password, &digest) {
            return Err(AppError::BadRequest(
                "New password must be different from current password".to_string(),
            ));
        }

        let new_hash = password::hash(new_password)?;
        self.set_password_hash(id, &new_hash).await
    }

    /// Persist a new password hash
    pub async fn set_password_hash(&self, id: &str, hash: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(hash)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    /// Soft delete; clearing the refresh hash revokes open sessions
    pub async fn remove(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = ?2, refresh_token_hash = NULL, updated_at = ?2
             WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    /// Store an OTP and its expiry; repeated requests overwrite
    pub async fn set_reset_code(
        &self,
        id: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET reset_code = ?2, reset_code_expires_at = ?3, updated_at = ?4
             WHERE id = ?1",
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// One-time use: drop the OTP once it has been exchanged
    pub async fn clear_reset_code(&self, id: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET reset_code = NULL, reset_code_expires_at = NULL, updated_at = ?2
             WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Lookup by federated identity column
    pub async fn find_by_external_id(
        &self,
        column: ExternalIdColumn,
        external_id: &str,
    ) -> AppResult<Option<UserProfile>> {
        let sql = format!(
            "SELECT {} FROM users WHERE {} = ?1 AND deleted_at IS NULL",
            PROFILE_COLUMNS,
            column.as_sql()
        );
        let row = sqlx::query(&sql)
            .bind(external_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|r| profile_from_row(&r)))
    }

    /// Attach a federated identity to an existing account
    pub async fn link_external_id(
        &self,
        id: &str,
        column: ExternalIdColumn,
        external_id: &str,
    ) -> AppResult<()> {
        let sql = format!(
            "UPDATE users SET {} = ?2, updated_at = ?3 WHERE id = ?1",
            column.as_sql()
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(external_id)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn username_taken(&self, username: &str, exclude_id: Option<&str>) -> AppResult<bool> {
        let count: i64 = match exclude_id {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1 AND id != ?2")
                    .bind(username)
                    .bind(id)
                    .fetch_one(&self.db)
                    .await?
            }
            None => sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1")
                .bind(username)
                .fetch_one(&self.db)
                .await?,
        };
        Ok(count > 0)
    }
}

/// Federated identity columns
#[derive(Debug, Clone, Copy)]
pub enum ExternalIdColumn {
    Google,
    Facebook,
}

impl ExternalIdColumn {
    fn as_sql(&self) -> &'static str {
        match self {
            ExternalIdColumn::Google => "google_id",
            ExternalIdColumn::Facebook => "facebook_id",
        }
    }
}

#[async_trait]
impl PrincipalLookup for UsersService {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<StoredCredentials>> {
        let record = self.find_record_by_email(email).await?;

        Ok(record.map(|r| StoredCredentials {
            principal: Principal {
                id: r.id,
                name: r.name,
                email: r.email,
                role: Some(r.role),
                realm: Realm::User,
            },
            password_hash: r.password_hash,
        }))
    }

    async fn refresh_token_hash(&self, id: &str) -> AppResult<Option<String>> {
        let hash: Option<Option<String>> = sqlx::query_scalar(
            "SELECT refresh_token_hash FROM users WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(hash.flatten())
    }

    async fn set_refresh_token_hash(&self, id: &str, hash: Option<String>) -> AppResult<()> {
        sqlx::query("UPDATE users SET refresh_token_hash = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(hash)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(())
    }
}
