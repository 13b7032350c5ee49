/// Admin console account management
///
/// Admin accounts carry a role (the RBAC side of the platform), an
/// active flag enforced by the account-state guard, and the stored
/// refresh-token hash. Deletion is hard, unlike end-user accounts.
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

/// Public admin projection, role name attached
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub role_id: i64,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile plus the role's resource/access-level bindings, for the
/// console to render its own capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfileWithPermissions {
    #[serde(flatten)]
    pub profile: AdminProfile,
    pub permissions: Vec<ResourceAccess>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAccess {
    pub resource: String,
    pub access_level: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAdmin {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    pub role_id: i64,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdmin {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: Option<String>,
    pub role_id: Option<i64>,
    pub is_active: Option<bool>,
}

const ADMIN_COLUMNS: &str = "a.id, a.name, a.email, a.is_active, a.role_id, r.name AS role_name, \
     a.created_at, a.updated_at";

fn admin_from_row(row: &sqlx::sqlite::SqliteRow) -> AdminProfile {
    AdminProfile {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        is_active: row.get("is_active"),
        role_id: row.get("role_id"),
        role: row.get("role_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[derive(Clone)]
pub struct AdminsService {
    db: SqlitePool,
}

impl AdminsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn create(&self, data: NewAdmin) -> AppResult<AdminProfile> {
        data.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        self.check_email_free(&data.email, None).await?;
        self.check_role_exists(data.role_id).await?;

        let id = Uuid::new_v4().to_string();
        let password_hash = password::hash(&data.password)?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO admins (id, name, email, password_hash, is_active, role_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&password_hash)
        .bind(data.is_active.unwrap_or(true))
        .bind(data.role_id)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        self.find_one(&id).await
    }

    pub async fn find_all(&self, query: &ListQuery) -> AppResult<Paginated<AdminProfile>> {
        let where_sql = "WHERE (?1 = '' OR a.name LIKE ?1 OR a.email LIKE ?1)
             AND (?2 = '' OR r.name = ?2)";

        let pattern = query
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s))
            .unwrap_or_default();
        let role = query.role.clone().unwrap_or_default();

        let sort = query.sort_column(&["created_at", "name", "email"], "created_at");
        let list_sql = format!(
            "SELECT {} FROM admins a JOIN roles r ON r.id = a.role_id {}
             ORDER BY a.{} {} LIMIT ?3 OFFSET ?4",
            ADMIN_COLUMNS,
            where_sql,
            sort,
            query.order().as_sql()
        );
        let count_sql = format!(
            "SELECT COUNT(*) FROM admins a JOIN roles r ON r.id = a.role_id {}",
            where_sql
        );

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

        let data = rows.iter().map(admin_from_row).collect();
        Ok(Paginated::new(data, total, query.page(), query.limit()))
    }

    pub async fn find_one(&self, id: &str) -> AppResult<AdminProfile> {
        let sql = format!(
            "SELECT {} FROM admins a JOIN roles r ON r.id = a.role_id WHERE a.id = ?1",
            ADMIN_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Admin with id {} not found", id)))?;

        Ok(admin_from_row(&row))
    }

    /// Profile with the role's permission bindings attached
    pub async fn my_profile(&self, id: &str) -> AppResult<AdminProfileWithPermissions> {
        let profile = self.find_one(id).await?;

        let rows = sqlx::query(
            "SELECT p.resource, rp.access_level
             FROM role_permissions rp
             JOIN permissions p ON p.id = rp.permission_id
             WHERE rp.role_id = ?1
             ORDER BY p.resource",
        )
        .bind(profile.role_id)
        .fetch_all(&self.db)
        .await?;

        let permissions = rows
            .iter()
            .map(|row| ResourceAccess {
                resource: row.get("resource"),
                access_level: row.get("access_level"),
            })
            .collect();

        Ok(AdminProfileWithPermissions {
            profile,
            permissions,
        })
    }

    pub async fn update(&self, id: &str, data: UpdateAdmin) -> AppResult<AdminProfile> {
        data.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        self.find_one(id).await?;

        if let Some(ref email) = data.email {
            self.check_email_free(email, Some(id)).await?;
        }
        if let Some(role_id) = data.role_id {
            self.check_role_exists(role_id).await?;
        }

        let password_hash = match &data.password {
            Some(plain) => Some(password::hash(plain)?),
            None => None,
        };

        sqlx::query(
            "UPDATE admins SET
                name = COALESCE(?2, name),
                email = COALESCE(?3, email),
                password_hash = COALESCE(?4, password_hash),
                role_id = COALESCE(?5, role_id),
                is_active = COALESCE(?6, is_active),
                updated_at = ?7
             WHERE id = ?1",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&password_hash)
        .bind(data.role_id)
        .bind(data.is_active)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        self.find_one(id).await
    }

    /// Hard delete (admin accounts are not soft-deleted)
    pub async fn remove(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM admins WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Admin with id {} not found", id)));
        }
        Ok(())
    }

    /// Seed the bootstrap super-admin account when configured and
    /// absent. Idempotent across restarts.
    pub async fn ensure_super_admin(
        &self,
        email: &str,
        password_plain: &str,
        super_admin_role_id: i64,
    ) -> AppResult<()> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;

        if count > 0 {
            return Ok(());
        }

        let id = Uuid::new_v4().to_string();
        let password_hash = password::hash(password_plain)?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO admins (id, name, email, password_hash, is_active, role_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7)",
        )
        .bind(&id)
        .bind("Super Admin")
        .bind(email)
        .bind(&password_hash)
        .bind(super_admin_role_id)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        tracing::info!(email, "bootstrap super-admin account created");

        Ok(())
    }

    async fn check_email_free(&self, email: &str, exclude_id: Option<&str>) -> AppResult<()> {
        let count: i64 = match exclude_id {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM admins WHERE email = ?1 AND id != ?2")
                    .bind(email)
                    .bind(id)
                    .fetch_one(&self.db)
                    .await?
            }
            None => sqlx::query_scalar("SELECT COUNT(*) FROM admins WHERE email = ?1")
                .bind(email)
                .fetch_one(&self.db)
                .await?,
        };

        if count > 0 {
            return Err(AppError::BadRequest("Email is already in use".to_string()));
        }
        Ok(())
    }

    async fn check_role_exists(&self, role_id: i64) -> AppResult<()> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE id = ?1")
            .bind(role_id)
            .fetch_one(&self.db)
            .await?;

        if count == 0 {
            return Err(AppError::NotFound(format!(
                "Role with id {} not found",
                role_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PrincipalLookup for AdminsService {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<StoredCredentials>> {
        let row = sqlx::query(
            "SELECT a.id, a.name, a.email, a.password_hash, r.name AS role_name
             FROM admins a JOIN roles r ON r.id = a.role_id
             WHERE a.email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|row| StoredCredentials {
            principal: Principal {
                id: row.get("id"),
                name: row.get("name"),
                email: row.get("email"),
                role: Some(row.get("role_name")),
                realm: Realm::Admin,
            },
            password_hash: Some(row.get("password_hash")),
        }))
    }

    async fn refresh_token_hash(&self, id: &str) -> AppResult<Option<String>> {
        let hash: Option<Option<String>> =
            sqlx::query_scalar("SELECT refresh_token_hash FROM admins WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        Ok(hash.flatten())
    }

    async fn set_refresh_token_hash(&self, id: &str, hash: Option<String>) -> AppResult<()> {
        sqlx::query("UPDATE admins SET refresh_token_hash = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(hash)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;

    /// Admin-side DDL (roles, permissions, bindings, admins) shared
    /// by service tests
    pub async fn create_admin_tables(db: &SqlitePool) {
        for ddl in [
            r#"
            CREATE TABLE roles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )
            "#,
            r#"
            CREATE TABLE permissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource TEXT NOT NULL UNIQUE
            )
            "#,
            r#"
            CREATE TABLE role_permissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                role_id INTEGER NOT NULL REFERENCES roles (id),
                permission_id INTEGER NOT NULL REFERENCES permissions (id),
                access_level INTEGER NOT NULL,
                UNIQUE (role_id, permission_id)
            )
            "#,
            r#"
            CREATE TABLE admins (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                role_id INTEGER NOT NULL REFERENCES roles (id),
                refresh_token_hash TEXT,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            )
            "#,
        ] {
            sqlx::query(ddl).execute(db).await.unwrap();
        }
    }
}
