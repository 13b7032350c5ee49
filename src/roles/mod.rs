/// Role and permission administration
///
/// Roles are named sets of (resource, access level) bindings owned by
/// the admin realm. Permissions are global named resources; the join
/// rows carry the bitmask. Bulk replacement of a role's bindings is
/// transactional so a failure leaves the prior set intact.
use crate::auth::access;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use validator::Validate;

/// A permission row: a protected resource by name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: i64,
    pub resource: String,
}

/// One binding inside a role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleGrant {
    pub permission_id: i64,
    pub resource: String,
    pub access_level: i64,
}

/// Role with its bindings, as listed/fetched
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleView {
    pub id: i64,
    pub name: String,
    pub permissions: Vec<RoleGrant>,
}

/// Requested binding when creating/updating a role
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    pub permission_id: i64,
    pub access_level: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewRole {
    #[validate(length(min = 1, message = "Role name cannot be empty"))]
    pub name: String,
    pub permissions: Vec<GrantRequest>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRole {
    #[validate(length(min = 1, message = "Role name cannot be empty"))]
    pub name: Option<String>,
    /// When present, replaces the role's entire binding set
    pub permissions: Option<Vec<GrantRequest>>,
}

#[derive(Clone)]
pub struct RolesService {
    db: SqlitePool,
}

impl RolesService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn create(&self, data: NewRole) -> AppResult<RoleView> {
        data.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        self.validate_grants(&data.permissions).await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE name = ?1")
            .bind(&data.name)
            .fetch_one(&self.db)
            .await?;
        if existing > 0 {
            return Err(AppError::BadRequest("Role name already exists".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let result = sqlx::query("INSERT INTO roles (name) VALUES (?1)")
            .bind(&data.name)
            .execute(&mut *tx)
            .await?;
        let role_id = result.last_insert_rowid();

        for grant in &data.permissions {
            sqlx::query(
                "INSERT INTO role_permissions (role_id, permission_id, access_level)
                 VALUES (?1, ?2, ?3)",
            )
            .bind(role_id)
            .bind(grant.permission_id)
            .bind(grant.access_level)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_one(role_id).await
    }

    pub async fn find_all(&self) -> AppResult<Vec<RoleView>> {
        let roles = sqlx::query("SELECT id, name FROM roles ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        let mut views = Vec::with_capacity(roles.len());
        for row in roles {
            let id: i64 = row.get("id");
            views.push(RoleView {
                id,
                name: row.get("name"),
                permissions: self.grants_for(id).await?,
            });
        }

        Ok(views)
    }

    /// The global resource catalogue
    pub async fn resources(&self) -> AppResult<Vec<Resource>> {
        let rows = sqlx::query("SELECT id, resource FROM permissions ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .iter()
            .map(|row| Resource {
                id: row.get("id"),
                resource: row.get("resource"),
            })
            .collect())
    }

    pub async fn find_one(&self, id: i64) -> AppResult<RoleView> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role with id {} not found", id)))?;

        Ok(RoleView {
            id,
            name: row.get("name"),
            permissions: self.grants_for(id).await?,
        })
    }

    /// Rename and/or replace the binding set. The delete-then-recreate
    /// of bindings runs in one transaction.
    pub async fn update(&self, id: i64, data: UpdateRole) -> AppResult<RoleView> {
        data.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        self.find_one(id).await?;

        if let Some(ref grants) = data.permissions {
            self.validate_grants(grants).await?;
        }

        let mut tx = self.db.begin().await?;

        if let Some(ref name) = data.name {
            sqlx::query("UPDATE roles SET name = ?2 WHERE id = ?1")
                .bind(id)
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(ref grants) = data.permissions {
            sqlx::query("DELETE FROM role_permissions WHERE role_id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            for grant in grants {
                sqlx::query(
                    "INSERT INTO role_permissions (role_id, permission_id, access_level)
                     VALUES (?1, ?2, ?3)",
                )
                .bind(id)
                .bind(grant.permission_id)
                .bind(grant.access_level)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        self.find_one(id).await
    }

    /// Delete a role; its bindings go first, in the same transaction
    pub async fn remove(&self, id: i64) -> AppResult<()> {
        self.find_one(id).await?;

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM roles WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn grants_for(&self, role_id: i64) -> AppResult<Vec<RoleGrant>> {
        let rows = sqlx::query(
            "SELECT rp.permission_id, p.resource, rp.access_level
             FROM role_permissions rp
             JOIN permissions p ON p.id = rp.permission_id
             WHERE rp.role_id = ?1
             ORDER BY p.resource",
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RoleGrant {
                permission_id: row.get("permission_id"),
                resource: row.get("resource"),
                access_level: row.get("access_level"),
            })
            .collect())
    }

    /// Every referenced permission must exist, every level must be a
    /// known bit combination, and no permission may appear twice
    async fn validate_grants(&self, grants: &[GrantRequest]) -> AppResult<()> {
        for grant in grants {
            if !access::is_valid_level(grant.access_level) {
                return Err(AppError::BadRequest(format!(
                    "Access level {} is out of range",
                    grant.access_level
                )));
            }
        }

        let mut ids: Vec<i64> = grants.iter().map(|g| g.permission_id).collect();
        ids.sort_unstable();
        let unique_before = ids.len();
        ids.dedup();
        if ids.len() != unique_before {
            return Err(AppError::BadRequest(
                "Duplicate permission IDs in request".to_string(),
            ));
        }

        for permission_id in &ids {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions WHERE id = ?1")
                .bind(permission_id)
                .fetch_one(&self.db)
                .await?;
            if count == 0 {
                return Err(AppError::BadRequest(
                    "One or more permission IDs are invalid".to_string(),
                ));
            }
        }

        Ok(())
    }
}
