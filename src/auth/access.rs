/// Bitmask permission model and the permission evaluator
///
/// A role's access to a named resource is an integer mask combining
/// READ/WRITE/DELETE bits. The one place bit semantics live is
/// `has_all`; call sites never reimplement the check.
use crate::error::AppResult;
use sqlx::SqlitePool;

pub const READ: i64 = 1;
pub const WRITE: i64 = 2;
pub const DELETE: i64 = 4;
pub const FULL: i64 = READ | WRITE | DELETE;

/// Role name whose members bypass the bitmask entirely on the
/// endpoints gated by role identity (app-wide settings, maintenance)
pub const SUPER_ADMIN_ROLE: &str = "super-admin";

/// True when the stored mask is a superset of every required bit.
/// Overlap is not enough: requiring READ+WRITE demands both.
pub fn has_all(stored: i64, required: i64) -> bool {
    stored & required == required
}

/// True for masks representable by the three known bits
pub fn is_valid_level(level: i64) -> bool {
    (0..=FULL).contains(&level)
}

/// Computes whether an admin's role carries a required capability
/// over a named resource. Any unexpected failure during evaluation is
/// a denial, never an allow.
#[derive(Clone)]
pub struct PermissionEvaluator {
    db: SqlitePool,
}

impl PermissionEvaluator {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Whether the admin's role grants every bit of `required` on
    /// `resource`. Fail-closed: evaluation errors deny.
    pub async fn authorize(&self, admin_id: &str, resource: &str, required: i64) -> bool {
        match self.stored_level(admin_id, resource).await {
            Ok(Some(stored)) => has_all(stored, required),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(
                    admin_id,
                    resource,
                    "permission evaluation failed, denying: {}",
                    e
                );
                false
            }
        }
    }

    /// Whether the admin's role is the distinguished super-admin
    /// role. Role identity, not permission bits: the two paths are
    /// deliberately distinct. Fail-closed.
    pub async fn is_super_admin(&self, admin_id: &str) -> bool {
        let result: AppResult<Option<String>> = async {
            let name = sqlx::query_scalar(
                "SELECT r.name FROM admins a JOIN roles r ON r.id = a.role_id WHERE a.id = ?1",
            )
            .bind(admin_id)
            .fetch_optional(&self.db)
            .await?;
            Ok(name)
        }
        .await;

        match result {
            Ok(Some(name)) => name == SUPER_ADMIN_ROLE,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(admin_id, "super-admin check failed, denying: {}", e);
                false
            }
        }
    }

    /// Stored access level for (admin's role, resource); None when the
    /// role holds no binding for the resource
    async fn stored_level(&self, admin_id: &str, resource: &str) -> AppResult<Option<i64>> {
        let level = sqlx::query_scalar(
            "SELECT rp.access_level
             FROM admins a
             JOIN role_permissions rp ON rp.role_id = a.role_id
             JOIN permissions p ON p.id = rp.permission_id
             WHERE a.id = ?1 AND p.resource = ?2",
        )
        .bind(admin_id)
        .bind(resource)
        .fetch_optional(&self.db)
        .await?;

        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_bits() {
        assert_eq!(READ, 1);
        assert_eq!(WRITE, 2);
        assert_eq!(DELETE, 4);
        assert_eq!(FULL, 7);
    }

    #[test]
    fn test_mask_monotonicity_for_read() {
        for stored in 0..=7 {
            let expected = [1, 3, 5, 7].contains(&stored);
            assert_eq!(has_all(stored, READ), expected, "stored={}", stored);
        }
    }

    #[test]
    fn test_composite_requirement_needs_every_bit() {
        for stored in 0..=7 {
            let expected = [3, 7].contains(&stored);
            assert_eq!(
                has_all(stored, READ | WRITE),
                expected,
                "stored={}",
                stored
            );
        }
    }

    #[test]
    fn test_overlap_is_not_enough() {
        // WRITE alone overlaps READ+WRITE but does not satisfy it
        assert!(!has_all(WRITE, READ | WRITE));
    }

    #[test]
    fn test_level_bounds() {
        assert!(is_valid_level(0));
        assert!(is_valid_level(7));
        assert!(!is_valid_level(8));
        assert!(!is_valid_level(-1));
    }

    async fn seeded_pool() -> SqlitePool {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE roles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE permissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource TEXT NOT NULL UNIQUE
            );
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE role_permissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                role_id INTEGER NOT NULL,
                permission_id INTEGER NOT NULL,
                access_level INTEGER NOT NULL,
                UNIQUE (role_id, permission_id)
            );
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE admins (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                role_id INTEGER NOT NULL
            );
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query("INSERT INTO roles (id, name) VALUES (1, 'ops'), (2, 'super-admin')")
            .execute(&db)
            .await
            .unwrap();
        sqlx::query("INSERT INTO permissions (id, resource) VALUES (1, 'users'), (2, 'roles')")
            .execute(&db)
            .await
            .unwrap();
        // ops: READ+WRITE on users, nothing on roles
        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id, access_level) VALUES (1, 1, 3)",
        )
        .execute(&db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO admins (id, name, email, password_hash, role_id)
             VALUES ('ops-admin', 'Ops', 'ops@fitarena.app', 'x', 1),
                    ('root-admin', 'Root', 'root@fitarena.app', 'x', 2)",
        )
        .execute(&db)
        .await
        .unwrap();

        db
    }

    #[tokio::test]
    async fn test_authorize_against_stored_role() {
        let evaluator = PermissionEvaluator::new(seeded_pool().await);

        // ops holds accessLevel 3 on "users"
        assert!(evaluator.authorize("ops-admin", "users", WRITE).await);
        assert!(evaluator.authorize("ops-admin", "users", READ | WRITE).await);
        assert!(!evaluator.authorize("ops-admin", "users", DELETE).await);
        // No binding for the resource denies
        assert!(!evaluator.authorize("ops-admin", "roles", READ).await);
        // Unknown admin denies
        assert!(!evaluator.authorize("ghost", "users", READ).await);
    }

    #[tokio::test]
    async fn test_super_admin_is_role_identity_not_bits() {
        let evaluator = PermissionEvaluator::new(seeded_pool().await);

        assert!(evaluator.is_super_admin("root-admin").await);
        assert!(!evaluator.is_super_admin("ops-admin").await);
        assert!(!evaluator.is_super_admin("ghost").await);
        // root-admin's role carries no role_permissions rows at all,
        // so the bitmask path would deny it
        assert!(!evaluator.authorize("root-admin", "users", READ).await);
    }

    #[tokio::test]
    async fn test_evaluation_errors_deny() {
        // Pool without any of the expected tables: every query errors
        let db = SqlitePool::connect(":memory:").await.unwrap();
        let evaluator = PermissionEvaluator::new(db);

        assert!(!evaluator.authorize("ops-admin", "users", READ).await);
        assert!(!evaluator.is_super_admin("ops-admin").await);
    }
}
