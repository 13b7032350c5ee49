/// Account-state guard
///
/// Runs after token verification on every protected request. The
/// admin realm re-fetches the account so a deactivation or deletion
/// takes effect immediately, before any still-valid access token
/// expires. The user realm is a pass-through: inactive or soft-deleted
/// end-users are not rejected here, only at refresh time once their
/// stored refresh hash is cleared. The asymmetry is intentional and
/// pinned by tests; do not "fix" it.
use crate::auth::realm::Realm;
use crate::error::{AppError, AppResult};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AccountStateGuard {
    db: SqlitePool,
}

impl AccountStateGuard {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Reject when the authenticated principal may no longer act
    pub async fn check(&self, realm: Realm, principal_id: &str) -> AppResult<()> {
        match realm {
            Realm::Admin => {
                let is_active: Option<bool> =
                    sqlx::query_scalar("SELECT is_active FROM admins WHERE id = ?1")
                        .bind(principal_id)
                        .fetch_optional(&self.db)
                        .await?;

                match is_active {
                    None => Err(AppError::Forbidden("Account no longer exists".to_string())),
                    Some(false) => {
                        Err(AppError::Forbidden("Account is inactive".to_string()))
                    }
                    Some(true) => Ok(()),
                }
            }
            Realm::User => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool_with_admins() -> SqlitePool {
        let db = SqlitePool::connect(":memory:").await.unwrap();

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

        sqlx::query(
            "INSERT INTO admins (id, name, email, password_hash, is_active, role_id)
             VALUES ('active-admin', 'A', 'a@fitarena.app', 'x', 1, 1),
                    ('disabled-admin', 'B', 'b@fitarena.app', 'x', 0, 1)",
        )
        .execute(&db)
        .await
        .unwrap();

        db
    }

    #[tokio::test]
    async fn test_active_admin_passes() {
        let guard = AccountStateGuard::new(pool_with_admins().await);
        assert!(guard.check(Realm::Admin, "active-admin").await.is_ok());
    }

    #[tokio::test]
    async fn test_inactive_admin_is_forbidden() {
        let guard = AccountStateGuard::new(pool_with_admins().await);
        let err = guard
            .check(Realm::Admin, "disabled-admin")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_deleted_admin_is_forbidden() {
        let guard = AccountStateGuard::new(pool_with_admins().await);
        let err = guard.check(Realm::Admin, "gone-admin").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_user_realm_is_a_pass_through() {
        // No users table exists in this pool; the user path must not
        // even consult the store
        let guard = AccountStateGuard::new(pool_with_admins().await);
        assert!(guard.check(Realm::User, "any-user").await.is_ok());
    }
}
