/// Database bootstrap tests against a real on-disk SQLite file
use fitarena_backend::db::{self, DatabaseOptions};

#[tokio::test]
async fn test_pool_creation_and_migrations_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("fitarena.sqlite");

    // Parent directories are created on demand
    let pool = db::create_pool(&path, DatabaseOptions::default()).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    db::test_connection(&pool).await.unwrap();

    // The resource catalogue and the super-admin role are seeded
    let resources: Vec<String> = sqlx::query_scalar("SELECT resource FROM permissions ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(resources, vec!["admins", "roles", "users"]);

    let bindings: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM role_permissions rp
         JOIN roles r ON r.id = rp.role_id
         WHERE r.name = 'super-admin' AND rp.access_level = 7",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(bindings, 3);
}

#[tokio::test]
async fn test_migrations_are_idempotent_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fitarena.sqlite");

    let pool = db::create_pool(&path, DatabaseOptions::default()).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool.close().await;

    // Re-opening and re-running migrations must not duplicate seeds
    let pool = db::create_pool(&path, DatabaseOptions::default()).await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let permission_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(permission_count, 3);
}
