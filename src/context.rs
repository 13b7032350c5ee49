/// Application context and dependency wiring
use crate::{
    admins::AdminsService,
    auth::{
        access::PermissionEvaluator, AccountStateGuard, AuthService, CredentialValidator,
        IdentityLinker, PasswordResetService, PrincipalLookup,
    },
    config::AppConfig,
    db,
    error::AppResult,
    mailer::Mailer,
    roles::RolesService,
    settings::SettingsService,
    users::UsersService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub db: SqlitePool,
    pub admins: Arc<AdminsService>,
    pub users: Arc<UsersService>,
    pub roles: Arc<RolesService>,
    pub settings: Arc<SettingsService>,
    pub auth: Arc<AuthService>,
    pub reset: Arc<PasswordResetService>,
    pub linker: Arc<IdentityLinker>,
    pub guard: AccountStateGuard,
    pub evaluator: PermissionEvaluator,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        // Fail fast on broken auth configuration
        config.validate()?;

        let db = db::create_pool(&config.database.path, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let config = Arc::new(config);

        Self::from_parts(config, db).await
    }

    /// Wire services over an existing pool; the pool must already be
    /// migrated. Split out so tests can run against in-memory
    /// databases.
    pub async fn from_parts(config: Arc<AppConfig>, db: SqlitePool) -> AppResult<Self> {
        let admins = Arc::new(AdminsService::new(db.clone()));
        let users = Arc::new(UsersService::new(db.clone()));
        let roles = Arc::new(RolesService::new(db.clone()));
        let settings = Arc::new(SettingsService::new(db.clone()));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        let validator = CredentialValidator::new(
            Arc::clone(&admins) as Arc<dyn PrincipalLookup>,
            Arc::clone(&users) as Arc<dyn PrincipalLookup>,
        );
        let auth = Arc::new(AuthService::new(Arc::clone(&config), validator));
        let reset = Arc::new(PasswordResetService::new(
            Arc::clone(&config),
            Arc::clone(&users),
            Arc::clone(&mailer),
        ));
        let linker = Arc::new(IdentityLinker::new(Arc::clone(&users)));
        let guard = AccountStateGuard::new(db.clone());
        let evaluator = PermissionEvaluator::new(db.clone());

        let ctx = Self {
            config,
            db,
            admins,
            users,
            roles,
            settings,
            auth,
            reset,
            linker,
            guard,
            evaluator,
            mailer,
        };

        ctx.bootstrap_super_admin().await?;

        Ok(ctx)
    }

    /// Seed the configured super-admin account, if any
    async fn bootstrap_super_admin(&self) -> AppResult<()> {
        let (Some(email), Some(password)) = (
            self.config.bootstrap.super_admin_email.as_deref(),
            self.config.bootstrap.super_admin_password.as_deref(),
        ) else {
            tracing::debug!("no bootstrap super-admin configured");
            return Ok(());
        };

        let role_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM roles WHERE name = 'super-admin'")
                .fetch_optional(&self.db)
                .await?;

        match role_id {
            Some(role_id) => self.admins.ensure_super_admin(email, password, role_id).await,
            None => {
                tracing::warn!("super-admin role missing, skipping bootstrap account");
                Ok(())
            }
        }
    }
}
