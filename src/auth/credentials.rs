/// Credential validation
use crate::auth::password;
use crate::auth::principal::{Principal, PrincipalLookup};
use crate::auth::realm::Realm;
use crate::error::{AppError, AppResult};
use std::sync::Arc;

/// Checks email/password pairs against the stored hashes of either
/// realm. Every failure collapses to the same generic error so the
/// response never reveals whether the email exists.
pub struct CredentialValidator {
    admins: Arc<dyn PrincipalLookup>,
    users: Arc<dyn PrincipalLookup>,
}

impl CredentialValidator {
    pub fn new(admins: Arc<dyn PrincipalLookup>, users: Arc<dyn PrincipalLookup>) -> Self {
        Self { admins, users }
    }

    /// Account store for a realm
    pub fn directory(&self, realm: Realm) -> &Arc<dyn PrincipalLookup> {
        match realm {
            Realm::Admin => &self.admins,
            Realm::User => &self.users,
        }
    }

    /// Validate a login attempt, returning the hash-free projection
    /// on success
    pub async fn validate(
        &self,
        realm: Realm,
        email: &str,
        password_plain: &str,
    ) -> AppResult<Principal> {
        let stored = self
            .directory(realm)
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let digest = stored
            .password_hash
            .as_deref()
            .ok_or(AppError::InvalidCredentials)?;

        if !password::verify(password_plain, digest) {
            return Err(AppError::InvalidCredentials);
        }

        Ok(stored.principal)
    }
}
