/// Principal types and the lookup seam between the auth core and the
/// realm account stores
///
/// The auth core never imports the admins/users services directly;
/// each implements `PrincipalLookup` and is injected. This keeps the
/// dependency one-way and lets the core be tested against in-memory
/// fakes.
use crate::auth::realm::Realm;
use crate::error::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Public-safe projection of an authenticated actor; never carries a
/// password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Option<String>,
    pub realm: Realm,
}

/// A principal as loaded for credential checks, hash included. Stays
/// inside the auth core; only the projection leaves.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub principal: Principal,
    /// None for accounts created through a federated identity that
    /// never set a local password
    pub password_hash: Option<String>,
}

/// Narrow account-store capability consumed by the auth core
#[async_trait]
pub trait PrincipalLookup: Send + Sync {
    /// Look up login credentials by email. `Ok(None)` when no such
    /// account exists; soft-deleted accounts do not match.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<StoredCredentials>>;

    /// Currently stored refresh-token hash for a principal, if any
    async fn refresh_token_hash(&self, id: &str) -> AppResult<Option<String>>;

    /// Replace the stored refresh-token hash; `None` revokes all
    /// sessions
    async fn set_refresh_token_hash(&self, id: &str, hash: Option<String>) -> AppResult<()>;
}
