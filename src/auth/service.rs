/// Session orchestration: login, refresh, logout
///
/// Issues realm-scoped access+refresh pairs and tracks the refresh
/// token as a bcrypt hash on the principal row. Exactly one refresh
/// hash is stored per principal, so concurrent logins both succeed
/// but each invalidates the other's prior refresh token
/// (last-write-wins), and clearing the hash revokes every session.
use crate::auth::credentials::CredentialValidator;
use crate::auth::password;
use crate::auth::principal::Principal;
use crate::auth::realm::Realm;
use crate::auth::tokens::{self, RefreshClaims, SessionClaims};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Access + refresh pair handed to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    config: Arc<AppConfig>,
    validator: CredentialValidator,
}

impl AuthService {
    pub fn new(config: Arc<AppConfig>, validator: CredentialValidator) -> Self {
        Self { config, validator }
    }

    /// Validate credentials and open a session in the given realm
    pub async fn login(
        &self,
        realm: Realm,
        email: &str,
        password_plain: &str,
    ) -> AppResult<(Principal, TokenPair)> {
        let principal = self.validator.validate(realm, email, password_plain).await?;
        let tokens = self.issue_pair(realm, &principal.id, &principal.email).await?;

        tracing::info!(realm = %realm, principal = %principal.id, "login");

        Ok((principal, tokens))
    }

    /// Open a session without a password check, for principals that
    /// just proved their identity another way (federated login)
    pub async fn establish_session(
        &self,
        realm: Realm,
        principal_id: &str,
        email: &str,
    ) -> AppResult<TokenPair> {
        self.issue_pair(realm, principal_id, email).await
    }

    /// Exchange a refresh token for a fresh pair. Valid only while
    /// its hash matches the one stored on the principal; rotation
    /// replaces that hash, retiring the presented token.
    pub async fn refresh(&self, realm: Realm, raw_token: &str) -> AppResult<TokenPair> {
        let secret = &self.config.auth.realm(realm).refresh_secret;
        let claims: RefreshClaims = tokens::verify(raw_token, secret)?;

        let stored = self
            .validator
            .directory(realm)
            .refresh_token_hash(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session has been revoked".to_string()))?;

        if !password::verify(raw_token, &stored) {
            return Err(AppError::Unauthorized(
                "Refresh token no longer valid".to_string(),
            ));
        }

        self.issue_pair(realm, &claims.sub, &claims.email).await
    }

    /// Revoke all of a principal's sessions
    pub async fn logout(&self, realm: Realm, principal_id: &str) -> AppResult<()> {
        self.validator
            .directory(realm)
            .set_refresh_token_hash(principal_id, None)
            .await?;

        tracing::info!(realm = %realm, principal = %principal_id, "logout");

        Ok(())
    }

    /// Issue an access+refresh pair and store the refresh hash
    async fn issue_pair(
        &self,
        realm: Realm,
        principal_id: &str,
        email: &str,
    ) -> AppResult<TokenPair> {
        let cfg = self.config.auth.realm(realm);

        let access_token = tokens::issue(
            SessionClaims {
                sub: principal_id.to_string(),
                email: email.to_string(),
            },
            Duration::seconds(cfg.access_ttl_secs),
            &cfg.access_secret,
        )?;
        // The fresh jti sits at the front of the payload, inside the
        // prefix bcrypt reads when the token is hashed for storage
        let refresh_token = tokens::issue(
            RefreshClaims {
                jti: Uuid::new_v4().to_string(),
                sub: principal_id.to_string(),
                email: email.to_string(),
            },
            Duration::seconds(cfg.refresh_ttl_secs),
            &cfg.refresh_secret,
        )?;

        let hash = password::hash(&refresh_token)?;
        self.validator
            .directory(realm)
            .set_refresh_token_hash(principal_id, Some(hash))
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
