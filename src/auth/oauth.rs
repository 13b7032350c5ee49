/// Federated identity linking
///
/// Providers run their own handshake upstream and hand the core a
/// normalized profile. Reconciliation order: by external id, then by
/// email (attach the id to the existing account), otherwise create a
/// minimal account whose profile still needs completing. Callers get
/// back whether the account is new so they can route first-time
/// sign-ins through profile completion.
use crate::error::{AppError, AppResult};
use crate::users::{ExternalIdColumn, UserProfile, UsersService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Facebook,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Facebook => "facebook",
        }
    }

    fn column(&self) -> ExternalIdColumn {
        match self {
            Provider::Google => ExternalIdColumn::Google,
            Provider::Facebook => ExternalIdColumn::Facebook,
        }
    }
}

pub struct IdentityLinker {
    users: Arc<UsersService>,
}

impl IdentityLinker {
    pub fn new(users: Arc<UsersService>) -> Self {
        Self { users }
    }

    /// Reconcile a provider profile to a local account. Returns the
    /// account and whether it was created by this call.
    pub async fn link_or_create(
        &self,
        provider: Provider,
        external_id: &str,
        email: Option<&str>,
        name: &str,
    ) -> AppResult<(UserProfile, bool)> {
        let email = email.ok_or_else(|| match provider {
            Provider::Facebook => AppError::Unauthorized(
                "Facebook account must have a public email".to_string(),
            ),
            Provider::Google => {
                AppError::Unauthorized("Google account must have an email".to_string())
            }
        })?;

        // Already linked
        if let Some(user) = self
            .users
            .find_by_external_id(provider.column(), external_id)
            .await?
        {
            return Ok((user, false));
        }

        // Known email: attach the identity to the existing account
        if let Some(record) = self.users.find_record_by_email(email).await? {
            self.users
                .link_external_id(&record.id, provider.column(), external_id)
                .await?;
            let user = self.users.find_one(&record.id).await?;

            tracing::info!(user = %user.id, provider = provider.as_str(), "linked federated identity");

            return Ok((user, false));
        }

        // Fresh account, profile completion pending
        let (google_id, facebook_id) = match provider {
            Provider::Google => (Some(external_id), None),
            Provider::Facebook => (None, Some(external_id)),
        };
        let user = self
            .users
            .create_federated(email, name, google_id, facebook_id)
            .await?;

        tracing::info!(user = %user.id, provider = provider.as_str(), "created account from federated identity");

        Ok((user, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::test_support::create_users_table;
    use crate::users::{NewUser, STATUS_PENDING};
    use sqlx::SqlitePool;

    async fn linker() -> (IdentityLinker, Arc<UsersService>) {
        let db = SqlitePool::connect(":memory:").await.unwrap();
        create_users_table(&db).await;
        let users = Arc::new(UsersService::new(db));
        (IdentityLinker::new(Arc::clone(&users)), users)
    }

    #[tokio::test]
    async fn test_creates_pending_account_for_unknown_identity() {
        let (linker, _) = linker().await;

        let (user, is_new) = linker
            .link_or_create(Provider::Google, "g-123", Some("new@x.com"), "New Person")
            .await
            .unwrap();

        assert!(is_new);
        assert_eq!(user.status, STATUS_PENDING);
        assert_eq!(user.email, "new@x.com");
    }

    #[tokio::test]
    async fn test_second_call_is_idempotent() {
        let (linker, _) = linker().await;

        let (first, first_new) = linker
            .link_or_create(Provider::Google, "g-123", Some("new@x.com"), "New Person")
            .await
            .unwrap();
        let (second, second_new) = linker
            .link_or_create(Provider::Google, "g-123", Some("new@x.com"), "New Person")
            .await
            .unwrap();

        assert!(first_new);
        assert!(!second_new);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_matching_email_links_existing_account() {
        let (linker, users) = linker().await;
        let existing = users
            .create(NewUser {
                email: "a@x.com".to_string(),
                password: "Sup3rSecret".to_string(),
                name: "Alex".to_string(),
                username: "alex".to_string(),
                phone: None,
                dob: None,
                gender: None,
                height_cm: None,
                weight_kg: None,
                address: None,
                role: None,
            })
            .await
            .unwrap();

        let (linked, is_new) = linker
            .link_or_create(Provider::Facebook, "fb-9", Some("a@x.com"), "Alex")
            .await
            .unwrap();

        assert!(!is_new);
        assert_eq!(linked.id, existing.id);

        // And the identity now resolves directly
        let (again, again_new) = linker
            .link_or_create(Provider::Facebook, "fb-9", Some("a@x.com"), "Alex")
            .await
            .unwrap();
        assert!(!again_new);
        assert_eq!(again.id, existing.id);
    }

    #[tokio::test]
    async fn test_facebook_without_email_is_rejected() {
        let (linker, _) = linker().await;

        let err = linker
            .link_or_create(Provider::Facebook, "fb-9", None, "No Email")
            .await
            .unwrap_err();

        match err {
            AppError::Unauthorized(msg) => assert!(msg.contains("public email")),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_providers_do_not_collide() {
        let (linker, _) = linker().await;

        let (google_user, _) = linker
            .link_or_create(Provider::Google, "shared-id", Some("g@x.com"), "G")
            .await
            .unwrap();
        let (facebook_user, _) = linker
            .link_or_create(Provider::Facebook, "shared-id", Some("f@x.com"), "F")
            .await
            .unwrap();

        assert_ne!(google_user.id, facebook_user.id);
    }
}
