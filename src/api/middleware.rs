/// Authentication and authorization middleware
///
/// Protected routers run an explicit pipeline: `authenticate` (realm
/// resolution, token verification) then `enforce_account_state` (the
/// post-auth guard). Authorization is per-route, through
/// `require_access` / `require_super_admin` in the handlers. Each
/// stage is a plain function with a pass/fail outcome.
use crate::{
    auth::realm::Realm,
    auth::tokens::{self, SessionClaims},
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

/// Authenticated request context, inserted by `authenticate`
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub realm: Realm,
    pub principal_id: String,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSession>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Verify the access token under the secret of the realm the request
/// path resolves to, and attach the session to the request. The realm
/// is decided before the token is opened; claims never choose the
/// secret.
pub async fn authenticate(
    State(ctx): State<AppContext>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let realm = Realm::from_path(req.uri().path());

    let token = extract_bearer_token(req.headers())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let secret = &ctx.config.auth.realm(realm).access_secret;
    let claims: SessionClaims = tokens::verify(&token, secret)?;

    req.extensions_mut().insert(AuthSession {
        realm,
        principal_id: claims.sub,
        email: claims.email,
    });

    Ok(next.run(req).await)
}

/// Reject authenticated requests whose account may no longer act
pub async fn enforce_account_state(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(session) = req.extensions().get::<AuthSession>() {
        ctx.guard.check(session.realm, &session.principal_id).await?;
    }

    Ok(next.run(req).await)
}

/// Per-route bitmask authorization for admin endpoints
pub async fn require_access(
    ctx: &AppContext,
    session: &AuthSession,
    resource: &str,
    required_level: i64,
) -> AppResult<()> {
    if session.realm != Realm::Admin {
        return Err(AppError::Forbidden("Admin realm required".to_string()));
    }

    if ctx
        .evaluator
        .authorize(&session.principal_id, resource, required_level)
        .await
    {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Insufficient permissions for {} (required level: {})",
            resource, required_level
        )))
    }
}

/// Role-identity gate for the endpoints reserved to the super-admin
/// role; deliberately not a bitmask check
pub async fn require_super_admin(ctx: &AppContext, session: &AuthSession) -> AppResult<()> {
    if session.realm != Realm::Admin {
        return Err(AppError::Forbidden("Admin realm required".to_string()));
    }

    if ctx.evaluator.is_super_admin(&session.principal_id).await {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only super-admin can perform this action".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc123"));

        let mut bare = HeaderMap::new();
        bare.insert("authorization", "abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&bare), None);

        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }
}
