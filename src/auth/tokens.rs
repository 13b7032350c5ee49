/// Token issuing and verification
///
/// Signed, time-boxed HS256 tokens. The caller supplies the claims,
/// lifetime, and secret; which secret applies is decided upstream by
/// realm and token kind (four independent configurations). Issuing is
/// pure: no state is touched.
use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Wire form of a token payload: the caller's claims plus the
/// issued-at and expiry stamps added here
#[derive(Debug, Serialize, Deserialize)]
struct TimeBoxed<T> {
    #[serde(flatten)]
    claims: T,
    iat: i64,
    exp: i64,
}

/// Verification failure, kept distinct internally; callers that do
/// not care collapse both to Unauthorized via `From`
#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Unauthorized("Token has expired".to_string()),
            TokenError::Invalid => AppError::Unauthorized("Invalid token".to_string()),
        }
    }
}

/// Produce a signed token embedding `claims` with an expiry `ttl`
/// from now. Fails with a configuration error when the secret is
/// absent.
pub fn issue<T: Serialize>(claims: T, ttl: Duration, secret: &str) -> AppResult<String> {
    if secret.is_empty() {
        return Err(AppError::Config(
            "Token signing secret is not configured".to_string(),
        ));
    }

    let now = Utc::now().timestamp();
    let payload = TimeBoxed {
        claims,
        iat: now,
        exp: now + ttl.num_seconds(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &payload,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
}

/// Verify signature and expiry, returning the embedded claims. No
/// expiry leeway: a token past its exp always fails.
pub fn verify<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    match decode::<TimeBoxed<T>>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(data.claims.claims),
        Err(e) => match e.kind() {
            ErrorKind::ExpiredSignature => Err(TokenError::Expired),
            _ => Err(TokenError::Invalid),
        },
    }
}

/// Claims carried by access tokens in both realms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
}

/// Claims carried by refresh tokens. `jti` is unique per issuance and
/// leads the payload, so a rotated-out token never matches the hash
/// stored for its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub jti: String,
    pub sub: String,
    pub email: String,
}

/// Claims carried by the single-purpose password-reset token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: String,
    pub purpose: String,
}
