/// Password-reset flow
///
/// Three steps: request (store + mail a 6-digit OTP), verify (exchange
/// the OTP for a short-lived purpose-scoped token), complete (exchange
/// that token for a password change). The OTP is one-time: it is
/// cleared the moment it verifies. The reset token carries a purpose
/// claim and only its TTL bounds replay; nothing is persisted for it.
use crate::auth::password;
use crate::auth::tokens::{self, ResetClaims};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::mailer::Mailer;
use crate::users::UsersService;
use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::Arc;

/// Purpose claim value marking a token as usable only for completing
/// a reset
pub const RESET_PURPOSE: &str = "password-reset";

/// OTP validity window
const RESET_CODE_TTL_MINUTES: i64 = 10;
/// Reset token validity window
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

pub struct PasswordResetService {
    config: Arc<AppConfig>,
    users: Arc<UsersService>,
    mailer: Arc<Mailer>,
}

impl PasswordResetService {
    pub fn new(config: Arc<AppConfig>, users: Arc<UsersService>, mailer: Arc<Mailer>) -> Self {
        Self {
            config,
            users,
            mailer,
        }
    }

    /// Generate and mail a fresh OTP; a repeated request overwrites
    /// the previous code and expiry
    pub async fn request_reset(&self, email: &str) -> AppResult<()> {
        let user = self
            .users
            .find_record_by_email(email)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("User with this email does not exist".to_string())
            })?;

        let code = generate_otp_code();
        let expires_at = Utc::now() + Duration::minutes(RESET_CODE_TTL_MINUTES);

        self.users.set_reset_code(&user.id, &code, expires_at).await?;

        // Mail failure surfaces to the caller; the stored code stays
        // so a successful retry can still be verified
        self.mailer
            .send_password_reset_email(&user.email, &user.name, &code)
            .await?;

        tracing::info!(user = %user.id, "password reset code issued");

        Ok(())
    }

    /// Exchange a valid OTP for a purpose-scoped reset token. The code
    /// is cleared on success and cannot verify twice.
    pub async fn verify_code(&self, email: &str, code: &str) -> AppResult<String> {
        let user = self.users.find_record_by_email(email).await?;

        let user = match user {
            Some(u) if u.reset_code.as_deref() == Some(code) => u,
            _ => {
                return Err(AppError::BadRequest(
                    "The code you entered is incorrect".to_string(),
                ))
            }
        };

        let expires_at = user.reset_code_expires_at.ok_or_else(|| {
            AppError::BadRequest("The code you entered is incorrect".to_string())
        })?;
        if Utc::now() > expires_at {
            return Err(AppError::BadRequest(
                "The reset code has expired. Please request a new one".to_string(),
            ));
        }

        self.users.clear_reset_code(&user.id).await?;

        let claims = ResetClaims {
            sub: user.id.clone(),
            purpose: RESET_PURPOSE.to_string(),
        };
        let secret = &self.config.auth.user.access_secret;
        let token = tokens::issue(claims, Duration::minutes(RESET_TOKEN_TTL_MINUTES), secret)?;

        Ok(token)
    }

    /// Verify a reset token and persist the new password. A token
    /// issued for any other purpose is rejected even when validly
    /// signed and unexpired.
    pub async fn complete_reset(&self, reset_token: &str, new_password: &str) -> AppResult<()> {
        let secret = &self.config.auth.user.access_secret;
        let claims: ResetClaims = tokens::verify(reset_token, secret)?;

        if claims.purpose != RESET_PURPOSE {
            return Err(AppError::Unauthorized("Invalid token purpose".to_string()));
        }

        let hash = password::hash(new_password)?;
        self.users.set_password_hash(&claims.sub, &hash).await?;

        tracing::info!(user = %claims.sub, "password reset completed");

        Ok(())
    }
}

/// Random 6-digit numeric code
fn generate_otp_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}
