use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's id.
    pub sub: i32,
    /// Expiration, seconds since the epoch.
    pub exp: i64,
    /// Issue time, seconds since the epoch.
    pub iat: i64,
}

/// Signing secret and session lifetime, shared by the handlers and the middleware.
#[derive(Clone)]
pub struct AuthSettings {
    secret: String,
    session_ttl: Duration,
}

impl AuthSettings {
    pub fn new(secret: impl Into<String>, session_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }
}

impl From<&Config> for AuthSettings {
    fn from(config: &Config) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            Duration::days(config.session_ttl_days),
        )
    }
}

/// A freshly signed session token and the moment it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs a session token for `user_id` valid for the configured session lifetime.
pub fn generate_token(user_id: i32, settings: &AuthSettings) -> Result<IssuedToken, AppError> {
    let now = Utc::now();
    let expires_at = now
        .checked_add_signed(settings.session_ttl)
        .ok_or_else(|| AppError::InternalServerError("Session lifetime overflows".into()))?;

    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))?;

    Ok(IssuedToken {
        token,
        // Tokens carry whole seconds.
        expires_at: Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(expires_at),
    })
}

/// Checks signature and expiry and returns the decoded claims.
///
/// Any failure is reported as `AppError::Unauthorized`.
pub fn verify_token(token: &str, settings: &AuthSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(secret: &str) -> AuthSettings {
        AuthSettings::new(secret, Duration::days(7))
    }

    #[test]
    fn test_token_generation_and_verification() {
        let settings = settings("test_secret_for_gen_verify");
        let issued = generate_token(1, &settings).unwrap();
        let claims = verify_token(&issued.token, &settings).unwrap();

        assert_eq!(claims.sub, 1);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert_eq!(claims.exp - claims.iat, Duration::days(7).num_seconds());
    }

    #[test]
    fn test_token_expiration() {
        let expired = Claims {
            sub: 2,
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
            iat: (Utc::now() - Duration::days(8)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &expired,
            &EncodingKey::from_secret(b"test_secret_for_expiration"),
        )
        .unwrap();

        match verify_token(&token, &settings("test_secret_for_expiration")) {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("ExpiredSignature")),
            other => panic!("expected an expired-token error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_token_signature() {
        let issued = generate_token(3, &settings("one_secret")).unwrap();

        match verify_token(&issued.token, &settings("a_completely_different_secret")) {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("InvalidSignature")),
            other => panic!("expected a signature error, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_token() {
        assert!(matches!(
            verify_token("not-a-jwt", &settings("secret")),
            Err(AppError::Unauthorized(_))
        ));
    }
}
