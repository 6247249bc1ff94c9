//! JWT token handling

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};

use super::identity::{AuthError, IdentityVerifier, VerifiedIdentity};
use super::models::Claims;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    secret: String,
    expiration_hours: u64,
}

impl JwtConfig {
    pub fn new(secret: String, expiration_hours: u64) -> Self {
        Self {
            secret,
            expiration_hours,
        }
    }

    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| "default-secret-change-me".to_string());
        let expiration_hours = std::env::var("JWT_EXPIRATION_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);
        Self::new(secret, expiration_hours)
    }
}

/// JWT manager
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    /// Create a new JWT token for a player
    pub fn create_token(
        &self,
        user_id: &str,
        username: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp().max(0) as usize;
        let expiration = now + (self.config.expiration_hours as usize * 3600);

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: expiration,
            iat: now,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
    }

    /// Verify and decode a JWT token
    pub fn verify_token(&self, token: &str) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &Validation::default(),
        )
    }
}

impl IdentityVerifier for JwtManager {
    fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let data = self.verify_token(token)?;
        Ok(VerifiedIdentity {
            user_id: data.claims.sub,
            display_name: Some(data.claims.username),
        })
    }
}
