//! Token verification seam used by connections.

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("empty token")]
    EmptyToken,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub user_id: String,
    pub display_name: Option<String>,
}

pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}

/// Trusts the client: the token is taken as the user id.
pub struct AnonymousVerifier;

impl IdentityVerifier for AnonymousVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(VerifiedIdentity {
            user_id: format!("anon:{}", token),
            display_name: None,
        })
    }
}
