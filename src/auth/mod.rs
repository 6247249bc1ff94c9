//! Player identity
//!
//! A connection authenticates with a bearer token before queueing. The
//! verifier behind that step is pluggable:
//! - `JwtManager` checks HS256 tokens signed with the server secret
//! - `AnonymousVerifier` accepts any non-empty token as the identity itself

pub mod identity;
pub mod jwt;
pub mod models;

pub use identity::{AnonymousVerifier, AuthError, IdentityVerifier, VerifiedIdentity};
pub use jwt::{JwtConfig, JwtManager};
pub use models::Claims;
