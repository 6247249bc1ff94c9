//! Identity token payload

use serde::{Deserialize, Serialize};

/// JWT claims carried by a player token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Stable user identity, used for pairing and rejoin checks
    pub sub: String,
    pub username: String,
    pub exp: usize,
    pub iat: usize,
}
