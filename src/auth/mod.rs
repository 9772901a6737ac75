pub mod credentials;
pub mod extractors;
pub mod gate;
pub mod middleware;
pub mod password;
pub mod session;
pub mod token;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::Principal;

pub use credentials::{CredentialError, CredentialVerifier};
pub use extractors::AuthenticatedPrincipal;
pub use gate::{AuthorizationGate, Rejection, RequestCredentials, ResolvePrincipal};
pub use middleware::AuthMiddleware;
pub use session::SessionAuthenticator;
pub use token::{Claims, IssuedToken, TokenAuthenticator, TokenError};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "neotask_session";

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Payload for `POST /api/auth/signup`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Between 3 and 32 characters: letters, digits, underscores or hyphens.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    /// bcrypt only reads the first 72 bytes, so longer passwords are refused.
    #[validate(length(min = 1, max = 72), custom = "validate_password_bytes")]
    pub password: String,
}

/// Payload for `POST /api/auth/login` and `POST /api/auth/session`.
/// Not validated: a malformed username simply fails to match.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned by a successful bearer-token login.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    /// Always `Bearer`.
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub username: String,
}

/// Returned by signup, session login and `GET /api/auth/me`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PrincipalResponse {
    pub id: Uuid,
    pub username: String,
}

impl From<Principal> for PrincipalResponse {
    fn from(principal: Principal) -> Self {
        Self {
            id: principal.id,
            username: principal.username,
        }
    }
}

fn validate_password_bytes(password: &str) -> Result<(), validator::ValidationError> {
    if password.len() > 72 {
        return Err(validator::ValidationError::new("password_too_long"));
    }
    Ok(())
}
