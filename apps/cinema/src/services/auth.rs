//! Credentials and bearer tokens.
//!
//! Passwords are stored as Argon2 PHC strings. Tokens are HS256 JWTs carrying
//! the user id and whether the user was staff when the token was issued.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::db::models::UserRole;
use crate::error::{AppError, Result};

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Valid Argon2 hash no password matches. Verified against when the email is
/// unknown so both paths cost the same.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$dGltaW5nYXR0YWNr$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// JWT claims for authentication tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub role: UserRole,
    /// Expiration (Unix seconds)
    pub exp: usize,
    /// Issued at (Unix seconds)
    pub iat: usize,
}

impl Claims {
    fn issue(user_id: i64, role: UserRole, ttl: Duration) -> Result<Self> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(format!("System time error: {}", e)))?
            .as_secs();
        let exp = now
            .checked_add(ttl.as_secs())
            .and_then(|exp| usize::try_from(exp).ok())
            .ok_or_else(|| AppError::Internal(format!("Token lifetime too large: {:?}", ttl)))?;

        Ok(Self {
            sub: user_id,
            role,
            iat: now as usize,
            exp,
        })
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

/// Hashes passwords and signs/validates tokens with one shared secret.
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    argon2: Argon2<'static>,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self::with_token_ttl(jwt_secret, DEFAULT_TOKEN_TTL)
    }

    pub fn with_token_ttl(jwt_secret: String, token_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_ttl,
            argon2: Argon2::default(),
        }
    }

    /// Returns the PHC string for `password` with a fresh salt.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Checks `password` against a stored PHC string.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash format: {}", e)))?;

        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Checks a login attempt. `stored_hash` is `None` when no account has the
    /// submitted email; the password is still run through Argon2.
    pub fn verify_credentials(&self, password: &str, stored_hash: Option<&str>) -> Result<bool> {
        match stored_hash {
            Some(hash) => self.verify_password(password, hash),
            None => {
                let _ = self.verify_password(password, DUMMY_HASH);
                Ok(false)
            }
        }
    }

    pub fn create_token(&self, user_id: i64, role: UserRole) -> Result<String> {
        let claims = Claims::issue(user_id, role, self.token_ttl)?;

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token creation failed: {}", e)))
    }

    /// Decodes and validates a token. Any failure is `Unauthorized`.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AppError::Unauthorized
            })
    }
}
