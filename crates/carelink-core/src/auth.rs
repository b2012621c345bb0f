//! # Auth Primitives
//!
//! Password hashing and signed tokens. Both are pure functions of their
//! inputs plus the clock, so the API layer can test them without a server.
//!
//! ## Password hashes
//!
//! `pbkdf2-sha256$<iterations>$<salt>$<hash>` with a random 16-byte salt.
//! Verification reads the iteration count from the stored hash.
//!
//! ## Tokens
//!
//! `base64url(claims JSON).base64url(HMAC-SHA256(claims part))`. Every
//! rejection (missing, malformed, tampered, expired, foreign secret) is the
//! same [`CareError::Unauthorized`].

use crate::primitives::{
    DEFAULT_HASH_ITERATIONS, HASH_LENGTH, HASH_SCHEME,
    MIN_HASH_ITERATIONS, SALT_LENGTH,
};
use crate::{CareError, RecordId, Role, User};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// IDENTITY
// =============================================================================

/// Who a verified token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: RecordId,
    pub role: Role,
}

impl Identity {
    #[must_use]
    pub fn of(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            role: user.role,
        }
    }
}

/// Result of a successful registration or login.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// Signed token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: RecordId,
    pub role: Role,
    /// Issued at, unix seconds.
    pub iat: i64,
    /// Expires at, unix seconds. Tokens are rejected at or after this instant.
    pub exp: i64,
}

// =============================================================================
// PASSWORD HASHER
// =============================================================================

/// Salted PBKDF2-SHA256 password hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_HASH_ITERATIONS,
        }
    }
}

impl PasswordHasher {
    /// Hasher producing hashes with the given iteration count.
    pub fn new(iterations: u32) -> Result<Self, CareError> {
        if iterations < MIN_HASH_ITERATIONS {
            return Err(CareError::Validation(format!(
                "Hash iterations must be at least {MIN_HASH_ITERATIONS}"
            )));
        }
        Ok(Self { iterations })
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash a password with a fresh random salt.
    #[must_use]
    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let derived = derive(password, &salt, self.iterations);
        format!(
            "{HASH_SCHEME}${}${}${}",
            self.iterations,
            URL_SAFE_NO_PAD.encode(salt),
            URL_SAFE_NO_PAD.encode(derived)
        )
    }

    /// Check a password against a stored hash. A malformed hash never matches.
    #[must_use]
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let mut parts = stored.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };
        if scheme != HASH_SCHEME {
            return false;
        }
        let Ok(iterations) = iterations.parse::<u32>() else {
            return false;
        };
        if iterations == 0 {
            return false;
        }
        let (Ok(salt), Ok(expected)) = (URL_SAFE_NO_PAD.decode(salt), URL_SAFE_NO_PAD.decode(hash))
        else {
            return false;
        };
        if expected.len() != HASH_LENGTH {
            return false;
        }

        let derived = derive(password, &salt, iterations);
        derived.as_slice().ct_eq(expected.as_slice()).into()
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

// =============================================================================
// TOKEN SIGNER
// =============================================================================

/// Issues and verifies HMAC-signed tokens.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl TokenSigner {
    /// Signer with the given secret and token lifetime.
    pub fn new(secret: impl AsRef<[u8]>, ttl_secs: i64) -> Result<Self, CareError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(CareError::invalid("Token secret must not be empty"));
        }
        if ttl_secs <= 0 {
            return Err(CareError::invalid("Token lifetime must be positive"));
        }
        Ok(Self {
            secret: secret.to_vec(),
            ttl_secs,
        })
    }

    /// Signer with a random secret.
    ///
    /// Tokens stop verifying when the process restarts.
    pub fn ephemeral(ttl_secs: i64) -> Result<Self, CareError> {
        let mut secret = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::new(secret, ttl_secs)
    }

    #[must_use]
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a token for `identity`, valid from now.
    pub fn issue(&self, identity: &Identity) -> Result<String, CareError> {
        self.issue_at(identity, Utc::now().timestamp())
    }

    /// Issue a token as if the clock read `now` (unix seconds).
    pub fn issue_at(&self, identity: &Identity, now: i64) -> Result<String, CareError> {
        let claims = Claims {
            sub: identity.user_id.clone(),
            role: identity.role,
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        let json =
            serde_json::to_vec(&claims).map_err(|e| CareError::Serialization(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes())?);
        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token against the current clock.
    pub fn verify(&self, token: &str) -> Result<Identity, CareError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a token as if the clock read `now` (unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Identity, CareError> {
        let (payload, signature) = token
            .trim()
            .split_once('.')
            .ok_or(CareError::Unauthorized)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| CareError::Unauthorized)?;
        let expected = self.sign(payload.as_bytes())?;
        if !bool::from(expected.as_slice().ct_eq(signature.as_slice())) {
            return Err(CareError::Unauthorized);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| CareError::Unauthorized)?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| CareError::Unauthorized)?;
        if now >= claims.exp || claims.sub.is_blank() {
            return Err(CareError::Unauthorized);
        }

        Ok(Identity {
            user_id: claims.sub,
            role: claims.role,
        })
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CareError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| CareError::Validation(e.to_string()))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

// =============================================================================
// AUTH SERVICE
// =============================================================================

/// Hasher and signer, configured together at startup.
#[derive(Debug, Clone)]
pub struct AuthService {
    hasher: PasswordHasher,
    signer: TokenSigner,
}

impl AuthService {
    #[must_use]
    pub fn new(hasher: PasswordHasher, signer: TokenSigner) -> Self {
        Self { hasher, signer }
    }

    #[must_use]
    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Issue a session for a stored user.
    pub fn session_for(&self, user: User) -> Result<AuthSession, CareError> {
        let token = self.signer.issue(&Identity::of(&user))?;
        Ok(AuthSession { token, user })
    }

    /// Check a password against the account found for a login attempt.
    ///
    /// A missing account and a wrong password fail with the same error.
    pub fn login(
        &self,
        account: Option<User>,
        password: &str,
    ) -> Result<AuthSession, CareError> {
        let user = account.ok_or(CareError::InvalidCredentials)?;
        if !self.hasher.verify(password, &user.password_hash) {
            return Err(CareError::InvalidCredentials);
        }
        self.session_for(user)
    }

    /// Decode a bearer token into the identity it carries.
    pub fn verify_token(&self, token: &str) -> Result<Identity, CareError> {
        self.signer.verify(token)
    }
}

// =============================================================================
// TESTS
// =============================================================================
