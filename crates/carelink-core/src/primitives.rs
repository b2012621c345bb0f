//! # Fixed Primitives
//!
//! Hardcoded constants of the CareLink core. Anything an operator may want to
//! tune lives in the application config instead; these are the values the
//! engine's contracts are written against.

/// Default lifetime of an issued token, in seconds (one hour).
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Default PBKDF2-SHA256 iteration count for new password hashes.
///
/// Verification always uses the count stored inside the hash, so raising
/// this value never invalidates existing accounts.
pub const DEFAULT_HASH_ITERATIONS: u32 = 100_000;

/// Lowest iteration count accepted by the hasher.
pub const MIN_HASH_ITERATIONS: u32 = 1_000;

/// Random salt length for password hashes, in bytes.
pub const SALT_LENGTH: usize = 16;

/// Derived key length for password hashes, in bytes.
pub const HASH_LENGTH: usize = 32;

/// Scheme tag at the front of every stored password hash.
pub const HASH_SCHEME: &str = "pbkdf2-sha256";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of short text fields (names, emails, statuses).
pub const MAX_NAME_LENGTH: usize = 256;

/// Maximum length of free-text fields (notes, tip content, alert messages).
pub const MAX_TEXT_LENGTH: usize = 65536;

/// Maximum number of items in a symptom checklist or condition list.
pub const MAX_ITEMS: usize = 100;

/// Maximum depth of a nested field selection.
pub const MAX_SELECTION_DEPTH: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_iterations_above_floor() {
        assert!(DEFAULT_HASH_ITERATIONS >= MIN_HASH_ITERATIONS);
    }

    #[test]
    fn token_ttl_is_one_hour() {
        assert_eq!(DEFAULT_TOKEN_TTL_SECS, 60 * 60);
    }
}
