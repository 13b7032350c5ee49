/// Password hashing primitive
///
/// Salted adaptive hashing via bcrypt. Verification failures of any
/// kind (including malformed digests) read as a mismatch so callers
/// stay on the single generic invalid-credentials path.
use crate::error::{AppError, AppResult};

/// Cost factor for all stored hashes
pub const HASH_COST: u32 = 10;

/// Hash a plaintext secret
pub fn hash(plain: &str) -> AppResult<String> {
    bcrypt::hash(plain, HASH_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Constant-time comparison of a plaintext against a stored digest
pub fn verify(plain: &str, digest: &str) -> bool {
    bcrypt::verify(plain, digest).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let digest = hash("hunter2!").unwrap();
        assert!(verify("hunter2!", &digest));
        assert!(!verify("hunter3!", &digest));
    }

    #[test]
    fn test_malformed_digest_reads_as_mismatch() {
        assert!(!verify("anything", "not-a-bcrypt-digest"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash("same-password").unwrap();
        let b = hash("same-password").unwrap();
        assert_ne!(a, b);
        assert!(verify("same-password", &a));
        assert!(verify("same-password", &b));
    }
}
