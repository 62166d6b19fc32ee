//! Password hashing and verification.
//!
//! bcrypt with a configurable cost factor. Verification distinguishes a
//! mismatch (`Ok(false)`) from a malformed digest or internal failure
//! (`Err`), and nothing here ever logs the plaintext.

use bcrypt::BcryptError;

/// Hash a password with the given bcrypt cost factor.
pub fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    bcrypt::hash(password, cost)
}

/// Verify a password against a stored digest.
///
/// A wrong password is `Ok(false)`; an error means the digest could not be
/// parsed or the verification itself failed.
pub fn verify_password(password: &str, digest: &str) -> Result<bool, BcryptError> {
    bcrypt::verify(password, digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4; // minimum cost, keeps tests fast

    #[test]
    fn test_hash_verify_round_trip() {
        let digest = hash_password("verysecret", TEST_COST).unwrap();
        assert_ne!(digest, "verysecret");
        assert!(verify_password("verysecret", &digest).unwrap());
    }

    #[test]
    fn test_wrong_password_is_ok_false() {
        let digest = hash_password("verysecret", TEST_COST).unwrap();
        assert!(!verify_password("verysecretx", &digest).unwrap());
        assert!(!verify_password("", &digest).unwrap());
    }

    #[test]
    fn test_malformed_digest_is_error() {
        assert!(verify_password("verysecret", "not-a-bcrypt-digest").is_err());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("verysecret", TEST_COST).unwrap();
        let b = hash_password("verysecret", TEST_COST).unwrap();
        assert_ne!(a, b);
    }
}
