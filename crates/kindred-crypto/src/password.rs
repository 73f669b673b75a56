use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// HMAC-SHA512 block size; keys of this length are used as-is.
pub const SALT_LEN: usize = 128;
pub const HASH_LEN: usize = 64;

/// A stored credential: the keyed hash of the password and the random key
/// (salt) it was computed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    pub hash: Vec<u8>,
    pub salt: Vec<u8>,
}

/// Hash a password under a freshly generated random key.
pub fn hash(password: &str) -> PasswordDigest {
    let mut salt = vec![0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);

    let hash = keyed(&salt, password).finalize().into_bytes().to_vec();
    PasswordDigest { hash, salt }
}

/// Recompute the keyed hash with the stored salt and compare against the
/// stored hash. Comparison runs over every byte regardless of where the
/// first difference is.
pub fn verify(password: &str, hash: &[u8], salt: &[u8]) -> bool {
    keyed(salt, password).verify_slice(hash).is_ok()
}

fn keyed(salt: &[u8], password: &str) -> HmacSha512 {
    let mut mac = HmacSha512::new_from_slice(salt).expect("HMAC accepts any key length");
    mac.update(password.as_bytes());
    mac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verify_roundtrip() {
        let digest = hash("pass1");
        assert_eq!(digest.hash.len(), HASH_LEN);
        assert_eq!(digest.salt.len(), SALT_LEN);

        assert!(verify("pass1", &digest.hash, &digest.salt));
    }

    #[test]
    fn wrong_password_fails() {
        let digest = hash("pass1");
        assert!(!verify("pass2", &digest.hash, &digest.salt));
        assert!(!verify("", &digest.hash, &digest.salt));
    }

    #[test]
    fn salts_are_unique() {
        let a = hash("same");
        let b = hash("same");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
        assert!(!verify("same", &a.hash, &b.salt));
    }

    #[test]
    fn truncated_hash_fails() {
        let digest = hash("pass1");
        assert!(!verify("pass1", &digest.hash[..32], &digest.salt));
    }
}
