//! Salted PBKDF2-SHA256 password hashes.
//!
//! Encoded as `pbkdf2-sha256$<iterations>$<salt>$<hash>` with unpadded
//! standard base64, so the parameters travel with every stored value.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::CryptoError;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 32;

const SCHEME: &str = "pbkdf2-sha256";
const MAX_ITERATIONS: u32 = 10_000_000;

/// Derived password hash, zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
struct DerivedHash {
    bytes: [u8; HASH_LENGTH],
}

impl DerivedHash {
    fn derive(password: &str, salt: &[u8], iterations: u32) -> Self {
        let mut bytes = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut bytes);
        Self { bytes }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { iterations: PBKDF2_ITERATIONS }
    }
}

impl PasswordHasher {
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations: iterations.clamp(1, MAX_ITERATIONS) }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash with a fresh random salt.
    pub fn hash(&self, password: &str) -> String {
        self.hash_with_salt(password, &generate_salt())
    }

    fn hash_with_salt(&self, password: &str, salt: &[u8; SALT_LENGTH]) -> String {
        let derived = DerivedHash::derive(password, salt, self.iterations);
        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(derived.bytes)
        )
    }
}

struct EncodedHash {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

fn parse(stored: &str) -> Result<EncodedHash, CryptoError> {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CryptoError::MalformedHash);
    };
    if scheme != SCHEME {
        return Err(CryptoError::UnsupportedScheme(scheme.into()));
    }
    let iterations: u32 = iterations.parse().map_err(|_| CryptoError::MalformedHash)?;
    if iterations == 0 || iterations > MAX_ITERATIONS {
        return Err(CryptoError::MalformedHash);
    }
    let salt = STANDARD_NO_PAD.decode(salt).map_err(|_| CryptoError::MalformedHash)?;
    let hash = STANDARD_NO_PAD.decode(hash).map_err(|_| CryptoError::MalformedHash)?;
    if hash.len() != HASH_LENGTH || salt.is_empty() {
        return Err(CryptoError::MalformedHash);
    }
    Ok(EncodedHash { iterations, salt, hash })
}

/// True when `stored` is already an encoded hash rather than legacy clear text.
pub fn is_password_hash(stored: &str) -> bool {
    parse(stored).is_ok()
}

/// Check `candidate` against an encoded hash in constant time.
pub fn verify_password(candidate: &str, stored: &str) -> Result<bool, CryptoError> {
    let encoded = parse(stored)?;
    let derived = DerivedHash::derive(candidate, &encoded.salt, encoded.iterations);
    Ok(derived.bytes[..].ct_eq(&encoded.hash[..]).into())
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
