use sha2::{Digest, Sha256};

/// Longest identifier a SHA-256 hex digest can produce.
const MAX_HASH_LENGTH: usize = 64;

/// Generates a deterministic hex identifier from an ordered list of parts.
///
/// The parts are fed to SHA-256 one after the other, with no separator, so
/// `["ab", "c"]` and `["a", "bc"]` produce the same identifier.
///
/// # Arguments
///
/// * `length` - Number of hex characters to keep, clamped to 64.
/// * `parts` - The strings to hash, in order.
///
/// # Returns
///
/// The first `length` characters of the hex encoded digest.
pub fn generate_hash(length: usize, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();

    for part in parts {
        hasher.update(part.as_bytes());
    }

    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(length.min(MAX_HASH_LENGTH));

    digest
}
