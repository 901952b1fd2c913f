use sha2::{Digest, Sha256};

/// Cache key for a piece of text: hex-encoded SHA-256 of the exact bytes.
///
/// No normalisation happens here. Two texts that differ only in whitespace get
/// different keys, because the model would embed them differently too.
pub fn hash_key(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
