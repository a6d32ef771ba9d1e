//! Request identity keys.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request identity.
///
/// The method is case-normalized; the URL is taken verbatim, query included,
/// so callers must canonicalize it first.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
