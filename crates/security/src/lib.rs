//! Shared-password gate.
//!
//! The application is protected by a single shared password. The only
//! requirement on the comparison is that it leaks nothing through
//! timing: candidates are hashed to fixed-length digests and compared
//! with a full XOR fold, so the comparison cost is independent of both
//! the candidate's length and the position of the first mismatch.
//!
//! Neither the password nor candidates are ever logged.

use sha2::{Digest, Sha256};
use tracing::debug;

/// Verifies candidates against the configured shared password.
pub struct PasswordGate {
    expected_digest: [u8; 32],
}

impl PasswordGate {
    /// Create a gate for the given shared password.
    pub fn new(password: &str) -> Self {
        Self {
            expected_digest: digest(password),
        }
    }

    /// Constant-time check of a candidate password.
    pub fn verify(&self, candidate: &str) -> bool {
        let ok = constant_time_eq(&digest(candidate), &self.expected_digest);
        debug!(ok, "Password gate check");
        ok
    }
}

fn digest(s: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hasher.finalize().into()
}

/// XOR-fold equality over fixed-length digests. Always touches every
/// byte; never short-circuits.
fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
