//! Viewer web authentication

use sha2::{Digest, Sha256};

/// Checks a viewer-presented credential against the web login session.
///
/// Pure: implementations must have no side effects visible to the relay
/// beyond the returned boolean. The relay re-checks the authenticated
/// attribute on every command dispatch, so revoking a session takes
/// effect on the next command.
pub trait WebAuthenticator: Send + Sync {
    /// Whether the credential identifies a valid web session
    fn check(&self, credential: &str) -> bool;
}

/// SHA-256 digest of a secret, used for comparison without branching on
/// the raw secret bytes.
pub fn secret_digest(secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}

/// Compare a presented secret against an expected digest.
///
/// An empty expected secret never verifies; a relay without a configured
/// secret rejects everything.
pub fn verify_secret(presented: &str, expected_digest: &[u8; 32], expected_empty: bool) -> bool {
    if expected_empty {
        return false;
    }
    secret_digest(presented) == *expected_digest
}

/// Default authenticator: a single shared secret doubles as the web
/// credential, matching deployments where the login page and the agent
/// use the same access password.
pub struct SharedSecretAuthenticator {
    digest: [u8; 32],
    empty: bool,
}

impl SharedSecretAuthenticator {
    /// Create an authenticator from the configured secret
    pub fn new(secret: &str) -> Self {
        Self {
            digest: secret_digest(secret),
            empty: secret.is_empty(),
        }
    }
}

impl WebAuthenticator for SharedSecretAuthenticator {
    fn check(&self, credential: &str) -> bool {
        verify_secret(credential, &self.digest, self.empty)
    }
}
