use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Digest bytes kept in the key.
const IDENTITY_BYTES: usize = 8;

/// Stable key correlating persisted frequency state across page loads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PopupIdentity(String);

impl PopupIdentity {
    /// An explicit id always wins over the headline.
    pub fn derive(explicit_id: Option<&str>, headline: &str) -> Self {
        match explicit_id {
            Some(id) => Self::digest("id", id),
            None => Self::digest("headline", headline),
        }
    }

    fn digest(namespace: &str, value: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(namespace.as_bytes());
        hasher.update(b":");
        hasher.update(value.as_bytes());
        let digest = hasher.finalize();

        let hex = digest[..IDENTITY_BYTES]
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<String>();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PopupIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
