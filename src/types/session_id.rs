//! Identifiers for scan sessions.
//!
//! Every `ScanSession` carries a `SessionId` so that log lines emitted by the
//! orchestrator, the workers and the progress monitor can be correlated.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A unique identifier for one scan session (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short form used in log fields and the verbose header.
    pub fn short(&self) -> String {
        let mut id = self.0.simple().to_string();
        id.truncate(8);
        id
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
