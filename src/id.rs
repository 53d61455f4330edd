use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique identifier shared by nodes, connectors, and connections.
///
/// Equality and hashing are by the underlying UUID only; identifiers carry
/// no information about which kind of entity they name — uniqueness within
/// a kind (all node ids, all connector ids, ...) is enforced by the owning
/// collection, not by the id type itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier(Uuid);

impl Identifier {
    /// Generate a fresh, globally unique identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reconstruct an identifier from a previously-issued UUID (document load).
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// First 8 hex characters, for log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
