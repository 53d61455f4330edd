use serde::{Deserialize, Serialize};

/// The fixed direction of a connector: `Input` connectors accept at most
/// one connection, `Output` connectors accept any number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

/// A connector's runtime data type, compared structurally by name.
///
/// Same-named types are assignable to each other, plus an `Any` wildcard
/// that is assignable both ways, for nodes that are genuinely polymorphic
/// (e.g. a generic merge node). Types are named by a short string rather
/// than a closed enum, keeping the type system open to node authors
/// outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType(String);

impl DataType {
    pub const ANY_NAME: &'static str = "any";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn any() -> Self {
        Self(Self::ANY_NAME.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_any(&self) -> bool {
        self.0 == Self::ANY_NAME
    }

    /// Is a value of `source` type assignable to a connector typed `self`
    /// (i.e. `self` is the target)? Used by `Connector::validate_connection`.
    pub fn assignable_from(&self, source: &DataType) -> bool {
        self.is_any() || source.is_any() || self == source
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DataType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
