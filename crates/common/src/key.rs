use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Address of one actor instance: a stable logical kind plus an opaque
/// identity string.
///
/// Rendered as `"{kind}/{id}"` everywhere a string key is needed: store
/// keys, caller ids, participant sets. The kind may itself contain `/`;
/// the identity may not, so parsing splits on the last separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorKey {
    kind: String,
    id: String,
}

impl ActorKey {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// The logical type name shared by all instances of one actor kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The identity string unique within the kind.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ActorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Error returned when a string is not a valid `"{kind}/{id}"` key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid actor key: {0:?}")]
pub struct KeyParseError(pub String);

impl FromStr for ActorKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('/') {
            Some((kind, id)) if !kind.is_empty() && !id.is_empty() => {
                Ok(Self::new(kind, id))
            }
            _ => Err(KeyParseError(s.to_string())),
        }
    }
}
