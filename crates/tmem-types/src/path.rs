use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TypeError};

/// One step of a path: an array index or a map key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
    Index(u64),
    Name(String),
}

/// Ordered sequence of keys from the document root. Empty selects the root.
pub type Path = Vec<PathKey>;

impl PathKey {
    /// Parse a token value into a path key.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::Name(s.clone())),
            Value::Number(n) => n
                .as_u64()
                .map(Self::Index)
                .ok_or_else(|| TypeError::InvalidPathKey(value.to_string())),
            other => Err(TypeError::InvalidPathKey(other.to_string())),
        }
    }

    /// Encode as a log token.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Index(i) => Value::from(*i),
            Self::Name(s) => Value::String(s.clone()),
        }
    }

    /// The array index, if this key is one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => usize::try_from(*i).ok(),
            Self::Name(_) => None,
        }
    }

    /// The key as used against a map. Integer keys address their decimal form.
    pub fn as_map_key(&self) -> Cow<'_, str> {
        match self {
            Self::Index(i) => Cow::Owned(i.to_string()),
            Self::Name(s) => Cow::Borrowed(s),
        }
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for PathKey {
    fn from(s: &str) -> Self {
        Self::Name(s.to_string())
    }
}

impl From<String> for PathKey {
    fn from(s: String) -> Self {
        Self::Name(s)
    }
}

impl From<usize> for PathKey {
    fn from(i: usize) -> Self {
        Self::Index(i as u64)
    }
}

impl From<u64> for PathKey {
    fn from(i: u64) -> Self {
        Self::Index(i)
    }
}

/// Parse a list of token values into a path.
pub fn path_from_values(values: &[Value]) -> Result<Path> {
    values.iter().map(PathKey::from_value).collect()
}

/// Render a path for messages, e.g. `["posts", 0, "tags"]`.
pub fn display_path(path: &[PathKey]) -> String {
    let parts: Vec<String> = path.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}
