use super::{Result, StoreError};
use std::fmt;
use std::str::FromStr;

// Characters that are not allowed inside a single key.
const FORBIDDEN_KEY_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

/// Location of a document inside the hierarchical store, e.g. `entries/<id>/locationHistory`.
///
/// All store interactions use this sanitized representation. A key path is a list of
/// non-empty keys, the empty list addresses the root of the store. Leading and trailing
/// slashes are ignored when parsing, empty keys in the middle of a path are rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath {
    keys: Vec<String>,
}

impl KeyPath {
    pub fn root() -> KeyPath {
        KeyPath { keys: Vec::new() }
    }

    pub fn parse(path: &str) -> Result<KeyPath> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut keys = Vec::new();
        for key in trimmed.split('/') {
            check_key(path, key)?;
            keys.push(key.to_string());
        }

        Ok(KeyPath { keys })
    }

    /// Returns the path of the direct child `key` of this path.
    pub fn child(&self, key: &str) -> Result<KeyPath> {
        check_key(key, key)?;
        if key.contains('/') {
            return Err(StoreError::InvalidPath {
                path: key.to_string(),
                reason: "a single key must not contain '/'",
            });
        }

        let mut keys = self.keys.clone();
        keys.push(key.to_string());
        Ok(KeyPath { keys })
    }

    pub fn join(&self, relative: &KeyPath) -> KeyPath {
        let mut keys = self.keys.clone();
        keys.extend(relative.keys.iter().cloned());
        KeyPath { keys }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn depth(&self) -> usize {
        self.keys.len()
    }

    pub fn is_root(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.keys.last().map(|key| key.as_str())
    }

    pub fn parent(&self) -> Option<KeyPath> {
        if self.is_root() {
            None
        } else {
            Some(KeyPath {
                keys: self.keys[..self.keys.len() - 1].to_vec(),
            })
        }
    }

    /// All strict ancestors of this path, starting at the root.
    pub fn ancestors(&self) -> Vec<KeyPath> {
        (0..self.keys.len())
            .map(|len| KeyPath {
                keys: self.keys[..len].to_vec(),
            })
            .collect()
    }

    /// True if `self` equals `other` or is one of its ancestors.
    pub fn is_prefix_of(&self, other: &KeyPath) -> bool {
        other.keys.len() >= self.keys.len() && other.keys[..self.keys.len()] == self.keys[..]
    }

    /// Two paths overlap if a write to one of them can change the value read at the other.
    pub fn overlaps(&self, other: &KeyPath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// The keys of `self` below `prefix`, None if `prefix` is not a prefix of `self`.
    pub fn strip_prefix(&self, prefix: &KeyPath) -> Option<&[String]> {
        if prefix.is_prefix_of(self) {
            Some(&self.keys[prefix.keys.len()..])
        } else {
            None
        }
    }
}

fn check_key(path: &str, key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: "keys must not be empty",
        });
    }
    if key.chars().any(|c| FORBIDDEN_KEY_CHARS.contains(&c) || c.is_control()) {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: "keys must not contain '.', '#', '$', '[', ']' or control characters",
        });
    }

    Ok(())
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keys.join("/"))
    }
}

impl FromStr for KeyPath {
    type Err = StoreError;

    fn from_str(path: &str) -> Result<Self> {
        Self::parse(path)
    }
}
