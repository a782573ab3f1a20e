//! Newtype wrappers for domain identifiers

use std::borrow::Borrow;
use std::fmt;

/// Prefix carried by every execution id
const ID_PREFIX: &str = "exec_";

/// Number of hex characters after the prefix
const ID_HEX_LEN: usize = 8;

/// Opaque identifier of one tracing run (`exec_` + 8 lowercase hex chars)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Generate a random id. Uniqueness against live entries is enforced by
    /// the registry, not here.
    #[must_use]
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{ID_PREFIX}{}", &hex[..ID_HEX_LEN]))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExecutionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ExecutionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ExecutionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_format() {
        let id = ExecutionId::generate();
        let s = id.as_str();
        assert!(s.starts_with("exec_"));
        assert_eq!(s.len(), ID_PREFIX.len() + ID_HEX_LEN);
        let hex = &s[ID_PREFIX.len()..];
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_display_matches_inner() {
        let id = ExecutionId::from("exec_deadbeef");
        assert_eq!(id.to_string(), "exec_deadbeef");
    }
}
