use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Prefix some identity providers put in front of role names (`ROLE_ADMIN`).
pub const ROLE_PREFIX: &str = "ROLE_";

/// Canonical role identifier.
///
/// Roles are opaque at this layer. The set of valid roles is whatever the
/// loaded [`crate::RoleRegistry`] declares; a `Role` obtained from
/// [`crate::PolicyEngine::normalize`] is always one of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `name` is acceptable as a canonical role name.
    ///
    /// Canonical names are non-empty, already trimmed and uppercased, and do
    /// not carry the `ROLE_` prefix. This keeps normalization idempotent.
    pub fn is_canonical_name(name: &str) -> bool {
        !name.is_empty()
            && name.trim() == name
            && name.to_uppercase() == name
            && !name.starts_with(ROLE_PREFIX)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for Role {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Role {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
