use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Token that grants every action when present in a role's permission list.
pub const WILDCARD: &str = "*";

/// Identifier of a guarded operation.
///
/// Actions are opaque strings, conventionally namespaced as
/// `resource:operation` or `resource:operation:scope`
/// (e.g. `"products:write"`, `"transactions:read:any"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(Cow<'static, str>);

impl Action {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == WILDCARD
    }

    /// Leading segment (`products` in `products:write`).
    pub fn resource(&self) -> &str {
        self.segment(0).unwrap_or_else(|| self.as_str())
    }

    /// Second segment, if the action is namespaced.
    pub fn operation(&self) -> Option<&str> {
        self.segment(1)
    }

    /// Everything after `resource:operation:`, if present.
    pub fn scope(&self) -> Option<&str> {
        self.as_str().splitn(3, ':').nth(2)
    }

    fn segment(&self, index: usize) -> Option<&str> {
        self.as_str().split(':').nth(index)
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for Action {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Action {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Action {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
