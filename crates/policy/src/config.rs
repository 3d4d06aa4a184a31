//! Declarative policy document.
//!
//! The role table, hierarchy edges, aliases and permission matrix are data,
//! not code. A [`PolicyConfig`] is only a parsed document; it is validated
//! when handed to [`crate::PolicyEngine::from_config`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};
use crate::priority::PriorityStrategy;

/// Policy bundled with the crate (storefront roles, Spanish legacy aliases).
pub const REFERENCE_POLICY: &str = include_str!("../policy/reference.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Least-privileged role every unrecognized input falls back to.
    pub default_role: String,

    #[serde(default)]
    pub priority: PriorityStrategy,

    /// Role table in declaration order.
    pub roles: Vec<RoleConfig>,

    #[serde(default)]
    pub registration: RegistrationConfig,
}

/// One row of the role table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub name: String,
    pub label: String,
    pub home_route: String,

    /// Direct subordinates only.
    #[serde(default)]
    pub manages: Vec<String>,

    /// Alternate spellings accepted from sessions; matched case-insensitively.
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Allowed actions. A `"*"` entry grants everything.
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Self-signup rules consumed by the registration workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationConfig {
    /// Role given to self-registered accounts (defaults to `default_role`).
    #[serde(default)]
    pub self_signup_role: Option<String>,

    /// Role that conceptually owns self-registered accounts.
    #[serde(default)]
    pub self_signup_owner: Option<String>,
}

impl PolicyConfig {
    pub fn from_json_str(raw: &str) -> PolicyResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn reference() -> PolicyResult<Self> {
        Self::from_json_str(REFERENCE_POLICY)
    }
}
