//! Policy error model.

use thiserror::Error;

/// Result type used when loading or validating a policy.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Failure while building a policy, or a lookup outside the canonical role set.
///
/// Every variant except [`PolicyError::UnknownRole`] is raised at load time.
/// Query operations on a built [`crate::PolicyEngine`] never fail.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy declares no roles")]
    EmptyRegistry,

    /// Canonical names must be trimmed, uppercase and free of the `ROLE_` prefix.
    #[error("invalid role name `{0}`")]
    InvalidRoleName(String),

    #[error("role `{0}` is declared more than once")]
    DuplicateRole(String),

    /// A role name was referenced that the registry does not declare.
    #[error("unknown role `{0}`")]
    UnknownRole(String),

    #[error("default role `{0}` is not declared")]
    MissingDefaultRole(String),

    #[error("alias `{alias}` maps to both `{first}` and `{second}`")]
    ConflictingAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("alias `{alias}` of `{role}` shadows a canonical role name")]
    AliasShadowsRole { alias: String, role: String },

    #[error("role `{role}` lists an empty action")]
    EmptyAction { role: String },

    #[error("cycle in manages graph: {0}")]
    CyclicHierarchy(String),

    /// Declaration-order priority requires managers to be declared before the
    /// roles they manage.
    #[error("role `{manager}` manages `{managed}`, which is declared before it")]
    PriorityOrder { manager: String, managed: String },

    #[error("invalid policy document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read policy file `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl PolicyError {
    pub fn unknown_role(name: impl Into<String>) -> Self {
        Self::UnknownRole(name.into())
    }
}
