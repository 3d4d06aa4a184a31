//! Mapping of external role tokens onto canonical roles.
//!
//! Sessions carry roles in whatever shape the identity provider produced:
//! `"admin"`, `"ROLE_ADMIN"`, `"Distribuidor"`, or nothing at all. The
//! normalizer is total. Anything it cannot place resolves to the default role.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::config::PolicyConfig;
use crate::error::{PolicyError, PolicyResult};
use crate::registry::RoleRegistry;
use crate::role::{ROLE_PREFIX, Role};

/// A value that may carry a role token.
///
/// `None` means "no role" (anonymous/guest) and always resolves to the
/// default role.
pub trait RoleLike {
    fn role_token(&self) -> Option<Cow<'_, str>>;
}

impl RoleLike for str {
    fn role_token(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self))
    }
}

impl RoleLike for String {
    fn role_token(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.as_str()))
    }
}

impl RoleLike for Role {
    fn role_token(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.as_str()))
    }
}

impl<T: RoleLike + ?Sized> RoleLike for &T {
    fn role_token(&self) -> Option<Cow<'_, str>> {
        (**self).role_token()
    }
}

impl<T: RoleLike> RoleLike for Option<T> {
    fn role_token(&self) -> Option<Cow<'_, str>> {
        self.as_ref().and_then(RoleLike::role_token)
    }
}

/// Scalars are coerced to their string form; `null`, arrays and objects
/// carry no role.
impl RoleLike for serde_json::Value {
    fn role_token(&self) -> Option<Cow<'_, str>> {
        match self {
            serde_json::Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            serde_json::Value::Number(n) => Some(Cow::Owned(n.to_string())),
            serde_json::Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            serde_json::Value::Null
            | serde_json::Value::Array(_)
            | serde_json::Value::Object(_) => None,
        }
    }
}

/// Case-insensitive token table: every canonical name plus configured aliases.
#[derive(Debug, Clone)]
pub struct RoleNormalizer {
    table: HashMap<String, Role>,
    default_role: Role,
}

impl RoleNormalizer {
    /// Build the alias table, rejecting aliases that are ambiguous or that
    /// could never be reached because a canonical name wins first.
    pub fn from_config(config: &PolicyConfig, registry: &RoleRegistry) -> PolicyResult<Self> {
        let mut table: HashMap<String, Role> = registry
            .all_roles()
            .iter()
            .map(|role| (role.as_str().to_string(), role.clone()))
            .collect();

        for row in &config.roles {
            let role = registry
                .lookup(&row.name)
                .ok_or_else(|| PolicyError::unknown_role(row.name.clone()))?;

            for raw in &row.aliases {
                let alias = raw.trim().to_uppercase();
                if alias.is_empty() {
                    return Err(PolicyError::InvalidRoleName(raw.clone()));
                }

                let stripped = alias.strip_prefix(ROLE_PREFIX).unwrap_or(&alias);
                if let Some(canonical) = registry.lookup(stripped) {
                    if canonical != role {
                        return Err(PolicyError::AliasShadowsRole {
                            alias,
                            role: role.to_string(),
                        });
                    }
                }

                match table.get(&alias) {
                    Some(existing) if existing != role => {
                        return Err(PolicyError::ConflictingAlias {
                            alias,
                            first: existing.to_string(),
                            second: role.to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        table.insert(alias, role.clone());
                    }
                }
            }
        }

        // A prefixed alias is unreachable when its stripped form belongs to
        // another role, since the stripped token is looked up first.
        let mut prefixed: Vec<(&String, &Role)> = table
            .iter()
            .filter(|(alias, _)| alias.starts_with(ROLE_PREFIX))
            .collect();
        prefixed.sort();
        for (alias, role) in prefixed {
            let stripped = &alias[ROLE_PREFIX.len()..];
            if let Some(other) = table.get(stripped) {
                if other != role {
                    return Err(PolicyError::ConflictingAlias {
                        alias: alias.clone(),
                        first: role.to_string(),
                        second: other.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            table,
            default_role: registry.default_role().clone(),
        })
    }

    /// Resolve any role-ish input to a canonical role.
    ///
    /// Trims and uppercases the token, strips a leading `ROLE_`, then tries the
    /// stripped token and the unstripped one against the table. Unmatched
    /// input yields the default role.
    pub fn normalize(&self, input: impl RoleLike) -> Role {
        let Some(token) = input.role_token() else {
            return self.default_role.clone();
        };

        let raw = token.trim().to_uppercase();
        let stripped = raw.strip_prefix(ROLE_PREFIX).unwrap_or(&raw);

        if let Some(role) = self.table.get(stripped).or_else(|| self.table.get(&raw)) {
            return role.clone();
        }

        tracing::debug!(
            token = %raw,
            fallback = %self.default_role,
            "unrecognized role token, using default role"
        );
        self.default_role.clone()
    }

    /// Whether `input` maps onto a role without falling back.
    pub fn recognizes(&self, input: impl RoleLike) -> bool {
        input.role_token().is_some_and(|token| {
            let raw = token.trim().to_uppercase();
            let stripped = raw.strip_prefix(ROLE_PREFIX).unwrap_or(&raw);
            self.table.contains_key(stripped) || self.table.contains_key(&raw)
        })
    }

    pub fn default_role(&self) -> &Role {
        &self.default_role
    }

    /// Number of accepted tokens, canonical names included.
    pub fn alias_count(&self) -> usize {
        self.table.len()
    }
}
