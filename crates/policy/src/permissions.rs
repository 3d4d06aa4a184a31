//! Role → allowed actions.

use std::collections::{BTreeSet, HashMap};

use serde::{Serialize, Serializer};

use crate::action::{Action, WILDCARD};
use crate::config::PolicyConfig;
use crate::error::{PolicyError, PolicyResult};
use crate::registry::RoleRegistry;
use crate::role::Role;

static NO_PERMISSIONS: PermissionSet = PermissionSet::Only(BTreeSet::new());

/// Actions granted to one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSet {
    /// Every action, including ones no policy mentions.
    All,
    Only(BTreeSet<Action>),
}

impl PermissionSet {
    /// Build from configured tokens. Any `"*"` entry makes the set the wildcard.
    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        let mut actions = BTreeSet::new();
        for token in tokens {
            if token == WILDCARD {
                return Self::All;
            }
            actions.insert(Action::new(token.to_string()));
        }
        Self::Only(actions)
    }

    pub fn allows(&self, action: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(actions) => actions.contains(action),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Explicit actions; empty for the wildcard.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        let actions = match self {
            Self::All => None,
            Self::Only(actions) => Some(actions.iter()),
        };
        actions.into_iter().flatten()
    }
}

/// Serialized as a list; the wildcard becomes `["*"]`.
impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => [WILDCARD].serialize(serializer),
            Self::Only(actions) => actions.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    sets: HashMap<Role, PermissionSet>,
}

impl PermissionMatrix {
    pub fn from_config(config: &PolicyConfig, registry: &RoleRegistry) -> PolicyResult<Self> {
        let mut sets = HashMap::with_capacity(config.roles.len());
        for row in &config.roles {
            let role = registry
                .lookup(&row.name)
                .ok_or_else(|| PolicyError::unknown_role(row.name.clone()))?;
            if row.permissions.iter().any(|action| action.trim().is_empty()) {
                return Err(PolicyError::EmptyAction {
                    role: row.name.clone(),
                });
            }
            let set = PermissionSet::from_tokens(row.permissions.iter().map(String::as_str));
            sets.insert(role.clone(), set);
        }
        Ok(Self { sets })
    }

    /// Permission set of `role`; unconfigured roles get the empty set.
    pub fn permission_set(&self, role: &Role) -> &PermissionSet {
        self.sets.get(role).unwrap_or(&NO_PERMISSIONS)
    }

    pub fn allows(&self, role: &Role, action: &str) -> bool {
        self.permission_set(role).allows(action)
    }

    pub fn wildcard_count(&self) -> usize {
        self.sets.values().filter(|set| set.is_wildcard()).count()
    }
}
