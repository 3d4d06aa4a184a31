//! Total order over roles for "at least as privileged as" checks.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};
use crate::registry::RoleRegistry;
use crate::role::Role;

/// Gap between consecutive priorities.
pub const PRIORITY_STEP: i64 = 10;

/// How priorities are derived from the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityStrategy {
    /// First-declared role ranks highest. The role table must be declared
    /// most privileged first; a manages edge pointing at an earlier role is
    /// rejected at load time.
    #[default]
    DeclarationOrder,
    /// Rank by the longest manages path down to a leaf, ties broken by
    /// declaration order.
    GraphDepth,
}

#[derive(Debug, Clone)]
pub struct PriorityAssigner {
    strategy: PriorityStrategy,
    priorities: HashMap<Role, i64>,
}

impl PriorityAssigner {
    /// Assign priorities. Expects an acyclic graph (see
    /// [`crate::HierarchyResolver::new`]).
    pub fn new(registry: &RoleRegistry, strategy: PriorityStrategy) -> PolicyResult<Self> {
        let ranked: Vec<&Role> = match strategy {
            PriorityStrategy::DeclarationOrder => {
                check_declaration_order(registry)?;
                registry.all_roles().iter().collect()
            }
            PriorityStrategy::GraphDepth => rank_by_depth(registry),
        };

        let count = ranked.len() as i64;
        let priorities = ranked
            .into_iter()
            .enumerate()
            .map(|(rank, role)| (role.clone(), (count - rank as i64) * PRIORITY_STEP))
            .collect();

        Ok(Self {
            strategy,
            priorities,
        })
    }

    pub fn strategy(&self) -> PriorityStrategy {
        self.strategy
    }

    /// Priority of `role`; roles outside the registry rank below all others.
    pub fn priority_of(&self, role: &Role) -> i64 {
        self.priorities.get(role).copied().unwrap_or(0)
    }

    pub fn at_least(&self, actor: &Role, minimum: &Role) -> bool {
        self.priority_of(actor) >= self.priority_of(minimum)
    }

    /// Sort `roles` most privileged first.
    pub fn sort_descending(&self, roles: &mut [Role]) {
        roles.sort_by_key(|role| std::cmp::Reverse(self.priority_of(role)));
    }
}

fn check_declaration_order(registry: &RoleRegistry) -> PolicyResult<()> {
    for (position, role) in registry.all_roles().iter().enumerate() {
        for managed in registry.manages(role) {
            if registry.position(managed).is_some_and(|p| p <= position) {
                return Err(PolicyError::PriorityOrder {
                    manager: role.to_string(),
                    managed: managed.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn rank_by_depth(registry: &RoleRegistry) -> Vec<&Role> {
    fn depth<'a>(
        registry: &'a RoleRegistry,
        role: &'a Role,
        memo: &mut HashMap<&'a Role, usize>,
        visiting: &mut HashSet<&'a Role>,
    ) -> usize {
        if let Some(&d) = memo.get(role) {
            return d;
        }
        if !visiting.insert(role) {
            return 0;
        }
        let d = registry
            .manages(role)
            .iter()
            .map(|child| depth(registry, child, memo, visiting) + 1)
            .max()
            .unwrap_or(0);
        visiting.remove(role);
        memo.insert(role, d);
        d
    }

    let mut memo = HashMap::new();
    let mut visiting = HashSet::new();
    let mut ranked: Vec<(usize, usize, &Role)> = registry
        .all_roles()
        .iter()
        .enumerate()
        .map(|(position, role)| (depth(registry, role, &mut memo, &mut visiting), position, role))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    ranked.into_iter().map(|(_, _, role)| role).collect()
}
