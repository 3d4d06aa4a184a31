//! Reachability over the "manages" graph.
//!
//! Edges point from a role to the roles it directly administers. The graph is
//! validated acyclic at load time, and every traversal still carries a
//! visited set so a malformed graph can never loop.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{PolicyError, PolicyResult};
use crate::priority::PriorityAssigner;
use crate::registry::RoleRegistry;
use crate::role::Role;

#[derive(Debug, Clone)]
pub struct HierarchyResolver {
    /// Transitive closure per role, BFS order, never containing the role itself.
    closures: HashMap<Role, Vec<Role>>,
    /// Declaration order, for deterministic output.
    order: Vec<Role>,
}

impl HierarchyResolver {
    /// Validate the graph and memoize every role's closure.
    pub fn new(registry: &RoleRegistry) -> PolicyResult<Self> {
        check_cycles(registry)?;

        let closures = registry
            .all_roles()
            .iter()
            .map(|role| (role.clone(), traverse(registry, role)))
            .collect();

        Ok(Self {
            closures,
            order: registry.all_roles().to_vec(),
        })
    }

    /// Whether `actor` may administer `target`.
    ///
    /// A role always manages itself.
    pub fn can_manage(&self, actor: &Role, target: &Role) -> bool {
        actor == target || self.closure(actor).contains(target)
    }

    /// Every role `actor` manages, directly or transitively.
    pub fn reachable_roles(&self, actor: &Role, include_self: bool) -> HashSet<Role> {
        let mut reachable: HashSet<Role> = self.closure(actor).iter().cloned().collect();
        if include_self {
            reachable.insert(actor.clone());
        }
        reachable
    }

    /// Roles `actor` may create, most privileged first.
    ///
    /// Never contains `actor`. Ties in priority fall back to declaration order.
    pub fn creatable_roles_for(&self, actor: &Role, priorities: &PriorityAssigner) -> Vec<Role> {
        let mut creatable: Vec<(i64, usize, Role)> = self
            .closure(actor)
            .iter()
            .map(|role| {
                let position = self.order.iter().position(|r| r == role).unwrap_or(usize::MAX);
                (priorities.priority_of(role), position, role.clone())
            })
            .collect();
        creatable.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        creatable.into_iter().map(|(_, _, role)| role).collect()
    }

    /// Roles that can manage `target`, excluding `target`, in declaration order.
    pub fn managers_of(&self, target: &Role) -> Vec<Role> {
        self.order
            .iter()
            .filter(|role| *role != target && self.closure(role).contains(target))
            .cloned()
            .collect()
    }

    fn closure(&self, role: &Role) -> &[Role] {
        self.closures.get(role).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Breadth-first walk from `actor`'s direct subordinates.
fn traverse(registry: &RoleRegistry, actor: &Role) -> Vec<Role> {
    let mut visited: HashSet<&Role> = HashSet::from([actor]);
    let mut queue: VecDeque<&Role> = registry.manages(actor).iter().collect();
    let mut reached = Vec::new();

    while let Some(role) = queue.pop_front() {
        if !visited.insert(role) {
            continue;
        }
        reached.push(role.clone());
        queue.extend(registry.manages(role));
    }

    reached
}

/// Depth-first search for a back edge, reporting the cycle as `A -> B -> A`.
fn check_cycles(registry: &RoleRegistry) -> PolicyResult<()> {
    fn visit<'a>(
        registry: &'a RoleRegistry,
        role: &'a Role,
        done: &mut HashSet<&'a Role>,
        stack: &mut Vec<&'a Role>,
    ) -> PolicyResult<()> {
        if done.contains(role) {
            return Ok(());
        }
        if let Some(start) = stack.iter().position(|r| *r == role) {
            let mut path: Vec<&str> = stack[start..].iter().map(|r| r.as_str()).collect();
            path.push(role.as_str());
            return Err(PolicyError::CyclicHierarchy(path.join(" -> ")));
        }

        stack.push(role);
        for next in registry.manages(role) {
            visit(registry, next, done, stack)?;
        }
        stack.pop();
        done.insert(role);
        Ok(())
    }

    let mut done = HashSet::new();
    let mut stack = Vec::new();
    for role in registry.all_roles() {
        visit(registry, role, &mut done, &mut stack)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PolicyConfig, RoleConfig};
    use crate::priority::PriorityStrategy;

    fn row(name: &str, manages: &[&str]) -> RoleConfig {
        RoleConfig {
            name: name.to_string(),
            label: name.to_string(),
            home_route: "/".to_string(),
            manages: manages.iter().map(|m| m.to_string()).collect(),
            aliases: Vec::new(),
            permissions: Vec::new(),
        }
    }

    fn registry(roles: Vec<RoleConfig>) -> RoleRegistry {
        let default_role = roles.last().map(|r| r.name.clone()).unwrap_or_default();
        RoleRegistry::from_config(&PolicyConfig {
            default_role,
            priority: PriorityStrategy::DeclarationOrder,
            roles,
            registration: Default::default(),
        })
        .unwrap()
    }

    fn reference() -> (RoleRegistry, HierarchyResolver, PriorityAssigner) {
        let config = PolicyConfig::reference().unwrap();
        let registry = RoleRegistry::from_config(&config).unwrap();
        let hierarchy = HierarchyResolver::new(&registry).unwrap();
        let priorities = PriorityAssigner::new(&registry, config.priority).unwrap();
        (registry, hierarchy, priorities)
    }

    #[test]
    fn manages_transitively_and_reflexively() {
        let (_, hierarchy, _) = reference();
        let distributor = Role::new("DISTRIBUTOR");
        assert!(hierarchy.can_manage(&distributor, &Role::new("CLIENT")));
        assert!(hierarchy.can_manage(&distributor, &distributor));
        assert!(hierarchy.can_manage(&Role::new("SUPERUSER"), &Role::new("TAQUILLA")));
        assert!(!hierarchy.can_manage(&Role::new("RESELLER"), &distributor));
        assert!(!hierarchy.can_manage(&Role::new("CLIENT"), &Role::new("TAQUILLA")));
    }

    #[test]
    fn reachable_roles_respects_include_self() {
        let (_, hierarchy, _) = reference();
        let taquilla = Role::new("TAQUILLA");
        assert_eq!(
            hierarchy.reachable_roles(&taquilla, false),
            HashSet::from([Role::new("CLIENT")])
        );
        assert_eq!(
            hierarchy.reachable_roles(&taquilla, true),
            HashSet::from([Role::new("CLIENT"), taquilla.clone()])
        );
        assert!(hierarchy.reachable_roles(&Role::new("CLIENT"), false).is_empty());
    }

    #[test]
    fn creatable_roles_are_deduplicated_and_ordered() {
        let (_, hierarchy, priorities) = reference();
        let names: Vec<String> = hierarchy
            .creatable_roles_for(&Role::new("ADMIN"), &priorities)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, ["DISTRIBUTOR", "RESELLER", "TAQUILLA", "CLIENT"]);
    }

    #[test]
    fn managers_of_lists_every_ancestor() {
        let (_, hierarchy, _) = reference();
        let names: Vec<String> = hierarchy
            .managers_of(&Role::new("RESELLER"))
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, ["SUPERUSER", "ADMIN", "DISTRIBUTOR"]);
        assert!(hierarchy.managers_of(&Role::new("SUPERUSER")).is_empty());
    }

    #[test]
    fn diamond_is_visited_once() {
        let registry = registry(vec![
            row("TOP", &["LEFT", "RIGHT"]),
            row("LEFT", &["BOTTOM"]),
            row("RIGHT", &["BOTTOM"]),
            row("BOTTOM", &[]),
        ]);
        let closure = traverse(&registry, &Role::new("TOP"));
        assert_eq!(closure.len(), 3);
    }

    #[test]
    fn traversal_terminates_on_cycles() {
        let registry = registry(vec![row("A", &["B"]), row("B", &["C"]), row("C", &["A"])]);
        let closure = traverse(&registry, &Role::new("A"));
        assert_eq!(closure, vec![Role::new("B"), Role::new("C")]);
    }

    #[test]
    fn cycles_are_rejected_with_path() {
        let registry = registry(vec![row("A", &["B"]), row("B", &["C"]), row("C", &["A"])]);
        let err = HierarchyResolver::new(&registry).unwrap_err();
        match err {
            PolicyError::CyclicHierarchy(path) => assert_eq!(path, "A -> B -> C -> A"),
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn self_edge_is_a_cycle() {
        let registry = registry(vec![row("A", &["A"])]);
        assert!(matches!(
            HierarchyResolver::new(&registry),
            Err(PolicyError::CyclicHierarchy(path)) if path == "A -> A"
        ));
    }
}
