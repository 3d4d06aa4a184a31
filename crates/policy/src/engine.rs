//! Public facade over the role policy.
//!
//! Construction validates the whole policy and is the only fallible step.
//! Every query afterwards is total: unrecognized input behaves exactly like
//! the default (least-privileged) role.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::config::PolicyConfig;
use crate::error::PolicyResult;
use crate::hierarchy::HierarchyResolver;
use crate::normalize::{RoleLike, RoleNormalizer};
use crate::permissions::{PermissionMatrix, PermissionSet};
use crate::priority::PriorityAssigner;
use crate::registry::{RoleDefinition, RoleRegistry};
use crate::role::Role;

/// Immutable, validated role policy. Cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    registry: RoleRegistry,
    normalizer: RoleNormalizer,
    hierarchy: HierarchyResolver,
    priorities: PriorityAssigner,
    permissions: PermissionMatrix,
}

/// Outcome of a permission check with the facts that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Canonical role the input resolved to.
    pub role: Role,
    pub action: String,
    pub granted: bool,
    pub reason: DecisionReason,
    /// The input was not recognized and the default role was used.
    pub fell_back: bool,
    /// On denial, roles whose permission set would allow the action.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub granted_to: Vec<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Wildcard,
    ExplicitGrant,
    NotGranted,
}

/// Audit view of one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleSummary {
    pub role: Role,
    pub label: String,
    pub home_route: String,
    pub priority: i64,
    pub manages: Vec<Role>,
    pub creatable: Vec<Role>,
    pub permissions: PermissionSet,
}

impl PolicyEngine {
    /// Validate `config` and build the engine.
    pub fn from_config(config: &PolicyConfig) -> PolicyResult<Self> {
        let registry = RoleRegistry::from_config(config)?;
        let normalizer = RoleNormalizer::from_config(config, &registry)?;
        let hierarchy = HierarchyResolver::new(&registry)?;
        let priorities = PriorityAssigner::new(&registry, config.priority)?;
        let permissions = PermissionMatrix::from_config(config, &registry)?;

        tracing::info!(
            roles = registry.len(),
            aliases = normalizer.alias_count(),
            wildcard_roles = permissions.wildcard_count(),
            default_role = %registry.default_role(),
            priority = ?priorities.strategy(),
            "Loaded role policy"
        );

        Ok(Self {
            registry,
            normalizer,
            hierarchy,
            priorities,
            permissions,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> PolicyResult<Self> {
        Self::from_config(&PolicyConfig::from_path(path)?)
    }

    /// Engine over the bundled reference policy.
    pub fn reference() -> PolicyResult<Self> {
        Self::from_config(&PolicyConfig::reference()?)
    }

    pub fn normalize(&self, input: impl RoleLike) -> Role {
        self.normalizer.normalize(input)
    }

    pub fn can_manage(&self, actor: impl RoleLike, target: impl RoleLike) -> bool {
        self.hierarchy
            .can_manage(&self.normalize(actor), &self.normalize(target))
    }

    /// Whether `actor` may create an account with role `target`.
    ///
    /// Unlike [`Self::can_manage`], a role can never create its own role.
    pub fn can_create(&self, actor: impl RoleLike, target: impl RoleLike) -> bool {
        let actor = self.normalize(actor);
        let target = self.normalize(target);
        actor != target && self.hierarchy.can_manage(&actor, &target)
    }

    pub fn at_least(&self, actor: impl RoleLike, minimum: impl RoleLike) -> bool {
        self.priorities
            .at_least(&self.normalize(actor), &self.normalize(minimum))
    }

    pub fn priority_of(&self, role: impl RoleLike) -> i64 {
        self.priorities.priority_of(&self.normalize(role))
    }

    pub fn reachable_roles(&self, actor: impl RoleLike, include_self: bool) -> HashSet<Role> {
        self.hierarchy
            .reachable_roles(&self.normalize(actor), include_self)
    }

    /// Roles `actor` may create, most privileged first, for role pickers.
    pub fn creatable_roles_for(&self, actor: impl RoleLike) -> Vec<Role> {
        self.hierarchy
            .creatable_roles_for(&self.normalize(actor), &self.priorities)
    }

    pub fn managers_of(&self, target: impl RoleLike) -> Vec<Role> {
        self.hierarchy.managers_of(&self.normalize(target))
    }

    /// Whether `role` may perform `action`. Unknown actions are denied.
    pub fn can(&self, role: impl RoleLike, action: &str) -> bool {
        self.permissions.allows(&self.normalize(role), action)
    }

    pub fn permissions_for(&self, role: impl RoleLike) -> &PermissionSet {
        self.permissions.permission_set(&self.normalize(role))
    }

    /// Same decision as [`Self::can`], with the reasoning attached.
    pub fn explain(&self, role: impl RoleLike, action: &str) -> Decision {
        let fell_back = !self.normalizer.recognizes(&role);
        let role = self.normalize(role);
        let set = self.permissions.permission_set(&role);

        let (granted, reason) = match set {
            PermissionSet::All => (true, DecisionReason::Wildcard),
            PermissionSet::Only(_) if set.allows(action) => (true, DecisionReason::ExplicitGrant),
            PermissionSet::Only(_) => (false, DecisionReason::NotGranted),
        };

        let granted_to = if granted {
            Vec::new()
        } else {
            tracing::debug!(role = %role, action, fell_back, "action denied");
            self.registry
                .all_roles()
                .iter()
                .filter(|candidate| self.permissions.allows(candidate, action))
                .cloned()
                .collect()
        };

        Decision {
            role,
            action: action.to_string(),
            granted,
            reason,
            fell_back,
            granted_to,
        }
    }

    /// Post-login landing route.
    pub fn home_route_for(&self, role: impl RoleLike) -> &str {
        &self
            .registry
            .definition_or_default(&self.normalize(role))
            .home_route
    }

    /// Human-readable role name.
    pub fn label_for(&self, role: impl RoleLike) -> &str {
        &self
            .registry
            .definition_or_default(&self.normalize(role))
            .label
    }

    pub fn definition_of(&self, role: &Role) -> PolicyResult<&RoleDefinition> {
        self.registry.definition_of(role)
    }

    pub fn all_roles(&self) -> &[Role] {
        self.registry.all_roles()
    }

    pub fn default_role(&self) -> &Role {
        self.registry.default_role()
    }

    /// Every role with its derived data, in declaration order.
    pub fn describe(&self) -> Vec<RoleSummary> {
        self.registry
            .definitions()
            .map(|definition| RoleSummary {
                role: definition.role.clone(),
                label: definition.label.clone(),
                home_route: definition.home_route.clone(),
                priority: self.priorities.priority_of(&definition.role),
                manages: definition.manages.clone(),
                creatable: self
                    .hierarchy
                    .creatable_roles_for(&definition.role, &self.priorities),
                permissions: self.permissions.permission_set(&definition.role).clone(),
            })
            .collect()
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn hierarchy(&self) -> &HierarchyResolver {
        &self.hierarchy
    }

    pub fn priorities(&self) -> &PriorityAssigner {
        &self.priorities
    }

    pub fn permissions(&self) -> &PermissionMatrix {
        &self.permissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> PolicyEngine {
        PolicyEngine::reference().unwrap()
    }

    #[test]
    fn home_route_and_label_follow_normalization() {
        let engine = engine();
        assert_eq!(engine.home_route_for("ROLE_ADMIN"), "/dashboard/admin");
        assert_eq!(engine.home_route_for(None::<&str>), "/");
        assert_eq!(engine.label_for("distribuidor"), "Distributor");
        assert_eq!(engine.label_for(&Role::new("TAQUILLA")), "Taquilla");
    }

    #[test]
    fn can_create_excludes_self_but_can_manage_does_not() {
        let engine = engine();
        assert!(engine.can_manage("RESELLER", "RESELLER"));
        assert!(!engine.can_create("RESELLER", "RESELLER"));
        assert!(engine.can_create("RESELLER", "TAQUILLA"));
        assert!(!engine.can_create("RESELLER", "DISTRIBUTOR"));
    }

    #[test]
    fn unknown_actor_behaves_as_default_role() {
        let engine = engine();
        assert_eq!(engine.creatable_roles_for("hacker"), engine.creatable_roles_for("CLIENT"));
        assert!(!engine.can("hacker", "users:create"));
        assert!(engine.can("hacker", "products:read"));
        assert!(!engine.at_least("hacker", "TAQUILLA"));
    }

    #[test]
    fn explain_wildcard_grant() {
        let decision = engine().explain("role_superuser", "payments:methods:write");
        assert!(decision.granted);
        assert_eq!(decision.reason, DecisionReason::Wildcard);
        assert!(!decision.fell_back);
        assert!(decision.granted_to.is_empty());
    }

    #[test]
    fn explain_denial_lists_granting_roles() {
        let decision = engine().explain("ADMIN", "products:write");
        assert!(!decision.granted);
        assert_eq!(decision.reason, DecisionReason::NotGranted);
        assert_eq!(decision.granted_to, vec![Role::new("SUPERUSER")]);
    }

    #[test]
    fn explain_marks_fallback() {
        let decision = engine().explain(json!(null), "orders:create");
        assert_eq!(decision.role.as_str(), "CLIENT");
        assert!(decision.fell_back);
        assert!(decision.granted);
        assert_eq!(decision.reason, DecisionReason::ExplicitGrant);
    }

    #[test]
    fn describe_lists_roles_in_declaration_order() {
        let summaries = engine().describe();
        assert_eq!(summaries.len(), 6);
        assert_eq!(summaries[0].role.as_str(), "SUPERUSER");
        assert_eq!(summaries[0].priority, 60);
        assert!(summaries[0].permissions.is_wildcard());
        assert_eq!(summaries[5].role.as_str(), "CLIENT");
        assert!(summaries[5].creatable.is_empty());

        let json = serde_json::to_value(&summaries[0]).unwrap();
        assert_eq!(json["permissions"], json!(["*"]));
        assert_eq!(json["manages"], json!(["ADMIN"]));
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PolicyEngine>();
    }

    mod proptest_tests {
        use super::*;
        use crate::config::RoleConfig;
        use crate::priority::PriorityStrategy;
        use proptest::prelude::*;

        /// Random acyclic role tables.
        ///
        /// Each declared role gets a distinct topological rank and may only
        /// manage roles of higher rank. Declaration-order policies use the
        /// declaration index as the rank; graph-depth policies use a shuffled
        /// rank, so managers can be declared after the roles they manage.
        fn acyclic_policy() -> impl Strategy<Value = PolicyConfig> {
            (2usize..9)
                .prop_flat_map(|n| {
                    (
                        Just((0..n).collect::<Vec<usize>>()).prop_shuffle(),
                        prop::collection::vec(any::<bool>(), n * n),
                        any::<bool>(),
                    )
                })
                .prop_map(|(shuffled, edges, by_depth)| {
                    let n = shuffled.len();
                    let rank: Vec<usize> = if by_depth { shuffled } else { (0..n).collect() };
                    let roles = (0..n)
                        .map(|k| RoleConfig {
                            name: format!("R{k}"),
                            label: format!("Role {k}"),
                            home_route: format!("/r{k}"),
                            manages: (0..n)
                                .filter(|&m| rank[m] > rank[k] && edges[k * n + m])
                                .map(|m| format!("R{m}"))
                                .collect(),
                            aliases: Vec::new(),
                            permissions: Vec::new(),
                        })
                        .collect();
                    PolicyConfig {
                        default_role: "R0".to_string(),
                        priority: if by_depth {
                            PriorityStrategy::GraphDepth
                        } else {
                            PriorityStrategy::DeclarationOrder
                        },
                        roles,
                        registration: Default::default(),
                    }
                })
        }

        fn role_token() -> impl Strategy<Value = String> {
            prop_oneof![
                "[A-Za-z_ ]{0,16}",
                prop::sample::select(vec![
                    "SUPERUSER", "admin", "ROLE_ADMIN", "Distribuidor", "cliente",
                    "ROLE_", "role_taquillero", " reseller ", "",
                ])
                .prop_map(str::to_string),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: normalizing a canonical role is a no-op.
            #[test]
            fn normalize_is_idempotent(token in role_token()) {
                let engine = engine();
                let once = engine.normalize(&token);
                prop_assert_eq!(engine.normalize(&once), once);
            }

            /// Property: every input resolves to a declared role.
            #[test]
            fn normalize_is_total(token in ".*") {
                let engine = engine();
                let role = engine.normalize(&token);
                prop_assert!(engine.registry().contains(&role));
            }

            /// Property: the prefix never changes the outcome.
            #[test]
            fn prefix_is_transparent(token in "[A-Za-z]{1,12}") {
                let engine = engine();
                prop_assert_eq!(
                    engine.normalize(format!("ROLE_{token}")),
                    engine.normalize(&token)
                );
            }

            /// Property: explain agrees with can for arbitrary actions.
            #[test]
            fn explain_matches_can(token in role_token(), action in "[a-z]{1,8}(:[a-z]{1,8}){0,2}") {
                let engine = engine();
                prop_assert_eq!(engine.explain(&token, &action).granted, engine.can(&token, &action));
            }

            /// Property: the wildcard role is granted any action at all.
            #[test]
            fn wildcard_grants_anything(action in ".+") {
                prop_assert!(engine().can("SUPERUSER", &action));
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: management is reflexive and transitive on any acyclic table.
            #[test]
            fn management_is_transitive(config in acyclic_policy()) {
                let engine = PolicyEngine::from_config(&config).unwrap();
                let roles = engine.all_roles();
                for a in roles {
                    prop_assert!(engine.can_manage(a, a));
                    for b in roles {
                        for c in roles {
                            if engine.can_manage(a, b) && engine.can_manage(b, c) {
                                prop_assert!(engine.can_manage(a, c), "{} -> {} -> {}", a, b, c);
                            }
                        }
                    }
                }
            }

            /// Property: a direct manages edge always lowers priority, and
            /// priorities are pairwise distinct.
            #[test]
            fn direct_edges_decrease_priority(config in acyclic_policy()) {
                let engine = PolicyEngine::from_config(&config).unwrap();
                let mut seen = HashSet::new();
                for role in engine.all_roles() {
                    prop_assert!(seen.insert(engine.priority_of(role)));
                    for managed in engine.registry().manages(role) {
                        prop_assert!(
                            engine.priority_of(role) > engine.priority_of(managed),
                            "{} manages {}", role, managed
                        );
                    }
                }
            }

            /// Property: creatable roles are the closure without the actor,
            /// free of duplicates, most privileged first.
            #[test]
            fn creatable_roles_are_the_closure(config in acyclic_policy()) {
                let engine = PolicyEngine::from_config(&config).unwrap();
                for role in engine.all_roles() {
                    let creatable = engine.creatable_roles_for(role);
                    prop_assert!(!creatable.contains(role));

                    let unique: HashSet<Role> = creatable.iter().cloned().collect();
                    prop_assert_eq!(unique.len(), creatable.len());
                    prop_assert_eq!(unique, engine.reachable_roles(role, false));

                    let priorities: Vec<i64> =
                        creatable.iter().map(|r| engine.priority_of(r)).collect();
                    prop_assert!(priorities.windows(2).all(|w| w[0] > w[1]));
                }
            }
        }
    }
}
