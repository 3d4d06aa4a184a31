//! `rolegate-policy` — role hierarchy and permission resolver.
//!
//! Pure, in-memory decision logic: no IO beyond loading the policy document,
//! no authentication, no persistence of role assignments.

pub mod action;
pub mod claims;
pub mod config;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod normalize;
pub mod permissions;
pub mod priority;
pub mod registration;
pub mod registry;
pub mod role;

pub use action::{Action, WILDCARD};
pub use claims::role_claim;
pub use config::{PolicyConfig, REFERENCE_POLICY, RegistrationConfig, RoleConfig};
pub use engine::{Decision, DecisionReason, PolicyEngine, RoleSummary};
pub use error::{PolicyError, PolicyResult};
pub use hierarchy::HierarchyResolver;
pub use normalize::{RoleLike, RoleNormalizer};
pub use permissions::{PermissionMatrix, PermissionSet};
pub use priority::{PRIORITY_STEP, PriorityAssigner, PriorityStrategy};
pub use registration::RegistrationRules;
pub use registry::{RoleDefinition, RoleRegistry};
pub use role::{ROLE_PREFIX, Role};
