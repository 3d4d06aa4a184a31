//! Self-signup rules.
//!
//! Which role a self-registered account receives, and which role owns such
//! accounts, are business rules of the registration workflow. They are loaded
//! alongside the policy but are not consulted by [`crate::PolicyEngine`].

use crate::config::PolicyConfig;
use crate::error::{PolicyError, PolicyResult};
use crate::registry::RoleRegistry;
use crate::role::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRules {
    self_signup_role: Role,
    self_signup_owner: Option<Role>,
}

impl RegistrationRules {
    /// Resolve the registration section against the registry. Names must be
    /// canonical; aliases are not accepted here.
    pub fn from_config(config: &PolicyConfig, registry: &RoleRegistry) -> PolicyResult<Self> {
        let resolve = |name: &String| {
            registry
                .lookup(name)
                .cloned()
                .ok_or_else(|| PolicyError::unknown_role(name.clone()))
        };

        let self_signup_role = match &config.registration.self_signup_role {
            Some(name) => resolve(name)?,
            None => registry.default_role().clone(),
        };
        let self_signup_owner = config
            .registration
            .self_signup_owner
            .as_ref()
            .map(resolve)
            .transpose()?;

        Ok(Self {
            self_signup_role,
            self_signup_owner,
        })
    }

    pub fn self_signup_role(&self) -> &Role {
        &self.self_signup_role
    }

    /// Role that owns self-registered accounts, if the policy names one.
    pub fn self_signup_owner(&self) -> Option<&Role> {
        self.self_signup_owner.as_ref()
    }
}
