//! Canonical role table.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::PolicyConfig;
use crate::error::{PolicyError, PolicyResult};
use crate::role::Role;

/// Static description of one canonical role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDefinition {
    pub role: Role,
    pub label: String,
    pub home_route: String,
    /// Direct subordinates, deduplicated, in configured order.
    pub manages: Vec<Role>,
}

/// Immutable set of canonical roles in declaration order.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: Vec<Role>,
    definitions: Vec<RoleDefinition>,
    index: HashMap<Role, usize>,
    default_index: usize,
}

impl RoleRegistry {
    /// Build the registry, checking names, duplicates, `manages` references
    /// and the presence of the default role.
    pub fn from_config(config: &PolicyConfig) -> PolicyResult<Self> {
        if config.roles.is_empty() {
            return Err(PolicyError::EmptyRegistry);
        }

        let mut roles = Vec::with_capacity(config.roles.len());
        let mut index = HashMap::with_capacity(config.roles.len());
        for (position, row) in config.roles.iter().enumerate() {
            if !Role::is_canonical_name(&row.name) {
                return Err(PolicyError::InvalidRoleName(row.name.clone()));
            }
            let role = Role::new(row.name.clone());
            if index.insert(role.clone(), position).is_some() {
                return Err(PolicyError::DuplicateRole(row.name.clone()));
            }
            roles.push(role);
        }

        let mut definitions = Vec::with_capacity(config.roles.len());
        for (role, row) in roles.iter().zip(&config.roles) {
            let mut manages: Vec<Role> = Vec::with_capacity(row.manages.len());
            for name in &row.manages {
                let position = *index
                    .get(name.as_str())
                    .ok_or_else(|| PolicyError::unknown_role(name.clone()))?;
                let managed = &roles[position];
                if !manages.contains(managed) {
                    manages.push(managed.clone());
                }
            }
            definitions.push(RoleDefinition {
                role: role.clone(),
                label: row.label.clone(),
                home_route: row.home_route.clone(),
                manages,
            });
        }

        let default_index = *index
            .get(config.default_role.as_str())
            .ok_or_else(|| PolicyError::MissingDefaultRole(config.default_role.clone()))?;

        Ok(Self {
            roles,
            definitions,
            index,
            default_index,
        })
    }

    /// Roles in declaration order.
    pub fn all_roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Definition of a canonical role.
    ///
    /// Only fails for a role that did not come out of this registry.
    pub fn definition_of(&self, role: &Role) -> PolicyResult<&RoleDefinition> {
        self.index
            .get(role)
            .map(|&position| &self.definitions[position])
            .ok_or_else(|| PolicyError::unknown_role(role.as_str()))
    }

    /// Definition of `role`, or of the default role if `role` is not declared.
    pub fn definition_or_default(&self, role: &Role) -> &RoleDefinition {
        let position = self.position(role).unwrap_or(self.default_index);
        &self.definitions[position]
    }

    pub fn default_role(&self) -> &Role {
        &self.roles[self.default_index]
    }

    pub fn contains(&self, role: &Role) -> bool {
        self.index.contains_key(role)
    }

    /// Canonical role whose name is exactly `name`.
    pub fn lookup(&self, name: &str) -> Option<&Role> {
        self.index.get(name).map(|&position| &self.roles[position])
    }

    /// Declaration index of `role`.
    pub fn position(&self, role: &Role) -> Option<usize> {
        self.index.get(role).copied()
    }

    /// Direct subordinates of `role`; empty for an undeclared role.
    pub fn manages(&self, role: &Role) -> &[Role] {
        self.position(role)
            .map(|position| self.definitions[position].manages.as_slice())
            .unwrap_or(&[])
    }

    pub fn definitions(&self) -> impl Iterator<Item = &RoleDefinition> {
        self.definitions.iter()
    }
}
