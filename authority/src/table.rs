//! Grant table configuration.
//!
//! The grant table is versioned data, loaded through one typed loader and
//! validated as a whole before it is turned into a [`crate::RoleAuthorityMatrix`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ids::RoleId;
use crate::types::{AuthorityGrant, Role};

/// A consistency problem found in a grant table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantIssue {
    /// Role defined more than once
    #[error("Role '{role}' is defined more than once")]
    DuplicateRole { role: RoleId },

    /// Grant names a source role that is not defined
    #[error("Grant {source_role} -> {target_role} references unknown source role")]
    UnknownSourceRole {
        source_role: RoleId,
        target_role: RoleId,
    },

    /// Grant names a target role that is not defined
    #[error("Grant {source_role} -> {target_role} references unknown target role")]
    UnknownTargetRole {
        source_role: RoleId,
        target_role: RoleId,
    },

    /// More than one grant for the same ordered pair
    #[error("Grant {source_role} -> {target_role} is defined {count} times")]
    DuplicateGrant {
        source_role: RoleId,
        target_role: RoleId,
        count: usize,
    },

    /// Bypass set names a role that is not defined
    #[error("Bypass role '{role}' is not defined")]
    UnknownBypassRole { role: RoleId },
}

/// Versioned grant configuration document.
///
/// ```yaml
/// version: "2024.05"
/// roles:
///   - id: admin
///     display_name: Administrator
///   - id: supervisor
///     display_name: Shift Supervisor
///   - id: operator
///     display_name: Machine Operator
/// bypass_roles: [admin]
/// grants:
///   - source_role: supervisor
///     target_role: operator
///     can_view: true
///     can_score: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantTable {
    /// Version label of this table
    #[serde(default)]
    pub version: String,
    /// Role definitions
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Roles that pass every authority check
    #[serde(default)]
    pub bypass_roles: Vec<RoleId>,
    /// Authority grants
    #[serde(default)]
    pub grants: Vec<AuthorityGrant>,
}

impl GrantTable {
    /// Load a grant table from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Builder: set version label.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Builder: add a role definition.
    pub fn with_role(mut self, id: RoleId, display_name: impl Into<String>) -> Self {
        self.roles.push(Role {
            id,
            display_name: display_name.into(),
        });
        self
    }

    /// Builder: add a bypass role.
    pub fn with_bypass(mut self, role: RoleId) -> Self {
        self.bypass_roles.push(role);
        self
    }

    /// Builder: add a grant.
    pub fn with_grant(mut self, grant: AuthorityGrant) -> Self {
        self.grants.push(grant);
        self
    }

    /// Check the table for internal consistency.
    ///
    /// Issues are reported in table order: roles, bypass set, then grants.
    pub fn validate(&self) -> Vec<GrantIssue> {
        let mut issues = Vec::new();

        let mut defined: HashSet<&RoleId> = HashSet::new();
        for role in &self.roles {
            if !defined.insert(&role.id) {
                issues.push(GrantIssue::DuplicateRole {
                    role: role.id.clone(),
                });
            }
        }

        for role in &self.bypass_roles {
            if !defined.contains(role) {
                issues.push(GrantIssue::UnknownBypassRole { role: role.clone() });
            }
        }

        let mut pair_counts: HashMap<(&RoleId, &RoleId), usize> = HashMap::new();
        for grant in &self.grants {
            *pair_counts
                .entry((&grant.source_role, &grant.target_role))
                .or_default() += 1;
        }

        let mut reported_duplicates: HashSet<(&RoleId, &RoleId)> = HashSet::new();
        for grant in &self.grants {
            if !defined.contains(&grant.source_role) {
                issues.push(GrantIssue::UnknownSourceRole {
                    source_role: grant.source_role.clone(),
                    target_role: grant.target_role.clone(),
                });
            }
            if !defined.contains(&grant.target_role) {
                issues.push(GrantIssue::UnknownTargetRole {
                    source_role: grant.source_role.clone(),
                    target_role: grant.target_role.clone(),
                });
            }

            let pair = (&grant.source_role, &grant.target_role);
            let count = pair_counts.get(&pair).copied().unwrap_or(0);
            if count > 1 && reported_duplicates.insert(pair) {
                issues.push(GrantIssue::DuplicateGrant {
                    source_role: grant.source_role.clone(),
                    target_role: grant.target_role.clone(),
                    count,
                });
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(raw: &str) -> RoleId {
        RoleId::parse(raw).unwrap()
    }

    fn grant(source: &str, target: &str) -> AuthorityGrant {
        AuthorityGrant {
            source_role: role(source),
            target_role: role(target),
            can_view: true,
            can_score: false,
            can_approve: false,
        }
    }

    #[test]
    fn test_yaml_load() {
        let yaml = r#"
version: "2024.05"
roles:
  - id: Supervisor
    display_name: Shift Supervisor
  - id: operator
    display_name: Machine Operator
grants:
  - source_role: supervisor
    target_role: OPERATOR
    can_view: true
    can_score: true
"#;
        let table = GrantTable::from_yaml(yaml).unwrap();
        assert_eq!(table.version, "2024.05");
        assert_eq!(table.roles[0].id, role("supervisor"));
        assert!(table.grants[0].can_score);
        assert!(!table.grants[0].can_approve);
        assert!(table.validate().is_empty());
    }

    #[test]
    fn test_yaml_rejects_malformed_role_id() {
        let yaml = r#"
roles:
  - id: "shift supervisor"
    display_name: Shift Supervisor
"#;
        assert!(GrantTable::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_validate_reports_dangling_references() {
        let table = GrantTable::default()
            .with_role(role("supervisor"), "Supervisor")
            .with_bypass(role("root"))
            .with_grant(grant("supervisor", "welder"))
            .with_grant(grant("inspector", "supervisor"));

        let issues = table.validate();
        assert_eq!(issues.len(), 3);
        assert!(issues.contains(&GrantIssue::UnknownBypassRole { role: role("root") }));
        assert!(issues.contains(&GrantIssue::UnknownTargetRole {
            source_role: role("supervisor"),
            target_role: role("welder"),
        }));
        assert!(issues.contains(&GrantIssue::UnknownSourceRole {
            source_role: role("inspector"),
            target_role: role("supervisor"),
        }));
    }

    #[test]
    fn test_validate_reports_duplicates_once() {
        let table = GrantTable::default()
            .with_role(role("supervisor"), "Supervisor")
            .with_role(role("operator"), "Operator")
            .with_role(role("operator"), "Operator (again)")
            .with_grant(grant("supervisor", "operator"))
            .with_grant(grant("supervisor", "operator"))
            .with_grant(grant("supervisor", "operator"));

        let issues = table.validate();
        assert_eq!(
            issues,
            vec![
                GrantIssue::DuplicateRole {
                    role: role("operator")
                },
                GrantIssue::DuplicateGrant {
                    source_role: role("supervisor"),
                    target_role: role("operator"),
                    count: 3,
                },
            ]
        );
    }
}
