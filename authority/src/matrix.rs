//! The role authority matrix.
//!
//! Built once from a [`GrantTable`] and shared read-only across requests.
//! Every authority decision in the system, bypass included, is made here.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::ids::RoleId;
use crate::table::{GrantIssue, GrantTable};
use crate::types::{Action, AuthorityGrant, Capabilities, Role};

/// Error types for matrix construction.
#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    /// Grant table failed validation
    #[error("Grant table '{version}' has {} issue(s)", issues.len())]
    InvalidGrantTable {
        version: String,
        issues: Vec<GrantIssue>,
    },

    /// Grant table could not be parsed
    #[error("Failed to parse grant table: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Outcome of a lenient matrix load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Issues found; the offending entries were dropped
    pub issues: Vec<GrantIssue>,
    /// Grants that made it into the matrix
    pub effective_grants: usize,
    /// Grants dropped because of issues
    pub dropped_grants: usize,
}

impl LoadReport {
    /// Whether the table loaded without any drift.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Per-(acting role, target role) authority lookup with default-deny semantics.
#[derive(Debug, Clone, Default)]
pub struct RoleAuthorityMatrix {
    /// Version label of the source table
    version: String,
    /// Known roles
    roles: BTreeMap<RoleId, Role>,
    /// Effective grants, indexed source -> target
    grants: HashMap<RoleId, HashMap<RoleId, AuthorityGrant>>,
    /// Roles that pass every check
    bypass: BTreeSet<RoleId>,
    /// SHA256 over the canonical effective content
    fingerprint: String,
}

impl RoleAuthorityMatrix {
    /// A matrix that denies everything.
    pub fn deny_all() -> Self {
        let mut matrix = Self::default();
        matrix.fingerprint = matrix.compute_fingerprint();
        matrix
    }

    /// Build a matrix, dropping anything the table gets wrong.
    ///
    /// Dangling role references and duplicated pairs fail closed: the grant
    /// is left out, and each issue is logged as configuration drift.
    pub fn from_table(table: &GrantTable) -> (Self, LoadReport) {
        let issues = table.validate();
        for issue in &issues {
            warn!(version = %table.version, issue = %issue, "Grant table drift");
        }

        let mut roles = BTreeMap::new();
        for role in &table.roles {
            roles.entry(role.id.clone()).or_insert_with(|| role.clone());
        }

        let bypass: BTreeSet<RoleId> = table
            .bypass_roles
            .iter()
            .filter(|r| roles.contains_key(*r))
            .cloned()
            .collect();

        let duplicated: HashSet<(&RoleId, &RoleId)> = issues
            .iter()
            .filter_map(|issue| match issue {
                GrantIssue::DuplicateGrant {
                    source_role,
                    target_role,
                    ..
                } => Some((source_role, target_role)),
                _ => None,
            })
            .collect();

        let mut grants: HashMap<RoleId, HashMap<RoleId, AuthorityGrant>> = HashMap::new();
        let mut effective = 0;
        for grant in &table.grants {
            let known = roles.contains_key(&grant.source_role)
                && roles.contains_key(&grant.target_role);
            if !known || duplicated.contains(&(&grant.source_role, &grant.target_role)) {
                continue;
            }
            grants
                .entry(grant.source_role.clone())
                .or_default()
                .insert(grant.target_role.clone(), grant.clone());
            effective += 1;
        }

        let mut matrix = Self {
            version: table.version.clone(),
            roles,
            grants,
            bypass,
            fingerprint: String::new(),
        };
        matrix.fingerprint = matrix.compute_fingerprint();

        let report = LoadReport {
            dropped_grants: table.grants.len() - effective,
            effective_grants: effective,
            issues,
        };

        info!(
            version = %matrix.version,
            roles = matrix.roles.len(),
            grants = report.effective_grants,
            dropped = report.dropped_grants,
            bypass = matrix.bypass.len(),
            fingerprint = %matrix.fingerprint,
            "Loaded role authority matrix"
        );

        (matrix, report)
    }

    /// Build a matrix, rejecting the table if it has any issue.
    pub fn from_table_strict(table: &GrantTable) -> Result<Self, AuthorityError> {
        let issues = table.validate();
        if !issues.is_empty() {
            return Err(AuthorityError::InvalidGrantTable {
                version: table.version.clone(),
                issues,
            });
        }
        Ok(Self::from_table(table).0)
    }

    /// Parse YAML and build strictly.
    pub fn from_yaml_strict(yaml: &str) -> Result<Self, AuthorityError> {
        let table = GrantTable::from_yaml(yaml)?;
        Self::from_table_strict(&table)
    }

    /// Whether a holder of `acting` may perform `action` on a holder of `target`.
    ///
    /// Bypass roles always pass. Otherwise the grant for the exact pair
    /// decides, and a missing grant denies.
    pub fn can(&self, acting: &RoleId, target: &RoleId, action: Action) -> bool {
        if self.is_bypass(acting) {
            return true;
        }
        self.grant(acting, target)
            .map(|g| g.permits(action))
            .unwrap_or(false)
    }

    /// All three capabilities for one role pair.
    pub fn capabilities(&self, acting: &RoleId, target: &RoleId) -> Capabilities {
        if self.is_bypass(acting) {
            return Capabilities::all();
        }
        self.grant(acting, target)
            .map(AuthorityGrant::capabilities)
            .unwrap_or_default()
    }

    /// Union of capabilities over every (acting, target) role combination.
    ///
    /// Role grants are additive: holding one more role never removes access.
    pub fn capabilities_for(&self, acting: &[RoleId], target: &[RoleId]) -> Capabilities {
        if acting.iter().any(|r| self.is_bypass(r)) {
            return Capabilities::all();
        }
        acting
            .iter()
            .flat_map(|a| target.iter().map(move |t| (a, t)))
            .fold(Capabilities::default(), |caps, (a, t)| {
                caps.union(self.capabilities(a, t))
            })
    }

    /// Whether a user holding `roles` may perform `action` on their own submissions.
    ///
    /// Viewing one's own ledger is always allowed. Scoring or approving
    /// oneself requires a bypass role, whatever the grants say.
    pub fn permits_self(&self, roles: &[RoleId], action: Action) -> bool {
        match action {
            Action::View => true,
            Action::Score | Action::Approve => roles.iter().any(|r| self.is_bypass(r)),
        }
    }

    /// Whether the role is in the configured bypass set.
    pub fn is_bypass(&self, role: &RoleId) -> bool {
        self.bypass.contains(role)
    }

    /// The grant for an exact pair, if any.
    pub fn grant(&self, acting: &RoleId, target: &RoleId) -> Option<&AuthorityGrant> {
        self.grants.get(acting).and_then(|targets| targets.get(target))
    }

    /// Grants held by a role, ordered by target role.
    pub fn grants_from(&self, acting: &RoleId) -> Vec<&AuthorityGrant> {
        let mut grants: Vec<&AuthorityGrant> = self
            .grants
            .get(acting)
            .map(|targets| targets.values().collect())
            .unwrap_or_default();
        grants.sort_by(|a, b| a.target_role.cmp(&b.target_role));
        grants
    }

    /// Look up a role definition.
    pub fn role(&self, id: &RoleId) -> Option<&Role> {
        self.roles.get(id)
    }

    /// All known roles, ordered by id.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    /// Number of effective grants.
    pub fn grant_count(&self) -> usize {
        self.grants.values().map(HashMap::len).sum()
    }

    /// Version label of the table this matrix was built from.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Fingerprint of the effective configuration, for audit.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn compute_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"version:");
        hasher.update(self.version.as_bytes());

        for role in self.roles.values() {
            hasher.update(b"\nrole:");
            hasher.update(role.id.as_str().as_bytes());
            hasher.update(b"=");
            hasher.update(role.display_name.as_bytes());
        }

        for role in &self.bypass {
            hasher.update(b"\nbypass:");
            hasher.update(role.as_str().as_bytes());
        }

        // Sort pairs for deterministic hashing
        let mut pairs: Vec<&AuthorityGrant> =
            self.grants.values().flat_map(HashMap::values).collect();
        pairs.sort_by(|a, b| {
            (&a.source_role, &a.target_role).cmp(&(&b.source_role, &b.target_role))
        });

        for grant in pairs {
            let flags = [grant.can_view, grant.can_score, grant.can_approve]
                .map(|f| if f { '1' } else { '0' });
            hasher.update(b"\ngrant:");
            hasher.update(grant.source_role.as_str().as_bytes());
            hasher.update(b">");
            hasher.update(grant.target_role.as_str().as_bytes());
            hasher.update(b":");
            hasher.update(flags.iter().collect::<String>().as_bytes());
        }

        hex::encode(hasher.finalize())
    }
}
