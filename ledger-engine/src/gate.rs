//! Authorization gate.
//!
//! Composes role resolution with matrix decisions. Every read of another
//! user's records and every permission check on the mutation path goes
//! through [`AuthorizationGate::authorize`].

use std::sync::Arc;

use authority::{Action, RoleAuthorityMatrix, RoleId, UserId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Denied, EngineError};
use crate::source::RoleDirectory;

/// Why a request was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessBasis {
    /// A user viewing their own records
    SelfView,
    /// A user acting on their own records through a bypass role
    SelfBypass,
    /// The actor holds a bypass role
    Bypass,
    /// At least one (acting role, target role) grant permits the action
    Grant,
}

/// Resolves users to roles and asks the matrix.
pub struct AuthorizationGate {
    directory: Arc<dyn RoleDirectory>,
}

impl AuthorizationGate {
    /// Create a gate over a role directory.
    pub fn new(directory: Arc<dyn RoleDirectory>) -> Self {
        Self { directory }
    }

    /// Decide whether `acting` may perform `action` on `target`'s records.
    ///
    /// Grants are a union over every role pair. An unknown actor is never
    /// permitted; an unknown target is reported as not found. A directory
    /// failure is an error, not a denial.
    pub async fn authorize(
        &self,
        matrix: &RoleAuthorityMatrix,
        acting: &UserId,
        target: &UserId,
        action: Action,
    ) -> Result<AccessBasis, EngineError> {
        if acting == target {
            return self.authorize_self(matrix, acting, action).await;
        }

        let (acting_roles, target_roles) =
            futures::try_join!(self.directory.roles_of(acting), self.directory.roles_of(target))
                .map_err(EngineError::RoleResolution)?;

        let Some(acting_roles) = acting_roles else {
            debug!(acting = %acting, "Unknown acting user");
            return Err(Denied::NotPermitted { action }.into());
        };
        let Some(target_roles) = target_roles else {
            return Err(Denied::TargetNotFound {
                target: target.clone(),
            }
            .into());
        };

        if !matrix.capabilities_for(&acting_roles, &target_roles).allows(action) {
            return Err(Denied::NotPermitted { action }.into());
        }

        if holds_bypass(matrix, &acting_roles) {
            Ok(AccessBasis::Bypass)
        } else {
            Ok(AccessBasis::Grant)
        }
    }

    async fn authorize_self(
        &self,
        matrix: &RoleAuthorityMatrix,
        user: &UserId,
        action: Action,
    ) -> Result<AccessBasis, EngineError> {
        if action == Action::View {
            return Ok(AccessBasis::SelfView);
        }

        let roles = self
            .directory
            .roles_of(user)
            .await
            .map_err(EngineError::RoleResolution)?
            .unwrap_or_default();

        if matrix.permits_self(&roles, action) {
            Ok(AccessBasis::SelfBypass)
        } else {
            Err(Denied::NotPermitted { action }.into())
        }
    }
}

fn holds_bypass(matrix: &RoleAuthorityMatrix, roles: &[RoleId]) -> bool {
    roles.iter().any(|r| matrix.is_bypass(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryStore;
    use authority::{AuthorityGrant, GrantTable};

    fn role(id: &str) -> RoleId {
        RoleId::parse(id).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    fn matrix() -> RoleAuthorityMatrix {
        let table = GrantTable::default()
            .with_version("test")
            .with_role(role("admin"), "Administrator")
            .with_role(role("supervisor"), "Shift supervisor")
            .with_role(role("inspector"), "Quality inspector")
            .with_role(role("operator"), "Machine operator")
            .with_bypass(role("admin"))
            .with_grant(AuthorityGrant {
                source_role: role("supervisor"),
                target_role: role("operator"),
                can_view: true,
                can_score: true,
                can_approve: false,
            })
            .with_grant(AuthorityGrant {
                source_role: role("inspector"),
                target_role: role("operator"),
                can_view: false,
                can_score: false,
                can_approve: true,
            });
        RoleAuthorityMatrix::from_table_strict(&table).unwrap()
    }

    fn gate() -> (AuthorizationGate, Arc<InMemoryStore>) {
        let store = Arc::new(
            InMemoryStore::new()
                .with_user(user("boss"), vec![role("admin")])
                .with_user(user("sup"), vec![role("supervisor")])
                .with_user(user("lead"), vec![role("supervisor"), role("inspector")])
                .with_user(user("op"), vec![role("operator")])
                .with_user(user("op2"), vec![role("operator")])
                .with_user(user("drifter"), vec![]),
        );
        (AuthorizationGate::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_grant_permits() {
        let (gate, _) = gate();
        let basis = gate
            .authorize(&matrix(), &user("sup"), &user("op"), Action::Score)
            .await
            .unwrap();
        assert_eq!(basis, AccessBasis::Grant);
    }

    #[tokio::test]
    async fn test_missing_capability_is_not_permitted() {
        let (gate, _) = gate();
        let err = gate
            .authorize(&matrix(), &user("sup"), &user("op"), Action::Approve)
            .await
            .unwrap_err();
        assert_eq!(
            err.denied(),
            Some(&Denied::NotPermitted {
                action: Action::Approve
            })
        );
    }

    #[tokio::test]
    async fn test_roles_are_additive() {
        let (gate, _) = gate();
        let m = matrix();
        for action in Action::all() {
            tokio_test::assert_ok!(gate.authorize(&m, &user("lead"), &user("op"), action).await);
        }
    }

    #[tokio::test]
    async fn test_no_grant_denies_peers() {
        let (gate, _) = gate();
        let m = matrix();
        for action in Action::all() {
            let err = gate
                .authorize(&m, &user("op"), &user("op2"), action)
                .await
                .unwrap_err();
            assert!(matches!(err.denied(), Some(Denied::NotPermitted { .. })));
        }
    }

    #[tokio::test]
    async fn test_bypass() {
        let (gate, _) = gate();
        let basis = gate
            .authorize(&matrix(), &user("boss"), &user("sup"), Action::Approve)
            .await
            .unwrap();
        assert_eq!(basis, AccessBasis::Bypass);
    }

    #[tokio::test]
    async fn test_self_view_needs_no_directory() {
        let (gate, store) = gate();
        store.set_directory_available(false);

        let basis = gate
            .authorize(&RoleAuthorityMatrix::deny_all(), &user("op"), &user("op"), Action::View)
            .await
            .unwrap();
        assert_eq!(basis, AccessBasis::SelfView);
    }

    #[tokio::test]
    async fn test_self_scoring_requires_bypass() {
        let (gate, _) = gate();
        let m = matrix();

        let err = gate
            .authorize(&m, &user("sup"), &user("sup"), Action::Score)
            .await
            .unwrap_err();
        assert!(err.denied().is_some());

        let basis = gate
            .authorize(&m, &user("boss"), &user("boss"), Action::Approve)
            .await
            .unwrap();
        assert_eq!(basis, AccessBasis::SelfBypass);
    }

    #[tokio::test]
    async fn test_unknown_target_is_not_found() {
        let (gate, _) = gate();
        let err = gate
            .authorize(&matrix(), &user("sup"), &user("ghost"), Action::View)
            .await
            .unwrap_err();
        assert_eq!(
            err.denied(),
            Some(&Denied::TargetNotFound {
                target: user("ghost")
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_actor_is_not_permitted() {
        let (gate, _) = gate();
        let err = gate
            .authorize(&matrix(), &user("ghost"), &user("op"), Action::View)
            .await
            .unwrap_err();
        assert!(matches!(err.denied(), Some(Denied::NotPermitted { .. })));
    }

    #[tokio::test]
    async fn test_roleless_target_only_bypass() {
        let (gate, _) = gate();
        let m = matrix();

        assert!(gate
            .authorize(&m, &user("sup"), &user("drifter"), Action::View)
            .await
            .is_err());
        tokio_test::assert_ok!(
            gate.authorize(&m, &user("boss"), &user("drifter"), Action::View)
                .await
        );
    }

    #[tokio::test]
    async fn test_directory_failure_is_an_error() {
        let (gate, store) = gate();
        store.set_directory_available(false);

        let err = gate
            .authorize(&matrix(), &user("sup"), &user("op"), Action::View)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RoleResolution(_)));
        assert!(err.denied().is_none());
    }
}
