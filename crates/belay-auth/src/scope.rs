//! Tenant scoping filter.
//!
//! Every data access takes its tenant from the resolved principal and
//! rejects records owned by any other company. A rejected record is
//! reported exactly like a missing one. Superusers are the only
//! principals exempt from the filter; their crossings are audited by
//! [`crate::authz::Authorizer::require`].

use belay_core::context::PrincipalContext;
use belay_core::error::{BelayError, BelayResult};
use belay_core::models::TenantOwned;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// Confined to one company.
    Tenant(Uuid),
    /// Superuser. `acting_as` is the company the operator chose to work
    /// in for this request, if any.
    Platform { acting_as: Option<Uuid> },
}

impl TenantScope {
    /// Build the scope for a request. Non-superusers without a tenant
    /// (e.g. an unlinked external account) have no scope at all.
    pub fn for_principal(ctx: &PrincipalContext) -> BelayResult<Self> {
        if ctx.is_superuser() {
            return Ok(TenantScope::Platform {
                acting_as: ctx.tenant_id,
            });
        }
        ctx.tenant_id
            .map(TenantScope::Tenant)
            .ok_or(BelayError::TenantContext)
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            TenantScope::Tenant(id) => Some(*id),
            TenantScope::Platform { acting_as } => *acting_as,
        }
    }

    /// The tenant every query of this request must filter on.
    pub fn require_tenant(&self) -> BelayResult<Uuid> {
        self.tenant_id().ok_or(BelayError::TenantContext)
    }

    pub fn is_platform(&self) -> bool {
        matches!(self, TenantScope::Platform { .. })
    }

    /// Pass `record` through if it belongs to this scope; otherwise fail
    /// with the same not-found error a missing record produces.
    pub fn admit<T: TenantOwned>(&self, record: T, entity: &str) -> BelayResult<T> {
        match self {
            TenantScope::Tenant(id) if record.tenant_id() != *id => {
                Err(BelayError::hidden(entity))
            }
            _ => Ok(record),
        }
    }

    /// Drop every record outside this scope.
    pub fn retain<T: TenantOwned>(&self, mut records: Vec<T>) -> Vec<T> {
        if let TenantScope::Tenant(id) = self {
            records.retain(|r| r.tenant_id() == *id);
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use belay_core::models::principal::PrincipalKind;

    use super::*;

    #[derive(Debug)]
    struct Owned(Uuid);

    impl TenantOwned for Owned {
        fn tenant_id(&self) -> Uuid {
            self.0
        }
    }

    fn ctx(kind: PrincipalKind, tenant_id: Option<Uuid>) -> PrincipalContext {
        PrincipalContext {
            principal_id: Uuid::new_v4(),
            kind,
            tenant_id,
            building_id: None,
            unit_id: None,
            session_id: None,
        }
    }

    #[test]
    fn company_principal_is_confined_to_its_tenant() {
        let tenant = Uuid::new_v4();
        let scope = TenantScope::for_principal(&ctx(PrincipalKind::Employee, Some(tenant))).unwrap();
        assert_eq!(scope, TenantScope::Tenant(tenant));
        assert_eq!(scope.require_tenant().unwrap(), tenant);

        assert!(scope.admit(Owned(tenant), "project").is_ok());
        let err = scope.admit(Owned(Uuid::new_v4()), "project").unwrap_err();
        assert!(matches!(err, BelayError::NotFound { .. }));
    }

    #[test]
    fn hidden_record_is_indistinguishable_from_missing() {
        let scope = TenantScope::Tenant(Uuid::new_v4());
        let err = scope.admit(Owned(Uuid::new_v4()), "project").unwrap_err();
        match err {
            BelayError::NotFound { entity, id } => {
                assert_eq!(entity, "project");
                assert_eq!(id, "unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn retain_filters_foreign_records() {
        let tenant = Uuid::new_v4();
        let scope = TenantScope::Tenant(tenant);
        let kept = scope.retain(vec![
            Owned(tenant),
            Owned(Uuid::new_v4()),
            Owned(tenant),
        ]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn principal_without_tenant_has_no_scope() {
        let err = TenantScope::for_principal(&ctx(PrincipalKind::Resident, None)).unwrap_err();
        assert!(matches!(err, BelayError::TenantContext));
    }

    #[test]
    fn superuser_is_exempt() {
        let scope = TenantScope::for_principal(&ctx(PrincipalKind::Superuser, None)).unwrap();
        assert!(scope.is_platform());
        assert!(scope.admit(Owned(Uuid::new_v4()), "project").is_ok());
        assert_eq!(scope.retain(vec![Owned(Uuid::new_v4())]).len(), 1);
        assert!(matches!(
            scope.require_tenant(),
            Err(BelayError::TenantContext)
        ));

        let target = Uuid::new_v4();
        let acting = TenantScope::for_principal(&ctx(PrincipalKind::Superuser, Some(target))).unwrap();
        assert_eq!(acting.require_tenant().unwrap(), target);
    }
}
