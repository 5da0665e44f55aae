//! Capability evaluation.
//!
//! A check runs in a fixed order: the caller must be active, the
//! resource must sit inside the caller's tenant (and, for external
//! principals, inside their building or unit), and only then is the
//! explicit grant for the capability read. Grants are read from storage
//! on every check.

use belay_core::context::{PrincipalContext, ResourceRef};
use belay_core::error::{BelayError, BelayResult};
use belay_core::models::audit::{ActorType, AuditOutcome, CreateAuditLogEntry};
use belay_core::models::permission::{Capability, PermissionGrant};
use belay_core::models::principal::PrincipalKind;
use belay_core::repository::{AuditLogRepository, PermissionGrantRepository, PrincipalRepository};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The caller no longer exists or was deactivated.
    Inactive,
    /// The resource belongs to another company.
    TenantMismatch,
    /// Same company, but outside the external principal's building or
    /// unit.
    OutsideLink,
    /// No grant, or a grant with `granted = false`.
    MissingGrant,
}

impl DenyReason {
    /// The error a caller sees. Scope failures are reported as a missing
    /// `entity` so they reveal nothing about the resource.
    pub fn into_error(self, entity: &str) -> BelayError {
        match self {
            DenyReason::Inactive => BelayError::AuthenticationFailed {
                reason: "invalid session".into(),
            },
            DenyReason::TenantMismatch | DenyReason::OutsideLink => BelayError::hidden(entity),
            DenyReason::MissingGrant => BelayError::denied(),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            DenyReason::Inactive => "inactive",
            DenyReason::TenantMismatch => "tenant_mismatch",
            DenyReason::OutsideLink => "outside_link",
            DenyReason::MissingGrant => "missing_grant",
        }
    }
}

/// Tenant and link confinement, evaluated before any grant is read.
pub fn check_scope(ctx: &PrincipalContext, resource: &ResourceRef) -> Result<(), DenyReason> {
    if ctx.is_superuser() {
        return Ok(());
    }
    if ctx.tenant_id != Some(resource.tenant_id) {
        return Err(DenyReason::TenantMismatch);
    }

    match ctx.kind {
        PrincipalKind::Owner | PrincipalKind::Employee | PrincipalKind::Superuser => Ok(()),
        PrincipalKind::BuildingManager => {
            if ctx.building_id.is_some() && resource.building_id == ctx.building_id {
                Ok(())
            } else {
                Err(DenyReason::OutsideLink)
            }
        }
        PrincipalKind::Resident => {
            let same_building = ctx.building_id.is_some() && resource.building_id == ctx.building_id;
            let unit_ok = match resource.unit_id {
                None => true,
                Some(unit) => ctx.unit_id == Some(unit),
            };
            if same_building && unit_ok {
                Ok(())
            } else {
                Err(DenyReason::OutsideLink)
            }
        }
    }
}

/// Only an explicit, positive grant allows.
pub fn grant_decision(grant: Option<&PermissionGrant>) -> Decision {
    match grant {
        Some(g) if g.granted => Decision::Allow,
        _ => Decision::Deny(DenyReason::MissingGrant),
    }
}

/// Answers "may this principal do X to this resource".
///
/// Generic over repository implementations so that the auth layer has no
/// dependency on the database crate.
pub struct Authorizer<P, G, A>
where
    P: PrincipalRepository,
    G: PermissionGrantRepository,
    A: AuditLogRepository,
{
    principals: P,
    grants: G,
    audit: A,
}

impl<P, G, A> Authorizer<P, G, A>
where
    P: PrincipalRepository,
    G: PermissionGrantRepository,
    A: AuditLogRepository,
{
    pub fn new(principals: P, grants: G, audit: A) -> Self {
        Self {
            principals,
            grants,
            audit,
        }
    }

    pub fn principals(&self) -> &P {
        &self.principals
    }

    pub fn grants(&self) -> &G {
        &self.grants
    }

    /// Evaluate a capability against a resource.
    pub async fn authorize(
        &self,
        ctx: &PrincipalContext,
        capability: Capability,
        resource: &ResourceRef,
    ) -> BelayResult<Decision> {
        let active = match self.principals.get_by_id(ctx.principal_id).await {
            Ok(principal) => principal.is_active(),
            Err(BelayError::NotFound { .. }) => false,
            Err(e) => return Err(e),
        };
        if !active {
            return Ok(Decision::Deny(DenyReason::Inactive));
        }

        if let Err(reason) = check_scope(ctx, resource) {
            return Ok(Decision::Deny(reason));
        }

        if ctx.is_superuser() {
            return Ok(Decision::Allow);
        }

        let grant = self
            .grants
            .get(resource.tenant_id, ctx.principal_id, capability)
            .await?;
        Ok(grant_decision(grant.as_ref()))
    }

    /// Like [`Self::authorize`], but a denial becomes an error and a
    /// superuser crossing is written to the audit log.
    pub async fn require(
        &self,
        ctx: &PrincipalContext,
        capability: Capability,
        resource: &ResourceRef,
        entity: &str,
    ) -> BelayResult<()> {
        match self.authorize(ctx, capability, resource).await? {
            Decision::Allow => {
                if ctx.is_superuser() {
                    info!(
                        principal_id = %ctx.principal_id,
                        tenant_id = %resource.tenant_id,
                        capability = %capability,
                        "Superuser crossed tenant boundary"
                    );
                    self.record(
                        ctx,
                        Some(resource.tenant_id),
                        "superuser.access",
                        resource.resource_id,
                        AuditOutcome::Success,
                        serde_json::json!({ "capability": capability.as_str() }),
                    )
                    .await?;
                }
                Ok(())
            }
            Decision::Deny(reason) => {
                warn!(
                    principal_id = %ctx.principal_id,
                    capability = %capability,
                    reason = reason.as_str(),
                    "Access denied"
                );
                Err(reason.into_error(entity))
            }
        }
    }

    /// Boolean check for optional output such as financial fields. Never
    /// errors on a denial and writes no audit entry.
    pub async fn allows(
        &self,
        ctx: &PrincipalContext,
        capability: Capability,
        resource: &ResourceRef,
    ) -> BelayResult<bool> {
        Ok(self.authorize(ctx, capability, resource).await? == Decision::Allow)
    }

    /// Append an audit entry attributed to `ctx`.
    pub async fn record(
        &self,
        ctx: &PrincipalContext,
        tenant_id: Option<Uuid>,
        action: &str,
        resource_id: Option<Uuid>,
        outcome: AuditOutcome,
        metadata: serde_json::Value,
    ) -> BelayResult<()> {
        let actor_type = if ctx.is_superuser() {
            ActorType::Superuser
        } else {
            ActorType::Principal
        };
        self.audit
            .append(CreateAuditLogEntry {
                tenant_id,
                actor_id: ctx.principal_id,
                actor_type,
                action: action.into(),
                resource_id,
                outcome,
                metadata: Some(metadata),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn ctx(kind: PrincipalKind, tenant_id: Uuid) -> PrincipalContext {
        PrincipalContext {
            principal_id: Uuid::new_v4(),
            kind,
            tenant_id: Some(tenant_id),
            building_id: None,
            unit_id: None,
            session_id: None,
        }
    }

    fn grant(granted: bool) -> PermissionGrant {
        PermissionGrant {
            tenant_id: Uuid::new_v4(),
            principal_id: Uuid::new_v4(),
            capability: Capability::ViewProjects,
            granted,
            granted_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn other_tenant_is_always_a_mismatch() {
        let caller = ctx(PrincipalKind::Owner, Uuid::new_v4());
        let resource = ResourceRef::tenant(Uuid::new_v4());
        assert_eq!(
            check_scope(&caller, &resource),
            Err(DenyReason::TenantMismatch)
        );
    }

    #[test]
    fn superuser_passes_scope() {
        let caller = PrincipalContext {
            tenant_id: None,
            ..ctx(PrincipalKind::Superuser, Uuid::new_v4())
        };
        assert!(check_scope(&caller, &ResourceRef::tenant(Uuid::new_v4())).is_ok());
    }

    #[test]
    fn resident_is_confined_to_own_unit() {
        let tenant = Uuid::new_v4();
        let building = Uuid::new_v4();
        let unit = Uuid::new_v4();
        let caller = PrincipalContext {
            building_id: Some(building),
            unit_id: Some(unit),
            ..ctx(PrincipalKind::Resident, tenant)
        };

        assert!(check_scope(&caller, &ResourceRef::unit(tenant, building, unit)).is_ok());
        assert!(check_scope(&caller, &ResourceRef::building(tenant, building)).is_ok());
        assert_eq!(
            check_scope(&caller, &ResourceRef::unit(tenant, building, Uuid::new_v4())),
            Err(DenyReason::OutsideLink)
        );
        assert_eq!(
            check_scope(&caller, &ResourceRef::building(tenant, Uuid::new_v4())),
            Err(DenyReason::OutsideLink)
        );
        assert_eq!(
            check_scope(&caller, &ResourceRef::tenant(tenant)),
            Err(DenyReason::OutsideLink)
        );
    }

    #[test]
    fn building_manager_is_confined_to_own_building() {
        let tenant = Uuid::new_v4();
        let building = Uuid::new_v4();
        let caller = PrincipalContext {
            building_id: Some(building),
            ..ctx(PrincipalKind::BuildingManager, tenant)
        };

        assert!(check_scope(&caller, &ResourceRef::building(tenant, building)).is_ok());
        assert!(
            check_scope(
                &caller,
                &ResourceRef::unit(tenant, building, Uuid::new_v4())
            )
            .is_ok()
        );
        assert_eq!(
            check_scope(&caller, &ResourceRef::building(tenant, Uuid::new_v4())),
            Err(DenyReason::OutsideLink)
        );
    }

    #[test]
    fn only_positive_grants_allow() {
        assert_eq!(grant_decision(Some(&grant(true))), Decision::Allow);
        assert_eq!(
            grant_decision(Some(&grant(false))),
            Decision::Deny(DenyReason::MissingGrant)
        );
        assert_eq!(
            grant_decision(None),
            Decision::Deny(DenyReason::MissingGrant)
        );
    }

    #[test]
    fn scope_denials_look_like_missing_records() {
        assert!(matches!(
            DenyReason::TenantMismatch.into_error("project"),
            BelayError::NotFound { .. }
        ));
        assert!(matches!(
            DenyReason::OutsideLink.into_error("project"),
            BelayError::NotFound { .. }
        ));
        assert!(matches!(
            DenyReason::MissingGrant.into_error("project"),
            BelayError::AuthorizationDenied { .. }
        ));
    }
}
