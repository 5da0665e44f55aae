//! Permission management: who may do what inside a company.
//!
//! Grants are written only by a caller holding `manage-permissions`, and
//! only for principals of the caller's own tenant. A target in another
//! tenant is reported as missing and nothing is written. The owner's
//! grants are fixed at signup and cannot be changed, so a company always
//! keeps one principal able to manage permissions.

use belay_core::context::{PrincipalContext, ResourceRef};
use belay_core::error::{BelayError, BelayResult};
use belay_core::models::audit::AuditOutcome;
use belay_core::models::permission::{Capability, PermissionGrant, SetGrant};
use belay_core::models::principal::{BaseRole, Principal, PrincipalKind, UpdatePrincipal};
use belay_core::repository::{AuditLogRepository, PermissionGrantRepository, PrincipalRepository};
use tracing::info;
use uuid::Uuid;

use crate::authz::Authorizer;
use crate::scope::TenantScope;

pub struct PermissionService<P, G, A>
where
    P: PrincipalRepository,
    G: PermissionGrantRepository,
    A: AuditLogRepository,
{
    authz: Authorizer<P, G, A>,
}

impl<P, G, A> PermissionService<P, G, A>
where
    P: PrincipalRepository,
    G: PermissionGrantRepository,
    A: AuditLogRepository,
{
    pub fn new(authz: Authorizer<P, G, A>) -> Self {
        Self { authz }
    }

    pub fn authorizer(&self) -> &Authorizer<P, G, A> {
        &self.authz
    }

    /// Tenant filter, then capability, then the target lookup inside the
    /// tenant.
    async fn target_in_scope(
        &self,
        ctx: &PrincipalContext,
        capability: Capability,
        target_id: Uuid,
    ) -> BelayResult<(Uuid, Principal)> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        self.authz
            .require(
                ctx,
                capability,
                &ResourceRef::tenant(tenant_id).with_id(target_id),
                "principal",
            )
            .await?;

        let target = self
            .authz
            .principals()
            .get_in_tenant(tenant_id, target_id)
            .await
            .map_err(|e| match e {
                BelayError::NotFound { .. } => BelayError::hidden("principal"),
                other => other,
            })?;
        Ok((tenant_id, target))
    }

    pub async fn grant(
        &self,
        ctx: &PrincipalContext,
        target_id: Uuid,
        capability: Capability,
    ) -> BelayResult<PermissionGrant> {
        let mut written = self
            .set_grants(ctx, target_id, &[(capability, true)])
            .await?;
        written.pop().ok_or_else(|| BelayError::Internal("grant not written".into()))
    }

    pub async fn revoke(
        &self,
        ctx: &PrincipalContext,
        target_id: Uuid,
        capability: Capability,
    ) -> BelayResult<PermissionGrant> {
        let mut written = self
            .set_grants(ctx, target_id, &[(capability, false)])
            .await?;
        written.pop().ok_or_else(|| BelayError::Internal("grant not written".into()))
    }

    /// Write several grants for one principal. Each takes effect on the
    /// next check.
    pub async fn set_grants(
        &self,
        ctx: &PrincipalContext,
        target_id: Uuid,
        changes: &[(Capability, bool)],
    ) -> BelayResult<Vec<PermissionGrant>> {
        let (tenant_id, target) = self
            .target_in_scope(ctx, Capability::ManagePermissions, target_id)
            .await?;
        if target.kind == PrincipalKind::Owner {
            return Err(BelayError::Validation {
                message: "the owner's grants cannot be changed".into(),
            });
        }

        let mut written = Vec::with_capacity(changes.len());
        for &(capability, granted) in changes {
            let grant = self
                .authz
                .grants()
                .set(SetGrant {
                    tenant_id,
                    principal_id: target.id,
                    capability,
                    granted,
                    granted_by: ctx.principal_id,
                })
                .await?;

            info!(
                tenant_id = %tenant_id,
                principal_id = %target.id,
                capability = %capability,
                granted,
                granted_by = %ctx.principal_id,
                "Permission grant changed"
            );
            self.authz
                .record(
                    ctx,
                    Some(tenant_id),
                    if granted { "permission.grant" } else { "permission.revoke" },
                    Some(target.id),
                    AuditOutcome::Success,
                    serde_json::json!({ "capability": capability.as_str() }),
                )
                .await?;
            written.push(grant);
        }
        Ok(written)
    }

    pub async fn list_grants(
        &self,
        ctx: &PrincipalContext,
        target_id: Uuid,
    ) -> BelayResult<Vec<PermissionGrant>> {
        let (tenant_id, target) = self
            .target_in_scope(ctx, Capability::ManagePermissions, target_id)
            .await?;
        self.authz
            .grants()
            .list_for_principal(tenant_id, target.id)
            .await
    }

    /// Change a company principal's display role. Grants are untouched.
    /// The `owner` label belongs to the owner alone and cannot be moved.
    pub async fn set_base_role(
        &self,
        ctx: &PrincipalContext,
        target_id: Uuid,
        role: BaseRole,
    ) -> BelayResult<Principal> {
        let (tenant_id, target) = self
            .target_in_scope(ctx, Capability::ManageEmployees, target_id)
            .await?;
        if !target.kind.is_company() {
            return Err(BelayError::Validation {
                message: "only company principals carry a base role".into(),
            });
        }
        if (target.kind == PrincipalKind::Owner) != (role == BaseRole::Owner) {
            return Err(BelayError::Validation {
                message: "only the company owner carries the owner role".into(),
            });
        }

        let updated = self
            .authz
            .principals()
            .update(
                target.id,
                UpdatePrincipal {
                    base_role: Some(role.clone()),
                    ..Default::default()
                },
            )
            .await?;

        self.authz
            .record(
                ctx,
                Some(tenant_id),
                "principal.set_role",
                Some(target.id),
                AuditOutcome::Success,
                serde_json::json!({ "base_role": role.to_string() }),
            )
            .await?;
        Ok(updated)
    }

    /// The capabilities currently granted to the caller.
    pub async fn my_capabilities(&self, ctx: &PrincipalContext) -> BelayResult<Vec<Capability>> {
        let Some(tenant_id) = ctx.tenant_id else {
            return Ok(Vec::new());
        };
        let grants = self
            .authz
            .grants()
            .list_for_principal(tenant_id, ctx.principal_id)
            .await?;
        Ok(grants
            .into_iter()
            .filter(|g| g.granted)
            .map(|g| g.capability)
            .collect())
    }
}
