//! Linking codes: how residents and building managers join a company.
//!
//! A code resolves to exactly one tenant and building, plus one unit for
//! resident codes. Registration claims the code for a pre-allocated
//! principal id before the principal is written. If the principal or any
//! of its default grants cannot be written, the grants are removed, the
//! principal is deactivated and the code is released, so a failed
//! registration leaves no usable linkage behind.

use belay_core::context::{PrincipalContext, ResourceRef};
use belay_core::error::{BelayError, BelayResult};
use belay_core::models::audit::AuditOutcome;
use belay_core::models::linking_code::{CreateLinkingCode, LinkKind, LinkTarget, LinkingCode};
use belay_core::models::permission::{Capability, SetGrant};
use belay_core::models::principal::{CreatePrincipal, Principal, PrincipalKind, UpdatePrincipal};
use belay_core::repository::{
    AuditLogRepository, BuildingRepository, LinkingCodeRepository, PermissionGrantRepository,
    PrincipalRepository, SessionRepository,
};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::authz::Authorizer;
use crate::config::AuthConfig;
use crate::password;
use crate::scope::TenantScope;
use crate::token;

/// Attempts at drawing an unused code before giving up.
const CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct IssueCodeInput {
    pub kind: LinkKind,
    pub building_id: Uuid,
    /// Required for resident codes, rejected for building-manager codes.
    pub unit_id: Option<Uuid>,
}

/// Self-registration with a linking code.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub code: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Capabilities seeded for a freshly linked external principal.
pub fn default_capabilities(kind: LinkKind) -> &'static [Capability] {
    match kind {
        LinkKind::Resident => &[Capability::ViewBuildingProgress, Capability::SubmitFeedback],
        LinkKind::BuildingManager => &[
            Capability::ViewBuildingProgress,
            Capability::ViewResidentFeedback,
        ],
    }
}

pub struct LinkingService<B, L, S, P, G, A>
where
    B: BuildingRepository,
    L: LinkingCodeRepository,
    S: SessionRepository,
    P: PrincipalRepository,
    G: PermissionGrantRepository,
    A: AuditLogRepository,
{
    buildings: B,
    codes: L,
    sessions: S,
    authz: Authorizer<P, G, A>,
    config: AuthConfig,
}

impl<B, L, S, P, G, A> LinkingService<B, L, S, P, G, A>
where
    B: BuildingRepository,
    L: LinkingCodeRepository,
    S: SessionRepository,
    P: PrincipalRepository,
    G: PermissionGrantRepository,
    A: AuditLogRepository,
{
    pub fn new(
        buildings: B,
        codes: L,
        sessions: S,
        authz: Authorizer<P, G, A>,
        config: AuthConfig,
    ) -> Self {
        Self {
            buildings,
            codes,
            sessions,
            authz,
            config,
        }
    }

    /// What a code points at, if it can still be used.
    pub async fn resolve_link(&self, code: &str) -> BelayResult<LinkTarget> {
        let record = self.codes.get_by_code(code.trim()).await.map_err(|e| match e {
            BelayError::NotFound { .. } => BelayError::InvalidLinkingCode,
            other => other,
        })?;
        if !record.is_available() {
            return Err(BelayError::InvalidLinkingCode);
        }
        Ok(record.target())
    }

    pub async fn issue_code(
        &self,
        ctx: &PrincipalContext,
        input: IssueCodeInput,
    ) -> BelayResult<LinkingCode> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        self.authz
            .require(
                ctx,
                Capability::ManageBuildings,
                &ResourceRef::building(tenant_id, input.building_id),
                "building",
            )
            .await?;

        let building = self
            .buildings
            .get_by_id(tenant_id, input.building_id)
            .await
            .map_err(|e| hide(e, "building"))?;

        match (input.kind, input.unit_id) {
            (LinkKind::Resident, Some(unit_id)) => {
                let unit = self
                    .buildings
                    .get_unit(tenant_id, unit_id)
                    .await
                    .map_err(|e| hide(e, "unit"))?;
                if unit.building_id != building.id {
                    return Err(BelayError::hidden("unit"));
                }
            }
            (LinkKind::Resident, None) => {
                return Err(BelayError::Validation {
                    message: "resident codes need a unit".into(),
                });
            }
            (LinkKind::BuildingManager, Some(_)) => {
                return Err(BelayError::Validation {
                    message: "building manager codes cover the whole building".into(),
                });
            }
            (LinkKind::BuildingManager, None) => {}
        }

        let expires_at = self
            .config
            .linking_code_lifetime()?
            .map(|lifetime| Utc::now() + lifetime);

        let mut attempts = 0;
        let created = loop {
            attempts += 1;
            let result = self
                .codes
                .create(CreateLinkingCode {
                    tenant_id,
                    code: token::generate_linking_code(input.kind, self.config.linking_code_length),
                    kind: input.kind,
                    building_id: building.id,
                    unit_id: input.unit_id,
                    expires_at,
                    created_by: ctx.principal_id,
                })
                .await;
            match result {
                Ok(code) => break code,
                Err(BelayError::AlreadyExists { .. }) if attempts < CODE_ATTEMPTS => continue,
                Err(e) => return Err(e),
            }
        };

        info!(
            tenant_id = %tenant_id,
            building_id = %building.id,
            code_id = %created.id,
            "Linking code issued"
        );
        self.authz
            .record(
                ctx,
                Some(tenant_id),
                "linking_code.issue",
                Some(created.id),
                AuditOutcome::Success,
                serde_json::json!({ "building_id": building.id }),
            )
            .await?;
        Ok(created)
    }

    /// Stop a code from accepting new registrations. A principal already
    /// bound to it keeps its access.
    pub async fn revoke_code(&self, ctx: &PrincipalContext, code_id: Uuid) -> BelayResult<()> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        let code = self
            .codes
            .get_by_id(tenant_id, code_id)
            .await
            .map_err(|e| hide(e, "linking_code"))?;
        self.authz
            .require(
                ctx,
                Capability::ManageBuildings,
                &ResourceRef::building(tenant_id, code.building_id).with_id(code.id),
                "linking_code",
            )
            .await?;

        self.codes.revoke(tenant_id, code.id).await?;
        self.authz
            .record(
                ctx,
                Some(tenant_id),
                "linking_code.revoke",
                Some(code.id),
                AuditOutcome::Success,
                serde_json::json!({}),
            )
            .await
    }

    /// Create an external principal from a code. Unknown, revoked, lapsed
    /// and already-bound codes all fail with `InvalidLinkingCode` and
    /// nothing is written.
    pub async fn register_external(&self, input: RegisterInput) -> BelayResult<Principal> {
        password::check_policy(&input.password, &self.config)?;

        let code = self.codes.get_by_code(input.code.trim()).await.map_err(|e| match e {
            BelayError::NotFound { .. } => BelayError::InvalidLinkingCode,
            other => other,
        })?;
        if !code.is_available() {
            return Err(BelayError::InvalidLinkingCode);
        }

        let principal_id = Uuid::new_v4();
        let code = self
            .codes
            .claim(code.tenant_id, code.id, principal_id)
            .await?;

        let kind = match code.kind {
            LinkKind::Resident => PrincipalKind::Resident,
            LinkKind::BuildingManager => PrincipalKind::BuildingManager,
        };
        let created = self
            .authz
            .principals()
            .create_with_id(
                principal_id,
                CreatePrincipal {
                    tenant_id: Some(code.tenant_id),
                    kind,
                    base_role: None,
                    username: input.username,
                    email: input.email,
                    password: input.password,
                    building_id: Some(code.building_id),
                    unit_id: code.unit_id,
                    hourly_rate_cents: None,
                },
            )
            .await;

        let principal = match created {
            Ok(p) => p,
            Err(e) => {
                warn!(code_id = %code.id, error = %e, "Registration failed, releasing code");
                self.codes.release(code.tenant_id, code.id).await?;
                return Err(e);
            }
        };

        if let Err(e) = self.seed_defaults(&code, principal.id).await {
            warn!(code_id = %code.id, error = %e, "Default grants failed, undoing registration");
            self.undo_registration(&code, principal.id).await;
            return Err(e);
        }

        info!(
            tenant_id = %code.tenant_id,
            principal_id = %principal.id,
            code_id = %code.id,
            "External principal registered"
        );
        let ctx = PrincipalContext::from_principal(&principal, None);
        self.authz
            .record(
                &ctx,
                Some(code.tenant_id),
                "principal.register",
                Some(principal.id),
                AuditOutcome::Success,
                serde_json::json!({ "code_id": code.id }),
            )
            .await?;

        Ok(principal)
    }

    async fn seed_defaults(&self, code: &LinkingCode, principal_id: Uuid) -> BelayResult<()> {
        for &capability in default_capabilities(code.kind) {
            self.authz
                .grants()
                .set(SetGrant {
                    tenant_id: code.tenant_id,
                    principal_id,
                    capability,
                    granted: true,
                    granted_by: code.created_by,
                })
                .await?;
        }
        Ok(())
    }

    /// Best effort: every step runs even if an earlier one fails.
    async fn undo_registration(&self, code: &LinkingCode, principal_id: Uuid) {
        for &capability in default_capabilities(code.kind) {
            if let Err(e) = self
                .authz
                .grants()
                .delete(code.tenant_id, principal_id, capability)
                .await
            {
                error!(principal_id = %principal_id, error = %e, "Could not remove default grant");
            }
        }
        if let Err(e) = self
            .authz
            .principals()
            .deactivate(code.tenant_id, principal_id)
            .await
        {
            error!(principal_id = %principal_id, error = %e, "Could not deactivate principal");
        }
        if let Err(e) = self.codes.release(code.tenant_id, code.id).await {
            error!(code_id = %code.id, error = %e, "Could not release linking code");
        }
    }

    /// Hand a building-manager account to new staff: the password changes,
    /// every existing session ends, and the code and building stay as
    /// they are.
    pub async fn rotate_building_manager_password(
        &self,
        ctx: &PrincipalContext,
        manager_id: Uuid,
        new_password: &str,
    ) -> BelayResult<()> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        let manager = self
            .authz
            .principals()
            .get_in_tenant(tenant_id, manager_id)
            .await
            .map_err(|e| hide(e, "building_manager"))?;
        let building_id = match (manager.kind, manager.building_id) {
            (PrincipalKind::BuildingManager, Some(building_id)) => building_id,
            _ => return Err(BelayError::hidden("building_manager")),
        };

        self.authz
            .require(
                ctx,
                Capability::ManageBuildings,
                &ResourceRef::building(tenant_id, building_id).with_id(manager.id),
                "building_manager",
            )
            .await?;
        password::check_policy(new_password, &self.config)?;

        self.authz
            .principals()
            .update(
                manager.id,
                UpdatePrincipal {
                    password: Some(new_password.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        self.sessions
            .invalidate_principal_sessions(manager.id)
            .await?;

        info!(
            tenant_id = %tenant_id,
            principal_id = %manager.id,
            "Building manager credential rotated"
        );
        self.authz
            .record(
                ctx,
                Some(tenant_id),
                "building_manager.rotate_password",
                Some(manager.id),
                AuditOutcome::Success,
                serde_json::json!({ "building_id": building_id }),
            )
            .await
    }

    pub async fn list_codes(
        &self,
        ctx: &PrincipalContext,
        building_id: Uuid,
    ) -> BelayResult<Vec<LinkingCode>> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        self.authz
            .require(
                ctx,
                Capability::ManageBuildings,
                &ResourceRef::building(tenant_id, building_id),
                "building",
            )
            .await?;
        self.codes.list_by_building(tenant_id, building_id).await
    }
}

fn hide(err: BelayError, entity: &str) -> BelayError {
    match err {
        BelayError::NotFound { .. } => BelayError::hidden(entity),
        other => other,
    }
}
