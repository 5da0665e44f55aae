//! Buildings and units, the anchors linking codes point at.

use belay_core::context::{PrincipalContext, ResourceRef};
use belay_core::error::{BelayError, BelayResult};
use belay_core::models::audit::AuditOutcome;
use belay_core::models::building::{Building, CreateBuilding, CreateUnit, Unit};
use belay_core::models::permission::Capability;
use belay_core::repository::{
    AuditLogRepository, BuildingRepository, PaginatedResult, Pagination,
    PermissionGrantRepository, PrincipalRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::authz::Authorizer;
use crate::scope::TenantScope;

pub struct BuildingService<B, P, G, A>
where
    B: BuildingRepository,
    P: PrincipalRepository,
    G: PermissionGrantRepository,
    A: AuditLogRepository,
{
    buildings: B,
    authz: Authorizer<P, G, A>,
}

impl<B, P, G, A> BuildingService<B, P, G, A>
where
    B: BuildingRepository,
    P: PrincipalRepository,
    G: PermissionGrantRepository,
    A: AuditLogRepository,
{
    pub fn new(buildings: B, authz: Authorizer<P, G, A>) -> Self {
        Self { buildings, authz }
    }

    pub async fn create_building(
        &self,
        ctx: &PrincipalContext,
        name: String,
        address: String,
    ) -> BelayResult<Building> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        self.authz
            .require(
                ctx,
                Capability::ManageBuildings,
                &ResourceRef::tenant(tenant_id),
                "company",
            )
            .await?;
        if name.trim().is_empty() {
            return Err(BelayError::Validation {
                message: "building name must not be empty".into(),
            });
        }

        let building = self
            .buildings
            .create(CreateBuilding {
                tenant_id,
                name,
                address,
            })
            .await?;
        info!(tenant_id = %tenant_id, building_id = %building.id, "Building created");
        self.authz
            .record(
                ctx,
                Some(tenant_id),
                "building.create",
                Some(building.id),
                AuditOutcome::Success,
                serde_json::json!({}),
            )
            .await?;
        Ok(building)
    }

    pub async fn create_unit(
        &self,
        ctx: &PrincipalContext,
        building_id: Uuid,
        label: String,
    ) -> BelayResult<Unit> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        self.authz
            .require(
                ctx,
                Capability::ManageBuildings,
                &ResourceRef::building(tenant_id, building_id),
                "building",
            )
            .await?;
        if label.trim().is_empty() {
            return Err(BelayError::Validation {
                message: "unit label must not be empty".into(),
            });
        }
        self.buildings
            .get_by_id(tenant_id, building_id)
            .await
            .map_err(|e| match e {
                BelayError::NotFound { .. } => BelayError::hidden("building"),
                other => other,
            })?;

        let unit = self
            .buildings
            .create_unit(CreateUnit {
                tenant_id,
                building_id,
                label,
            })
            .await?;
        self.authz
            .record(
                ctx,
                Some(tenant_id),
                "unit.create",
                Some(unit.id),
                AuditOutcome::Success,
                serde_json::json!({ "building_id": building_id }),
            )
            .await?;
        Ok(unit)
    }

    pub async fn list_buildings(
        &self,
        ctx: &PrincipalContext,
        pagination: Pagination,
    ) -> BelayResult<PaginatedResult<Building>> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        self.authz
            .require(
                ctx,
                Capability::ManageBuildings,
                &ResourceRef::tenant(tenant_id),
                "company",
            )
            .await?;
        self.buildings.list(tenant_id, pagination).await
    }

    pub async fn list_units(
        &self,
        ctx: &PrincipalContext,
        building_id: Uuid,
    ) -> BelayResult<Vec<Unit>> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        self.authz
            .require(
                ctx,
                Capability::ManageBuildings,
                &ResourceRef::building(tenant_id, building_id),
                "building",
            )
            .await?;
        self.buildings.list_units(tenant_id, building_id).await
    }
}
