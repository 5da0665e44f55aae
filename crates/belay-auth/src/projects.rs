//! Projects and server-side financial redaction.
//!
//! Company principals reach projects through `view-projects`; external
//! principals reach the projects of their own building through
//! `view-building-progress` and never see financial fields.

use belay_core::context::{PrincipalContext, ResourceRef};
use belay_core::error::{BelayError, BelayResult};
use belay_core::models::audit::AuditOutcome;
use belay_core::models::permission::Capability;
use belay_core::models::project::{CreateProject, Project, ProjectView, UpdateProject};
use belay_core::repository::{
    AuditLogRepository, BuildingRepository, PaginatedResult, Pagination,
    PermissionGrantRepository, PrincipalRepository, ProjectRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::authz::Authorizer;
use crate::scope::TenantScope;

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub building_id: Option<Uuid>,
    pub budget_cents: Option<i64>,
    pub labor_cost_cents: Option<i64>,
    pub billed_cents: Option<i64>,
}

fn project_resource(project: &Project) -> ResourceRef {
    let base = match project.building_id {
        Some(building_id) => ResourceRef::building(project.tenant_id, building_id),
        None => ResourceRef::tenant(project.tenant_id),
    };
    base.with_id(project.id)
}

fn validate_amounts(amounts: &[Option<i64>]) -> BelayResult<()> {
    if amounts.iter().flatten().any(|v| *v < 0) {
        return Err(BelayError::Validation {
            message: "amounts must not be negative".into(),
        });
    }
    Ok(())
}

pub struct ProjectService<R, B, P, G, A>
where
    R: ProjectRepository,
    B: BuildingRepository,
    P: PrincipalRepository,
    G: PermissionGrantRepository,
    A: AuditLogRepository,
{
    projects: R,
    buildings: B,
    authz: Authorizer<P, G, A>,
}

impl<R, B, P, G, A> ProjectService<R, B, P, G, A>
where
    R: ProjectRepository,
    B: BuildingRepository,
    P: PrincipalRepository,
    G: PermissionGrantRepository,
    A: AuditLogRepository,
{
    pub fn new(projects: R, buildings: B, authz: Authorizer<P, G, A>) -> Self {
        Self {
            projects,
            buildings,
            authz,
        }
    }

    /// Financial fields are shown to company principals holding
    /// `view-financial-data` and to nobody else.
    async fn shows_financials(
        &self,
        ctx: &PrincipalContext,
        resource: &ResourceRef,
    ) -> BelayResult<bool> {
        if ctx.kind.is_external() {
            return Ok(false);
        }
        self.authz
            .allows(ctx, Capability::ViewFinancialData, resource)
            .await
    }

    pub async fn create(
        &self,
        ctx: &PrincipalContext,
        input: NewProject,
    ) -> BelayResult<ProjectView> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        let resource = ResourceRef::tenant(tenant_id);
        self.authz
            .require(ctx, Capability::CreateProject, &resource, "company")
            .await?;

        if input.name.trim().is_empty() {
            return Err(BelayError::Validation {
                message: "project name must not be empty".into(),
            });
        }
        validate_amounts(&[
            input.budget_cents,
            input.labor_cost_cents,
            input.billed_cents,
        ])?;
        if let Some(building_id) = input.building_id {
            self.buildings
                .get_by_id(tenant_id, building_id)
                .await
                .map_err(|e| match e {
                    BelayError::NotFound { .. } => BelayError::hidden("building"),
                    other => other,
                })?;
        }

        let project = self
            .projects
            .create(CreateProject {
                tenant_id,
                name: input.name,
                building_id: input.building_id,
                budget_cents: input.budget_cents,
                labor_cost_cents: input.labor_cost_cents,
                billed_cents: input.billed_cents,
                created_by: ctx.principal_id,
            })
            .await?;

        info!(tenant_id = %tenant_id, project_id = %project.id, "Project created");
        self.authz
            .record(
                ctx,
                Some(tenant_id),
                "project.create",
                Some(project.id),
                AuditOutcome::Success,
                serde_json::json!({}),
            )
            .await?;

        let show = self.shows_financials(ctx, &resource).await?;
        Ok(ProjectView::new(project, show))
    }

    pub async fn get(&self, ctx: &PrincipalContext, project_id: Uuid) -> BelayResult<ProjectView> {
        let scope = TenantScope::for_principal(ctx)?;
        let tenant_id = scope.require_tenant()?;
        let project = self
            .projects
            .get_by_id(tenant_id, project_id)
            .await
            .and_then(|p| scope.admit(p, "project"))?;

        let resource = project_resource(&project);
        let capability = if ctx.kind.is_external() {
            Capability::ViewBuildingProgress
        } else {
            Capability::ViewProjects
        };
        self.authz
            .require(ctx, capability, &resource, "project")
            .await?;

        let show = self.shows_financials(ctx, &resource).await?;
        Ok(ProjectView::new(project, show))
    }

    /// Company callers page through every project of the company;
    /// external callers get the projects of their own building.
    pub async fn list(
        &self,
        ctx: &PrincipalContext,
        pagination: Pagination,
    ) -> BelayResult<PaginatedResult<ProjectView>> {
        let scope = TenantScope::for_principal(ctx)?;
        let tenant_id = scope.require_tenant()?;

        if ctx.kind.is_external() {
            let Some(building_id) = ctx.building_id else {
                return Err(BelayError::TenantContext);
            };
            self.authz
                .require(
                    ctx,
                    Capability::ViewBuildingProgress,
                    &ResourceRef::building(tenant_id, building_id),
                    "building",
                )
                .await?;
            let projects = scope.retain(
                self.projects
                    .list_by_building(tenant_id, building_id)
                    .await?,
            );
            let total = projects.len() as u64;
            let items = projects
                .into_iter()
                .skip(pagination.offset as usize)
                .take(pagination.limit as usize)
                .map(|p| ProjectView::new(p, false))
                .collect();
            return Ok(PaginatedResult {
                items,
                total,
                offset: pagination.offset,
                limit: pagination.limit,
            });
        }

        let resource = ResourceRef::tenant(tenant_id);
        self.authz
            .require(ctx, Capability::ViewProjects, &resource, "company")
            .await?;
        let show = self.shows_financials(ctx, &resource).await?;

        let page = self.projects.list(tenant_id, pagination).await?;
        Ok(PaginatedResult {
            items: scope
                .retain(page.items)
                .into_iter()
                .map(|p| ProjectView::new(p, show))
                .collect(),
            total: page.total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    /// Changing any financial field additionally needs
    /// `view-financial-data`.
    pub async fn update(
        &self,
        ctx: &PrincipalContext,
        project_id: Uuid,
        input: UpdateProject,
    ) -> BelayResult<ProjectView> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        let current = self.projects.get_by_id(tenant_id, project_id).await?;
        let resource = project_resource(&current);
        self.authz
            .require(ctx, Capability::EditProject, &resource, "project")
            .await?;

        let touches_financials = input.budget_cents.is_some()
            || input.labor_cost_cents.is_some()
            || input.billed_cents.is_some();
        if touches_financials {
            self.authz
                .require(ctx, Capability::ViewFinancialData, &resource, "project")
                .await?;
            validate_amounts(&[
                input.budget_cents.flatten(),
                input.labor_cost_cents.flatten(),
                input.billed_cents.flatten(),
            ])?;
        }
        if let Some(name) = &input.name {
            if name.trim().is_empty() {
                return Err(BelayError::Validation {
                    message: "project name must not be empty".into(),
                });
            }
        }

        let updated = self.projects.update(tenant_id, current.id, input).await?;
        self.authz
            .record(
                ctx,
                Some(tenant_id),
                "project.update",
                Some(updated.id),
                AuditOutcome::Success,
                serde_json::json!({ "financials": touches_financials }),
            )
            .await?;

        let show = self.shows_financials(ctx, &resource).await?;
        Ok(ProjectView::new(updated, show))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use belay_core::models::project::ProjectStatus;

    use super::*;

    #[test]
    fn project_without_building_is_tenant_wide() {
        let tenant = Uuid::new_v4();
        let project = Project {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            name: "Anchor inspection".into(),
            building_id: None,
            status: ProjectStatus::Planned,
            budget_cents: None,
            labor_cost_cents: None,
            billed_cents: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let resource = project_resource(&project);
        assert_eq!(resource.building_id, None);
        assert_eq!(resource.resource_id, Some(project.id));

        let building = Uuid::new_v4();
        let resource = project_resource(&Project {
            building_id: Some(building),
            ..project
        });
        assert_eq!(resource.building_id, Some(building));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(validate_amounts(&[Some(10), None]).is_ok());
        assert!(matches!(
            validate_amounts(&[Some(-1)]),
            Err(BelayError::Validation { .. })
        ));
    }
}
