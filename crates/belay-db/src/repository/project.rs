//! SurrealDB implementation of [`ProjectRepository`].

use belay_core::error::BelayResult;
use belay_core::models::project::{CreateProject, Project, ProjectStatus, UpdateProject};
use belay_core::repository::{PaginatedResult, Pagination, ProjectRepository};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ProjectRow {
    tenant_id: String,
    name: String,
    building_id: Option<String>,
    status: String,
    budget_cents: Option<i64>,
    labor_cost_cents: Option<i64>,
    billed_cents: Option<i64>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ProjectRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    building_id: Option<String>,
    status: String,
    budget_cents: Option<i64>,
    labor_cost_cents: Option<i64>,
    billed_cents: Option<i64>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<ProjectStatus, DbError> {
    match s {
        "Planned" => Ok(ProjectStatus::Planned),
        "Active" => Ok(ProjectStatus::Active),
        "OnHold" => Ok(ProjectStatus::OnHold),
        "Completed" => Ok(ProjectStatus::Completed),
        other => Err(DbError::Conversion(format!(
            "unknown project status: {other}"
        ))),
    }
}

fn status_to_str(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Planned => "Planned",
        ProjectStatus::Active => "Active",
        ProjectStatus::OnHold => "OnHold",
        ProjectStatus::Completed => "Completed",
    }
}

impl ProjectRow {
    fn into_project(self, id: Uuid) -> Result<Project, DbError> {
        Ok(Project {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            building_id: parse_opt_uuid(self.building_id.as_deref(), "building")?,
            status: parse_status(&self.status)?,
            budget_cents: self.budget_cents,
            labor_cost_cents: self.labor_cost_cents,
            billed_cents: self.billed_cents,
            created_by: parse_uuid(&self.created_by, "created_by")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ProjectRowWithId {
    fn try_into_project(self) -> Result<Project, DbError> {
        let id = parse_uuid(&self.record_id, "project")?;
        ProjectRow {
            tenant_id: self.tenant_id,
            name: self.name,
            building_id: self.building_id,
            status: self.status,
            budget_cents: self.budget_cents,
            labor_cost_cents: self.labor_cost_cents,
            billed_cents: self.billed_cents,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_project(id)
    }
}

/// SurrealDB implementation of the Project repository.
#[derive(Clone)]
pub struct SurrealProjectRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProjectRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProjectRepository for SurrealProjectRepository<C> {
    async fn create(&self, input: CreateProject) -> BelayResult<Project> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('project', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 building_id = $building_id, status = 'Planned', \
                 budget_cents = $budget_cents, \
                 labor_cost_cents = $labor_cost_cents, \
                 billed_cents = $billed_cents, \
                 created_by = $created_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("building_id", input.building_id.map(|b| b.to_string())))
            .bind(("budget_cents", input.budget_cents))
            .bind(("labor_cost_cents", input.labor_cost_cents))
            .bind(("billed_cents", input.billed_cents))
            .bind(("created_by", input.created_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("project", e))?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project".into(),
            id: id_str,
        })?;

        Ok(row.into_project(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> BelayResult<Project> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('project', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project".into(),
            id: id_str,
        })?;

        Ok(row.into_project(id)?)
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateProject,
    ) -> BelayResult<Project> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.budget_cents.is_some() {
            sets.push("budget_cents = $budget_cents");
        }
        if input.labor_cost_cents.is_some() {
            sets.push("labor_cost_cents = $labor_cost_cents");
        }
        if input.billed_cents.is_some() {
            sets.push("billed_cents = $billed_cents");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('project', $id) SET {} \
             WHERE tenant_id = $tenant_id RETURN AFTER",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status_to_str(status).to_string()));
        }
        if let Some(budget) = input.budget_cents {
            builder = builder.bind(("budget_cents", budget));
        }
        if let Some(labor) = input.labor_cost_cents {
            builder = builder.bind(("labor_cost_cents", labor));
        }
        if let Some(billed) = input.billed_cents {
            builder = builder.bind(("billed_cents", billed));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("project", e))?;

        let rows: Vec<ProjectRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "project".into(),
            id: id_str,
        })?;

        Ok(row.into_project(id)?)
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> BelayResult<PaginatedResult<Project>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM project \
                 WHERE tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM project \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProjectRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(ProjectRowWithId::try_into_project)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_by_building(
        &self,
        tenant_id: Uuid,
        building_id: Uuid,
    ) -> BelayResult<Vec<Project>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM project \
                 WHERE tenant_id = $tenant_id AND building_id = $building_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("building_id", building_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProjectRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(ProjectRowWithId::try_into_project)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
