//! Project domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TenantOwned;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProjectStatus {
    Planned,
    Active,
    OnHold,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub building_id: Option<Uuid>,
    pub status: ProjectStatus,
    pub budget_cents: Option<i64>,
    pub labor_cost_cents: Option<i64>,
    pub billed_cents: Option<i64>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantOwned for Project {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub tenant_id: Uuid,
    pub name: String,
    pub building_id: Option<Uuid>,
    pub budget_cents: Option<i64>,
    pub labor_cost_cents: Option<i64>,
    pub billed_cents: Option<i64>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub status: Option<ProjectStatus>,
    pub budget_cents: Option<Option<i64>>,
    pub labor_cost_cents: Option<Option<i64>>,
    pub billed_cents: Option<Option<i64>>,
}

/// Project as returned to a caller. Financial fields are `None` unless
/// the caller holds `view-financial-data`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectView {
    pub id: Uuid,
    pub name: String,
    pub building_id: Option<Uuid>,
    pub status: ProjectStatus,
    pub budget_cents: Option<i64>,
    pub labor_cost_cents: Option<i64>,
    pub billed_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectView {
    pub fn new(project: Project, include_financials: bool) -> Self {
        let (budget_cents, labor_cost_cents, billed_cents) = if include_financials {
            (
                project.budget_cents,
                project.labor_cost_cents,
                project.billed_cents,
            )
        } else {
            (None, None, None)
        };
        Self {
            id: project.id,
            name: project.name,
            building_id: project.building_id,
            status: project.status,
            budget_cents,
            labor_cost_cents,
            billed_cents,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Facade wash".into(),
            building_id: None,
            status: ProjectStatus::Active,
            budget_cents: Some(1_250_000),
            labor_cost_cents: Some(400_000),
            billed_cents: Some(0),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn financials_are_stripped_without_permission() {
        let view = ProjectView::new(project(), false);
        assert_eq!(view.budget_cents, None);
        assert_eq!(view.labor_cost_cents, None);
        assert_eq!(view.billed_cents, None);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json["budget_cents"].is_null());
    }

    #[test]
    fn financials_are_kept_with_permission() {
        let view = ProjectView::new(project(), true);
        assert_eq!(view.budget_cents, Some(1_250_000));
        assert_eq!(view.labor_cost_cents, Some(400_000));
    }
}
