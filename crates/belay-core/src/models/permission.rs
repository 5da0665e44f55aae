//! Capability and permission-grant domain model.
//!
//! Capabilities are flat and independent: holding one never implies
//! another, and no base role implies any of them. A principal holds a
//! capability only while an explicit grant with `granted = true` exists.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TenantOwned;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    ViewProjects,
    CreateProject,
    EditProject,
    DeleteProject,
    ViewFinancialData,
    ViewEmployeeRates,
    ManageEmployees,
    ManagePermissions,
    LogHours,
    ViewAllHours,
    ManageBuildings,
    ManageCertifications,
    ViewBuildingProgress,
    SubmitFeedback,
    ViewResidentFeedback,
}

impl Capability {
    pub const ALL: [Capability; 15] = [
        Capability::ViewProjects,
        Capability::CreateProject,
        Capability::EditProject,
        Capability::DeleteProject,
        Capability::ViewFinancialData,
        Capability::ViewEmployeeRates,
        Capability::ManageEmployees,
        Capability::ManagePermissions,
        Capability::LogHours,
        Capability::ViewAllHours,
        Capability::ManageBuildings,
        Capability::ManageCertifications,
        Capability::ViewBuildingProgress,
        Capability::SubmitFeedback,
        Capability::ViewResidentFeedback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::ViewProjects => "view-projects",
            Capability::CreateProject => "create-project",
            Capability::EditProject => "edit-project",
            Capability::DeleteProject => "delete-project",
            Capability::ViewFinancialData => "view-financial-data",
            Capability::ViewEmployeeRates => "view-employee-rates",
            Capability::ManageEmployees => "manage-employees",
            Capability::ManagePermissions => "manage-permissions",
            Capability::LogHours => "log-hours",
            Capability::ViewAllHours => "view-all-hours",
            Capability::ManageBuildings => "manage-buildings",
            Capability::ManageCertifications => "manage-certifications",
            Capability::ViewBuildingProgress => "view-building-progress",
            Capability::SubmitFeedback => "submit-feedback",
            Capability::ViewResidentFeedback => "view-resident-feedback",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown capability: {s}"))
    }
}

/// A single stored grant. `granted = false` is an explicit deny and is
/// treated exactly like an absent grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub tenant_id: Uuid,
    pub principal_id: Uuid,
    pub capability: Capability,
    pub granted: bool,
    /// Principal that last changed this grant.
    pub granted_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantOwned for PermissionGrant {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

/// Upsert input for a grant, keyed by `(tenant_id, principal_id, capability)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetGrant {
    pub tenant_id: Uuid,
    pub principal_id: Uuid,
    pub capability: Capability,
    pub granted: bool,
    pub granted_by: Uuid,
}
