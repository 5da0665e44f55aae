//! Building and unit domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TenantOwned;

/// A building the company works on and whose residents and managers
/// can be given portal access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantOwned for Building {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBuilding {
    pub tenant_id: Uuid,
    pub name: String,
    pub address: String,
}

/// A unit (suite, apartment) inside exactly one building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub building_id: Uuid,
    /// Unit number as printed on the door (e.g. `1204`).
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for Unit {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUnit {
    pub tenant_id: Uuid,
    pub building_id: Uuid,
    pub label: String,
}
