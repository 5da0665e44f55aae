//! Linking-code domain model.
//!
//! A linking code is an opaque string handed out of band (email,
//! printed notice, QR code) that associates one external principal with
//! one company and building, and for residents one unit. At most one
//! principal is bound to a code at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TenantOwned;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LinkKind {
    /// Unit-scoped, for individual self-registration.
    Resident,
    /// Building-scoped and stable across staff turnover: the account's
    /// password is rotated, the code is not reissued.
    BuildingManager,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LinkStatus {
    Active,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkingCode {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub kind: LinkKind,
    pub building_id: Uuid,
    /// Always `Some` for resident codes, always `None` for building
    /// manager codes.
    pub unit_id: Option<Uuid>,
    pub status: LinkStatus,
    pub bound_principal_id: Option<Uuid>,
    /// After this instant the code can no longer be claimed. A principal
    /// already bound keeps its access.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LinkingCode {
    /// Whether a new principal may be bound to this code right now.
    pub fn is_available(&self) -> bool {
        self.is_available_at(Utc::now())
    }

    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.status == LinkStatus::Active
            && self.bound_principal_id.is_none()
            && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }

    pub fn target(&self) -> LinkTarget {
        LinkTarget {
            tenant_id: self.tenant_id,
            kind: self.kind,
            building_id: self.building_id,
            unit_id: self.unit_id,
        }
    }
}

impl TenantOwned for LinkingCode {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLinkingCode {
    pub tenant_id: Uuid,
    pub code: String,
    pub kind: LinkKind,
    pub building_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}

/// What a valid code resolves to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkTarget {
    pub tenant_id: Uuid,
    pub kind: LinkKind,
    pub building_id: Uuid,
    pub unit_id: Option<Uuid>,
}
