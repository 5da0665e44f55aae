//! Per-request identity and resource addressing.
//!
//! A [`PrincipalContext`] is built once per request from the session and
//! passed explicitly to every service call. There is no ambient
//! "current company".

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::principal::{Principal, PrincipalKind};

/// The resolved caller of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalContext {
    pub principal_id: Uuid,
    pub kind: PrincipalKind,
    /// Derived from the stored principal, never from client input.
    pub tenant_id: Option<Uuid>,
    pub building_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
}

impl PrincipalContext {
    pub fn from_principal(principal: &Principal, session_id: Option<Uuid>) -> Self {
        Self {
            principal_id: principal.id,
            kind: principal.kind,
            tenant_id: principal.tenant_id,
            building_id: principal.building_id,
            unit_id: principal.unit_id,
            session_id,
        }
    }

    pub fn is_superuser(&self) -> bool {
        self.kind == PrincipalKind::Superuser
    }
}

/// Where a requested resource lives.
///
/// Company principals are checked against `tenant_id` only. External
/// principals are additionally confined to their building (building
/// managers) or unit (residents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub tenant_id: Uuid,
    pub building_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub resource_id: Option<Uuid>,
}

impl ResourceRef {
    /// A tenant-wide resource (e.g. the company's project list).
    pub fn tenant(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            building_id: None,
            unit_id: None,
            resource_id: None,
        }
    }

    pub fn building(tenant_id: Uuid, building_id: Uuid) -> Self {
        Self {
            building_id: Some(building_id),
            ..Self::tenant(tenant_id)
        }
    }

    pub fn unit(tenant_id: Uuid, building_id: Uuid, unit_id: Uuid) -> Self {
        Self {
            building_id: Some(building_id),
            unit_id: Some(unit_id),
            ..Self::tenant(tenant_id)
        }
    }

    pub fn with_id(mut self, resource_id: Uuid) -> Self {
        self.resource_id = Some(resource_id);
        self
    }
}
