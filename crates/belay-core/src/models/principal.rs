//! Principal domain model.
//!
//! A principal is any actor that can hold a session: company owners and
//! employees, external residents and building managers, and platform
//! superusers. The base role is an organizational label only; it never
//! confers a capability (see [`super::permission`]).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PrincipalKind {
    Owner,
    Employee,
    Resident,
    BuildingManager,
    /// Platform operator. Exempt from tenant scoping; every crossing is
    /// audited.
    Superuser,
}

impl PrincipalKind {
    /// Owner or employee of a company.
    pub fn is_company(self) -> bool {
        matches!(self, PrincipalKind::Owner | PrincipalKind::Employee)
    }

    /// Resident or building manager, linked through a code.
    pub fn is_external(self) -> bool {
        matches!(self, PrincipalKind::Resident | PrincipalKind::BuildingManager)
    }
}

/// Organizational label shown in the UI. Carries no permission
/// semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BaseRole {
    Owner,
    OperationsManager,
    Supervisor,
    Technician,
    Custom(String),
}

impl fmt::Display for BaseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseRole::Owner => f.write_str("owner"),
            BaseRole::OperationsManager => f.write_str("operations_manager"),
            BaseRole::Supervisor => f.write_str("supervisor"),
            BaseRole::Technician => f.write_str("technician"),
            BaseRole::Custom(label) => write!(f, "custom:{label}"),
        }
    }
}

impl FromStr for BaseRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(BaseRole::Owner),
            "operations_manager" => Ok(BaseRole::OperationsManager),
            "supervisor" => Ok(BaseRole::Supervisor),
            "technician" => Ok(BaseRole::Technician),
            other => match other.strip_prefix("custom:") {
                Some(label) if !label.trim().is_empty() => Ok(BaseRole::Custom(label.to_string())),
                _ => Err(format!("unknown base role: {other}")),
            },
        }
    }
}

impl TryFrom<String> for BaseRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BaseRole> for String {
    fn from(role: BaseRole) -> Self {
        role.to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PrincipalStatus {
    Active,
    /// Soft-deactivated: cannot authenticate, history retained.
    Deactivated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    /// `None` for superusers and for external principals not yet linked.
    pub tenant_id: Option<Uuid>,
    pub kind: PrincipalKind,
    /// Company principals only.
    pub base_role: Option<BaseRole>,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub status: PrincipalStatus,
    /// Linked building (external principals only).
    pub building_id: Option<Uuid>,
    /// Linked unit (residents only).
    pub unit_id: Option<Uuid>,
    /// Pay rate, shown only to holders of `view-employee-rates`.
    pub hourly_rate_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    pub fn is_active(&self) -> bool {
        self.status == PrincipalStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrincipal {
    pub tenant_id: Option<Uuid>,
    pub kind: PrincipalKind,
    pub base_role: Option<BaseRole>,
    pub username: String,
    pub email: String,
    /// Raw password (hashed with Argon2id before storage).
    pub password: String,
    pub building_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub hourly_rate_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePrincipal {
    pub email: Option<String>,
    pub base_role: Option<BaseRole>,
    pub status: Option<PrincipalStatus>,
    /// Raw replacement password (hashed before storage).
    pub password: Option<String>,
    /// `Some(Some(v))` = set, `Some(None)` = clear, `None` = no change.
    pub hourly_rate_cents: Option<Option<i64>>,
}

/// Outward-facing view of a principal. Never carries the credential
/// hash; the pay rate is filled only for callers allowed to see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalView {
    pub id: Uuid,
    pub kind: PrincipalKind,
    pub base_role: Option<BaseRole>,
    pub username: String,
    pub email: String,
    pub status: PrincipalStatus,
    pub building_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub hourly_rate_cents: Option<i64>,
}

impl PrincipalView {
    pub fn new(principal: &Principal, include_rate: bool) -> Self {
        Self {
            id: principal.id,
            kind: principal.kind,
            base_role: principal.base_role.clone(),
            username: principal.username.clone(),
            email: principal.email.clone(),
            status: principal.status,
            building_id: principal.building_id,
            unit_id: principal.unit_id,
            hourly_rate_cents: if include_rate {
                principal.hourly_rate_cents
            } else {
                None
            },
        }
    }
}
