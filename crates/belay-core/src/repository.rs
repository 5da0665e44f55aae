//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories
//! require a `tenant_id` parameter and filter on it in the query itself,
//! so a record from another company is indistinguishable from a missing
//! one. The few global lookups (principal by id or login name, linking
//! code by its string, session by token hash) exist for the request
//! entry points that have no tenant yet; callers pass their results
//! through the tenant scope before use.

use uuid::Uuid;

use crate::error::BelayResult;
use crate::models::{
    audit::{AuditLogEntry, CreateAuditLogEntry},
    building::{Building, CreateBuilding, CreateUnit, Unit},
    company::{Company, CreateCompany, UpdateCompany},
    linking_code::{CreateLinkingCode, LinkingCode},
    permission::{Capability, PermissionGrant, SetGrant},
    principal::{CreatePrincipal, Principal, UpdatePrincipal},
    project::{CreateProject, Project, UpdateProject},
    session::{CreateSession, Session},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Companies (global scope)
// ---------------------------------------------------------------------------

pub trait CompanyRepository: Send + Sync {
    fn create(&self, input: CreateCompany) -> impl Future<Output = BelayResult<Company>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BelayResult<Company>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateCompany,
    ) -> impl Future<Output = BelayResult<Company>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = BelayResult<PaginatedResult<Company>>> + Send;
}

// ---------------------------------------------------------------------------
// Principals
// ---------------------------------------------------------------------------

pub trait PrincipalRepository: Send + Sync {
    fn create(&self, input: CreatePrincipal)
    -> impl Future<Output = BelayResult<Principal>> + Send;
    /// Create with a caller-chosen id (used when a linking code is
    /// claimed for the principal before the record exists).
    fn create_with_id(
        &self,
        id: Uuid,
        input: CreatePrincipal,
    ) -> impl Future<Output = BelayResult<Principal>> + Send;
    /// Global lookup, for session resolution only.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BelayResult<Principal>> + Send;
    fn get_in_tenant(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = BelayResult<Principal>> + Send;
    /// Global lookup, for login only.
    fn get_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = BelayResult<Principal>> + Send;
    /// Global lookup, for login only.
    fn get_by_email(&self, email: &str) -> impl Future<Output = BelayResult<Principal>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePrincipal,
    ) -> impl Future<Output = BelayResult<Principal>> + Send;
    /// Soft-delete: sets status to Deactivated.
    fn deactivate(&self, tenant_id: Uuid, id: Uuid)
    -> impl Future<Output = BelayResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = BelayResult<PaginatedResult<Principal>>> + Send;
    /// Active owners and employees of a company (seat usage).
    fn count_active_company_principals(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = BelayResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Permission grants (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait PermissionGrantRepository: Send + Sync {
    /// Insert or overwrite the grant for `(tenant, principal, capability)`.
    fn set(&self, input: SetGrant) -> impl Future<Output = BelayResult<PermissionGrant>> + Send;
    fn get(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
        capability: Capability,
    ) -> impl Future<Output = BelayResult<Option<PermissionGrant>>> + Send;
    fn list_for_principal(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
    ) -> impl Future<Output = BelayResult<Vec<PermissionGrant>>> + Send;
    /// Remove the grant record entirely (back to deny-by-default).
    fn delete(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
        capability: Capability,
    ) -> impl Future<Output = BelayResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Buildings & units (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait BuildingRepository: Send + Sync {
    fn create(&self, input: CreateBuilding) -> impl Future<Output = BelayResult<Building>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = BelayResult<Building>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = BelayResult<PaginatedResult<Building>>> + Send;
    fn create_unit(&self, input: CreateUnit) -> impl Future<Output = BelayResult<Unit>> + Send;
    fn get_unit(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = BelayResult<Unit>> + Send;
    fn list_units(
        &self,
        tenant_id: Uuid,
        building_id: Uuid,
    ) -> impl Future<Output = BelayResult<Vec<Unit>>> + Send;
}

// ---------------------------------------------------------------------------
// Linking codes
// ---------------------------------------------------------------------------

pub trait LinkingCodeRepository: Send + Sync {
    fn create(
        &self,
        input: CreateLinkingCode,
    ) -> impl Future<Output = BelayResult<LinkingCode>> + Send;
    /// Global lookup by the opaque code string.
    fn get_by_code(&self, code: &str) -> impl Future<Output = BelayResult<LinkingCode>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = BelayResult<LinkingCode>> + Send;
    /// The code a principal is currently bound to, if any.
    fn get_by_bound_principal(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
    ) -> impl Future<Output = BelayResult<Option<LinkingCode>>> + Send;
    /// Bind a principal to an active, unbound code. Fails with
    /// `InvalidLinkingCode` when the code was revoked or bound by someone
    /// else in the meantime.
    fn claim(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        principal_id: Uuid,
    ) -> impl Future<Output = BelayResult<LinkingCode>> + Send;
    /// Clear the bound principal so the code can be used again.
    fn release(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = BelayResult<()>> + Send;
    fn revoke(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = BelayResult<()>> + Send;
    fn list_by_building(
        &self,
        tenant_id: Uuid,
        building_id: Uuid,
    ) -> impl Future<Output = BelayResult<Vec<LinkingCode>>> + Send;
}

// ---------------------------------------------------------------------------
// Projects (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait ProjectRepository: Send + Sync {
    fn create(&self, input: CreateProject) -> impl Future<Output = BelayResult<Project>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = BelayResult<Project>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateProject,
    ) -> impl Future<Output = BelayResult<Project>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = BelayResult<PaginatedResult<Project>>> + Send;
    fn list_by_building(
        &self,
        tenant_id: Uuid,
        building_id: Uuid,
    ) -> impl Future<Output = BelayResult<Vec<Project>>> + Send;
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = BelayResult<Session>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = BelayResult<Session>> + Send;
    /// Invalidate a single session.
    fn invalidate(&self, id: Uuid) -> impl Future<Output = BelayResult<()>> + Send;
    /// Invalidate all sessions for a principal (password rotation,
    /// deactivation).
    fn invalidate_principal_sessions(
        &self,
        principal_id: Uuid,
    ) -> impl Future<Output = BelayResult<()>> + Send;
    /// Remove all expired sessions.
    fn cleanup_expired(&self) -> impl Future<Output = BelayResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only)
// ---------------------------------------------------------------------------

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub resource_id: Option<Uuid>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit log entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = BelayResult<AuditLogEntry>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = BelayResult<PaginatedResult<AuditLogEntry>>> + Send;
}
