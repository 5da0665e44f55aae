//! Domain models for Belay.
//!
//! Every tenant-owned type implements [`TenantOwned`] so the scoping
//! filter can admit or reject it without knowing its concrete shape.

pub mod audit;
pub mod building;
pub mod company;
pub mod linking_code;
pub mod permission;
pub mod principal;
pub mod project;
pub mod session;

use uuid::Uuid;

/// A record that belongs to exactly one company.
pub trait TenantOwned {
    fn tenant_id(&self) -> Uuid;
}
