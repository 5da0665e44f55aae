//! SurrealDB repository implementations.

mod audit;
mod building;
mod company;
mod linking_code;
mod permission;
mod principal;
mod project;
mod session;

pub use audit::SurrealAuditLogRepository;
pub use building::SurrealBuildingRepository;
pub use company::SurrealCompanyRepository;
pub use linking_code::SurrealLinkingCodeRepository;
pub use permission::SurrealPermissionGrantRepository;
pub use principal::{SurrealPrincipalRepository, hash_password};
pub use project::SurrealProjectRepository;
pub use session::SurrealSessionRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Conversion(format!("invalid {what} UUID: {e}")))
}

fn parse_opt_uuid(value: Option<&str>, what: &str) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(v, what)).transpose()
}
