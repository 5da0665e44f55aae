//! SurrealDB implementation of [`PermissionGrantRepository`].
//!
//! Each grant lives at a deterministic record id derived from
//! `(tenant, principal, capability)`, so setting a grant is a single
//! UPSERT and there is never more than one record per key.

use belay_core::error::BelayResult;
use belay_core::models::permission::{Capability, PermissionGrant, SetGrant};
use belay_core::repository::PermissionGrantRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct GrantRow {
    tenant_id: String,
    principal_id: String,
    capability: String,
    granted: bool,
    granted_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GrantRow {
    fn try_into_grant(self) -> Result<PermissionGrant, DbError> {
        Ok(PermissionGrant {
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            principal_id: parse_uuid(&self.principal_id, "principal")?,
            capability: self
                .capability
                .parse::<Capability>()
                .map_err(DbError::Conversion)?,
            granted: self.granted,
            granted_by: parse_uuid(&self.granted_by, "granted_by")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn grant_key(tenant_id: Uuid, principal_id: Uuid, capability: Capability) -> String {
    format!("{tenant_id}_{principal_id}_{capability}")
}

/// SurrealDB implementation of the permission-grant repository.
#[derive(Clone)]
pub struct SurrealPermissionGrantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionGrantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PermissionGrantRepository for SurrealPermissionGrantRepository<C> {
    async fn set(&self, input: SetGrant) -> BelayResult<PermissionGrant> {
        let key = grant_key(input.tenant_id, input.principal_id, input.capability);

        let result = self
            .db
            .query(
                "UPSERT type::record('permission_grant', $key) SET \
                 tenant_id = $tenant_id, \
                 principal_id = $principal_id, \
                 capability = $capability, \
                 granted = $granted, \
                 granted_by = $granted_by, \
                 updated_at = time::now() \
                 RETURN AFTER",
            )
            .bind(("key", key.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("principal_id", input.principal_id.to_string()))
            .bind(("capability", input.capability.as_str().to_string()))
            .bind(("granted", input.granted))
            .bind(("granted_by", input.granted_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("permission_grant", e))?;

        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission_grant".into(),
            id: key,
        })?;

        Ok(row.try_into_grant()?)
    }

    async fn get(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
        capability: Capability,
    ) -> BelayResult<Option<PermissionGrant>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('permission_grant', $key) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("key", grant_key(tenant_id, principal_id, capability)))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .next()
            .map(GrantRow::try_into_grant)
            .transpose()?)
    }

    async fn list_for_principal(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
    ) -> BelayResult<Vec<PermissionGrant>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM permission_grant \
                 WHERE tenant_id = $tenant_id AND principal_id = $principal_id \
                 ORDER BY capability ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("principal_id", principal_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(GrantRow::try_into_grant)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn delete(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
        capability: Capability,
    ) -> BelayResult<()> {
        self.db
            .query(
                "DELETE type::record('permission_grant', $key) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("key", grant_key(tenant_id, principal_id, capability)))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
