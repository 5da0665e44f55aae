//! SurrealDB implementation of [`LinkingCodeRepository`].
//!
//! Binding a principal to a code is a single conditional UPDATE, so two
//! registrations racing for the same code cannot both succeed.

use belay_core::error::{BelayError, BelayResult};
use belay_core::models::linking_code::{CreateLinkingCode, LinkKind, LinkStatus, LinkingCode};
use belay_core::repository::LinkingCodeRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct LinkingCodeRow {
    tenant_id: String,
    code: String,
    kind: String,
    building_id: String,
    unit_id: Option<String>,
    status: String,
    bound_principal_id: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct LinkingCodeRowWithId {
    record_id: String,
    tenant_id: String,
    code: String,
    kind: String,
    building_id: String,
    unit_id: Option<String>,
    status: String,
    bound_principal_id: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_kind(s: &str) -> Result<LinkKind, DbError> {
    match s {
        "Resident" => Ok(LinkKind::Resident),
        "BuildingManager" => Ok(LinkKind::BuildingManager),
        other => Err(DbError::Conversion(format!("unknown link kind: {other}"))),
    }
}

fn kind_to_str(kind: LinkKind) -> &'static str {
    match kind {
        LinkKind::Resident => "Resident",
        LinkKind::BuildingManager => "BuildingManager",
    }
}

fn parse_status(s: &str) -> Result<LinkStatus, DbError> {
    match s {
        "Active" => Ok(LinkStatus::Active),
        "Revoked" => Ok(LinkStatus::Revoked),
        other => Err(DbError::Conversion(format!("unknown link status: {other}"))),
    }
}

impl LinkingCodeRow {
    fn into_code(self, id: Uuid) -> Result<LinkingCode, DbError> {
        Ok(LinkingCode {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            code: self.code,
            kind: parse_kind(&self.kind)?,
            building_id: parse_uuid(&self.building_id, "building")?,
            unit_id: parse_opt_uuid(self.unit_id.as_deref(), "unit")?,
            status: parse_status(&self.status)?,
            bound_principal_id: parse_opt_uuid(
                self.bound_principal_id.as_deref(),
                "bound principal",
            )?,
            expires_at: self.expires_at,
            created_by: parse_uuid(&self.created_by, "created_by")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl LinkingCodeRowWithId {
    fn try_into_code(self) -> Result<LinkingCode, DbError> {
        let id = parse_uuid(&self.record_id, "linking code")?;
        LinkingCodeRow {
            tenant_id: self.tenant_id,
            code: self.code,
            kind: self.kind,
            building_id: self.building_id,
            unit_id: self.unit_id,
            status: self.status,
            bound_principal_id: self.bound_principal_id,
            expires_at: self.expires_at,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_code(id)
    }
}

/// SurrealDB implementation of the LinkingCode repository.
#[derive(Clone)]
pub struct SurrealLinkingCodeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealLinkingCodeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Run a tenant-filtered UPDATE on one code and return the record
    /// after the change. An empty result means the record does not exist
    /// in this tenant or the WHERE clause rejected it.
    async fn update_one(
        &self,
        query: &str,
        tenant_id: Uuid,
        id: Uuid,
        principal_id: Option<Uuid>,
    ) -> Result<Option<LinkingCode>, DbError> {
        let mut builder = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()));
        if let Some(principal_id) = principal_id {
            builder = builder.bind(("principal_id", principal_id.to_string()));
        }

        let result = builder.await?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("linking_code", e))?;

        let rows: Vec<LinkingCodeRow> = result.take(0)?;
        rows.into_iter().next().map(|r| r.into_code(id)).transpose()
    }
}

impl<C: Connection> LinkingCodeRepository for SurrealLinkingCodeRepository<C> {
    async fn create(&self, input: CreateLinkingCode) -> BelayResult<LinkingCode> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('linking_code', $id) SET \
                 tenant_id = $tenant_id, code = $code, kind = $kind, \
                 building_id = $building_id, unit_id = $unit_id, \
                 status = 'Active', bound_principal_id = NONE, \
                 expires_at = $expires_at, created_by = $created_by",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("code", input.code))
            .bind(("kind", kind_to_str(input.kind).to_string()))
            .bind(("building_id", input.building_id.to_string()))
            .bind(("unit_id", input.unit_id.map(|u| u.to_string())))
            .bind(("expires_at", input.expires_at))
            .bind(("created_by", input.created_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("linking_code", e))?;

        let rows: Vec<LinkingCodeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "linking_code".into(),
            id: id_str,
        })?;

        Ok(row.into_code(id)?)
    }

    async fn get_by_code(&self, code: &str) -> BelayResult<LinkingCode> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM linking_code \
                 WHERE code = $code",
            )
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LinkingCodeRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(BelayError::InvalidLinkingCode)?;

        Ok(row.try_into_code()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> BelayResult<LinkingCode> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('linking_code', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LinkingCodeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "linking_code".into(),
            id: id_str,
        })?;

        Ok(row.into_code(id)?)
    }

    async fn get_by_bound_principal(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
    ) -> BelayResult<Option<LinkingCode>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM linking_code \
                 WHERE tenant_id = $tenant_id \
                 AND bound_principal_id = $principal_id",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("principal_id", principal_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LinkingCodeRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .next()
            .map(LinkingCodeRowWithId::try_into_code)
            .transpose()?)
    }

    async fn claim(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        principal_id: Uuid,
    ) -> BelayResult<LinkingCode> {
        let claimed = self
            .update_one(
                "UPDATE type::record('linking_code', $id) SET \
                 bound_principal_id = $principal_id, \
                 updated_at = time::now() \
                 WHERE tenant_id = $tenant_id AND status = 'Active' \
                 AND bound_principal_id = NONE \
                 AND (expires_at = NONE OR expires_at > time::now()) \
                 RETURN AFTER",
                tenant_id,
                id,
                Some(principal_id),
            )
            .await?;

        claimed.ok_or(BelayError::InvalidLinkingCode)
    }

    async fn release(&self, tenant_id: Uuid, id: Uuid) -> BelayResult<()> {
        self.update_one(
            "UPDATE type::record('linking_code', $id) SET \
             bound_principal_id = NONE, updated_at = time::now() \
             WHERE tenant_id = $tenant_id \
             RETURN AFTER",
            tenant_id,
            id,
            None,
        )
        .await?
        .ok_or_else(|| DbError::NotFound {
            entity: "linking_code".into(),
            id: id.to_string(),
        })?;

        Ok(())
    }

    async fn revoke(&self, tenant_id: Uuid, id: Uuid) -> BelayResult<()> {
        self.update_one(
            "UPDATE type::record('linking_code', $id) SET \
             status = 'Revoked', updated_at = time::now() \
             WHERE tenant_id = $tenant_id \
             RETURN AFTER",
            tenant_id,
            id,
            None,
        )
        .await?
        .ok_or_else(|| DbError::NotFound {
            entity: "linking_code".into(),
            id: id.to_string(),
        })?;

        Ok(())
    }

    async fn list_by_building(
        &self,
        tenant_id: Uuid,
        building_id: Uuid,
    ) -> BelayResult<Vec<LinkingCode>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM linking_code \
                 WHERE tenant_id = $tenant_id AND building_id = $building_id \
                 ORDER BY created_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("building_id", building_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<LinkingCodeRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(LinkingCodeRowWithId::try_into_code)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
