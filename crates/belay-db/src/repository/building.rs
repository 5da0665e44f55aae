//! SurrealDB implementation of [`BuildingRepository`] (buildings and
//! their units).

use belay_core::error::BelayResult;
use belay_core::models::building::{Building, CreateBuilding, CreateUnit, Unit};
use belay_core::repository::{BuildingRepository, PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct BuildingRow {
    record_id: String,
    tenant_id: String,
    name: String,
    address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BuildingRow {
    fn try_into_building(self) -> Result<Building, DbError> {
        Ok(Building {
            id: parse_uuid(&self.record_id, "building")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            address: self.address,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct UnitRow {
    record_id: String,
    tenant_id: String,
    building_id: String,
    label: String,
    created_at: DateTime<Utc>,
}

impl UnitRow {
    fn try_into_unit(self) -> Result<Unit, DbError> {
        Ok(Unit {
            id: parse_uuid(&self.record_id, "unit")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            building_id: parse_uuid(&self.building_id, "building")?,
            label: self.label,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Building repository.
#[derive(Clone)]
pub struct SurrealBuildingRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealBuildingRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> BuildingRepository for SurrealBuildingRepository<C> {
    async fn create(&self, input: CreateBuilding) -> BelayResult<Building> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('building', $id) SET \
                 tenant_id = $tenant_id, name = $name, address = $address; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('building', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("address", input.address))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("building", e))?;

        let rows: Vec<BuildingRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "building".into(),
            id: id_str,
        })?;

        Ok(row.try_into_building()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> BelayResult<Building> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('building', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BuildingRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "building".into(),
            id: id_str,
        })?;

        Ok(row.try_into_building()?)
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> BelayResult<PaginatedResult<Building>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM building \
                 WHERE tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM building \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BuildingRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(BuildingRow::try_into_building)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn create_unit(&self, input: CreateUnit) -> BelayResult<Unit> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('unit', $id) SET \
                 tenant_id = $tenant_id, building_id = $building_id, \
                 label = $label; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('unit', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("building_id", input.building_id.to_string()))
            .bind(("label", input.label))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("unit", e))?;

        let rows: Vec<UnitRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "unit".into(),
            id: id_str,
        })?;

        Ok(row.try_into_unit()?)
    }

    async fn get_unit(&self, tenant_id: Uuid, id: Uuid) -> BelayResult<Unit> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('unit', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UnitRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "unit".into(),
            id: id_str,
        })?;

        Ok(row.try_into_unit()?)
    }

    async fn list_units(&self, tenant_id: Uuid, building_id: Uuid) -> BelayResult<Vec<Unit>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM unit \
                 WHERE tenant_id = $tenant_id AND building_id = $building_id \
                 ORDER BY label ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("building_id", building_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UnitRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(UnitRow::try_into_unit)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
