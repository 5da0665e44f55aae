//! SurrealDB implementation of [`CompanyRepository`].

use belay_core::error::BelayResult;
use belay_core::models::company::{Company, CreateCompany, SubscriptionTier, UpdateCompany};
use belay_core::repository::{CompanyRepository, PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CompanyRow {
    name: String,
    subscription_tier: String,
    seat_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CompanyRowWithId {
    record_id: String,
    name: String,
    subscription_tier: String,
    seat_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_tier(s: &str) -> Result<SubscriptionTier, DbError> {
    match s {
        "Basic" => Ok(SubscriptionTier::Basic),
        "Professional" => Ok(SubscriptionTier::Professional),
        "Enterprise" => Ok(SubscriptionTier::Enterprise),
        other => Err(DbError::Conversion(format!(
            "unknown subscription tier: {other}"
        ))),
    }
}

fn tier_to_str(tier: SubscriptionTier) -> &'static str {
    match tier {
        SubscriptionTier::Basic => "Basic",
        SubscriptionTier::Professional => "Professional",
        SubscriptionTier::Enterprise => "Enterprise",
    }
}

impl CompanyRow {
    fn into_company(self, id: Uuid) -> Result<Company, DbError> {
        Ok(Company {
            id,
            name: self.name,
            subscription_tier: parse_tier(&self.subscription_tier)?,
            seat_count: self.seat_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl CompanyRowWithId {
    fn try_into_company(self) -> Result<Company, DbError> {
        let id = parse_uuid(&self.record_id, "company")?;
        CompanyRow {
            name: self.name,
            subscription_tier: self.subscription_tier,
            seat_count: self.seat_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_company(id)
    }
}

/// SurrealDB implementation of the Company repository.
#[derive(Clone)]
pub struct SurrealCompanyRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCompanyRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CompanyRepository for SurrealCompanyRepository<C> {
    async fn create(&self, input: CreateCompany) -> BelayResult<Company> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('company', $id) SET \
                 name = $name, \
                 subscription_tier = $tier, \
                 seat_count = $seat_count",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("tier", tier_to_str(input.subscription_tier).to_string()))
            .bind(("seat_count", input.seat_count))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("company", e))?;

        let rows: Vec<CompanyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "company".into(),
            id: id_str,
        })?;

        Ok(row.into_company(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> BelayResult<Company> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('company', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CompanyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "company".into(),
            id: id_str,
        })?;

        Ok(row.into_company(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateCompany) -> BelayResult<Company> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.subscription_tier.is_some() {
            sets.push("subscription_tier = $tier");
        }
        if input.seat_count.is_some() {
            sets.push("seat_count = $seat_count");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('company', $id) SET {} RETURN AFTER",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(tier) = input.subscription_tier {
            builder = builder.bind(("tier", tier_to_str(tier).to_string()));
        }
        if let Some(seat_count) = input.seat_count {
            builder = builder.bind(("seat_count", seat_count));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("company", e))?;

        let rows: Vec<CompanyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "company".into(),
            id: id_str,
        })?;

        Ok(row.into_company(id)?)
    }

    async fn list(&self, pagination: Pagination) -> BelayResult<PaginatedResult<Company>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM company GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM company \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CompanyRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(CompanyRowWithId::try_into_company)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
