//! SurrealDB implementation of [`PrincipalRepository`].
//!
//! Password hashing uses Argon2id with OWASP-recommended parameters
//! (memory: 19 MiB, iterations: 2, parallelism: 1). Salt is randomly
//! generated per hash. An optional pepper (server-side secret) can be
//! provided at construction time.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use belay_core::error::BelayResult;
use belay_core::models::principal::{
    BaseRole, CreatePrincipal, Principal, PrincipalKind, PrincipalStatus, UpdatePrincipal,
};
use belay_core::repository::{PaginatedResult, Pagination, PrincipalRepository};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct PrincipalRow {
    tenant_id: Option<String>,
    kind: String,
    base_role: Option<String>,
    username: String,
    email: String,
    password_hash: String,
    status: String,
    building_id: Option<String>,
    unit_id: Option<String>,
    hourly_rate_cents: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct PrincipalRowWithId {
    record_id: String,
    tenant_id: Option<String>,
    kind: String,
    base_role: Option<String>,
    username: String,
    email: String,
    password_hash: String,
    status: String,
    building_id: Option<String>,
    unit_id: Option<String>,
    hourly_rate_cents: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_kind(s: &str) -> Result<PrincipalKind, DbError> {
    match s {
        "Owner" => Ok(PrincipalKind::Owner),
        "Employee" => Ok(PrincipalKind::Employee),
        "Resident" => Ok(PrincipalKind::Resident),
        "BuildingManager" => Ok(PrincipalKind::BuildingManager),
        "Superuser" => Ok(PrincipalKind::Superuser),
        other => Err(DbError::Conversion(format!("unknown principal kind: {other}"))),
    }
}

fn kind_to_str(kind: PrincipalKind) -> &'static str {
    match kind {
        PrincipalKind::Owner => "Owner",
        PrincipalKind::Employee => "Employee",
        PrincipalKind::Resident => "Resident",
        PrincipalKind::BuildingManager => "BuildingManager",
        PrincipalKind::Superuser => "Superuser",
    }
}

fn parse_status(s: &str) -> Result<PrincipalStatus, DbError> {
    match s {
        "Active" => Ok(PrincipalStatus::Active),
        "Deactivated" => Ok(PrincipalStatus::Deactivated),
        other => Err(DbError::Conversion(format!(
            "unknown principal status: {other}"
        ))),
    }
}

fn status_to_str(status: PrincipalStatus) -> &'static str {
    match status {
        PrincipalStatus::Active => "Active",
        PrincipalStatus::Deactivated => "Deactivated",
    }
}

fn parse_role(s: Option<&str>) -> Result<Option<BaseRole>, DbError> {
    s.map(|v| v.parse::<BaseRole>().map_err(DbError::Conversion))
        .transpose()
}

impl PrincipalRow {
    fn into_principal(self, id: Uuid) -> Result<Principal, DbError> {
        Ok(Principal {
            id,
            tenant_id: parse_opt_uuid(self.tenant_id.as_deref(), "tenant")?,
            kind: parse_kind(&self.kind)?,
            base_role: parse_role(self.base_role.as_deref())?,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            status: parse_status(&self.status)?,
            building_id: parse_opt_uuid(self.building_id.as_deref(), "building")?,
            unit_id: parse_opt_uuid(self.unit_id.as_deref(), "unit")?,
            hourly_rate_cents: self.hourly_rate_cents,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PrincipalRowWithId {
    fn try_into_principal(self) -> Result<Principal, DbError> {
        let id = parse_uuid(&self.record_id, "principal")?;
        PrincipalRow {
            tenant_id: self.tenant_id,
            kind: self.kind,
            base_role: self.base_role,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            status: self.status,
            building_id: self.building_id,
            unit_id: self.unit_id,
            hourly_rate_cents: self.hourly_rate_cents,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_principal(id)
    }
}

/// Hash a password with Argon2id using OWASP-recommended parameters.
///
/// If a pepper is provided, it is prepended to the password before
/// hashing. The salt is randomly generated for each call.
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, DbError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::Hashing(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| DbError::Hashing(e.to_string()))?;

    Ok(hash.to_string())
}

/// SurrealDB implementation of the Principal repository.
#[derive(Clone)]
pub struct SurrealPrincipalRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealPrincipalRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }

    /// Run a global single-row lookup whose filter is bound as `$value`.
    async fn select_one(&self, query: &str, key: &str, value: String) -> BelayResult<Principal> {
        let mut result = self
            .db
            .query(query)
            .bind(("value", value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: format!("{key}={value}"),
        })?;

        Ok(row.try_into_principal()?)
    }
}

impl<C: Connection> PrincipalRepository for SurrealPrincipalRepository<C> {
    async fn create(&self, input: CreatePrincipal) -> BelayResult<Principal> {
        self.create_with_id(Uuid::new_v4(), input).await
    }

    async fn create_with_id(&self, id: Uuid, input: CreatePrincipal) -> BelayResult<Principal> {
        let id_str = id.to_string();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        let result = self
            .db
            .query(
                "CREATE type::record('principal', $id) SET \
                 tenant_id = $tenant_id, \
                 kind = $kind, base_role = $base_role, \
                 username = $username, email = $email, \
                 password_hash = $password_hash, \
                 status = 'Active', \
                 building_id = $building_id, unit_id = $unit_id, \
                 hourly_rate_cents = $hourly_rate_cents",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.map(|t| t.to_string())))
            .bind(("kind", kind_to_str(input.kind).to_string()))
            .bind(("base_role", input.base_role.map(|r| r.to_string())))
            .bind(("username", input.username))
            .bind(("email", input.email))
            .bind(("password_hash", password_hash))
            .bind(("building_id", input.building_id.map(|b| b.to_string())))
            .bind(("unit_id", input.unit_id.map(|u| u.to_string())))
            .bind(("hourly_rate_cents", input.hourly_rate_cents))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("principal", e))?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;

        Ok(row.into_principal(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> BelayResult<Principal> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('principal', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;

        Ok(row.into_principal(id)?)
    }

    async fn get_in_tenant(&self, tenant_id: Uuid, id: Uuid) -> BelayResult<Principal> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('principal', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;

        Ok(row.into_principal(id)?)
    }

    async fn get_by_username(&self, username: &str) -> BelayResult<Principal> {
        self.select_one(
            "SELECT meta::id(id) AS record_id, * FROM principal \
             WHERE username = $value",
            "username",
            username.to_string(),
        )
        .await
    }

    async fn get_by_email(&self, email: &str) -> BelayResult<Principal> {
        self.select_one(
            "SELECT meta::id(id) AS record_id, * FROM principal \
             WHERE email = $value",
            "email",
            email.to_string(),
        )
        .await
    }

    async fn update(&self, id: Uuid, input: UpdatePrincipal) -> BelayResult<Principal> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.base_role.is_some() {
            sets.push("base_role = $base_role");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.password.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.hourly_rate_cents.is_some() {
            sets.push("hourly_rate_cents = $hourly_rate_cents");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('principal', $id) SET {} RETURN AFTER",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(role) = input.base_role {
            builder = builder.bind(("base_role", role.to_string()));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status_to_str(status).to_string()));
        }
        if let Some(password) = input.password {
            let hash = hash_password(&password, self.pepper.as_deref())?;
            builder = builder.bind(("password_hash", hash));
        }
        if let Some(rate) = input.hourly_rate_cents {
            builder = builder.bind(("hourly_rate_cents", rate));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_check("principal", e))?;

        let rows: Vec<PrincipalRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "principal".into(),
            id: id_str,
        })?;

        Ok(row.into_principal(id)?)
    }

    async fn deactivate(&self, tenant_id: Uuid, id: Uuid) -> BelayResult<()> {
        self.db
            .query(
                "UPDATE type::record('principal', $id) SET \
                 status = 'Deactivated', updated_at = time::now() \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> BelayResult<PaginatedResult<Principal>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM principal \
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
                "SELECT meta::id(id) AS record_id, * FROM principal \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PrincipalRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(PrincipalRowWithId::try_into_principal)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn count_active_company_principals(&self, tenant_id: Uuid) -> BelayResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM principal \
                 WHERE tenant_id = $tenant_id AND status = 'Active' \
                 AND kind IN ['Owner', 'Employee'] GROUP ALL",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
