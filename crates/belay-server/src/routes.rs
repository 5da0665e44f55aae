//! HTTP routes. Handlers translate JSON to service calls and nothing
//! else; every check lives in the services.

use axum::extract::{Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use belay_auth::{IssueCodeInput, LoginInput, NewEmployee, NewProject, RegisterInput, SignupInput};
use belay_core::error::BelayError;
use belay_core::models::building::{Building, Unit};
use belay_core::models::company::SubscriptionTier;
use belay_core::models::linking_code::{LinkKind, LinkTarget, LinkingCode};
use belay_core::models::permission::{Capability, PermissionGrant};
use belay_core::models::principal::{BaseRole, PrincipalView};
use belay_core::models::project::{ProjectView, UpdateProject};
use belay_core::repository::{PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{HttpError, ValidatedJson};
use crate::extract::{Caller, cleared_cookie, session_cookie};
use crate::state::AppState;

const MAX_PAGE: u64 = 200;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/signup", post(signup))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/me", get(me))
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}", get(get_project).patch(update_project))
        .route("/api/employees", post(create_employee))
        .route("/api/principals", get(list_principals))
        .route("/api/principals/{id}/deactivate", post(deactivate_principal))
        .route("/api/principals/{id}/role", put(set_role))
        .route("/api/principals/{id}/grants", get(list_grants))
        .route("/api/principals/{id}/grants/{capability}", put(set_grant))
        .route("/api/buildings", get(list_buildings).post(create_building))
        .route("/api/buildings/{id}/units", get(list_units).post(create_unit))
        .route("/api/buildings/{id}/linking-codes", get(list_codes))
        .route("/api/linking-codes", post(issue_code))
        .route("/api/linking-codes/{id}/revoke", post(revoke_code))
        .route("/api/link-targets/{code}", get(resolve_link))
        .route("/api/register", post(register))
        .route(
            "/api/building-managers/{id}/rotate-password",
            post(rotate_manager_password),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Shared request/response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl From<PageQuery> for Pagination {
    fn from(q: PageQuery) -> Self {
        let defaults = Pagination::default();
        Pagination {
            offset: q.offset.unwrap_or(defaults.offset),
            limit: q.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> From<PaginatedResult<T>> for Page<T> {
    fn from(r: PaginatedResult<T>) -> Self {
        Self {
            items: r.items,
            total: r.total,
            offset: r.offset,
            limit: r.limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub company_name: String,
    #[serde(default = "default_tier")]
    pub subscription_tier: SubscriptionTier,
    pub seat_count: u32,
    pub username: String,
    pub email: String,
    pub password: String,
}

fn default_tier() -> SubscriptionTier {
    SubscriptionTier::Basic
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub company_id: Uuid,
    pub owner_id: Uuid,
}

async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let out = state
        .directory
        .signup(SignupInput {
            company_name: req.company_name,
            subscription_tier: req.subscription_tier,
            seat_count: req.seat_count,
            username: req.username,
            email: req.email,
            password: req.password,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            company_id: out.company.id,
            owner_id: out.owner.id,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub principal_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let ip_address = header("x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()));

    let out = state
        .auth
        .login(LoginInput {
            username_or_email: req.username_or_email,
            password: req.password,
            ip_address,
            user_agent: header("user-agent"),
        })
        .await?;

    let cookie = session_cookie(&out.session_token, &state.cookie)
        .ok_or_else(|| BelayError::Internal("session token is not a valid header".into()))?;
    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            principal_id: out.principal_id,
            expires_at: out.expires_at,
        }),
    ))
}

async fn logout(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> Result<impl IntoResponse, HttpError> {
    if let Some(session_id) = ctx.session_id {
        state.auth.logout(session_id).await?;
        info!(principal_id = %ctx.principal_id, "Principal logged out");
    }
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cleared_cookie())]))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub principal: PrincipalView,
    pub tenant_id: Option<Uuid>,
    pub capabilities: Vec<Capability>,
}

async fn me(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> Result<Json<MeResponse>, HttpError> {
    let principal = state.directory.me(&ctx).await?;
    let capabilities = state.permissions.my_capabilities(&ctx).await?;
    Ok(Json(MeResponse {
        principal,
        tenant_id: ctx.tenant_id,
        capabilities,
    }))
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub building_id: Option<Uuid>,
    pub budget_cents: Option<i64>,
    pub labor_cost_cents: Option<i64>,
    pub billed_cents: Option<i64>,
}

async fn list_projects(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<ProjectView>>, HttpError> {
    let result = state.projects.list(&ctx, page.into()).await?;
    Ok(Json(result.into()))
}

async fn create_project(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let view = state
        .projects
        .create(
            &ctx,
            NewProject {
                name: req.name,
                building_id: req.building_id,
                budget_cents: req.budget_cents,
                labor_cost_cents: req.labor_cost_cents,
                billed_cents: req.billed_cents,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_project(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectView>, HttpError> {
    Ok(Json(state.projects.get(&ctx, id).await?))
}

async fn update_project(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProject>,
) -> Result<Json<ProjectView>, HttpError> {
    Ok(Json(state.projects.update(&ctx, id, req).await?))
}

// ---------------------------------------------------------------------------
// Principals & permissions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub base_role: BaseRole,
    pub hourly_rate_cents: Option<i64>,
}

async fn create_employee(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ValidatedJson(req): ValidatedJson<CreateEmployeeRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let view = state
        .directory
        .create_employee(
            &ctx,
            NewEmployee {
                username: req.username,
                email: req.email,
                password: req.password,
                base_role: req.base_role,
                hourly_rate_cents: req.hourly_rate_cents,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn list_principals(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<PrincipalView>>, HttpError> {
    let result = state.directory.list_principals(&ctx, page.into()).await?;
    Ok(Json(result.into()))
}

async fn deactivate_principal(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    state.directory.deactivate_principal(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub base_role: BaseRole,
}

async fn set_role(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<SetRoleRequest>,
) -> Result<Json<PrincipalView>, HttpError> {
    let updated = state.permissions.set_base_role(&ctx, id, req.base_role).await?;
    Ok(Json(PrincipalView::new(&updated, false)))
}

async fn list_grants(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PermissionGrant>>, HttpError> {
    Ok(Json(state.permissions.list_grants(&ctx, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SetGrantRequest {
    pub granted: bool,
}

async fn set_grant(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path((id, capability)): Path<(Uuid, String)>,
    ValidatedJson(req): ValidatedJson<SetGrantRequest>,
) -> Result<Json<PermissionGrant>, HttpError> {
    let capability: Capability = capability
        .parse()
        .map_err(|message| BelayError::Validation { message })?;
    let grant = if req.granted {
        state.permissions.grant(&ctx, id, capability).await?
    } else {
        state.permissions.revoke(&ctx, id, capability).await?
    };
    Ok(Json(grant))
}

// ---------------------------------------------------------------------------
// Buildings & linking codes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateBuildingRequest {
    pub name: String,
    pub address: String,
}

async fn create_building(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ValidatedJson(req): ValidatedJson<CreateBuildingRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let building = state
        .buildings
        .create_building(&ctx, req.name, req.address)
        .await?;
    Ok((StatusCode::CREATED, Json(building)))
}

async fn list_buildings(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Building>>, HttpError> {
    let result = state.buildings.list_buildings(&ctx, page.into()).await?;
    Ok(Json(result.into()))
}

#[derive(Debug, Deserialize)]
pub struct CreateUnitRequest {
    pub label: String,
}

async fn create_unit(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(building_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateUnitRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let unit = state
        .buildings
        .create_unit(&ctx, building_id, req.label)
        .await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

async fn list_units(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(building_id): Path<Uuid>,
) -> Result<Json<Vec<Unit>>, HttpError> {
    Ok(Json(state.buildings.list_units(&ctx, building_id).await?))
}

async fn list_codes(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(building_id): Path<Uuid>,
) -> Result<Json<Vec<LinkingCode>>, HttpError> {
    Ok(Json(state.linking.list_codes(&ctx, building_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct IssueCodeRequest {
    pub kind: LinkKind,
    pub building_id: Uuid,
    pub unit_id: Option<Uuid>,
}

async fn issue_code(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ValidatedJson(req): ValidatedJson<IssueCodeRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let code = state
        .linking
        .issue_code(
            &ctx,
            IssueCodeInput {
                kind: req.kind,
                building_id: req.building_id,
                unit_id: req.unit_id,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(code)))
}

async fn revoke_code(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    state.linking.revoke_code(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_link(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LinkTarget>, HttpError> {
    Ok(Json(state.linking.resolve_link(&code).await?))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub code: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let principal = state
        .linking
        .register_external(RegisterInput {
            code: req.code,
            username: req.username,
            email: req.email,
            password: req.password,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(PrincipalView::new(&principal, false))))
}

#[derive(Debug, Deserialize)]
pub struct RotatePasswordRequest {
    pub new_password: String,
}

async fn rotate_manager_password(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<RotatePasswordRequest>,
) -> Result<StatusCode, HttpError> {
    state
        .linking
        .rotate_building_manager_password(&ctx, id, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
