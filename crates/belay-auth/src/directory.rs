//! Company signup and the company-side principal lifecycle.

use std::fmt;

use belay_core::context::{PrincipalContext, ResourceRef};
use belay_core::error::{BelayError, BelayResult};
use belay_core::models::audit::AuditOutcome;
use belay_core::models::company::{Company, CreateCompany, SubscriptionTier};
use belay_core::models::permission::{Capability, SetGrant};
use belay_core::models::principal::{
    BaseRole, CreatePrincipal, Principal, PrincipalKind, PrincipalView,
};
use belay_core::repository::{
    AuditLogRepository, CompanyRepository, LinkingCodeRepository, PaginatedResult, Pagination,
    PermissionGrantRepository, PrincipalRepository, SessionRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::authz::Authorizer;
use crate::config::AuthConfig;
use crate::password;
use crate::scope::TenantScope;

/// A new company together with its owner account.
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub company_name: String,
    pub subscription_tier: SubscriptionTier,
    pub seat_count: u32,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SignupOutput {
    pub company: Company,
    pub owner: Principal,
}

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub username: String,
    pub email: String,
    pub password: String,
    pub base_role: BaseRole,
    pub hourly_rate_cents: Option<i64>,
}

/// Platform operator account provisioned at startup.
#[derive(Clone)]
pub struct SuperuserSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SuperuserSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperuserSeed")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct DirectoryService<C, P, G, A, S, L>
where
    C: CompanyRepository,
    P: PrincipalRepository,
    G: PermissionGrantRepository,
    A: AuditLogRepository,
    S: SessionRepository,
    L: LinkingCodeRepository,
{
    companies: C,
    sessions: S,
    codes: L,
    authz: Authorizer<P, G, A>,
    config: AuthConfig,
}

impl<C, P, G, A, S, L> DirectoryService<C, P, G, A, S, L>
where
    C: CompanyRepository,
    P: PrincipalRepository,
    G: PermissionGrantRepository,
    A: AuditLogRepository,
    S: SessionRepository,
    L: LinkingCodeRepository,
{
    pub fn new(
        companies: C,
        sessions: S,
        codes: L,
        authz: Authorizer<P, G, A>,
        config: AuthConfig,
    ) -> Self {
        Self {
            companies,
            sessions,
            codes,
            authz,
            config,
        }
    }

    async fn ensure_login_free(&self, username: &str, email: &str) -> BelayResult<()> {
        let principals = self.authz.principals();
        for taken in [
            principals.get_by_username(username).await,
            principals.get_by_email(email).await,
        ] {
            match taken {
                Ok(_) => {
                    return Err(BelayError::AlreadyExists {
                        entity: "principal".into(),
                    });
                }
                Err(BelayError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Create the platform superuser unless it already exists. Running
    /// this again with the same username changes nothing; a company or
    /// external principal holding that username is a conflict.
    pub async fn ensure_superuser(&self, seed: SuperuserSeed) -> BelayResult<Principal> {
        let principals = self.authz.principals();
        match principals.get_by_username(&seed.username).await {
            Ok(existing) if existing.kind == PrincipalKind::Superuser => {
                info!(principal_id = %existing.id, "Superuser already provisioned");
                return Ok(existing);
            }
            Ok(_) => {
                return Err(BelayError::AlreadyExists {
                    entity: "principal".into(),
                });
            }
            Err(BelayError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        password::check_policy(&seed.password, &self.config)?;
        self.ensure_login_free(&seed.username, &seed.email).await?;

        let operator = principals
            .create(CreatePrincipal {
                tenant_id: None,
                kind: PrincipalKind::Superuser,
                base_role: None,
                username: seed.username,
                email: seed.email,
                password: seed.password,
                building_id: None,
                unit_id: None,
                hourly_rate_cents: None,
            })
            .await?;

        info!(principal_id = %operator.id, "Superuser provisioned");
        self.authz
            .record(
                &PrincipalContext::from_principal(&operator, None),
                None,
                "superuser.provision",
                Some(operator.id),
                AuditOutcome::Success,
                serde_json::json!({}),
            )
            .await?;
        Ok(operator)
    }

    /// Create a company and its owner. The owner receives every
    /// capability as an explicit grant; the `owner` role itself confers
    /// nothing.
    pub async fn signup(&self, input: SignupInput) -> BelayResult<SignupOutput> {
        if input.company_name.trim().is_empty() {
            return Err(BelayError::Validation {
                message: "company name must not be empty".into(),
            });
        }
        if input.seat_count == 0 {
            return Err(BelayError::Validation {
                message: "seat count must be at least 1".into(),
            });
        }
        password::check_policy(&input.password, &self.config)?;
        // Checked up front so a taken login does not leave an ownerless
        // company behind.
        self.ensure_login_free(&input.username, &input.email)
            .await?;

        let company = self
            .companies
            .create(CreateCompany {
                name: input.company_name,
                subscription_tier: input.subscription_tier,
                seat_count: input.seat_count,
            })
            .await?;

        let owner = self
            .authz
            .principals()
            .create(CreatePrincipal {
                tenant_id: Some(company.id),
                kind: PrincipalKind::Owner,
                base_role: Some(BaseRole::Owner),
                username: input.username,
                email: input.email,
                password: input.password,
                building_id: None,
                unit_id: None,
                hourly_rate_cents: None,
            })
            .await?;

        for capability in Capability::ALL {
            self.authz
                .grants()
                .set(SetGrant {
                    tenant_id: company.id,
                    principal_id: owner.id,
                    capability,
                    granted: true,
                    granted_by: owner.id,
                })
                .await?;
        }

        info!(
            tenant_id = %company.id,
            owner_id = %owner.id,
            "Company signed up"
        );

        Ok(SignupOutput { company, owner })
    }

    /// Add an employee. Fails with a validation error once every paid
    /// seat is taken. The new employee starts with no grants.
    pub async fn create_employee(
        &self,
        ctx: &PrincipalContext,
        input: NewEmployee,
    ) -> BelayResult<PrincipalView> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        let resource = ResourceRef::tenant(tenant_id);
        self.authz
            .require(ctx, Capability::ManageEmployees, &resource, "company")
            .await?;

        if input.base_role == BaseRole::Owner {
            return Err(BelayError::Validation {
                message: "the owner role cannot be assigned to an employee".into(),
            });
        }
        password::check_policy(&input.password, &self.config)?;

        let company = self.companies.get_by_id(tenant_id).await?;
        let used = self
            .authz
            .principals()
            .count_active_company_principals(tenant_id)
            .await?;
        if used >= u64::from(company.seat_count) {
            return Err(BelayError::Validation {
                message: format!("all {} seats are in use", company.seat_count),
            });
        }

        let employee = self
            .authz
            .principals()
            .create(CreatePrincipal {
                tenant_id: Some(tenant_id),
                kind: PrincipalKind::Employee,
                base_role: Some(input.base_role),
                username: input.username,
                email: input.email,
                password: input.password,
                building_id: None,
                unit_id: None,
                hourly_rate_cents: input.hourly_rate_cents,
            })
            .await?;

        self.authz
            .record(
                ctx,
                Some(tenant_id),
                "principal.create",
                Some(employee.id),
                AuditOutcome::Success,
                serde_json::json!({ "kind": "employee" }),
            )
            .await?;

        let show_rate = self
            .authz
            .allows(ctx, Capability::ViewEmployeeRates, &resource)
            .await?;
        Ok(PrincipalView::new(&employee, show_rate))
    }

    /// Soft-deactivate a principal: status flips, every session dies, and
    /// a resident's linking code is released for the next occupant.
    pub async fn deactivate_principal(
        &self,
        ctx: &PrincipalContext,
        target_id: Uuid,
    ) -> BelayResult<()> {
        let tenant_id = TenantScope::for_principal(ctx)?.require_tenant()?;
        self.authz
            .require(
                ctx,
                Capability::ManageEmployees,
                &ResourceRef::tenant(tenant_id).with_id(target_id),
                "principal",
            )
            .await?;

        if target_id == ctx.principal_id {
            return Err(BelayError::Validation {
                message: "you cannot deactivate your own account".into(),
            });
        }

        let target = self
            .authz
            .principals()
            .get_in_tenant(tenant_id, target_id)
            .await
            .map_err(|e| match e {
                BelayError::NotFound { .. } => BelayError::hidden("principal"),
                other => other,
            })?;
        if target.kind == PrincipalKind::Owner {
            return Err(BelayError::denied());
        }

        self.authz
            .principals()
            .deactivate(tenant_id, target.id)
            .await?;
        self.sessions
            .invalidate_principal_sessions(target.id)
            .await?;

        if target.kind == PrincipalKind::Resident {
            let bound = self
                .codes
                .get_by_bound_principal(tenant_id, target.id)
                .await?;
            if let Some(code) = bound {
                self.codes.release(tenant_id, code.id).await?;
                info!(code_id = %code.id, "Linking code released");
            }
        }

        info!(
            tenant_id = %tenant_id,
            principal_id = %target.id,
            "Principal deactivated"
        );
        self.authz
            .record(
                ctx,
                Some(tenant_id),
                "principal.deactivate",
                Some(target.id),
                AuditOutcome::Success,
                serde_json::json!({}),
            )
            .await
    }

    /// The caller's own record; the pay rate is always visible to its
    /// owner.
    pub async fn me(&self, ctx: &PrincipalContext) -> BelayResult<PrincipalView> {
        let principal = self.authz.principals().get_by_id(ctx.principal_id).await?;
        Ok(PrincipalView::new(&principal, true))
    }

    pub async fn list_principals(
        &self,
        ctx: &PrincipalContext,
        pagination: Pagination,
    ) -> BelayResult<PaginatedResult<PrincipalView>> {
        let scope = TenantScope::for_principal(ctx)?;
        let tenant_id = scope.require_tenant()?;
        let resource = ResourceRef::tenant(tenant_id);
        self.authz
            .require(ctx, Capability::ManageEmployees, &resource, "company")
            .await?;
        let show_rates = self
            .authz
            .allows(ctx, Capability::ViewEmployeeRates, &resource)
            .await?;

        let page = self
            .authz
            .principals()
            .list(tenant_id, pagination)
            .await?;
        Ok(PaginatedResult {
            items: page
                .items
                .iter()
                .map(|p| PrincipalView::new(p, show_rates))
                .collect(),
            total: page.total,
            offset: page.offset,
            limit: page.limit,
        })
    }
}
