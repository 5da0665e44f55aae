//! Shared in-memory fixture for the auth integration tests.

#![allow(dead_code)]

use belay_auth::{
    AuthConfig, AuthService, Authorizer, BuildingService, DirectoryService, LinkingService,
    NewEmployee, PermissionService, ProjectService, SignupInput, SignupOutput,
};
use belay_core::context::PrincipalContext;
use belay_core::models::company::SubscriptionTier;
use belay_core::models::principal::{BaseRole, CreatePrincipal, Principal, PrincipalKind};
use belay_core::repository::PrincipalRepository;
use belay_db::repository::{
    SurrealAuditLogRepository, SurrealBuildingRepository, SurrealCompanyRepository,
    SurrealLinkingCodeRepository, SurrealPermissionGrantRepository, SurrealPrincipalRepository,
    SurrealProjectRepository, SurrealSessionRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";

pub type Authz = Authorizer<
    SurrealPrincipalRepository<Db>,
    SurrealPermissionGrantRepository<Db>,
    SurrealAuditLogRepository<Db>,
>;

pub struct World {
    pub db: Surreal<Db>,
    pub config: AuthConfig,
}

impl World {
    pub async fn new() -> Self {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        belay_db::run_migrations(&db).await.unwrap();
        Self {
            db,
            config: AuthConfig::default(),
        }
    }

    pub fn principals(&self) -> SurrealPrincipalRepository<Db> {
        SurrealPrincipalRepository::new(self.db.clone())
    }

    pub fn sessions(&self) -> SurrealSessionRepository<Db> {
        SurrealSessionRepository::new(self.db.clone())
    }

    pub fn codes(&self) -> SurrealLinkingCodeRepository<Db> {
        SurrealLinkingCodeRepository::new(self.db.clone())
    }

    pub fn audit(&self) -> SurrealAuditLogRepository<Db> {
        SurrealAuditLogRepository::new(self.db.clone())
    }

    pub fn authz(&self) -> Authz {
        Authorizer::new(
            self.principals(),
            SurrealPermissionGrantRepository::new(self.db.clone()),
            self.audit(),
        )
    }

    pub fn auth(&self) -> AuthService<SurrealPrincipalRepository<Db>, SurrealSessionRepository<Db>> {
        AuthService::new(self.principals(), self.sessions(), self.config.clone())
    }

    pub fn directory(
        &self,
    ) -> DirectoryService<
        SurrealCompanyRepository<Db>,
        SurrealPrincipalRepository<Db>,
        SurrealPermissionGrantRepository<Db>,
        SurrealAuditLogRepository<Db>,
        SurrealSessionRepository<Db>,
        SurrealLinkingCodeRepository<Db>,
    > {
        DirectoryService::new(
            SurrealCompanyRepository::new(self.db.clone()),
            self.sessions(),
            self.codes(),
            self.authz(),
            self.config.clone(),
        )
    }

    pub fn permissions(
        &self,
    ) -> PermissionService<
        SurrealPrincipalRepository<Db>,
        SurrealPermissionGrantRepository<Db>,
        SurrealAuditLogRepository<Db>,
    > {
        PermissionService::new(self.authz())
    }

    pub fn buildings(
        &self,
    ) -> BuildingService<
        SurrealBuildingRepository<Db>,
        SurrealPrincipalRepository<Db>,
        SurrealPermissionGrantRepository<Db>,
        SurrealAuditLogRepository<Db>,
    > {
        BuildingService::new(SurrealBuildingRepository::new(self.db.clone()), self.authz())
    }

    pub fn linking(
        &self,
    ) -> LinkingService<
        SurrealBuildingRepository<Db>,
        SurrealLinkingCodeRepository<Db>,
        SurrealSessionRepository<Db>,
        SurrealPrincipalRepository<Db>,
        SurrealPermissionGrantRepository<Db>,
        SurrealAuditLogRepository<Db>,
    > {
        LinkingService::new(
            SurrealBuildingRepository::new(self.db.clone()),
            self.codes(),
            self.sessions(),
            self.authz(),
            self.config.clone(),
        )
    }

    pub fn projects(
        &self,
    ) -> ProjectService<
        SurrealProjectRepository<Db>,
        SurrealBuildingRepository<Db>,
        SurrealPrincipalRepository<Db>,
        SurrealPermissionGrantRepository<Db>,
        SurrealAuditLogRepository<Db>,
    > {
        ProjectService::new(
            SurrealProjectRepository::new(self.db.clone()),
            SurrealBuildingRepository::new(self.db.clone()),
            self.authz(),
        )
    }

    /// A company with five seats; returns the signup result and the
    /// owner's context.
    pub async fn company(&self, slug: &str) -> (SignupOutput, PrincipalContext) {
        let out = self
            .directory()
            .signup(SignupInput {
                company_name: format!("{slug} Rope Access"),
                subscription_tier: SubscriptionTier::Professional,
                seat_count: 5,
                username: format!("{slug}-owner"),
                email: format!("owner@{slug}.example"),
                password: PASSWORD.into(),
            })
            .await
            .unwrap();
        let ctx = PrincipalContext::from_principal(&out.owner, None);
        (out, ctx)
    }

    /// An employee with no grants.
    pub async fn employee(
        &self,
        owner: &PrincipalContext,
        username: &str,
        role: BaseRole,
    ) -> PrincipalContext {
        let view = self
            .directory()
            .create_employee(
                owner,
                NewEmployee {
                    username: username.into(),
                    email: format!("{username}@staff.example"),
                    password: PASSWORD.into(),
                    base_role: role,
                    hourly_rate_cents: Some(4_500),
                },
            )
            .await
            .unwrap();
        let principal = self.principals().get_by_id(view.id).await.unwrap();
        PrincipalContext::from_principal(&principal, None)
    }

    pub async fn superuser(&self) -> Principal {
        self.principals()
            .create(CreatePrincipal {
                tenant_id: None,
                kind: PrincipalKind::Superuser,
                base_role: None,
                username: format!("ops-{}", Uuid::new_v4().simple()),
                email: format!("ops-{}@platform.example", Uuid::new_v4().simple()),
                password: PASSWORD.into(),
                building_id: None,
                unit_id: None,
                hourly_rate_cents: None,
            })
            .await
            .unwrap()
    }
}

/// Context of a freshly loaded principal.
pub async fn ctx_of(world: &World, principal_id: Uuid) -> PrincipalContext {
    let principal = world.principals().get_by_id(principal_id).await.unwrap();
    PrincipalContext::from_principal(&principal, None)
}
