//! Shared application state: one instance of every service, built over
//! the SurrealDB repositories.

use std::sync::Arc;

use belay_auth::{
    AuthConfig, AuthService, Authorizer, BuildingService, DirectoryService, LinkingService,
    PermissionService, ProjectService,
};
use belay_db::repository::{
    SurrealAuditLogRepository, SurrealBuildingRepository, SurrealCompanyRepository,
    SurrealLinkingCodeRepository, SurrealPermissionGrantRepository, SurrealPrincipalRepository,
    SurrealProjectRepository, SurrealSessionRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

type Principals = SurrealPrincipalRepository<Any>;
type Grants = SurrealPermissionGrantRepository<Any>;
type Audit = SurrealAuditLogRepository<Any>;
type Sessions = SurrealSessionRepository<Any>;
type Buildings = SurrealBuildingRepository<Any>;
type Codes = SurrealLinkingCodeRepository<Any>;

pub type Auth = AuthService<Principals, Sessions>;
pub type Directory =
    DirectoryService<SurrealCompanyRepository<Any>, Principals, Grants, Audit, Sessions, Codes>;
pub type Permissions = PermissionService<Principals, Grants, Audit>;
pub type BuildingsService = BuildingService<Buildings, Principals, Grants, Audit>;
pub type Linking = LinkingService<Buildings, Codes, Sessions, Principals, Grants, Audit>;
pub type Projects =
    ProjectService<SurrealProjectRepository<Any>, Buildings, Principals, Grants, Audit>;

/// Cookie attributes for the session token.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub secure: bool,
    pub max_age_secs: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Auth>,
    pub directory: Arc<Directory>,
    pub permissions: Arc<Permissions>,
    pub buildings: Arc<BuildingsService>,
    pub linking: Arc<Linking>,
    pub projects: Arc<Projects>,
    pub cookie: CookieSettings,
}

impl AppState {
    pub fn new(db: Surreal<Any>, config: AuthConfig, cookie_secure: bool) -> Self {
        let principals = match &config.pepper {
            Some(pepper) => SurrealPrincipalRepository::with_pepper(db.clone(), pepper.clone()),
            None => SurrealPrincipalRepository::new(db.clone()),
        };
        let authz = || {
            Authorizer::new(
                principals.clone(),
                SurrealPermissionGrantRepository::new(db.clone()),
                SurrealAuditLogRepository::new(db.clone()),
            )
        };
        let sessions = SurrealSessionRepository::new(db.clone());
        let buildings = SurrealBuildingRepository::new(db.clone());
        let codes = SurrealLinkingCodeRepository::new(db.clone());

        Self {
            auth: Arc::new(AuthService::new(
                principals.clone(),
                sessions.clone(),
                config.clone(),
            )),
            directory: Arc::new(DirectoryService::new(
                SurrealCompanyRepository::new(db.clone()),
                sessions.clone(),
                codes.clone(),
                authz(),
                config.clone(),
            )),
            permissions: Arc::new(PermissionService::new(authz())),
            buildings: Arc::new(BuildingService::new(buildings.clone(), authz())),
            linking: Arc::new(LinkingService::new(
                buildings.clone(),
                codes,
                sessions,
                authz(),
                config.clone(),
            )),
            projects: Arc::new(ProjectService::new(
                SurrealProjectRepository::new(db.clone()),
                buildings,
                authz(),
            )),
            cookie: CookieSettings {
                secure: cookie_secure,
                max_age_secs: config.session_lifetime_secs,
            },
        }
    }
}
