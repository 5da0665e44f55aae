//! Belay Auth. The request path: session resolution, tenant scoping,
//! capability checks, and the services built on them (permission
//! management, company directory, buildings, linking codes, projects).

pub mod authz;
pub mod buildings;
pub mod config;
pub mod directory;
pub mod error;
pub mod linking;
pub mod password;
pub mod permissions;
pub mod projects;
pub mod scope;
pub mod service;
pub mod token;

pub use authz::{Authorizer, Decision, DenyReason};
pub use buildings::BuildingService;
pub use config::AuthConfig;
pub use directory::{DirectoryService, NewEmployee, SignupInput, SignupOutput, SuperuserSeed};
pub use error::AuthError;
pub use linking::{IssueCodeInput, LinkingService, RegisterInput};
pub use permissions::PermissionService;
pub use projects::{NewProject, ProjectService};
pub use scope::TenantScope;
pub use service::{AuthService, LoginInput, LoginOutput};
