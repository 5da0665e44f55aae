//! Company signup and principal lifecycle.

mod common;

use belay_auth::{NewEmployee, SignupInput, SuperuserSeed};
use belay_core::error::BelayError;
use belay_core::models::company::SubscriptionTier;
use belay_core::models::permission::Capability;
use belay_core::models::principal::{BaseRole, PrincipalKind, PrincipalStatus};
use belay_core::repository::{Pagination, PrincipalRepository};
use common::{PASSWORD, World};

fn hire(username: &str) -> NewEmployee {
    NewEmployee {
        username: username.into(),
        email: format!("{username}@staff.example"),
        password: PASSWORD.into(),
        base_role: BaseRole::Technician,
        hourly_rate_cents: Some(4_200),
    }
}

#[tokio::test]
async fn signup_grants_owner_every_capability() {
    let world = World::new().await;
    let (signup, owner) = world.company("alpine").await;
    assert_eq!(signup.owner.base_role, Some(BaseRole::Owner));

    let mut caps = world.permissions().my_capabilities(&owner).await.unwrap();
    caps.sort();
    let mut all = Capability::ALL.to_vec();
    all.sort();
    assert_eq!(caps, all);
}

#[tokio::test]
async fn signup_with_taken_login_creates_nothing() {
    let world = World::new().await;
    world.company("alpine").await;

    let err = world
        .directory()
        .signup(SignupInput {
            company_name: "Copycat Rope Access".into(),
            subscription_tier: SubscriptionTier::Basic,
            seat_count: 2,
            username: "alpine-owner".into(),
            email: "someone@else.example".into(),
            password: PASSWORD.into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BelayError::AlreadyExists { .. }));
}

#[tokio::test]
async fn short_password_is_rejected() {
    let world = World::new().await;
    let (_, owner) = world.company("alpine").await;
    let err = world
        .directory()
        .create_employee(
            &owner,
            NewEmployee {
                password: "short".into(),
                ..hire("tech")
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BelayError::Validation { .. }));
}

#[tokio::test]
async fn seat_count_caps_employees() {
    let world = World::new().await;
    let (_, owner) = world.company("alpine").await;
    let directory = world.directory();

    // Five seats, the owner holds one.
    for i in 0..4 {
        directory
            .create_employee(&owner, hire(&format!("tech-{i}")))
            .await
            .unwrap();
    }
    let err = directory
        .create_employee(&owner, hire("tech-overflow"))
        .await
        .unwrap_err();
    assert!(matches!(err, BelayError::Validation { .. }));

    let listed = directory
        .list_principals(&owner, Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 5);
}

#[tokio::test]
async fn deactivation_rules() {
    let world = World::new().await;
    let (signup, owner) = world.company("alpine").await;
    let manager = world
        .employee(&owner, "ops", BaseRole::OperationsManager)
        .await;
    world
        .permissions()
        .grant(&owner, manager.principal_id, Capability::ManageEmployees)
        .await
        .unwrap();
    let tech = world.employee(&owner, "tech", BaseRole::Technician).await;
    let directory = world.directory();

    let err = directory
        .deactivate_principal(&manager, manager.principal_id)
        .await
        .unwrap_err();
    assert!(matches!(err, BelayError::Validation { .. }));

    let err = directory
        .deactivate_principal(&manager, signup.owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, BelayError::AuthorizationDenied { .. }));

    directory
        .deactivate_principal(&manager, tech.principal_id)
        .await
        .unwrap();
    let stored = world.principals().get_by_id(tech.principal_id).await.unwrap();
    assert_eq!(stored.status, PrincipalStatus::Deactivated);
}

#[tokio::test]
async fn rates_follow_view_employee_rates() {
    let world = World::new().await;
    let (_, owner) = world.company("alpine").await;
    let ops = world
        .employee(&owner, "ops", BaseRole::OperationsManager)
        .await;
    world
        .permissions()
        .grant(&owner, ops.principal_id, Capability::ManageEmployees)
        .await
        .unwrap();

    let directory = world.directory();
    let hired = directory.create_employee(&ops, hire("tech")).await.unwrap();
    assert_eq!(hired.hourly_rate_cents, None);

    let listed = directory
        .list_principals(&owner, Pagination::default())
        .await
        .unwrap();
    let tech = listed.items.iter().find(|p| p.username == "tech").unwrap();
    assert_eq!(tech.hourly_rate_cents, Some(4_200));

    let me = directory.me(&ops).await.unwrap();
    assert_eq!(me.hourly_rate_cents, Some(4_500));
}

#[tokio::test]
async fn base_role_is_only_a_label() {
    let world = World::new().await;
    let (signup, owner) = world.company("alpine").await;
    let tech = world.employee(&owner, "tech", BaseRole::Technician).await;
    let permissions = world.permissions();

    let promoted = permissions
        .set_base_role(&owner, tech.principal_id, BaseRole::OperationsManager)
        .await
        .unwrap();
    assert_eq!(promoted.base_role, Some(BaseRole::OperationsManager));
    assert!(permissions.my_capabilities(&tech).await.unwrap().is_empty());

    let custom = BaseRole::Custom("rigging lead".into());
    let relabelled = permissions
        .set_base_role(&owner, tech.principal_id, custom.clone())
        .await
        .unwrap();
    assert_eq!(relabelled.base_role, Some(custom));
    assert!(
        !world
            .authz()
            .allows(
                &tech,
                Capability::ManageEmployees,
                &belay_core::context::ResourceRef::tenant(signup.company.id)
            )
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn owner_label_stays_with_the_owner() {
    let world = World::new().await;
    let (signup, owner) = world.company("alpine").await;
    let tech = world.employee(&owner, "tech", BaseRole::Technician).await;
    let permissions = world.permissions();

    let err = permissions
        .set_base_role(&owner, tech.principal_id, BaseRole::Owner)
        .await
        .unwrap_err();
    assert!(matches!(err, BelayError::Validation { .. }));

    let err = permissions
        .set_base_role(&owner, signup.owner.id, BaseRole::Technician)
        .await
        .unwrap_err();
    assert!(matches!(err, BelayError::Validation { .. }));

    let principals = world.principals();
    let stored_tech = principals.get_by_id(tech.principal_id).await.unwrap();
    assert_eq!(stored_tech.base_role, Some(BaseRole::Technician));
    let stored_owner = principals.get_by_id(signup.owner.id).await.unwrap();
    assert_eq!(stored_owner.base_role, Some(BaseRole::Owner));
}

#[tokio::test]
async fn superuser_provisioning_is_idempotent() {
    let world = World::new().await;
    let directory = world.directory();
    let seed = SuperuserSeed {
        username: "ops".into(),
        email: "ops@platform.example".into(),
        password: PASSWORD.into(),
    };

    let first = directory.ensure_superuser(seed.clone()).await.unwrap();
    assert_eq!(first.kind, PrincipalKind::Superuser);
    assert_eq!(first.tenant_id, None);
    let again = directory.ensure_superuser(seed).await.unwrap();
    assert_eq!(again.id, first.id);

    world.company("alpine").await;
    let err = directory
        .ensure_superuser(SuperuserSeed {
            username: "alpine-owner".into(),
            email: "ops2@platform.example".into(),
            password: PASSWORD.into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, BelayError::AlreadyExists { .. }));
}
