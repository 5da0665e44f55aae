//! Project access and financial redaction.

mod common;

use belay_auth::{IssueCodeInput, NewProject, RegisterInput};
use belay_core::error::BelayError;
use belay_core::models::linking_code::LinkKind;
use belay_core::models::permission::Capability;
use belay_core::models::principal::BaseRole;
use belay_core::models::project::UpdateProject;
use belay_core::repository::Pagination;
use common::{PASSWORD, World, ctx_of};

fn facade(building_id: Option<uuid::Uuid>) -> NewProject {
    NewProject {
        name: "Facade wash".into(),
        building_id,
        budget_cents: Some(1_250_000),
        labor_cost_cents: Some(400_000),
        billed_cents: Some(0),
    }
}

#[tokio::test]
async fn supervisor_creates_but_cannot_see_financials() {
    let world = World::new().await;
    let (_, owner) = world.company("alpine").await;
    let sup = world.employee(&owner, "sup", BaseRole::Supervisor).await;
    let permissions = world.permissions();
    permissions
        .set_grants(
            &owner,
            sup.principal_id,
            &[
                (Capability::CreateProject, true),
                (Capability::ViewProjects, true),
                (Capability::ViewFinancialData, false),
            ],
        )
        .await
        .unwrap();

    let projects = world.projects();
    let created = projects.create(&sup, facade(None)).await.unwrap();
    assert_eq!(created.budget_cents, None);

    let fetched = projects.get(&sup, created.id).await.unwrap();
    assert_eq!(fetched.budget_cents, None);
    assert_eq!(fetched.labor_cost_cents, None);
    assert_eq!(fetched.billed_cents, None);

    let as_owner = projects.get(&owner, created.id).await.unwrap();
    assert_eq!(as_owner.budget_cents, Some(1_250_000));

    let listed = projects.list(&sup, Pagination::default()).await.unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].budget_cents, None);
}

#[tokio::test]
async fn viewing_needs_view_projects() {
    let world = World::new().await;
    let (_, owner) = world.company("alpine").await;
    let tech = world.employee(&owner, "tech", BaseRole::Technician).await;
    let projects = world.projects();
    let created = projects.create(&owner, facade(None)).await.unwrap();

    let err = projects.get(&tech, created.id).await.unwrap_err();
    assert!(matches!(err, BelayError::AuthorizationDenied { .. }));
    let err = projects.create(&tech, facade(None)).await.unwrap_err();
    assert!(matches!(err, BelayError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn other_company_projects_are_not_found() {
    let world = World::new().await;
    let (_, owner_a) = world.company("alpine").await;
    let (_, owner_b) = world.company("summit").await;
    let projects = world.projects();
    let theirs = projects.create(&owner_b, facade(None)).await.unwrap();

    let err = projects.get(&owner_a, theirs.id).await.unwrap_err();
    assert!(matches!(err, BelayError::NotFound { .. }));
    let err = projects
        .update(
            &owner_a,
            theirs.id,
            UpdateProject {
                name: Some("Hijacked".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BelayError::NotFound { .. }));

    let mine = projects.list(&owner_a, Pagination::default()).await.unwrap();
    assert_eq!(mine.total, 0);
}

#[tokio::test]
async fn editing_financials_needs_view_financial_data() {
    let world = World::new().await;
    let (_, owner) = world.company("alpine").await;
    let sup = world.employee(&owner, "sup", BaseRole::Supervisor).await;
    world
        .permissions()
        .grant(&owner, sup.principal_id, Capability::EditProject)
        .await
        .unwrap();
    let projects = world.projects();
    let created = projects.create(&owner, facade(None)).await.unwrap();

    let renamed = projects
        .update(
            &sup,
            created.id,
            UpdateProject {
                name: Some("Facade wash, phase 2".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Facade wash, phase 2");

    let err = projects
        .update(
            &sup,
            created.id,
            UpdateProject {
                budget_cents: Some(Some(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BelayError::AuthorizationDenied { .. }));
    assert_eq!(
        projects.get(&owner, created.id).await.unwrap().budget_cents,
        Some(1_250_000)
    );
}

#[tokio::test]
async fn residents_see_own_building_without_financials() {
    let world = World::new().await;
    let (_, owner) = world.company("alpine").await;
    let buildings = world.buildings();
    let harbour = buildings
        .create_building(&owner, "Harbour Tower".into(), "1 Quay St".into())
        .await
        .unwrap();
    let ridge = buildings
        .create_building(&owner, "Ridge House".into(), "9 Hill Rd".into())
        .await
        .unwrap();
    let unit = buildings
        .create_unit(&owner, harbour.id, "1204".into())
        .await
        .unwrap();

    let projects = world.projects();
    let here = projects.create(&owner, facade(Some(harbour.id))).await.unwrap();
    let there = projects.create(&owner, facade(Some(ridge.id))).await.unwrap();
    let internal = projects.create(&owner, facade(None)).await.unwrap();

    let linking = world.linking();
    let code = linking
        .issue_code(
            &owner,
            IssueCodeInput {
                kind: LinkKind::Resident,
                building_id: harbour.id,
                unit_id: Some(unit.id),
            },
        )
        .await
        .unwrap();
    let resident = linking
        .register_external(RegisterInput {
            code: code.code,
            username: "resident-1204".into(),
            email: "1204@harbour.example".into(),
            password: PASSWORD.into(),
        })
        .await
        .unwrap();
    let ctx = ctx_of(&world, resident.id).await;

    let seen = projects.get(&ctx, here.id).await.unwrap();
    assert_eq!(seen.budget_cents, None);
    assert!(matches!(
        projects.get(&ctx, there.id).await,
        Err(BelayError::NotFound { .. })
    ));
    assert!(matches!(
        projects.get(&ctx, internal.id).await,
        Err(BelayError::NotFound { .. })
    ));

    let listed = projects.list(&ctx, Pagination::default()).await.unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].id, here.id);
    assert_eq!(listed.items[0].labor_cost_cents, None);
}
