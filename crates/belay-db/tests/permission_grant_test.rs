//! Integration tests for the PermissionGrant repository.

use belay_core::models::permission::{Capability, SetGrant};
use belay_core::repository::PermissionGrantRepository;
use belay_db::repository::SurrealPermissionGrantRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealPermissionGrantRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    belay_db::run_migrations(&db).await.unwrap();
    SurrealPermissionGrantRepository::new(db)
}

fn grant(tenant_id: Uuid, principal_id: Uuid, capability: Capability, granted: bool) -> SetGrant {
    SetGrant {
        tenant_id,
        principal_id,
        capability,
        granted,
        granted_by: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn missing_grant_reads_as_none() {
    let repo = setup().await;
    let found = repo
        .get(Uuid::new_v4(), Uuid::new_v4(), Capability::ViewProjects)
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn set_is_an_upsert() {
    let repo = setup().await;
    let tenant_id = Uuid::new_v4();
    let principal_id = Uuid::new_v4();

    let first = repo
        .set(grant(tenant_id, principal_id, Capability::ViewFinancialData, true))
        .await
        .unwrap();
    assert!(first.granted);

    let second = repo
        .set(grant(tenant_id, principal_id, Capability::ViewFinancialData, false))
        .await
        .unwrap();
    assert!(!second.granted);

    let all = repo
        .list_for_principal(tenant_id, principal_id)
        .await
        .unwrap();
    assert_eq!(all.len(), 1, "one record per (tenant, principal, capability)");
    assert!(!all[0].granted);
}

#[tokio::test]
async fn grants_are_tenant_scoped() {
    let repo = setup().await;
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();
    let principal_id = Uuid::new_v4();

    repo.set(grant(tenant_a, principal_id, Capability::ViewProjects, true))
        .await
        .unwrap();

    assert!(
        repo.get(tenant_b, principal_id, Capability::ViewProjects)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        repo.list_for_principal(tenant_b, principal_id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn delete_restores_default_deny() {
    let repo = setup().await;
    let tenant_id = Uuid::new_v4();
    let principal_id = Uuid::new_v4();

    repo.set(grant(tenant_id, principal_id, Capability::LogHours, true))
        .await
        .unwrap();
    repo.set(grant(tenant_id, principal_id, Capability::ViewProjects, true))
        .await
        .unwrap();

    repo.delete(tenant_id, principal_id, Capability::LogHours)
        .await
        .unwrap();

    assert!(
        repo.get(tenant_id, principal_id, Capability::LogHours)
            .await
            .unwrap()
            .is_none()
    );
    let remaining = repo
        .list_for_principal(tenant_id, principal_id)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].capability, Capability::ViewProjects);
}
