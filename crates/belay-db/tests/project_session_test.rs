//! Integration tests for the Project, Session and AuditLog repositories.

use belay_core::error::BelayError;
use belay_core::models::audit::{ActorType, AuditOutcome, CreateAuditLogEntry};
use belay_core::models::project::{CreateProject, ProjectStatus, UpdateProject};
use belay_core::models::session::CreateSession;
use belay_core::repository::{
    AuditLogFilter, AuditLogRepository, Pagination, ProjectRepository, SessionRepository,
};
use belay_db::repository::{
    SurrealAuditLogRepository, SurrealProjectRepository, SurrealSessionRepository,
};
use chrono::{Duration, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    belay_db::run_migrations(&db).await.unwrap();
    db
}

fn project(tenant_id: Uuid, name: &str, building_id: Option<Uuid>) -> CreateProject {
    CreateProject {
        tenant_id,
        name: name.into(),
        building_id,
        budget_cents: Some(2_000_000),
        labor_cost_cents: Some(750_000),
        billed_cents: None,
        created_by: Uuid::new_v4(),
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_update_and_list_projects() {
    let repo = SurrealProjectRepository::new(setup().await);
    let tenant_id = Uuid::new_v4();
    let building_id = Uuid::new_v4();

    let created = repo
        .create(project(tenant_id, "Window wash", Some(building_id)))
        .await
        .unwrap();
    assert_eq!(created.status, ProjectStatus::Planned);
    assert_eq!(created.budget_cents, Some(2_000_000));

    repo.create(project(tenant_id, "Anchor inspection", None))
        .await
        .unwrap();

    let updated = repo
        .update(
            tenant_id,
            created.id,
            UpdateProject {
                status: Some(ProjectStatus::Active),
                billed_cents: Some(Some(500_000)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, ProjectStatus::Active);
    assert_eq!(updated.billed_cents, Some(500_000));
    assert_eq!(updated.name, "Window wash");

    let page = repo.list(tenant_id, Pagination::default()).await.unwrap();
    assert_eq!(page.total, 2);

    let in_building = repo.list_by_building(tenant_id, building_id).await.unwrap();
    assert_eq!(in_building.len(), 1);
    assert_eq!(in_building[0].id, created.id);
}

#[tokio::test]
async fn project_is_invisible_from_another_tenant() {
    let repo = SurrealProjectRepository::new(setup().await);
    let tenant_id = Uuid::new_v4();
    let other = Uuid::new_v4();

    let created = repo
        .create(project(tenant_id, "Window wash", None))
        .await
        .unwrap();

    let err = repo.get_by_id(other, created.id).await.unwrap_err();
    assert!(matches!(err, BelayError::NotFound { .. }));

    let err = repo
        .update(
            other,
            created.id,
            UpdateProject {
                name: Some("hijacked".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BelayError::NotFound { .. }));

    let still = repo.get_by_id(tenant_id, created.id).await.unwrap();
    assert_eq!(still.name, "Window wash");
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

fn session(principal_id: Uuid, token_hash: &str, expires_in: Duration) -> CreateSession {
    CreateSession {
        principal_id,
        token_hash: token_hash.into(),
        ip_address: Some("127.0.0.1".into()),
        user_agent: None,
        expires_at: Utc::now() + expires_in,
    }
}

#[tokio::test]
async fn session_lookup_and_invalidation() {
    let repo = SurrealSessionRepository::new(setup().await);
    let principal_id = Uuid::new_v4();

    let created = repo
        .create(session(principal_id, "hash-1", Duration::hours(1)))
        .await
        .unwrap();
    let found = repo.get_by_token_hash("hash-1").await.unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.principal_id, principal_id);

    repo.invalidate(created.id).await.unwrap();
    let err = repo.get_by_token_hash("hash-1").await.unwrap_err();
    assert!(matches!(err, BelayError::NotFound { .. }));
}

#[tokio::test]
async fn invalidate_all_sessions_for_principal() {
    let repo = SurrealSessionRepository::new(setup().await);
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    repo.create(session(alice, "a-1", Duration::hours(1)))
        .await
        .unwrap();
    repo.create(session(alice, "a-2", Duration::hours(1)))
        .await
        .unwrap();
    repo.create(session(bob, "b-1", Duration::hours(1)))
        .await
        .unwrap();

    repo.invalidate_principal_sessions(alice).await.unwrap();

    assert!(repo.get_by_token_hash("a-1").await.is_err());
    assert!(repo.get_by_token_hash("a-2").await.is_err());
    assert!(repo.get_by_token_hash("b-1").await.is_ok());
}

#[tokio::test]
async fn cleanup_removes_only_expired_sessions() {
    let repo = SurrealSessionRepository::new(setup().await);
    let principal_id = Uuid::new_v4();

    repo.create(session(principal_id, "old", -Duration::hours(1)))
        .await
        .unwrap();
    repo.create(session(principal_id, "new", Duration::hours(1)))
        .await
        .unwrap();

    assert_eq!(repo.cleanup_expired().await.unwrap(), 1);
    assert!(repo.get_by_token_hash("old").await.is_err());
    assert!(repo.get_by_token_hash("new").await.is_ok());
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

#[tokio::test]
async fn audit_entries_are_filtered_by_tenant_and_action() {
    let repo = SurrealAuditLogRepository::new(setup().await);
    let tenant_id = Uuid::new_v4();
    let actor_id = Uuid::new_v4();

    for action in ["permission.grant", "permission.grant", "principal.deactivate"] {
        repo.append(CreateAuditLogEntry {
            tenant_id: Some(tenant_id),
            actor_id,
            actor_type: ActorType::Principal,
            action: action.into(),
            resource_id: None,
            outcome: AuditOutcome::Success,
            metadata: None,
        })
        .await
        .unwrap();
    }
    repo.append(CreateAuditLogEntry {
        tenant_id: Some(Uuid::new_v4()),
        actor_id,
        actor_type: ActorType::Superuser,
        action: "permission.grant".into(),
        resource_id: None,
        outcome: AuditOutcome::Success,
        metadata: Some(serde_json::json!({ "reason": "support" })),
    })
    .await
    .unwrap();

    let all = repo
        .list(tenant_id, AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);

    let grants = repo
        .list(
            tenant_id,
            AuditLogFilter {
                action: Some("permission.grant".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(grants.total, 2);
    assert!(grants.items.iter().all(|e| e.action == "permission.grant"));
}
