//! Integration tests for login, session resolution and logout.

mod common;

use belay_auth::{AuthConfig, LoginInput};
use belay_core::error::BelayError;
use belay_core::models::principal::{BaseRole, PrincipalKind};
use common::{PASSWORD, World};

fn login(name: &str, password: &str) -> LoginInput {
    LoginInput {
        username_or_email: name.into(),
        password: password.into(),
        ip_address: Some("127.0.0.1".into()),
        user_agent: Some("integration-test".into()),
    }
}

#[tokio::test]
async fn login_by_username_or_email_resolves_to_tenant() {
    let world = World::new().await;
    let (signup, _) = world.company("alpine").await;
    let auth = world.auth();

    let by_name = auth.login(login("alpine-owner", PASSWORD)).await.unwrap();
    assert_eq!(by_name.principal_id, signup.owner.id);
    assert_eq!(by_name.session_token.len(), 43);

    let by_email = auth
        .login(login("owner@alpine.example", PASSWORD))
        .await
        .unwrap();
    assert_ne!(by_email.session_id, by_name.session_id);

    let ctx = auth.resolve(&by_name.session_token).await.unwrap();
    assert_eq!(ctx.principal_id, signup.owner.id);
    assert_eq!(ctx.tenant_id, Some(signup.company.id));
    assert_eq!(ctx.kind, PrincipalKind::Owner);
    assert_eq!(ctx.session_id, Some(by_name.session_id));
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() {
    let world = World::new().await;
    world.company("alpine").await;
    let auth = world.auth();

    let wrong_password = auth
        .login(login("alpine-owner", "not-the-password"))
        .await
        .unwrap_err();
    let unknown_user = auth.login(login("nobody", PASSWORD)).await.unwrap_err();

    assert!(matches!(
        wrong_password,
        BelayError::AuthenticationFailed { .. }
    ));
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
}

#[tokio::test]
async fn logout_ends_the_session() {
    let world = World::new().await;
    world.company("alpine").await;
    let auth = world.auth();

    let out = auth.login(login("alpine-owner", PASSWORD)).await.unwrap();
    auth.logout(out.session_id).await.unwrap();

    let err = auth.resolve(&out.session_token).await.unwrap_err();
    assert!(matches!(err, BelayError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn unknown_token_does_not_resolve() {
    let world = World::new().await;
    let err = world.auth().resolve("not-a-real-token").await.unwrap_err();
    assert!(matches!(err, BelayError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn expired_session_does_not_resolve() {
    let mut world = World::new().await;
    world.company("alpine").await;
    world.config = AuthConfig {
        session_lifetime_secs: 0,
        ..AuthConfig::default()
    };
    let auth = world.auth();

    let out = auth.login(login("alpine-owner", PASSWORD)).await.unwrap();
    let err = auth.resolve(&out.session_token).await.unwrap_err();
    assert!(matches!(err, BelayError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn deactivated_principal_cannot_log_in_and_sessions_stop() {
    let world = World::new().await;
    let (_, owner) = world.company("alpine").await;
    world.employee(&owner, "tech", BaseRole::Technician).await;
    let auth = world.auth();

    let live = auth.login(login("tech", PASSWORD)).await.unwrap();
    assert!(auth.resolve(&live.session_token).await.is_ok());

    world
        .directory()
        .deactivate_principal(&owner, live.principal_id)
        .await
        .unwrap();

    let err = auth.resolve(&live.session_token).await.unwrap_err();
    assert!(matches!(err, BelayError::AuthenticationFailed { .. }));

    let err = auth.login(login("tech", PASSWORD)).await.unwrap_err();
    assert!(matches!(err, BelayError::AuthenticationFailed { .. }));
}

#[tokio::test]
async fn revoke_all_sessions_ends_every_session() {
    let world = World::new().await;
    let (signup, _) = world.company("alpine").await;
    let auth = world.auth();

    let first = auth.login(login("alpine-owner", PASSWORD)).await.unwrap();
    let second = auth.login(login("alpine-owner", PASSWORD)).await.unwrap();
    auth.revoke_all_sessions(signup.owner.id).await.unwrap();

    assert!(auth.resolve(&first.session_token).await.is_err());
    assert!(auth.resolve(&second.session_token).await.is_err());
}

#[tokio::test]
async fn unrepresentable_session_lifetime_opens_no_session() {
    let mut world = World::new().await;
    world.company("alpine").await;
    world.config = AuthConfig {
        session_lifetime_secs: u64::MAX,
        ..AuthConfig::default()
    };

    let err = world
        .auth()
        .login(login("alpine-owner", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, BelayError::Internal(_)));
}
