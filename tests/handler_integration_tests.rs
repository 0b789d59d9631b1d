use axum::{Extension, Json, extract::Path, extract::State, http::StatusCode};
use lms_gateway::{
    AppState, MemorySessionStore, MockIdentityBackend,
    auth::AuthUser,
    config::AppConfig,
    errors::GateError,
    gate::{self, RequestIdentity},
    handlers,
    models::{AssumeRoleRequest, BackendUser, Role, UpdateRoleRequest},
    session::SessionStore,
};
use std::sync::Arc;
use uuid::Uuid;

// --- Test Scaffolding ---

const SESSION_ID: Uuid = Uuid::from_u128(42);

fn backend_user(sub: &str, role: Role) -> BackendUser {
    BackendUser {
        sub: sub.to_string(),
        email: format!("{sub}@example.com"),
        role,
    }
}

/// Builds the shared state around a mock backend, returning the memory store
/// alongside so tests can inspect session records directly.
fn create_app_state(backend: MockIdentityBackend) -> (AppState, Arc<MemorySessionStore>) {
    let sessions = Arc::new(MemorySessionStore::new());
    let state = AppState {
        sessions: sessions.clone(),
        backend: Arc::new(backend),
        config: AppConfig::default(),
    };
    (state, sessions)
}

fn auth_user(sub: &str) -> AuthUser {
    AuthUser {
        sub: sub.to_string(),
        email: format!("{sub}@example.com"),
        session_id: SESSION_ID,
        token: "test-token".to_string(),
    }
}

fn identity(sub: &str, platform: Role, session: Role) -> RequestIdentity {
    RequestIdentity {
        sub: sub.to_string(),
        email: format!("{sub}@example.com"),
        platform_role: platform,
        session_role: session,
    }
}

// --- Profile & Selection Handlers ---

#[tokio::test]
async fn test_get_me_reports_resolved_identity() {
    let profile = handlers::get_me(Extension(identity("u1", Role::Teacher, Role::Student))).await;

    assert_eq!(profile.sub, "u1");
    assert_eq!(profile.email, "u1@example.com");
    assert_eq!(profile.platform_role, Role::Teacher);
    assert_eq!(profile.session_role, Role::Student);
    // Avatar is fabricated from the subject, so it is stable per user.
    assert_eq!(
        profile.avatar_url.as_deref(),
        Some("https://api.dicebear.com/7.x/avataaars/svg?seed=u1")
    );
}

#[tokio::test]
async fn test_get_session_role_lists_assumable_set() {
    let response =
        handlers::get_session_role(Extension(identity("u1", Role::Teacher, Role::Teacher))).await;

    assert_eq!(response.platform_role, Role::Teacher);
    assert_eq!(response.session_role, Role::Teacher);
    assert_eq!(response.available_roles, vec![Role::Teacher, Role::Student]);
}

// --- Role Assumption ---

#[tokio::test]
async fn test_assume_role_downgrade_succeeds_and_persists() {
    let (state, sessions) =
        create_app_state(MockIdentityBackend::new(backend_user("u1", Role::Teacher)));

    let result = handlers::assume_role(
        auth_user("u1"),
        Extension(identity("u1", Role::Teacher, Role::Teacher)),
        State(state),
        Json(AssumeRoleRequest { role: Role::Student }),
    )
    .await;

    let response = result.expect("downgrade within the ceiling must succeed").0;
    assert_eq!(response.platform_role, Role::Teacher);
    assert_eq!(response.session_role, Role::Student);

    // The session record was written with the validated pair.
    let record = sessions.get(SESSION_ID).await.unwrap().unwrap();
    assert_eq!(record.platform_role, Role::Teacher);
    assert_eq!(record.session_role, Role::Student);
}

#[tokio::test]
async fn test_assume_role_above_ceiling_is_denied_without_state_change() {
    let (state, sessions) =
        create_app_state(MockIdentityBackend::new(backend_user("u1", Role::Student)));

    let result = handlers::assume_role(
        auth_user("u1"),
        Extension(identity("u1", Role::Student, Role::Student)),
        State(state),
        Json(AssumeRoleRequest { role: Role::Teacher }),
    )
    .await;

    match result {
        Err(GateError::RoleAssumptionDenied { platform, requested }) => {
            assert_eq!(platform, Role::Student);
            assert_eq!(requested, Role::Teacher);
        }
        other => panic!("expected RoleAssumptionDenied, got {other:?}"),
    }

    // Nothing was written on the failure path.
    assert!(sessions.get(SESSION_ID).await.unwrap().is_none());
}

#[tokio::test]
async fn test_logout_clears_session_record() {
    let (state, sessions) =
        create_app_state(MockIdentityBackend::new(backend_user("u1", Role::Teacher)));

    // Assume first so there is something to clear.
    handlers::assume_role(
        auth_user("u1"),
        Extension(identity("u1", Role::Teacher, Role::Teacher)),
        State(state.clone()),
        Json(AssumeRoleRequest { role: Role::Teacher }),
    )
    .await
    .unwrap();
    assert!(sessions.get(SESSION_ID).await.unwrap().is_some());

    let status = handlers::logout(auth_user("u1"), State(state)).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(sessions.get(SESSION_ID).await.unwrap().is_none());
}

// --- Role Resolution ---

#[tokio::test]
async fn test_resolution_defaults_session_role_to_platform() {
    let (state, _sessions) =
        create_app_state(MockIdentityBackend::new(backend_user("u1", Role::Teacher)));

    let resolved = gate::resolve_roles(&state, &auth_user("u1")).await.unwrap();
    assert_eq!(resolved.profile.role, Role::Teacher);
    assert_eq!(resolved.assumed_role, None);
    assert_eq!(resolved.session_role(), Role::Teacher);
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let (state, _sessions) =
        create_app_state(MockIdentityBackend::new(backend_user("u1", Role::Teacher)));
    let user = auth_user("u1");

    // Assume a downgrade, then resolve twice with no intervening change.
    handlers::assume_role(
        user.clone(),
        Extension(identity("u1", Role::Teacher, Role::Teacher)),
        State(state.clone()),
        Json(AssumeRoleRequest { role: Role::Student }),
    )
    .await
    .unwrap();

    let first = gate::resolve_roles(&state, &user).await.unwrap();
    let second = gate::resolve_roles(&state, &user).await.unwrap();

    assert_eq!(first.profile.role, second.profile.role);
    assert_eq!(first.assumed_role, second.assumed_role);
    assert_eq!(first.session_role(), Role::Student);
    assert_eq!(second.session_role(), Role::Student);
}

#[tokio::test]
async fn test_resolution_fails_closed_when_backend_is_down() {
    let (state, _sessions) = create_app_state(MockIdentityBackend::new_failing());

    let result = gate::resolve_roles(&state, &auth_user("u1")).await;
    match result {
        Err(GateError::UpstreamUnavailable(_)) => {}
        other => panic!("expected UpstreamUnavailable, got {other:?}"),
    }
}

// --- Admin Proxy Handlers ---

#[tokio::test]
async fn test_list_users_requires_admin_session_role() {
    let mut backend = MockIdentityBackend::new(backend_user("root", Role::Admin));
    backend.users = vec![
        backend_user("u1", Role::Student),
        backend_user("u2", Role::Teacher),
    ];
    let (state, _sessions) = create_app_state(backend);

    // An admin platform role acting as student is refused like anyone else.
    let result = handlers::list_users(
        auth_user("root"),
        Extension(identity("root", Role::Admin, Role::Student)),
        State(state.clone()),
    )
    .await;
    assert!(matches!(result, Err(GateError::PathForbidden)));

    // Acting as admin, the backend listing is forwarded.
    let users = handlers::list_users(
        auth_user("root"),
        Extension(identity("root", Role::Admin, Role::Admin)),
        State(state),
    )
    .await
    .unwrap()
    .0;
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].sub, "u1");
}

#[tokio::test]
async fn test_update_user_role_forwards_mutation() {
    let mut backend = MockIdentityBackend::new(backend_user("root", Role::Admin));
    backend.users = vec![backend_user("u1", Role::Student)];
    let (state, _sessions) = create_app_state(backend);

    let updated = handlers::update_user_role(
        auth_user("root"),
        Extension(identity("root", Role::Admin, Role::Admin)),
        State(state),
        Path("u1".to_string()),
        Json(UpdateRoleRequest { role: Role::Teacher }),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(updated.sub, "u1");
    assert_eq!(updated.email, "u1@example.com");
    assert_eq!(updated.role, Role::Teacher);
}
