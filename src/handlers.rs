use crate::{
    AppState,
    auth::AuthUser,
    errors::GateError,
    gate::RequestIdentity,
    models::{
        AssumeRoleRequest, BackendUser, Role, SessionRecord, SessionRoleResponse,
        UpdateRoleRequest, UserProfile,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

// --- Handlers ---

/// get_me
///
/// [Authenticated Route] Provides the caller's resolved profile: subject,
/// email, platform role and the session role this request is acting as. The
/// identity comes from the gate's request extension, so no second backend call
/// is made here.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Resolved profile", body = UserProfile))
)]
pub async fn get_me(Extension(identity): Extension<RequestIdentity>) -> Json<UserProfile> {
    Json(UserProfile {
        // Using a DiceBear API for stable, unique avatar generation based on
        // the subject identifier.
        avatar_url: Some(format!(
            "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
            identity.sub
        )),
        sub: identity.sub,
        email: identity.email,
        platform_role: identity.platform_role,
        session_role: identity.session_role,
    })
}

/// get_session_role
///
/// [Authenticated Route] Reports the current role pair plus the set of roles
/// the caller may assume. This endpoint is the selection entry point: it stays
/// reachable while no session role has been chosen yet, since the selection
/// screen needs it to render its options.
#[utoipa::path(
    get,
    path = "/me/role",
    responses((status = 200, description = "Current role pair", body = SessionRoleResponse))
)]
pub async fn get_session_role(
    Extension(identity): Extension<RequestIdentity>,
) -> Json<SessionRoleResponse> {
    Json(SessionRoleResponse {
        platform_role: identity.platform_role,
        session_role: identity.session_role,
        available_roles: identity.platform_role.assumable_roles().to_vec(),
    })
}

/// assume_role
///
/// [Authenticated Route] Selects (or changes) the session role.
///
/// *Validation*: The requested role is checked against the rule table for the
/// platform role the gate resolved this request. On rejection nothing is
/// written; the session keeps whatever role it had. On success the session
/// record is replaced and no other state changes.
#[utoipa::path(
    post,
    path = "/me/role",
    request_body = AssumeRoleRequest,
    responses(
        (status = 200, description = "Role assumed", body = SessionRoleResponse),
        (status = 403, description = "Requested role exceeds platform role")
    )
)]
pub async fn assume_role(
    AuthUser { session_id, .. }: AuthUser,
    Extension(identity): Extension<RequestIdentity>,
    State(state): State<AppState>,
    Json(payload): Json<AssumeRoleRequest>,
) -> Result<Json<SessionRoleResponse>, GateError> {
    let platform = identity.platform_role;

    if !platform.can_assume(payload.role) {
        return Err(GateError::RoleAssumptionDenied {
            platform,
            requested: payload.role,
        });
    }

    state
        .sessions
        .put(
            session_id,
            SessionRecord {
                platform_role: platform,
                session_role: payload.role,
                assumed_at: Utc::now(),
            },
        )
        .await?;

    Ok(Json(SessionRoleResponse {
        platform_role: platform,
        session_role: payload.role,
        available_roles: platform.assumable_roles().to_vec(),
    }))
}

/// logout
///
/// [Authenticated Route] Ends the role portion of the login session by
/// removing the session record. The path itself is public as far as the gate
/// is concerned (a roleless session must be able to log out without being
/// bounced to role selection), so authentication happens here through the
/// extractor rather than in the gate.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Session role cleared"))
)]
pub async fn logout(
    AuthUser { session_id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, GateError> {
    state.sessions.clear(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// list_users
///
/// [Admin Route] Retrieves the full account listing from the identity
/// backend, with the caller's own credential forwarded.
///
/// *Authorization*: The `/admin` prefix is admin-tier at the gate; the handler
/// still re-checks the resolved session role before calling out. An admin
/// acting as teacher or student is refused here like anyone else.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All accounts", body = [BackendUser]),
        (status = 403, description = "Session role is not admin")
    )
)]
pub async fn list_users(
    AuthUser { token, .. }: AuthUser,
    Extension(identity): Extension<RequestIdentity>,
    State(state): State<AppState>,
) -> Result<Json<Vec<BackendUser>>, GateError> {
    if identity.session_role != Role::Admin {
        return Err(GateError::PathForbidden);
    }
    let users = state.backend.list_users(&token).await?;
    Ok(Json(users))
}

/// update_user_role
///
/// [Admin Route] Forwards a platform-role mutation to the identity backend.
/// This is the single write path for platform roles; session roles are never
/// touched by it (an affected user's stale session role stops being honored
/// by the gate on their next request).
#[utoipa::path(
    put,
    path = "/admin/users/{sub}/role",
    params(("sub" = String, Path, description = "Subject identifier of the target account")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated account", body = BackendUser),
        (status = 403, description = "Session role is not admin")
    )
)]
pub async fn update_user_role(
    AuthUser { token, .. }: AuthUser,
    Extension(identity): Extension<RequestIdentity>,
    State(state): State<AppState>,
    Path(sub): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<BackendUser>, GateError> {
    if identity.session_role != Role::Admin {
        return Err(GateError::PathForbidden);
    }
    let updated = state
        .backend
        .update_platform_role(&token, &sub, payload.role)
        .await?;
    Ok(Json(updated))
}
