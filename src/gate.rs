use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    auth::AuthUser,
    errors::GateError,
    models::{BackendUser, Role},
    policy::GateDecision,
};

// Headers attached to the request on allow, so downstream handlers and
// proxied services can trust the identity without re-deriving it.
const USER_SUB_HEADER: HeaderName = HeaderName::from_static("x-user-sub");
const USER_EMAIL_HEADER: HeaderName = HeaderName::from_static("x-user-email");
const USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");

/// RequestIdentity
///
/// The resolved identity the gate attaches to every allowed request, as a
/// request extension. Handlers read it instead of calling the identity backend
/// again, keeping the per-request outbound call count at one.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub sub: String,
    pub email: String,
    /// The backend-authoritative privilege ceiling, fetched fresh this
    /// request.
    pub platform_role: Role,
    /// The role this request is acting as: the session's assumed role, or the
    /// platform role when nothing has been assumed yet (only reachable on the
    /// selection entry path).
    pub session_role: Role,
}

/// ResolvedRoles
///
/// The effective `(platform_role, session_role)` pair for one request,
/// together with the backend profile it was derived from.
#[derive(Debug, Clone)]
pub struct ResolvedRoles {
    pub profile: BackendUser,
    /// The explicitly assumed session role, if the session store holds one
    /// that the fresh platform role still permits.
    pub assumed_role: Option<Role>,
}

impl ResolvedRoles {
    /// The session role per the resolution contract: the assumed role when
    /// set, otherwise defaulting to the platform role.
    pub fn session_role(&self) -> Role {
        self.assumed_role.unwrap_or(self.profile.role)
    }
}

/// resolve_roles
///
/// Produces the effective role pair for the current request by combining the
/// authenticated identity with backend-sourced role data.
///
/// - The platform role comes from the identity backend, fetched with the
///   caller's own credential. If that call fails, the whole resolution fails
///   with `UpstreamUnavailable`; a privileged default is never substituted.
/// - The session-scoped override is read from the session store. A stored
///   override the fresh platform role no longer permits (the account was
///   demoted mid-session) is ignored, as if no role had been selected; the
///   record itself is only ever rewritten by a new assumption or by logout.
///
/// Idempotent and side-effect-free apart from the outbound read: resolving
/// twice without an intervening assumption yields the same pair.
pub async fn resolve_roles(state: &AppState, user: &AuthUser) -> Result<ResolvedRoles, GateError> {
    let profile = state.backend.fetch_profile(&user.token).await?;

    let assumed_role = match state.sessions.get(user.session_id).await? {
        Some(record) if profile.role.can_assume(record.session_role) => {
            Some(record.session_role)
        }
        Some(stale) => {
            tracing::warn!(
                sub = %profile.sub,
                stored = %stale.session_role,
                platform = %profile.role,
                "ignoring session role the platform role no longer permits"
            );
            None
        }
        None => None,
    };

    Ok(ResolvedRoles {
        profile,
        assumed_role,
    })
}

/// gate_middleware
///
/// The session authorization gate, applied to the entire router. For each
/// inbound request:
///
/// 1. Public paths pass through untouched, no authentication required.
/// 2. Everything else must carry a valid session token (401 otherwise).
/// 3. Roles are resolved per `resolve_roles`: one fresh backend read plus the
///    session store, with backend failure surfacing as 502 rather than as an
///    implicit allow.
/// 4. The path-tier rules decide: allow, redirect to role selection (303), or
///    forbidden (403). The rules see only the explicitly assumed session role;
///    a teacher acting as student is a student here.
/// 5. On allow, the resolved identity is attached to the request as an
///    extension and as x-user-* headers before the downstream handler runs.
pub async fn gate_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    // 1. Public paths short-circuit before any credential work.
    if state.config.policy.is_public(&path) {
        return next.run(request).await;
    }

    // 2. Authenticate. The extractor rejects with 401; the gate reports it
    // through the shared error taxonomy instead.
    let (mut parts, body) = request.into_parts();
    let user = match AuthUser::from_request_parts(&mut parts, &state).await {
        Ok(user) => user,
        Err(_) => return GateError::Unauthenticated.into_response(),
    };
    let mut request = Request::from_parts(parts, body);

    // 3. Resolve the role pair (one backend read + session store).
    let resolved = match resolve_roles(&state, &user).await {
        Ok(resolved) => resolved,
        Err(e) => return e.into_response(),
    };

    // 4. Evaluate the tier rules against the assumed role only.
    match state
        .config
        .policy
        .evaluate(&path, resolved.assumed_role)
    {
        GateDecision::Allow => {}
        GateDecision::SelectionRequired => {
            return GateError::SelectionRequired {
                location: state.config.select_role_redirect.clone(),
            }
            .into_response();
        }
        GateDecision::Forbidden => return GateError::PathForbidden.into_response(),
    }

    // 5. Attach the resolved identity for downstream consumers.
    let identity = RequestIdentity {
        sub: resolved.profile.sub.clone(),
        email: resolved.profile.email.clone(),
        platform_role: resolved.profile.role,
        session_role: resolved.session_role(),
    };
    attach_identity(&mut request, &identity);
    request.extensions_mut().insert(identity);

    next.run(request).await
}

/// Writes the x-user-* headers onto the outgoing request. A value that is not
/// valid in a header (possible for exotic emails) is skipped; the extension
/// carries the authoritative copy either way.
fn attach_identity(request: &mut Request, identity: &RequestIdentity) {
    let headers = request.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&identity.sub) {
        headers.insert(USER_SUB_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&identity.email) {
        headers.insert(USER_EMAIL_HEADER, value);
    }
    headers.insert(
        USER_ROLE_HEADER,
        HeaderValue::from_static(identity.session_role.as_str()),
    );
}
