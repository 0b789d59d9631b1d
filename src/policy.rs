use crate::models::Role;

/// GateDecision
///
/// The three possible outcomes of evaluating a request path against the tier
/// rules. There are no other outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The request proceeds to the downstream handler.
    Allow,
    /// Authenticated but no session role chosen yet; redirect to selection.
    SelectionRequired,
    /// The session role is below the tier the path requires.
    Forbidden,
}

/// PathPolicy
///
/// The ordered path-tier rule set. Each tier is a list of path prefixes; the
/// lists are configuration data (see `AppConfig`) rather than logic, so the
/// precedence below can be audited and tested in isolation from the web
/// framework.
///
/// Evaluation order, first match governing (prefixes can overlap, e.g. a
/// teacher-tier `/courses/create` under a student-tier `/courses`):
///
/// 1. public prefix: allow unconditionally, no authentication or role needed.
/// 2. no session role and the path is not the selection entry point: redirect
///    to role selection.
/// 3. admin prefix and role is not admin: forbidden.
/// 4. teacher prefix and role is neither admin nor teacher: forbidden.
/// 5. student prefix and role is none of the three: forbidden. Always
///    satisfied once any role is set, but still evaluated so a future fourth
///    role slots in without reordering anything.
/// 6. otherwise: allow.
#[derive(Debug, Clone)]
pub struct PathPolicy {
    /// Paths reachable with no authentication at all.
    pub public: Vec<String>,
    /// Paths requiring the admin session role.
    pub admin: Vec<String>,
    /// Paths requiring at least the teacher session role.
    pub teacher: Vec<String>,
    /// Paths requiring any session role.
    pub student: Vec<String>,
    /// The role-selection entry point: the one non-public prefix reachable
    /// while authenticated but roleless (it is how a role gets chosen).
    pub selection_entry: String,
}

impl PathPolicy {
    /// prefix_matches
    ///
    /// Segment-aware prefix match: `/admin` covers `/admin` and `/admin/x`
    /// but not `/administrator`. A bare `/` entry matches only the root path
    /// exactly, so listing `/` as public does not make every path public.
    fn prefix_matches(prefix: &str, path: &str) -> bool {
        if prefix == "/" {
            return path == "/";
        }
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    fn any_matches(prefixes: &[String], path: &str) -> bool {
        prefixes.iter().any(|p| Self::prefix_matches(p, path))
    }

    /// True when the path is reachable without authentication.
    pub fn is_public(&self, path: &str) -> bool {
        Self::any_matches(&self.public, path)
    }

    /// evaluate
    ///
    /// The pure decision function: request path plus the current session role
    /// (absent if the user has not selected one yet) in, decision out. The
    /// caller is responsible for having authenticated the request before
    /// passing a non-public path here.
    pub fn evaluate(&self, path: &str, session_role: Option<Role>) -> GateDecision {
        // Rule 1: public prefixes short-circuit everything else.
        if self.is_public(path) {
            return GateDecision::Allow;
        }

        // Rule 2: roleless sessions may only reach the selection entry point.
        let Some(role) = session_role else {
            if Self::prefix_matches(&self.selection_entry, path) {
                return GateDecision::Allow;
            }
            return GateDecision::SelectionRequired;
        };

        // Rules 3-5: tier checks in descending privilege order.
        if Self::any_matches(&self.admin, path) && role != Role::Admin {
            return GateDecision::Forbidden;
        }
        if Self::any_matches(&self.teacher, path)
            && !matches!(role, Role::Admin | Role::Teacher)
        {
            return GateDecision::Forbidden;
        }
        if Self::any_matches(&self.student, path)
            && !matches!(role, Role::Admin | Role::Teacher | Role::Student)
        {
            return GateDecision::Forbidden;
        }

        // Rule 6: anything else is allowed once a role is set.
        GateDecision::Allow
    }
}
