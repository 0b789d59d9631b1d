use lms_gateway::models::Role;
use lms_gateway::policy::{GateDecision, PathPolicy};

/// The default tier lists: public includes "/" and "/health", admin covers
/// "/admin", teacher covers "/teacher" and "/courses/create", student covers
/// "/courses" and "/progress", selection entry is "/me/role".
fn policy() -> PathPolicy {
    PathPolicy::default_policy()
}

// --- Rule 1: Public Prefixes ---

#[test]
fn test_public_paths_allow_without_any_role() {
    let p = policy();
    assert_eq!(p.evaluate("/health", None), GateDecision::Allow);
    assert_eq!(p.evaluate("/auth/login", None), GateDecision::Allow);
    assert_eq!(p.evaluate("/select-role", None), GateDecision::Allow);
    // Public wins even when a role is present.
    assert_eq!(p.evaluate("/health", Some(Role::Student)), GateDecision::Allow);
}

#[test]
fn test_root_public_entry_matches_root_only() {
    let p = policy();
    // "/" in the public list covers the root path itself...
    assert_eq!(p.evaluate("/", None), GateDecision::Allow);
    // ...but does not make every other path public.
    assert_eq!(p.evaluate("/dashboard", None), GateDecision::SelectionRequired);
}

#[test]
fn test_prefix_match_is_segment_aware() {
    let p = policy();
    // "/admin" covers "/admin" and "/admin/users"...
    assert_eq!(p.evaluate("/admin", Some(Role::Teacher)), GateDecision::Forbidden);
    assert_eq!(
        p.evaluate("/admin/users", Some(Role::Teacher)),
        GateDecision::Forbidden
    );
    // ...but "/administrator" is a different path and falls through to the
    // final allow rule.
    assert_eq!(
        p.evaluate("/administrator", Some(Role::Teacher)),
        GateDecision::Allow
    );
}

// --- Rule 2: Roleless Sessions ---

#[test]
fn test_roleless_request_redirects_rather_than_denies() {
    let p = policy();
    assert_eq!(p.evaluate("/dashboard", None), GateDecision::SelectionRequired);
    // Even for a path that would be forbidden with the wrong role, rolelessness
    // is reported first, as a redirect.
    assert_eq!(p.evaluate("/admin/users", None), GateDecision::SelectionRequired);
}

#[test]
fn test_selection_entry_is_reachable_while_roleless() {
    let p = policy();
    assert_eq!(p.evaluate("/me/role", None), GateDecision::Allow);
    // Once a role is set, the entry point stays reachable (it is how roles
    // get re-selected).
    assert_eq!(p.evaluate("/me/role", Some(Role::Student)), GateDecision::Allow);
}

// --- Rules 3-5: Tier Checks ---

#[test]
fn test_admin_tier_requires_admin() {
    let p = policy();
    assert_eq!(p.evaluate("/admin/users", Some(Role::Admin)), GateDecision::Allow);
    assert_eq!(
        p.evaluate("/admin/users", Some(Role::Teacher)),
        GateDecision::Forbidden
    );
    assert_eq!(
        p.evaluate("/admin/users", Some(Role::Student)),
        GateDecision::Forbidden
    );
}

#[test]
fn test_teacher_tier_admits_admin_and_teacher() {
    let p = policy();
    assert_eq!(p.evaluate("/teacher/courses", Some(Role::Admin)), GateDecision::Allow);
    assert_eq!(
        p.evaluate("/teacher/courses", Some(Role::Teacher)),
        GateDecision::Allow
    );
    assert_eq!(
        p.evaluate("/teacher/courses", Some(Role::Student)),
        GateDecision::Forbidden
    );
}

#[test]
fn test_overlapping_prefixes_resolve_by_tier_order() {
    let p = policy();
    // "/courses/create" is teacher-tier even though "/courses" is
    // student-tier; the more privileged rule is evaluated first.
    assert_eq!(
        p.evaluate("/courses/create", Some(Role::Student)),
        GateDecision::Forbidden
    );
    assert_eq!(
        p.evaluate("/courses/create", Some(Role::Teacher)),
        GateDecision::Allow
    );
    // Plain course browsing stays open to students.
    assert_eq!(p.evaluate("/courses/123", Some(Role::Student)), GateDecision::Allow);
}

#[test]
fn test_student_tier_satisfied_by_every_role() {
    let p = policy();
    for role in [Role::Admin, Role::Teacher, Role::Student] {
        assert_eq!(p.evaluate("/progress", Some(role)), GateDecision::Allow);
    }
}

// --- Rule 6: Default Allow ---

#[test]
fn test_unlisted_paths_allow_once_a_role_is_set() {
    let p = policy();
    assert_eq!(p.evaluate("/dashboard", Some(Role::Student)), GateDecision::Allow);
    assert_eq!(p.evaluate("/me", Some(Role::Teacher)), GateDecision::Allow);
}
