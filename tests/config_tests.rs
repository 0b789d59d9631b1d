use lms_gateway::config::{AppConfig, Env};
use serial_test::serial;
use std::{env, panic};

// --- Setup/Teardown Utilities ---

/// Utility to run a test function and restore environment variables afterward
fn run_with_env<T, R>(test: T, cleanup_vars: Vec<&'static str>) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    // Save current environment variables
    let originals: Vec<(String, Option<String>)> = cleanup_vars
        .iter()
        .map(|&var| (var.to_string(), env::var(var).ok()))
        .collect();

    // Run the test
    let result = panic::catch_unwind(test);

    // Restore original environment variables
    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(&key, val);
            } else {
                env::remove_var(&key);
            }
        }
    }

    // Re-panic if the test failed
    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    // We expect this to panic because the production secrets are not set
    let result = panic::catch_unwind(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::remove_var("SESSION_JWT_SECRET");
            env::remove_var("IDENTITY_API_URL");
            env::remove_var("DATABASE_URL");
        }
        AppConfig::load()
    });

    // Cleanup
    unsafe {
        env::remove_var("APP_ENV");
    }

    // Assert that the config loading failed (panicked)
    assert!(
        result.is_err(),
        "Production config loading should panic on missing secrets"
    );
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    // Local mode should not panic, and should use the development fallbacks
    let config = run_with_env(
        || {
            unsafe {
                env::set_var("APP_ENV", "local");
                // Clear other variables to test fallbacks
                env::remove_var("SESSION_JWT_SECRET");
                env::remove_var("IDENTITY_API_URL");
                env::remove_var("DATABASE_URL");
            }
            AppConfig::load()
        },
        vec![
            "APP_ENV",
            "SESSION_JWT_SECRET",
            "IDENTITY_API_URL",
            "DATABASE_URL",
        ],
    );

    assert_eq!(config.env, Env::Local);
    // Check the dev backend default
    assert_eq!(config.backend_url, "http://localhost:8000/api");
    // Check local JWT secret fallback
    assert_eq!(config.jwt_secret, "local-dev-session-secret");
    // Sessions stay in memory locally; no database demanded
    assert_eq!(config.db_url, None);
}

#[test]
#[serial]
fn test_default_policy_tier_lists() {
    let config = run_with_env(
        || {
            unsafe {
                env::set_var("APP_ENV", "local");
                env::remove_var("PUBLIC_PATHS");
                env::remove_var("ADMIN_PATHS");
                env::remove_var("TEACHER_PATHS");
                env::remove_var("STUDENT_PATHS");
            }
            AppConfig::load()
        },
        vec![
            "APP_ENV",
            "PUBLIC_PATHS",
            "ADMIN_PATHS",
            "TEACHER_PATHS",
            "STUDENT_PATHS",
        ],
    );

    assert!(config.policy.public.contains(&"/health".to_string()));
    assert_eq!(config.policy.admin, vec!["/admin"]);
    assert_eq!(config.policy.teacher, vec!["/teacher", "/courses/create"]);
    assert_eq!(config.policy.student, vec!["/courses", "/progress"]);
    assert_eq!(config.policy.selection_entry, "/me/role");
    assert_eq!(config.select_role_redirect, "/select-role");
}

#[test]
#[serial]
fn test_path_lists_are_overridable_from_env() {
    let config = run_with_env(
        || {
            unsafe {
                env::set_var("APP_ENV", "local");
                env::set_var("ADMIN_PATHS", "/ops, /admin");
                env::set_var("TEACHER_PATHS", "/staff");
            }
            AppConfig::load()
        },
        vec!["APP_ENV", "ADMIN_PATHS", "TEACHER_PATHS"],
    );

    // Entries are split on commas and trimmed
    assert_eq!(config.policy.admin, vec!["/ops", "/admin"]);
    assert_eq!(config.policy.teacher, vec!["/staff"]);
    // Unset lists keep their defaults
    assert_eq!(config.policy.student, vec!["/courses", "/progress"]);
}
