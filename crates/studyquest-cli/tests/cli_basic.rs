//! Basic CLI E2E tests.
//!
//! Each test points the binary at its own temporary data directory.

mod common;

use common::{parse_json, run_events, run_summary, TestHome};

const FAST_RUN: &[&str] = &[
    "session",
    "run",
    "--duration",
    "6",
    "--interval",
    "2",
    "--amount",
    "1",
    "--probability",
    "1",
    "--tick-ms",
    "10",
];

// ── Config ───────────────────────────────────────────────────────────

#[test]
fn test_config_get_default() {
    let home = TestHome::new();
    let out = home.run_success(&["config", "get", "session.duration_secs"]);
    assert_eq!(out.trim(), "20");
    assert!(home.path().join("config.toml").exists());
}

#[test]
fn test_config_set_persists() {
    let home = TestHome::new();
    home.run_success(&["config", "set", "session.reward_interval_secs", "5"]);
    let out = home.run_success(&["config", "get", "session.reward_interval_secs"]);
    assert_eq!(out.trim(), "5");

    home.run_success(&["config", "set", "session.seed", "42"]);
    let out = home.run_success(&["config", "get", "session.seed"]);
    assert_eq!(out.trim(), "42");
}

#[test]
fn test_config_rejects_bad_input() {
    let home = TestHome::new();
    let stderr = home.run_failure(&["config", "get", "session.nope"]);
    assert!(stderr.contains("session.nope"));
    home.run_failure(&["config", "set", "tick_ms", "fast"]);
    home.run_failure(&["config", "set", "nope", "1"]);
}

#[test]
fn test_config_reset() {
    let home = TestHome::new();
    home.run_success(&["config", "set", "tick_ms", "250"]);
    home.run_success(&["config", "reset"]);
    let out = home.run_success(&["config", "get", "tick_ms"]);
    assert_eq!(out.trim(), "1000");
}

#[test]
fn test_config_list_json() {
    let home = TestHome::new();
    let config = parse_json(&home.run_success(&["config", "list"]));
    assert_eq!(config["session"]["reward_amount"], 1);
    assert_eq!(config["log"]["level"], "warn");
}

// ── Auth ─────────────────────────────────────────────────────────────

#[test]
fn test_auth_status_signed_out() {
    let home = TestHome::new();
    let status = parse_json(&home.run_success(&["auth", "status"]));
    assert_eq!(status["signed_in"], false);
    assert!(status["user"].is_null());
}

#[test]
fn test_auth_register_login_logout() {
    let home = TestHome::new();
    let ana = home.register("ana@example.com", "ana");
    assert_eq!(ana["email"], "ana@example.com");
    assert_eq!(ana["role"], "admin");

    let status = parse_json(&home.run_success(&["auth", "status"]));
    assert_eq!(status["signed_in"], true);
    assert_eq!(status["user"]["username"], "ana");

    home.run_success(&["auth", "logout"]);
    let status = parse_json(&home.run_success(&["auth", "status"]));
    assert_eq!(status["signed_in"], false);

    let again = parse_json(&home.run_success(&[
        "auth",
        "login",
        "--email",
        "ana@example.com",
        "--password",
        "study-hard",
    ]));
    assert_eq!(again["user_id"], ana["user_id"]);
}

#[test]
fn test_auth_failures() {
    let home = TestHome::new();
    home.register("ana@example.com", "ana");

    home.run_failure(&[
        "auth",
        "register",
        "--email",
        "ANA@example.com",
        "--username",
        "other",
        "--password",
        "study-hard",
    ]);
    home.run_failure(&[
        "auth",
        "login",
        "--email",
        "ana@example.com",
        "--password",
        "wrong-password",
    ]);
    home.run_failure(&[
        "auth",
        "register",
        "--email",
        "not-an-email",
        "--username",
        "x",
        "--password",
        "study-hard",
    ]);
}

#[test]
fn test_profile_requires_sign_in() {
    let home = TestHome::new();
    home.run_failure(&["profile", "show"]);
    home.run_failure(&["stats", "all"]);
}

// ── Session ──────────────────────────────────────────────────────────

#[test]
fn test_session_simulate_full() {
    let home = TestHome::new();
    let out = parse_json(&home.run_success(&[
        "session",
        "simulate",
        "--duration",
        "10",
        "--interval",
        "3",
        "--amount",
        "1",
        "--probability",
        "1",
    ]));
    assert_eq!(out["ticks"], 10);
    assert_eq!(out["rolls"].as_array().unwrap().len(), 3);
    assert_eq!(out["outcome"]["accrued_points"], 3);
    assert_eq!(out["outcome"]["cancelled"], false);
    assert_eq!(out["expected_points"], 3.0);
}

#[test]
fn test_session_simulate_stopped_early() {
    let home = TestHome::new();
    let out = parse_json(&home.run_success(&[
        "session",
        "simulate",
        "--duration",
        "10",
        "--interval",
        "3",
        "--probability",
        "1",
        "--stop-after",
        "2",
    ]));
    assert_eq!(out["ticks"], 2);
    assert_eq!(out["outcome"]["accrued_points"], 0);
    assert_eq!(out["outcome"]["cancelled"], true);
}

#[test]
fn test_session_simulate_seed_is_reproducible() {
    let home = TestHome::new();
    let args = [
        "session",
        "simulate",
        "--duration",
        "60",
        "--interval",
        "1",
        "--seed",
        "7",
    ];
    let first = parse_json(&home.run_success(&args));
    let second = parse_json(&home.run_success(&args));
    assert_eq!(first["rolls"], second["rolls"]);
}

#[test]
fn test_session_rejects_invalid_parameters() {
    let home = TestHome::new();
    home.run_failure(&["session", "simulate", "--duration", "0"]);
    home.run_failure(&["session", "simulate", "--interval", "0"]);
    home.run_failure(&["session", "simulate", "--probability", "1.5"]);
    home.run_failure(&["session", "run", "--duration", "0", "--tick-ms", "10"]);
}

#[test]
fn test_session_run_credits_points() {
    let home = TestHome::new();
    home.register("ana@example.com", "ana");

    let stdout = home.run_success(FAST_RUN);
    let events = run_events(&stdout);
    assert_eq!(events.first().unwrap()["type"], "SessionStarted");
    assert_eq!(events.last().unwrap()["type"], "SessionCompleted");
    let rolls = events
        .iter()
        .filter(|e| e["type"] == "RewardRolled")
        .count();
    assert_eq!(rolls, 3);

    let summary = run_summary(&stdout);
    assert_eq!(summary["outcome"]["accrued_points"], 3);
    assert_eq!(summary["report"]["status"], "credited");
    assert_eq!(summary["report"]["balance"], 3);

    home.run_success(FAST_RUN);
    let profile = parse_json(&home.run_success(&["profile", "show"]));
    assert_eq!(profile["points"], 6);
}

#[test]
fn test_session_run_signed_out_is_not_credited() {
    let home = TestHome::new();
    let summary = run_summary(&home.run_success(FAST_RUN));
    assert_eq!(summary["outcome"]["accrued_points"], 3);
    assert_eq!(summary["report"]["status"], "skipped_no_identity");
}

#[test]
fn test_stats_after_run() {
    let home = TestHome::new();
    home.register("ana@example.com", "ana");
    home.run_success(FAST_RUN);

    let stats = parse_json(&home.run_success(&["stats", "all"]));
    assert_eq!(stats["total_sessions"], 1);
    assert_eq!(stats["completed_sessions"], 1);
    assert_eq!(stats["total_points"], 3);
    assert_eq!(stats["total_study_secs"], 6);

    let today = parse_json(&home.run_success(&["stats", "today"]));
    assert_eq!(today["total_sessions"], 1);

    let recent = parse_json(&home.run_success(&["stats", "recent", "--limit", "5"]));
    assert_eq!(recent.as_array().unwrap().len(), 1);
}

// ── Admin ────────────────────────────────────────────────────────────

#[test]
fn test_admin_listing_is_gated() {
    let home = TestHome::new();
    home.register("ana@example.com", "ana");
    let bo = home.register("bo@example.com", "bo");
    assert_eq!(bo["role"], "user");

    // Signed in as bo after registering.
    home.run_failure(&["admin", "users"]);

    home.run_success(&[
        "auth",
        "login",
        "--email",
        "ana@example.com",
        "--password",
        "study-hard",
    ]);
    let users = parse_json(&home.run_success(&["admin", "users"]));
    let emails: Vec<&str> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, ["ana@example.com", "bo@example.com"]);

    let table = home.run_success(&["admin", "users", "--table"]);
    assert!(table.starts_with("USERNAME"));
    assert!(table.contains("bo@example.com"));
}

#[test]
fn test_admin_promote() {
    let home = TestHome::new();
    home.register("ana@example.com", "ana");
    home.register("bo@example.com", "bo");
    home.run_success(&[
        "auth",
        "login",
        "--email",
        "ana@example.com",
        "--password",
        "study-hard",
    ]);

    let promoted = parse_json(&home.run_success(&["admin", "promote", "bo@example.com"]));
    assert_eq!(promoted["role"], "admin");
    home.run_failure(&["admin", "promote", "nobody@example.com"]);

    home.run_success(&[
        "auth",
        "login",
        "--email",
        "bo@example.com",
        "--password",
        "study-hard",
    ]);
    home.run_success(&["admin", "users"]);
}
