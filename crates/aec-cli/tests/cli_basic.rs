//! Basic CLI E2E tests.
//!
//! Tests run the built `aec` binary against a throwaway data directory and
//! verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command in `data_dir` and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_aec"))
        .args(args)
        .env("AEC_DATA_DIR", data_dir)
        .env_remove("AEC_ACTOR_ID")
        .env_remove("AEC_ACTOR_EMAIL")
        .env_remove("AEC_ACTOR_ROLE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "command {args:?} failed: {stderr}");
    stdout
}

fn json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    serde_json::from_str(&run_ok(data_dir, args)).expect("Failed to parse JSON output")
}

const COORD: [&str; 6] = ["--actor-id", "2", "--actor-email", "coord@aec.pt", "--role", "coordinator"];
const TECH3: [&str; 6] = ["--actor-id", "3", "--actor-email", "tech3@aec.pt", "--role", "technician"];
const TECH4: [&str; 6] = ["--actor-id", "4", "--actor-email", "tech4@aec.pt", "--role", "technician"];

fn with<'a>(actor: &[&'a str], args: &[&'a str]) -> Vec<&'a str> {
    args.iter().chain(actor.iter()).copied().collect()
}

/// Creates a Tuesday slot for technician 3 in January 2099 and materializes it.
fn seed(dir: &Path) -> String {
    let out = run_ok(
        dir,
        &with(
            &COORD,
            &[
                "slot", "create", "--school", "1", "--class", "3A", "--technician", "3",
                "--activity", "Music", "--weekday", "2", "--start", "14:00", "--end", "15:30",
                "--valid-from", "2099-01-01", "--valid-to", "2099-01-31",
            ],
        ),
    );
    assert!(out.contains("Slot created:"));

    let out = run_ok(
        dir,
        &with(&COORD, &["session", "materialize", "--from", "2099-01-01", "--to", "2099-01-31"]),
    );
    assert!(out.contains("Created 4 session(s)."), "unexpected output: {out}");

    let slots = json(dir, &["slot", "list", "--json"]);
    slots[0]["id"].as_str().unwrap().to_string()
}

#[test]
fn test_slot_and_materialize() {
    let dir = tempfile::tempdir().unwrap();
    let slot_id = seed(dir.path());

    let sessions = json(dir.path(), &["session", "list", "--json"]);
    let ids: Vec<&str> = sessions
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        ["2099-01-06", "2099-01-13", "2099-01-20", "2099-01-27"]
            .iter()
            .map(|d| format!("{slot_id}_{d}"))
            .collect::<Vec<_>>()
    );

    // second run creates nothing
    let out = run_ok(
        dir.path(),
        &with(&COORD, &["session", "materialize", "--from", "2099-01-01", "--to", "2099-01-31"]),
    );
    assert!(out.contains("Created 0 session(s)."));
}

#[test]
fn test_substitution_flow() {
    let dir = tempfile::tempdir().unwrap();
    let slot_id = seed(dir.path());
    let session = format!("{slot_id}_2099-01-13");

    let out = run_ok(
        dir.path(),
        &with(
            &TECH3,
            &["substitution", "request", session.as_str(), "--substitute", "4", "--reason", "training"],
        ),
    );
    assert!(out.contains("PENDING_APPROVAL"));

    let requests = json(dir.path(), &["substitution", "list", "--json"]);
    let request_id = requests[0]["id"].as_str().unwrap().to_string();

    // technicians cannot approve
    let (_, stderr, code) = run_cli(dir.path(), &with(&TECH3, &["substitution", "approve", request_id.as_str()]));
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));

    run_ok(dir.path(), &with(&COORD, &["substitution", "approve", request_id.as_str()]));

    // only the substitute may accept
    let (_, _, code) = run_cli(dir.path(), &with(&TECH3, &["substitution", "accept", request_id.as_str()]));
    assert_eq!(code, 1);

    let out = run_ok(dir.path(), &with(&TECH4, &["substitution", "accept", request_id.as_str()]));
    assert!(out.contains("APPROVED"));

    let sessions = json(dir.path(), &["session", "list", "--status", "substituted", "--json"]);
    assert_eq!(sessions.as_array().unwrap().len(), 1);
    assert_eq!(sessions[0]["id"], session.as_str());
    assert_eq!(sessions[0]["assigned_technician_id"], "4");

    let audit = json(dir.path(), &["audit", "list", "--limit", "2", "--json"]);
    assert_eq!(audit[0]["action"], "ACCEPT_SUBSTITUTION_REQUEST");
    assert_eq!(audit[1]["action"], "ASSIGN_SESSION_SUBSTITUTE");
    assert_eq!(audit[1]["actor_email"], "tech4@aec.pt");
}

#[test]
fn test_approver_cannot_reject_after_approval() {
    let dir = tempfile::tempdir().unwrap();
    let slot_id = seed(dir.path());
    let session = format!("{slot_id}_2099-01-20");

    run_ok(
        dir.path(),
        &with(&TECH3, &["substitution", "request", session.as_str(), "--substitute", "4", "--reason", "exam"]),
    );
    let requests = json(dir.path(), &["substitution", "list", "--json"]);
    let request_id = requests[0]["id"].as_str().unwrap().to_string();
    run_ok(dir.path(), &with(&COORD, &["substitution", "approve", request_id.as_str()]));

    let (_, stderr, code) = run_cli(dir.path(), &with(&COORD, &["substitution", "reject", request_id.as_str()]));
    assert_eq!(code, 1);
    assert!(stderr.contains("PENDING_TECH_ACCEPTANCE"), "unexpected error: {stderr}");

    let audit = json(dir.path(), &["audit", "list", "--limit", "1", "--json"]);
    assert_eq!(audit[0]["action"], "APPROVE_SUBSTITUTION_REQUEST");

    // the substitute's decline is tagged with the substitute as actor
    run_ok(dir.path(), &with(&TECH4, &["substitution", "decline", request_id.as_str()]));
    let audit = json(dir.path(), &["audit", "list", "--limit", "1", "--json"]);
    assert_eq!(audit[0]["action"], "DECLINE_SUBSTITUTION_REQUEST");
    assert_eq!(audit[0]["actor_email"], "tech4@aec.pt");
}

#[test]
fn test_only_the_origin_or_an_approver_requests_cover() {
    let dir = tempfile::tempdir().unwrap();
    let slot_id = seed(dir.path());
    let session = format!("{slot_id}_2099-01-27");

    // technician 4 is not assigned to the session
    let (_, stderr, code) = run_cli(
        dir.path(),
        &with(&TECH4, &["substitution", "request", session.as_str(), "--substitute", "4", "--reason", "swap"]),
    );
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"), "unexpected error: {stderr}");

    // the assigned technician cannot name someone else as origin
    let (_, _, code) = run_cli(
        dir.path(),
        &with(
            &TECH3,
            &["substitution", "request", session.as_str(), "--substitute", "4", "--reason", "swap", "--origin", "5"],
        ),
    );
    assert_eq!(code, 1);
    assert!(json(dir.path(), &["substitution", "list", "--json"]).as_array().unwrap().is_empty());

    // a coordinator may file on the technician's behalf
    let out = run_ok(
        dir.path(),
        &with(&COORD, &["substitution", "request", session.as_str(), "--substitute", "4", "--reason", "sick"]),
    );
    assert!(out.contains("3 -> 4"), "unexpected output: {out}");
}

#[test]
fn test_attendance_sign_off() {
    let dir = tempfile::tempdir().unwrap();
    let slot_id = seed(dir.path());
    let session = format!("{slot_id}_2099-01-06");

    run_ok(dir.path(), &with(&COORD, &["session", "absent", session.as_str()]));
    let out = run_ok(
        dir.path(),
        &with(
            &TECH3,
            &["session", "attend", session.as_str(), "--attendees", "19", "--summary", "choir", "--sign-off"],
        ),
    );
    assert!(out.contains("COMPLETED"));

    // a finished session cannot be cancelled
    let (_, stderr, code) = run_cli(dir.path(), &with(&COORD, &["session", "cancel", session.as_str()]));
    assert_eq!(code, 1);
    assert!(stderr.contains("COMPLETED"), "unexpected error: {stderr}");
}

#[test]
fn test_missing_actor_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["session", "cancel", "x_2099-01-06"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("--actor-id"));
}

#[test]
fn test_config_get_set() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(dir.path(), &["config", "get", "materialization.lookahead_days"]).trim(), "14");

    run_ok(dir.path(), &["config", "set", "materialization.lookahead_days", "28"]);
    assert_eq!(run_ok(dir.path(), &["config", "get", "materialization.lookahead_days"]).trim(), "28");
    assert!(run_ok(dir.path(), &["config", "show"]).contains("lookahead_days = 28"));

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "materialization.lookahead_days", "soon"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(dir.path(), &["config", "get", "nope"]);
    assert_eq!(code, 1);
}
