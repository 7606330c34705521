//! End-to-end tests for the `homunculus` binary with an isolated HOME.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const SCRUBBED_ENV: [&str; 7] = [
    "CLAUDE_SESSION_ID",
    "CLAUDE_PACKAGE_MANAGER",
    "CLAUDE_TRANSCRIPT_PATH",
    "COMPACT_THRESHOLD",
    "HOMUNCULUS_ANALYZER",
    "HOMUNCULUS_DEBUG_LOG",
    "RUST_LOG",
];

struct Sandbox {
    home: TempDir,
    project: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            project: TempDir::new().unwrap(),
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("homunculus").unwrap();
        for key in SCRUBBED_ENV {
            cmd.env_remove(key);
        }
        cmd.env("HOME", self.home.path())
            .env("TMPDIR", self.home.path())
            .current_dir(self.project.path());
        cmd
    }

    fn claude_dir(&self) -> std::path::PathBuf {
        self.home.path().join(".claude")
    }

    fn write_session(&self, name: &str, content: &str) -> std::path::PathBuf {
        let dir = self.claude_dir().join("sessions");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn test_observe_passes_payload_through_and_records() {
    let sandbox = Sandbox::new();
    let payload = r#"{"tool_name":"Read","tool_input":{"file_path":"src/lib.rs"},"session_id":"s-1"}"#;

    sandbox
        .cmd()
        .args(["observe", "pre"])
        .write_stdin(payload)
        .assert()
        .success()
        .stdout(payload);

    let log = read(&sandbox.claude_dir().join("homunculus/observations.jsonl"));
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains(r#""event":"tool_start""#));
    assert!(log.contains(r#""tool":"Read""#));
}

#[test]
fn test_observe_tolerates_garbage() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["observe", "post"])
        .write_stdin("not json")
        .assert()
        .success()
        .stdout("not json");

    assert!(!sandbox
        .claude_dir()
        .join("homunculus/observations.jsonl")
        .exists());
}

#[test]
fn test_hooks_pass_non_utf8_bytes_through() {
    let sandbox = Sandbox::new();
    let payload: Vec<u8> = vec![b'{', 0xff, 0xfe, b'}'];

    for args in [&["observe", "pre"][..], &["check-console-log"][..]] {
        let output = sandbox
            .cmd()
            .args(args)
            .write_stdin(payload.clone())
            .output()
            .unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout, payload);
    }
}

#[test]
fn test_observe_skipped_inside_analyzer() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["observe", "pre"])
        .env("HOMUNCULUS_ANALYZER", "1")
        .write_stdin(r#"{"tool_name":"Read"}"#)
        .assert()
        .success();

    assert!(!sandbox
        .claude_dir()
        .join("homunculus/observations.jsonl")
        .exists());
}

#[test]
fn test_alias_set_resolve_and_list() {
    let sandbox = Sandbox::new();
    let session = sandbox.write_session("2026-04-01-a1b2c3d4-session.tmp", "# Auth work\n");

    sandbox
        .cmd()
        .args(["alias", "set", "auth", "a1b2c3d4", "--title", "Auth refactor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created alias 'auth'"));

    sandbox
        .cmd()
        .args(["alias", "resolve", "auth"])
        .assert()
        .success()
        .stdout(format!("{}\n", session.display()));

    sandbox
        .cmd()
        .args(["alias", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Auth refactor"));
}

#[test]
fn test_alias_rejects_reserved_and_invalid_names() {
    let sandbox = Sandbox::new();
    sandbox.write_session("2026-04-01-a1b2c3d4-session.tmp", "# x\n");

    sandbox
        .cmd()
        .args(["alias", "set", "list", "a1b2c3d4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reserved"));

    sandbox
        .cmd()
        .args(["alias", "set", "bad name", "a1b2c3d4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("letters, numbers"));
}

#[test]
fn test_alias_cleanup_drops_missing_sessions() {
    let sandbox = Sandbox::new();
    let session = sandbox.write_session("2026-04-01-a1b2c3d4-session.tmp", "# x\n");
    sandbox
        .cmd()
        .args(["alias", "set", "doomed", "a1b2c3d4"])
        .assert()
        .success();
    std::fs::remove_file(&session).unwrap();

    sandbox
        .cmd()
        .args(["alias", "cleanup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 1"));

    sandbox
        .cmd()
        .args(["alias", "resolve", "doomed"])
        .assert()
        .failure();
}

#[test]
fn test_sessions_list_and_show() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions found"));

    sandbox.write_session(
        "2026-04-02-deadbeef-session.tmp",
        "# Parser rewrite\n\n### Completed\n- [x] lexer\n\n### In Progress\n- [ ] parser\n",
    );

    sandbox
        .cmd()
        .args(["sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deadbeef").and(predicate::str::contains("Parser rewrite")));

    sandbox
        .cmd()
        .args(["sessions", "show", "dead"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[x] lexer").and(predicate::str::contains("1/2 items completed")));
}

#[test]
fn test_pm_env_override_wins() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.project.path().join("yarn.lock"), "").unwrap();

    sandbox
        .cmd()
        .args(["pm", "detect"])
        .env("CLAUDE_PACKAGE_MANAGER", "pnpm")
        .assert()
        .success()
        .stdout(predicate::str::contains("Package manager: pnpm (environment)"));
}

#[test]
fn test_pm_lock_file_and_run_command() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.project.path().join("yarn.lock"), "").unwrap();

    sandbox
        .cmd()
        .args(["pm", "run", "lint"])
        .assert()
        .success()
        .stdout("yarn lint\n");
}

#[test]
fn test_pm_set_rejects_unknown_manager() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["pm", "set", "cargo"])
        .assert()
        .failure();

    sandbox
        .cmd()
        .args(["pm", "set", "bun"])
        .assert()
        .success();
    assert!(read(&sandbox.claude_dir().join("package-manager.json")).contains("\"bun\""));
}

#[test]
fn test_suggest_compact_at_threshold() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .arg("suggest-compact")
        .env("CLAUDE_SESSION_ID", "cli-test")
        .env("COMPACT_THRESHOLD", "2")
        .assert()
        .success()
        .stderr(predicate::str::contains("StrategicCompact").not());

    sandbox
        .cmd()
        .arg("suggest-compact")
        .env("CLAUDE_SESSION_ID", "cli-test")
        .env("COMPACT_THRESHOLD", "2")
        .assert()
        .success()
        .stderr(predicate::str::contains("2 tool calls reached"));
}

#[test]
fn test_check_console_log_outside_repo_passes_through() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .arg("check-console-log")
        .write_stdin("{\"stop\":true}")
        .assert()
        .success()
        .stdout("{\"stop\":true}");
}

#[test]
fn test_observer_status_when_not_running() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["observer", "status"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Observer is NOT running")
                .and(predicate::str::contains("Min for analysis: 20")),
        );

    sandbox
        .cmd()
        .args(["observer", "stop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Observer not running"));
}

#[test]
fn test_observer_analyze_skips_small_logs() {
    let sandbox = Sandbox::new();
    let log = sandbox.claude_dir().join("homunculus/observations.jsonl");
    std::fs::create_dir_all(log.parent().unwrap()).unwrap();
    std::fs::write(&log, "{}\n{}\n").unwrap();

    sandbox
        .cmd()
        .args(["observer", "analyze"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(2/20)"));
    assert_eq!(read(&log), "{}\n{}\n");
}

#[test]
fn test_instincts_evolve_needs_three() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["instincts", "evolve"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Need at least 3 instincts"));
}
