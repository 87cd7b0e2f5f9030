//! Common utilities for CLI E2E tests.

use std::path::Path;
use std::process::Command;

/// An isolated data directory the CLI is pointed at via `STUDYQUEST_HOME`.
pub struct TestHome {
    dir: tempfile::TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Invoke a CLI command and return (stdout, stderr, exit code).
    pub fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = Command::new(env!("CARGO_BIN_EXE_studyquest"))
            .args(args)
            .env("STUDYQUEST_HOME", self.path())
            .env("STUDYQUEST_LOG", "off")
            .output()
            .expect("Failed to execute CLI command");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);

        (stdout, stderr, code)
    }

    /// Invoke a CLI command and expect success.
    pub fn run_success(&self, args: &[&str]) -> String {
        let (stdout, stderr, code) = self.run(args);
        if code != 0 && !stderr.is_empty() {
            eprintln!("CLI error output: {}", stderr);
        }
        assert_eq!(code, 0, "CLI command failed with code {}: {:?}", code, args);
        stdout
    }

    /// Invoke a CLI command and expect failure; returns stderr.
    pub fn run_failure(&self, args: &[&str]) -> String {
        let (_, stderr, code) = self.run(args);
        assert!(code != 0, "CLI command unexpectedly succeeded: {:?}", args);
        stderr
    }

    /// Register an account through the CLI, which also signs it in.
    pub fn register(&self, email: &str, username: &str) -> serde_json::Value {
        parse_json(&self.run_success(&[
            "auth",
            "register",
            "--email",
            email,
            "--username",
            username,
            "--password",
            "study-hard",
        ]))
    }
}

/// Parse JSON output from CLI.
pub fn parse_json(json: &str) -> serde_json::Value {
    serde_json::from_str(json).expect("Failed to parse JSON output")
}

/// `session run` streams one compact event per line, then a pretty summary.
/// Returns the summary.
pub fn run_summary(stdout: &str) -> serde_json::Value {
    let lines: Vec<&str> = stdout.lines().collect();
    let start = lines
        .iter()
        .position(|line| *line == "{")
        .expect("No summary in session output");
    parse_json(&lines[start..].join("\n"))
}

/// Compact event lines printed before the summary.
pub fn run_events(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .take_while(|line| *line != "{")
        .map(parse_json)
        .collect()
}
