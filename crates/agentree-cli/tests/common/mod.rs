//! Shared E2E test helpers for `agentree` binary tests.

#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::time::Duration;
use tempfile::TempDir;

/// Default timeout for a single CLI invocation.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variables that would redirect the binary away from the tempdir.
const CONFIG_VARS: &[&str] = &[
    "AGENTREE_DATA_DIR",
    "AGENTREE_DEFAULT_TENANT",
    "AGENTREE_BUSY_TIMEOUT_MS",
    "AGENTREE_LOG_LEVEL",
    "RUST_LOG",
];

/// A scratch data directory the binary runs against.
pub struct Cli {
    pub dir: TempDir,
}

impl Cli {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Fresh tenant `default` with root `admin` (balance 100, 2h, grants day/week).
    pub fn initialized() -> Self {
        let cli = Self::new();
        let out = cli.ok(&[
            "init",
            "--root",
            "admin",
            "--password",
            "root-pw",
            "--balance",
            "100",
            "--hours",
            "2",
            "--grants",
            "day,week",
        ]);
        assert_eq!(out["payload"]["username"], "admin");
        cli
    }

    /// Command bound to this data directory, run from inside it.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd: assert_cmd::Command = cargo_bin_cmd!("agentree");
        cmd.timeout(TIMEOUT);
        for var in CONFIG_VARS {
            cmd.env_remove(var);
        }
        cmd.current_dir(self.dir.path());
        cmd.args(["--data-dir", self.dir.path().to_str().expect("valid utf8")]);
        cmd
    }

    /// Runs `args`, expects exit 0 and returns the parsed outcome.
    pub fn ok(&self, args: &[&str]) -> Value {
        let output = self.cmd().args(args).assert().success().get_output().clone();
        let outcome = parse(&output.stdout);
        assert_eq!(outcome["success"], true, "{outcome}");
        outcome
    }

    /// Runs `args`, expects exit 1 and returns the parsed outcome.
    pub fn fails(&self, args: &[&str]) -> Value {
        let output = self.cmd().args(args).assert().code(1).get_output().clone();
        let outcome = parse(&output.stdout);
        assert_eq!(outcome["success"], false, "{outcome}");
        outcome
    }
}

fn parse(stdout: &[u8]) -> Value {
    serde_json::from_slice(stdout).expect("stdout is one JSON outcome")
}

pub fn approx(value: &Value, expected: f64) -> bool {
    value
        .as_f64()
        .is_some_and(|v| (v - expected).abs() < 1e-9)
}
