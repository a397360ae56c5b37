//! Test helper utilities.
//!
//! [`FakeCli`] stands in for the real `sf` binary: a small `/bin/sh` script in a
//! temporary directory whose behaviour each test spells out. These APIs are intended
//! for test-only code paths.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::ExecutorConfig;
use crate::dispatcher::Dispatcher;
use crate::executor::CommandInvocation;

const SCRIPT_NAME: &str = "sf";
const ARGS_LOG: &str = "args.log";

/// A throwaway executable that plays the Salesforce CLI.
///
/// The directory (and script) is removed when the value is dropped.
pub struct FakeCli {
    dir: TempDir,
    script: PathBuf,
}

impl FakeCli {
    /// Creates an executable running `body` under `/bin/sh`.
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir for fake sf");
        let script = dir.path().join(SCRIPT_NAME);
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).expect("failed to write fake sf");
        make_executable(&script);
        Self { dir, script }
    }

    /// Prints each argument on its own line.
    pub fn echo_args() -> Self {
        Self::new(r#"for arg in "$@"; do printf '%s\n' "$arg"; done"#)
    }

    /// Records its arguments (one per line) to [`recorded_args`](Self::recorded_args),
    /// then prints `stdout` and exits with `exit_code`.
    pub fn recording(stdout: &str, exit_code: i32) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir for fake sf");
        let log = dir.path().join(ARGS_LOG);
        let payload = dir.path().join("stdout.txt");
        std::fs::write(&payload, stdout).expect("failed to write fake sf output");
        let body = format!(
            ": > '{log}'\nfor arg in \"$@\"; do printf '%s\\n' \"$arg\" >> '{log}'; done\ncat '{payload}'\nexit {exit_code}",
            log = log.display(),
            payload = payload.display(),
        );
        let script = dir.path().join(SCRIPT_NAME);
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).expect("failed to write fake sf");
        make_executable(&script);
        Self { dir, script }
    }

    pub fn path(&self) -> &Path {
        &self.script
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Executor settings pointing at this script, with default bounds.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::with_program(self.script.to_string_lossy().into_owned())
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.executor_config())
    }

    pub fn invocation(&self, args: &[&str]) -> CommandInvocation {
        CommandInvocation::new(
            self.script.to_string_lossy().into_owned(),
            args.iter().map(|a| a.to_string()).collect(),
        )
    }

    /// Arguments seen by the last run of a [`recording`](Self::recording) script.
    pub fn recorded_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join(ARGS_LOG))
            .map(|log| log.lines().map(str::to_owned).collect())
            .unwrap_or_default()
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to mark fake sf executable");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
