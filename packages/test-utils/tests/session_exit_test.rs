//! Process-wide session teardown at exit
//!
//! The outer test re-runs this binary with only `register_exit_hook`
//! selected. That child registers a hook on the shared session and exits;
//! the hook has to have run by the time the child process is gone.

use std::path::PathBuf;
use std::process::Command;

use atlas_test_utils::fixtures::*;
use rstest::rstest;

const FLAG_VAR: &str = "ATLAS_EXIT_HOOK_FLAG";

#[rstest]
#[ignore = "run in a child process by test_session_hooks_run_at_process_exit"]
fn register_exit_hook(test_environment: &'static TestEnvironment) {
    let Some(flag) = std::env::var_os(FLAG_VAR).map(PathBuf::from) else {
        return;
    };
    test_environment.on_teardown(move || {
        let previous = std::fs::read_to_string(&flag).unwrap_or_default();
        std::fs::write(&flag, previous + "ran\n").unwrap();
    });
}

#[test]
fn test_session_hooks_run_at_process_exit() {
    let dir = tempfile::tempdir().unwrap();
    let flag = dir.path().join("teardown.flag");

    let output = Command::new(std::env::current_exe().unwrap())
        .args(["register_exit_hook", "--exact", "--ignored", "--test-threads=1"])
        .env(FLAG_VAR, &flag)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "child test failed: {}",
        String::from_utf8_lossy(&output.stdout)
    );
    assert_eq!(std::fs::read_to_string(&flag).unwrap(), "ran\n");
}
