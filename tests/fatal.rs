//SPDX-License-Identifier: MIT OR Apache-2.0
//! Violations under the default policy abort the process (or, with
//! `analysis-probe`, fault on a null read), so each scenario runs in a child
//! copy of this test binary.
#![cfg(not(target_arch = "wasm32"))]

use borrow_cells::BorrowCell;
use std::process::{Command, Output};

const SCENARIO: &str = "BORROW_CELLS_FATAL_SCENARIO";

fn run_scenario(name: &str) -> Output {
    Command::new(std::env::current_exe().expect("test binary path"))
        .args(["--exact", "scenario_child", "--nocapture"])
        .env(SCENARIO, name)
        .output()
        .expect("spawn child test binary")
}

#[cfg(not(feature = "analysis-probe"))]
fn assert_aborted(output: &Output, message: &str) {
    assert!(!output.status.success(), "child exited normally: {:?}", output.status);
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(output.status.signal(), Some(6), "expected SIGABRT");
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("borrow_cells: aliasing violation on thread"), "stderr was: {stderr}");
    assert!(stderr.contains(message), "stderr was: {stderr}");
    assert!(stderr.contains("stack backtrace:"), "stderr was: {stderr}");
}

/// Entry point for the child process; does nothing in a normal test run.
#[test]
fn scenario_child() {
    let Ok(name) = std::env::var(SCENARIO) else {
        return;
    };
    let cell = BorrowCell::new(5);
    match name.as_str() {
        "double_exclusive" => {
            let _x = cell.borrow_exclusive();
            let _y = cell.borrow_exclusive();
        }
        "sequential_exclusive" => {
            cell.borrow_exclusive().release();
            cell.borrow_exclusive().release();
            {
                let mut z = cell.borrow_exclusive();
                *z += 1;
            }
        }
        "exclusive_over_shared" => {
            let _x = cell.borrow_shared();
            let _y = cell.borrow_shared();
            let _z = cell.borrow_exclusive();
        }
        "sequential_shared" => {
            cell.borrow_shared().release();
            cell.borrow_shared().release();
            cell.borrow_exclusive().release();
        }
        "leaked_handle" => {
            std::mem::forget(cell.borrow_shared());
            drop(cell);
        }
        other => panic!("unknown scenario {other}"),
    }
}

#[cfg(not(feature = "analysis-probe"))]
#[test]
fn double_exclusive_aborts() {
    let output = run_scenario("double_exclusive");
    assert_aborted(&output, "an exclusive borrow is outstanding");
}

#[cfg(not(feature = "analysis-probe"))]
#[test]
fn exclusive_over_shared_aborts() {
    let output = run_scenario("exclusive_over_shared");
    assert_aborted(&output, "2 shared borrows are outstanding");
}

#[cfg(not(feature = "analysis-probe"))]
#[test]
fn destroying_with_leaked_handle_aborts() {
    let output = run_scenario("leaked_handle");
    assert_aborted(&output, "cell destroyed while the counter was 1");
}

#[test]
fn sequential_borrows_exit_cleanly() {
    for name in ["sequential_exclusive", "sequential_shared"] {
        let output = run_scenario(name);
        assert!(output.status.success(), "{name}: {:?}", output.status);
        assert!(!String::from_utf8_lossy(&output.stderr).contains("aliasing violation"));
    }
}

// The feature must swap the default policy, not add a second one beside it.
#[cfg(feature = "analysis-probe")]
const _: fn() = || {
    let _: borrow_cells::DefaultPolicy = borrow_cells::Probe;
};

#[cfg(all(unix, feature = "analysis-probe"))]
#[test]
fn double_exclusive_faults_on_null_read() {
    use std::os::unix::process::ExitStatusExt;

    let output = run_scenario("double_exclusive");
    assert!(!output.status.success(), "child exited normally: {:?}", output.status);
    assert_eq!(output.status.signal(), Some(11), "expected SIGSEGV");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("stack backtrace:"), "fatal reporter ran: {stderr}");
}
