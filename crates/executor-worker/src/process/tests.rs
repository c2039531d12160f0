//! Tests for the interpreter-backed worker.
//!
//! Tests that need a real interpreter return early when `python3` is not on
//! the `PATH`.

use std::fs;
use std::process::Command;
use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

use super::*;

const SERVER_MODULE: &str = concat!(
    "def add(a, b):\n",
    "    print('adding', a, b)\n",
    "    return a + b\n",
    "\n",
    "def boom():\n",
    "    print('about to fail')\n",
    "    raise ValueError('bad input')\n",
    "\n",
    "def sleepy():\n",
    "    import time\n",
    "    time.sleep(10)\n",
);

const ECHO_SCRIPT: &str = concat!(
    "import json, sys\n",
    "for line in sys.stdin:\n",
    "    sys.stdout.write(json.dumps({'status': 'ok', 'data': 'custom'}) + '\\n')\n",
    "    sys.stdout.flush()\n",
);

fn python_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

#[fixture]
fn course() -> TempDir {
    let root = TempDir::new().expect("course dir");
    fs::create_dir(root.path().join("q1")).expect("question dir");
    fs::write(root.path().join("q1").join("server.py"), SERVER_MODULE).expect("server module");
    root
}

fn prepared_worker(course: &TempDir, settings: WorkerSettings) -> ProcessWorker {
    let mut worker = ProcessWorker::new(settings);
    worker.ensure_child().expect("spawn worker");
    worker
        .prepare_for_course(course.path())
        .expect("prepare course");
    worker
}

fn call(fcn: &str, args: Vec<serde_json::Value>) -> CallRequest {
    CallRequest::new("question", "q1", "server", fcn, args)
}

#[test]
fn missing_program_fails_to_spawn() {
    let mut worker = ProcessWorker::new(WorkerSettings::new("/nonexistent/executor-worker"));
    let err = worker.ensure_child().expect_err("spawn should fail");
    assert!(matches!(err, WorkerError::SpawnFailed { .. }));
    assert!(!worker.is_running());
}

#[test]
fn call_without_child_reports_spawn_failure() {
    let mut worker = ProcessWorker::new(WorkerSettings::new("/nonexistent/executor-worker"));
    let err = worker
        .call(&call("add", vec![json!(1), json!(2)]))
        .expect_err("call should fail");
    assert!(matches!(err, WorkerError::SpawnFailed { .. }));
}

#[rstest]
fn call_returns_data_and_output(course: TempDir) {
    if !python_available() {
        return;
    }
    let mut worker = prepared_worker(&course, WorkerSettings::new("python3"));
    let output = worker
        .call(&call("add", vec![json!(2), json!(3)]))
        .expect("call succeeds");
    assert_eq!(output.data(), &json!(5));
    assert_eq!(output.output(), Some("adding 2 3\n"));
}

#[rstest]
fn missing_function_is_classified(course: TempDir) {
    if !python_available() {
        return;
    }
    let mut worker = prepared_worker(&course, WorkerSettings::new("python3"));
    let err = worker
        .call(&call("grade", vec![]))
        .expect_err("grade is not defined");
    assert!(err.is_function_missing());
    assert!(worker.is_running());
}

#[rstest]
fn raised_exception_becomes_call_failure(course: TempDir) {
    if !python_available() {
        return;
    }
    let mut worker = prepared_worker(&course, WorkerSettings::new("python3"));
    let err = worker.call(&call("boom", vec![])).expect_err("boom raises");
    assert!(matches!(err, WorkerError::CallFailed { .. }));
    assert!(err.to_string().contains("ValueError: bad input"));
    assert_eq!(err.captured_output(), Some("about to fail\n"));
    assert!(worker.is_running(), "a failing call keeps the child alive");
}

#[rstest]
fn timeout_discards_child_and_next_call_respawns(course: TempDir) {
    if !python_available() {
        return;
    }
    let settings =
        WorkerSettings::new("python3").with_call_timeout(Some(Duration::from_secs(1)));
    let mut worker = prepared_worker(&course, settings);

    let err = worker.call(&call("sleepy", vec![])).expect_err("times out");
    assert!(matches!(err, WorkerError::Timeout { timeout_secs: 1 }));
    assert!(!worker.is_running());

    worker
        .prepare_for_course(course.path())
        .expect("prepare fresh child");
    let output = worker
        .call(&call("add", vec![json!(1), json!(1)]))
        .expect("fresh child answers");
    assert_eq!(output.data(), &json!(2));
}

#[rstest]
fn restart_resets_live_child(course: TempDir) {
    if !python_available() {
        return;
    }
    let mut worker = prepared_worker(&course, WorkerSettings::new("python3"));
    assert!(worker.restart().expect("restart"));
    assert!(worker.is_running());
}

#[rstest]
fn restart_respawns_finished_child(course: TempDir) {
    if !python_available() {
        return;
    }
    let mut worker = prepared_worker(&course, WorkerSettings::new("python3"));
    worker.done();
    assert!(!worker.is_running());
    assert!(worker.restart().expect("restart"));
    assert!(worker.is_running());
}

#[test]
fn restart_fails_when_program_is_missing() {
    let mut worker = ProcessWorker::new(WorkerSettings::new("/nonexistent/executor-worker"));
    assert!(worker.restart().is_err());
}

#[test]
fn custom_script_replaces_bootstrap() {
    if !python_available() {
        return;
    }
    let dir = TempDir::new().expect("script dir");
    let script = dir.path().join("echo.py");
    fs::write(&script, ECHO_SCRIPT).expect("write script");

    let settings = WorkerSettings::new("python3").with_script(Some(script));
    let mut worker = ProcessWorker::new(settings);
    let output = worker
        .call(&CallRequest::new("", "", "", "anything", vec![]))
        .expect("echo answers");
    assert_eq!(output.data(), &json!("custom"));
}
