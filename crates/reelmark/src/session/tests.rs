use std::fs;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::tempdir;

use super::*;
use crate::config::OutputIsolation;
use crate::event_log::read_events;
use crate::models::CorrelationState;
use crate::test_support::ScriptedRecorder;

fn session_in(
    base: &Path,
    tweak: impl FnOnce(&mut CaptureConfig),
) -> (CaptureSession, Arc<ScriptedRecorder>) {
    let mut config = CaptureConfig::rooted_at(base);
    config.flush_grace_ms = 0;
    tweak(&mut config);
    let recorder = Arc::new(ScriptedRecorder::new("webm"));
    let session = CaptureSession::new(config, recorder.clone()).expect("session");
    (session, recorder)
}

fn videos(base: &Path) -> PathBuf {
    base.join("test-results").join("videos")
}

fn webm_names(dir: &Path) -> Vec<String> {
    let mut names = fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".webm"))
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[test]
fn parameterized_test_artifact_gets_stable_name() {
    let temp = tempdir().expect("tempdir");
    let (session, _) = session_in(temp.path(), |_| {});

    session
        .run("test_readbook[chrome]", |_| ())
        .expect("run");

    assert_eq!(
        webm_names(&videos(temp.path())),
        vec!["test_readbook_chrome_.webm".to_string()]
    );
    let record = session
        .record("test_readbook[chrome]")
        .expect("record")
        .expect("registered");
    assert!(record.correlated);
    assert_eq!(record.state, CorrelationState::Correlated);
    assert_eq!(
        record.final_path,
        Some(videos(temp.path()).join("test_readbook_chrome_.webm"))
    );
}

#[test]
fn second_completion_changes_nothing() {
    let temp = tempdir().expect("tempdir");
    let (session, _) = session_in(temp.path(), |_| {});

    let context = session.setup("test_idem").expect("setup");
    let first = session.teardown(context);
    let placed = first.final_path().cloned().expect("placed");
    let before = webm_names(&videos(temp.path()));
    let log_path = session
        .event_log()
        .path()
        .map(Path::to_path_buf)
        .expect("log enabled");
    let log_before = fs::read(&log_path).expect("read log");

    let second = session.complete("test_idem");
    assert_eq!(second, CompletionOutcome::AlreadyCorrelated(placed.clone()));
    assert_eq!(session.complete("test_idem"), second);
    assert_eq!(webm_names(&videos(temp.path())), before);
    assert!(placed.is_file());
    assert_eq!(fs::read(&log_path).expect("read log"), log_before);
}

#[test]
fn sequential_tests_with_same_base_name_do_not_overwrite() {
    let temp = tempdir().expect("tempdir");
    let (session, _) = session_in(temp.path(), |_| {});

    session
        .run_named("suite_a::test_x", "test_x", |_| ())
        .expect("first run");
    session
        .run_named("suite_b::test_x", "test_x", |_| ())
        .expect("second run");

    let first = session
        .record("suite_a::test_x")
        .expect("record")
        .and_then(|r| r.final_path)
        .expect("first placed");
    let second = session
        .record("suite_b::test_x")
        .expect("record")
        .and_then(|r| r.final_path)
        .expect("second placed");

    assert_eq!(first, videos(temp.path()).join("test_x.webm"));
    assert_ne!(first, second);
    let second_name = second
        .file_name()
        .and_then(|n| n.to_str())
        .expect("second name");
    let stamp = second_name
        .strip_prefix("test_x_")
        .and_then(|rest| rest.strip_suffix(".webm"))
        .expect("timestamp suffix");
    assert!(stamp.parse::<i64>().is_ok(), "suffix must be unix seconds: {stamp}");
    assert_eq!(fs::read(&first).expect("first bytes"), b"suite_a::test_x");
    assert_eq!(fs::read(&second).expect("second bytes"), b"suite_b::test_x");
}

#[test]
fn missing_flush_leaves_record_uncorrelated_without_failing() {
    let temp = tempdir().expect("tempdir");
    let (session, recorder) = session_in(temp.path(), |config| config.flush_grace_ms = 20);
    recorder.skip_flush("test_slow");

    let context = session.setup("test_slow").expect("setup");
    let outcome = session.teardown(context);
    assert!(matches!(
        outcome,
        CompletionOutcome::Uncorrelated { code: "CORRELATION_MISS", .. }
    ));
    assert!(matches!(
        session.complete("test_slow"),
        CompletionOutcome::Uncorrelated { .. }
    ));

    let record = session.record("test_slow").expect("record").expect("registered");
    assert!(!record.correlated);
    assert_eq!(record.state, CorrelationState::Uncorrelated);
    let summary = session.summary().expect("summary");
    assert_eq!(summary.uncorrelated_identities, vec!["test_slow".to_string()]);
}

#[test]
fn stale_leftover_is_not_reclaimed() {
    let temp = tempdir().expect("tempdir");
    let (session, recorder) = session_in(temp.path(), |config| config.clock_skew_tolerance_ms = 0);
    fs::create_dir_all(videos(temp.path())).expect("mkdir");
    let leftover = videos(temp.path()).join("0badc0de.webm");
    fs::write(&leftover, b"previous run").expect("write leftover");
    thread::sleep(Duration::from_millis(50));
    recorder.skip_flush("test_fresh");

    session.run("test_fresh", |_| ()).expect("run");

    assert!(leftover.is_file());
    assert!(!videos(temp.path()).join("test_fresh.webm").exists());
}

#[test]
fn panicking_body_still_gets_artifact_placed() {
    let temp = tempdir().expect("tempdir");
    let (session, _) = session_in(temp.path(), |_| {});

    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        session
            .run("test_panics", |_| -> () { panic!("assertion failed in page flow") })
            .expect("setup ok")
    }));

    assert!(result.is_err());
    assert!(videos(temp.path()).join("test_panics.webm").is_file());
    assert_eq!(
        session
            .record("test_panics")
            .expect("record")
            .map(|r| r.state),
        Some(CorrelationState::Correlated)
    );
}

#[test]
fn failed_close_is_recovered_by_completion_hook() {
    let temp = tempdir().expect("tempdir");
    let (session, recorder) = session_in(temp.path(), |_| {});
    recorder.fail_close("test_close");

    let context = session.setup("test_close").expect("setup");
    assert!(matches!(
        session.teardown(context),
        CompletionOutcome::ContextCloseFailed(_)
    ));
    assert_eq!(
        session.record("test_close").expect("record").map(|r| r.state),
        Some(CorrelationState::Created)
    );

    let outcome = session.complete("test_close");
    assert_eq!(
        outcome,
        CompletionOutcome::Correlated(videos(temp.path()).join("test_close.webm"))
    );
}

#[test]
fn completion_for_unknown_identity_is_a_no_op() {
    let temp = tempdir().expect("tempdir");
    let (session, _) = session_in(temp.path(), |_| {});
    assert_eq!(session.complete("never_set_up"), CompletionOutcome::NotRegistered);
}

#[test]
fn setup_failure_is_the_only_error_surface() {
    let temp = tempdir().expect("tempdir");
    let (session, recorder) = session_in(temp.path(), |_| {});
    recorder.fail_start("test_no_browser");

    let err = session
        .run("test_no_browser", |_| ())
        .expect_err("setup must fail");
    assert!(err.is_fatal());
    assert_eq!(session.complete("test_no_browser"), CompletionOutcome::NotRegistered);
}

#[test]
fn overlapping_executions_are_isolated_per_execution() {
    let temp = tempdir().expect("tempdir");
    let (session, _) = session_in(temp.path(), |config| {
        config.isolation = OutputIsolation::PerExecution;
    });

    let first = session.setup("test_overlap[a]").expect("setup a");
    let second = session.setup("test_overlap[b]").expect("setup b");
    session.teardown(second);
    session.teardown(first);

    let dir = videos(temp.path());
    assert_eq!(
        fs::read(dir.join("test_overlap_a_.webm")).expect("a bytes"),
        b"test_overlap[a]"
    );
    assert_eq!(
        fs::read(dir.join("test_overlap_b_.webm")).expect("b bytes"),
        b"test_overlap[b]"
    );
    let leftover_dirs = fs::read_dir(dir.join(crate::factory::EXECUTION_DIRS))
        .expect("runs dir")
        .count();
    assert_eq!(leftover_dirs, 0, "private directories are removed once empty");
}

#[test]
fn very_long_identity_is_recorded_and_placed_per_execution() {
    let temp = tempdir().expect("tempdir");
    let (session, _) = session_in(temp.path(), |config| {
        config.isolation = OutputIsolation::PerExecution;
    });
    let identity = format!("tests/test_search.py::test_search[{}]", "q".repeat(240));

    session.run(&identity, |_| ()).expect("long identity must not fail setup");

    let placed = session
        .record(&identity)
        .expect("record")
        .and_then(|r| r.final_path)
        .expect("placed");
    let file_name = placed
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .expect("file name");
    assert!(file_name.len() < 255);
    assert!(file_name.starts_with("tests_test_search.py__test_search_qqq"));
    assert_eq!(fs::read(&placed).expect("artifact"), identity.as_bytes());
}

#[test]
fn very_long_display_name_is_placed_in_shared_mode() {
    let temp = tempdir().expect("tempdir");
    let (session, _) = session_in(temp.path(), |_| {});
    let name = format!("test_long[{}]", "x".repeat(400));

    session.run_named("suite::test_long", &name, |_| ()).expect("run");
    session.run_named("suite::test_long_again", &name, |_| ()).expect("run again");

    let names = webm_names(&videos(temp.path()));
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|n| n.len() < 255 && n.starts_with("test_long_xxx")));
}

#[test]
fn session_can_be_shared_across_worker_threads() {
    let temp = tempdir().expect("tempdir");
    let (session, _) = session_in(temp.path(), |config| {
        config.isolation = OutputIsolation::PerExecution;
    });
    let session = Arc::new(session);

    let handles = (0..4)
        .map(|i| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                session
                    .run(&format!("test_worker[{i}]"), |_| ())
                    .expect("run");
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().expect("worker");
    }

    for i in 0..4 {
        let path = videos(temp.path()).join(format!("test_worker_{i}_.webm"));
        assert_eq!(
            fs::read(&path).expect("worker artifact"),
            format!("test_worker[{i}]").as_bytes()
        );
    }
    assert_eq!(session.summary().expect("summary").correlated, 4);
}

#[test]
fn lifecycle_is_written_to_event_log() {
    let temp = tempdir().expect("tempdir");
    let (session, _) = session_in(temp.path(), |_| {});
    let log_path = session
        .event_log()
        .path()
        .map(Path::to_path_buf)
        .expect("log enabled");

    session.run("test_logged", |_| ()).expect("run");
    let summary = session.finish().expect("finish");
    assert_eq!(summary.correlated, 1);

    let events = read_events(&log_path).expect("read events");
    let ops = events
        .events
        .iter()
        .map(|e| (e.operation.as_str(), e.status.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        ops,
        vec![
            ("setup", "ok"),
            ("teardown", "ok"),
            ("teardown_correlate", "ok"),
            ("session_finish", "ok"),
        ]
    );
    assert_eq!(
        events.events[2].artifact_path.as_deref(),
        Some(
            videos(temp.path())
                .join("test_logged.webm")
                .display()
                .to_string()
                .as_str()
        )
    );
}
