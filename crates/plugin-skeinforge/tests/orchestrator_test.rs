//! Process-level tests for the orchestrator and generator, driving real
//! `/bin/sh` children.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use plugin_skeinforge::{
    GenerationConfig, InvocationSpec, LogSink, ProcessOrchestrator, ProcessOutcome, Severity,
    SkeinforgeGenerator, UpdateCallback,
};
use tokio_util::sync::CancellationToken;
use toolpath_core::config::toolchain::ToolchainConfig;

#[derive(Default)]
struct RecordingSink {
    lines: Mutex<Vec<(String, Severity)>>,
}

impl RecordingSink {
    fn lines_at(&self, severity: Severity) -> Vec<String> {
        self.lines
            .lock()
            .expect("lock")
            .iter()
            .filter(|(_, s)| *s == severity)
            .map(|(l, _)| l.clone())
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.lines.lock().expect("lock").is_empty()
    }
}

impl LogSink for RecordingSink {
    fn log_message(&self, line: &str, severity: Severity) {
        self.lines
            .lock()
            .expect("lock")
            .push((line.to_string(), severity));
    }
}

fn shell(script: &str) -> InvocationSpec {
    InvocationSpec {
        executable: "sh".to_string(),
        arguments: vec!["-c".to_string(), script.to_string()],
        working_directory: std::env::temp_dir(),
    }
}

fn update_recorder() -> (UpdateCallback, Arc<Mutex<Vec<String>>>) {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);
    let callback: UpdateCallback = Arc::new(move |line: &str| {
        sink.lock().expect("lock").push(line.to_string());
    });
    (callback, updates)
}

#[tokio::test]
async fn test_success_routes_streams() {
    let orchestrator = ProcessOrchestrator::new(100, Duration::from_secs(1));
    let sink = Arc::new(RecordingSink::default());
    let (on_update, updates) = update_recorder();

    let run = orchestrator
        .run(
            &shell("echo 'Carve layer 1'; echo 'warning: thin wall' >&2; echo 'Fill layer 1'"),
            sink.clone(),
            Some(on_update),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(run.outcome, ProcessOutcome::Success);
    assert!(run.pid.is_some());
    assert_eq!(
        sink.lines_at(Severity::Verbose),
        vec!["Carve layer 1", "Fill layer 1"]
    );
    assert_eq!(sink.lines_at(Severity::Error), vec!["warning: thin wall"]);
    assert_eq!(
        *updates.lock().expect("lock"),
        vec!["Carve layer 1", "Fill layer 1"]
    );
    assert_eq!(run.output.stderr, vec!["warning: thin wall"]);
    assert!(!run.output.truncated);
}

#[tokio::test]
async fn test_exit_code_two_is_non_zero_exit() {
    let orchestrator = ProcessOrchestrator::default();
    let sink = Arc::new(RecordingSink::default());

    let run = orchestrator
        .run(
            &shell("echo 'Traceback: bad profile' >&2; exit 2"),
            sink.clone(),
            None,
            CancellationToken::new(),
        )
        .await;

    assert_eq!(run.outcome, ProcessOutcome::NonZeroExit { code: 2 });
    assert_eq!(run.output.stderr, vec!["Traceback: bad profile"]);
}

#[tokio::test]
async fn test_trailing_partial_line_is_flushed() {
    let orchestrator = ProcessOrchestrator::default();
    let sink = Arc::new(RecordingSink::default());

    let run = orchestrator
        .run(
            &shell("printf 'first\\nno newline'"),
            sink.clone(),
            None,
            CancellationToken::new(),
        )
        .await;

    assert_eq!(run.outcome, ProcessOutcome::Success);
    assert_eq!(sink.lines_at(Severity::Verbose), vec!["first", "no newline"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_heavy_output_on_both_streams_does_not_deadlock() {
    let orchestrator = ProcessOrchestrator::new(20_000, Duration::from_secs(1));
    let sink = Arc::new(RecordingSink::default());
    let script = "i=0; while [ $i -lt 10000 ]; do echo \"out $i\"; echo \"err $i\" >&2; i=$((i+1)); done";

    let run = tokio::time::timeout(
        Duration::from_secs(120),
        orchestrator.run(&shell(script), sink.clone(), None, CancellationToken::new()),
    )
    .await
    .expect("run must not deadlock");

    assert_eq!(run.outcome, ProcessOutcome::Success);

    let stdout = sink.lines_at(Severity::Verbose);
    let stderr = sink.lines_at(Severity::Error);
    assert_eq!(stdout.len(), 10_000);
    assert_eq!(stderr.len(), 10_000);
    assert_eq!(stdout[0], "out 0");
    assert_eq!(stdout[9_999], "out 9999");
    assert!(
        stdout
            .iter()
            .enumerate()
            .all(|(i, line)| *line == format!("out {i}"))
    );
    assert!(
        stderr
            .iter()
            .enumerate()
            .all(|(i, line)| *line == format!("err {i}"))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancellation_kills_child() {
    let orchestrator = ProcessOrchestrator::new(100, Duration::from_secs(1));
    let sink = Arc::new(RecordingSink::default());
    let cancel = CancellationToken::new();

    let task = {
        let cancel = cancel.clone();
        let sink = sink.clone();
        tokio::spawn(async move {
            orchestrator
                .run(&shell("echo started; exec sleep 30"), sink, None, cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(300)).await;
    cancel.cancel();

    let run = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("cancelled run returns promptly")
        .expect("task join");

    assert_eq!(run.outcome, ProcessOutcome::Cancelled);
    let pid = run.pid.expect("child was started");

    #[cfg(target_os = "linux")]
    assert!(
        !Path::new(&format!("/proc/{pid}")).exists(),
        "child {pid} still in the process table"
    );
    let _ = pid;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_interrupt_racing_cancellation_reports_cancelled() {
    for _ in 0..20 {
        let orchestrator = ProcessOrchestrator::new(100, Duration::from_secs(1));
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        // Same sequence as Ctrl-C in a terminal: the child gets SIGINT and the
        // token is cancelled right after.
        let on_update: UpdateCallback = Arc::new(move |line: &str| {
            if let Some(pid) = line.strip_prefix("pid ") {
                let _ = std::process::Command::new("sh")
                    .args(["-c", &format!("kill -INT {}", pid.trim())])
                    .status();
                token.cancel();
            }
        });

        let run = tokio::time::timeout(
            Duration::from_secs(10),
            orchestrator.run(
                &shell("echo \"pid $$\"; exec sleep 30"),
                Arc::new(RecordingSink::default()),
                Some(on_update),
                cancel,
            ),
        )
        .await
        .expect("interrupted run returns");

        assert_eq!(run.outcome, ProcessOutcome::Cancelled);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancellation_kills_background_children() {
    let grace = Duration::from_millis(500);
    let orchestrator = ProcessOrchestrator::new(100, grace);
    let sink = Arc::new(RecordingSink::default());
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let on_update: UpdateCallback = Arc::new(move |line: &str| {
        if line.starts_with("grandchild ") {
            token.cancel();
        }
    });

    let started = Instant::now();
    let run = tokio::time::timeout(
        Duration::from_secs(10),
        orchestrator.run(
            &shell("sleep 30 & echo \"grandchild $!\"; exec sleep 30"),
            sink.clone(),
            Some(on_update),
            cancel,
        ),
    )
    .await
    .expect("cancelled run returns");

    assert_eq!(run.outcome, ProcessOutcome::Cancelled);
    assert!(
        started.elapsed() < grace + Duration::from_secs(2),
        "took {:?}",
        started.elapsed()
    );

    let grandchild = announced_pid(&sink, "grandchild ");
    #[cfg(target_os = "linux")]
    assert!(
        eventually_gone(grandchild).await,
        "grandchild {grandchild} outlived the run"
    );
    let _ = grandchild;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_while_flushing_after_exit_returns() {
    let grace = Duration::from_millis(500);
    let orchestrator = ProcessOrchestrator::new(100, grace);
    let sink = Arc::new(RecordingSink::default());
    let cancel = CancellationToken::new();

    // The shell exits at once but its background child keeps both pipes open.
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        })
    };

    let started = Instant::now();
    let run = tokio::time::timeout(
        Duration::from_secs(10),
        orchestrator.run(
            &shell("sleep 30 & echo \"grandchild $!\"; echo done"),
            sink.clone(),
            None,
            cancel,
        ),
    )
    .await
    .expect("flush is abandoned on cancellation");
    canceller.await.expect("canceller");

    assert_eq!(run.outcome, ProcessOutcome::Success);
    assert!(
        started.elapsed() < Duration::from_millis(500) + grace + Duration::from_secs(2),
        "took {:?}",
        started.elapsed()
    );
    assert!(sink.lines_at(Severity::Verbose).contains(&"done".to_string()));

    let grandchild = announced_pid(&sink, "grandchild ");
    #[cfg(target_os = "linux")]
    assert!(
        eventually_gone(grandchild).await,
        "grandchild {grandchild} outlived the run"
    );
    let _ = grandchild;
}

/// Pid printed by the child as `<prefix><pid>`.
fn announced_pid(sink: &RecordingSink, prefix: &str) -> u32 {
    sink.lines_at(Severity::Verbose)
        .iter()
        .find_map(|line| line.strip_prefix(prefix))
        .and_then(|pid| pid.trim().parse().ok())
        .expect("child announced its pid")
}

/// Zombies count as gone: nothing in the test reaps reparented orphans.
#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .map(|(_, rest)| !matches!(rest.trim_start().chars().next(), Some('Z' | 'X')))
            .unwrap_or(false),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
async fn eventually_gone(pid: u32) -> bool {
    for _ in 0..30 {
        if !process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
async fn test_nonexistent_executable_never_logs() {
    let orchestrator = ProcessOrchestrator::default();
    let sink = Arc::new(RecordingSink::default());
    let (on_update, updates) = update_recorder();

    let spec = InvocationSpec {
        executable: "/definitely/not/a/python".to_string(),
        arguments: vec!["-u".to_string(), "skeinforge.py".to_string()],
        working_directory: std::env::temp_dir(),
    };
    let run = orchestrator
        .run(&spec, sink.clone(), Some(on_update), CancellationToken::new())
        .await;

    assert!(matches!(run.outcome, ProcessOutcome::LaunchFailure { .. }));
    assert!(run.pid.is_none());
    assert!(sink.is_empty());
    assert!(updates.lock().expect("lock").is_empty());
}

// ---------------------------------------------------------------------------
// End-to-end with a fake toolchain
// ---------------------------------------------------------------------------

/// Lay out a toolchain root whose entry script is a shell script, run with
/// `sh -u <script> -p <profile> <raft-flag> <model>`.
fn fake_toolchain(root: &Path, script: &str) -> ToolchainConfig {
    std::fs::create_dir_all(root.join("prefs/SF35-test")).expect("mkdir profile");
    std::fs::write(root.join("skeinforge.py"), script).expect("write script");
    ToolchainConfig {
        path: Some(root.to_path_buf()),
        interpreter: "sh".to_string(),
        ..Default::default()
    }
}

const WORKING_SCRIPT: &str = r#"
echo "profile=$2"
echo "raft=$3"
model="$4"
out="${model%.*}.gcode"
echo "G21" > "$out"
echo "Wrote $out"
"#;

#[tokio::test]
async fn test_generate_success_yields_artifact() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = fake_toolchain(&temp.path().join("skeinforge"), WORKING_SCRIPT);
    let generator = SkeinforgeGenerator::new(&config).expect("generator");

    let profile = generator.find_profile("SF35-test").expect("profile");
    let gen_config = GenerationConfig::new(profile.full_path(), true).expect("config");
    let model = temp.path().join("part.stl");
    std::fs::write(&model, "solid part\nendsolid part\n").expect("model");

    let sink = Arc::new(RecordingSink::default());
    let (on_update, updates) = update_recorder();
    let report = generator
        .generate(&gen_config, &model, sink.clone(), Some(on_update), CancellationToken::new())
        .await
        .expect("report");

    assert_eq!(report.outcome, ProcessOutcome::Success);
    let artifact = report.artifact.clone().expect("artifact on success");
    assert_eq!(artifact.output_path, temp.path().join("part.gcode"));
    assert_eq!(artifact.base_name, temp.path().join("part"));
    assert!(artifact.output_path.exists());

    assert_eq!(report.invocation.executable, "sh");
    assert_eq!(report.invocation.arguments[0], "-u");
    assert_eq!(report.invocation.arguments[4], "--raft");
    assert!(updates.lock().expect("lock").contains(&"raft=--raft".to_string()));
    assert!(
        report
            .output
            .stdout
            .iter()
            .any(|l| l.ends_with("SF35-test"))
    );

    let result = report.into_result().expect("success");
    assert_eq!(result.map(|a| a.output_path), Some(temp.path().join("part.gcode")));
}

#[tokio::test]
async fn test_generate_failure_has_no_artifact() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = fake_toolchain(
        &temp.path().join("skeinforge"),
        "echo 'Traceback: profile unreadable' >&2\nexit 2\n",
    );
    let generator = SkeinforgeGenerator::new(&config).expect("generator");
    let gen_config = GenerationConfig::new(
        temp.path().join("skeinforge/prefs/SF35-test"),
        false,
    )
    .expect("config");

    let report = generator
        .generate(
            &gen_config,
            &temp.path().join("part.stl"),
            Arc::new(RecordingSink::default()),
            None,
            CancellationToken::new(),
        )
        .await
        .expect("report");

    assert_eq!(report.outcome, ProcessOutcome::NonZeroExit { code: 2 });
    assert!(report.artifact.is_none());
    assert_eq!(report.output.stderr, vec!["Traceback: profile unreadable"]);
    assert!(report.into_result().is_err());
}

#[tokio::test]
async fn test_generate_relative_model_is_anchored() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = fake_toolchain(&temp.path().join("skeinforge"), "exit 0\n");
    let generator = SkeinforgeGenerator::new(&config).expect("generator");
    let gen_config = GenerationConfig::new(
        temp.path().join("skeinforge/prefs/SF35-test"),
        false,
    )
    .expect("config");

    let report = generator
        .generate(
            &gen_config,
            Path::new("models/widget.stl"),
            Arc::new(RecordingSink::default()),
            None,
            CancellationToken::new(),
        )
        .await
        .expect("report");

    let expected: PathBuf = std::env::current_dir()
        .expect("cwd")
        .join("models/widget.gcode");
    assert_eq!(
        report.artifact.expect("artifact").output_path,
        expected
    );
    assert_eq!(
        report.invocation.arguments[5],
        std::env::current_dir()
            .expect("cwd")
            .join("models/widget.stl")
            .to_string_lossy()
    );
}
