//! Child process orchestration: launch, concurrent draining, cancellation
//! and outcome classification.
//!
//! Every process-level result is folded into a [`ProcessOutcome`]; nothing
//! here returns an error to the caller.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toolpath_core::config::toolchain::ToolchainConfig;
use tracing::{debug, error, info, instrument, warn};

use crate::drainer::{LineStreamDrainer, SharedTail, TailBuffer};
use crate::models::{CapturedOutput, InvocationSpec, ProcessOutcome, ProcessRun};
use crate::sink::{LogSink, UpdateCallback};

/// Runs one external invocation at a time per call; calls are independent.
#[derive(Debug, Clone)]
pub struct ProcessOrchestrator {
    /// Trailing lines kept per stream.
    capture_lines: usize,
    /// Time drainers get to see their streams close after a kill.
    drain_grace: Duration,
}

impl Default for ProcessOrchestrator {
    fn default() -> Self {
        Self::from_config(&ToolchainConfig::default())
    }
}

impl ProcessOrchestrator {
    /// Create an orchestrator.
    pub fn new(capture_lines: usize, drain_grace: Duration) -> Self {
        Self {
            capture_lines,
            drain_grace,
        }
    }

    /// Create an orchestrator from toolchain settings.
    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self::new(
            config.capture_lines,
            Duration::from_millis(config.drain_grace_ms),
        )
    }

    /// Launch `spec`, drain both output streams concurrently and wait for
    /// the child to exit or for `cancel` to fire.
    ///
    /// On cancellation the child is killed and reaped before returning
    /// [`ProcessOutcome::Cancelled`]. Standard output lines go to `sink` at
    /// verbose severity and to `on_update`; standard error lines go to `sink`
    /// at error severity. All drained lines are delivered before this
    /// returns.
    #[instrument(skip_all, fields(executable = %spec.executable))]
    pub async fn run(
        &self,
        spec: &InvocationSpec,
        sink: Arc<dyn LogSink>,
        on_update: Option<UpdateCallback>,
        cancel: CancellationToken,
    ) -> ProcessRun {
        let start = Instant::now();
        let stdout_tail = TailBuffer::shared(self.capture_lines);
        let stderr_tail = TailBuffer::shared(self.capture_lines);

        if cancel.is_cancelled() {
            info!("Generation cancelled before launch");
            return self.finish(ProcessOutcome::Cancelled, None, &stdout_tail, &stderr_tail, start);
        }

        let mut cmd = Command::new(&spec.executable);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        // Own process group, so a kill reaches anything the toolchain started
        // and a terminal interrupt goes through the cancellation token only.
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        cmd.args(&spec.arguments)
            .current_dir(&spec.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            command = %spec,
            cwd = %spec.working_directory.display(),
            "Spawning Skeinforge process"
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(command = %spec, error = %e, "Could not run Skeinforge");
                let outcome = ProcessOutcome::LaunchFailure {
                    cause: e.to_string(),
                };
                return self.finish(outcome, None, &stdout_tail, &stderr_tail, start);
            }
        };
        let pid = child.id();

        let mut drainers: Vec<JoinHandle<usize>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            let drainer =
                LineStreamDrainer::primary(Arc::clone(&sink), on_update, Arc::clone(&stdout_tail));
            drainers.push(tokio::spawn(drainer.drain(stdout)));
        }
        if let Some(stderr) = child.stderr.take() {
            let drainer = LineStreamDrainer::secondary(Arc::clone(&sink), Arc::clone(&stderr_tail));
            drainers.push(tokio::spawn(drainer.drain(stderr)));
        }

        // Race: process exit vs cancellation. Cancellation is checked first
        // so a child dying from the same interrupt is still reported as such.
        let (outcome, killed) = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!(pid = ?pid, "Generation cancelled, killing Skeinforge process");
                kill_tree(&mut child, pid).await;
                (ProcessOutcome::Cancelled, true)
            }
            status = child.wait() => match status {
                Ok(status) if status.success() => {
                    info!(
                        pid = ?pid,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Skeinforge completed"
                    );
                    (ProcessOutcome::Success, false)
                }
                Ok(status) => {
                    let code = status.code().unwrap_or(-1);
                    error!(
                        pid = ?pid,
                        code = code,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Unrecognized error code returned by Skeinforge"
                    );
                    (ProcessOutcome::NonZeroExit { code }, false)
                }
                Err(e) => {
                    error!(pid = ?pid, error = %e, "Lost track of Skeinforge process, killing");
                    kill_tree(&mut child, pid).await;
                    (ProcessOutcome::NonZeroExit { code: -1 }, true)
                }
            },
        };

        self.settle(drainers, &cancel, killed, pid).await;

        // The child may have died from the interrupt that also cancelled the
        // run; by now the cancellation has been observed.
        let outcome = match outcome {
            ProcessOutcome::NonZeroExit { code } if cancel.is_cancelled() => {
                info!(pid = ?pid, code, "Skeinforge exited after cancellation");
                ProcessOutcome::Cancelled
            }
            other => other,
        };

        self.finish(outcome, pid, &stdout_tail, &stderr_tail, start)
    }

    /// Wait for the drainers to deliver everything.
    ///
    /// After a kill, or if cancellation arrives while flushing, drainers get
    /// `drain_grace` to finish and are aborted afterwards; a grandchild that
    /// inherited the pipes must not keep the run alive. Cancellation while
    /// flushing also kills what is left of the child's process group.
    async fn settle(
        &self,
        drainers: Vec<JoinHandle<usize>>,
        cancel: &CancellationToken,
        killed: bool,
        pid: Option<u32>,
    ) {
        let aborts: Vec<_> = drainers.iter().map(|h| h.abort_handle()).collect();

        let joined = async move {
            for handle in drainers {
                if let Err(e) = handle.await {
                    if !e.is_cancelled() {
                        warn!(error = %e, "Output drainer task failed");
                    }
                }
            }
        };
        tokio::pin!(joined);

        if !killed {
            tokio::select! {
                _ = &mut joined => return,
                _ = cancel.cancelled() => {
                    debug!("Cancelled while flushing toolchain output");
                    #[cfg(unix)]
                    {
                        if let Some(pid) = pid {
                            kill_group(pid);
                        }
                    }
                    #[cfg(not(unix))]
                    {
                        let _ = pid;
                    }
                }
            }
        }

        if tokio::time::timeout(self.drain_grace, &mut joined)
            .await
            .is_err()
        {
            warn!(
                grace_ms = self.drain_grace.as_millis() as u64,
                "Toolchain output still open after grace period, abandoning drainers"
            );
            for abort in &aborts {
                abort.abort();
            }
        }
    }

    fn finish(
        &self,
        outcome: ProcessOutcome,
        pid: Option<u32>,
        stdout_tail: &SharedTail,
        stderr_tail: &SharedTail,
        start: Instant,
    ) -> ProcessRun {
        let (stdout, stdout_truncated) = snapshot(stdout_tail);
        let (stderr, stderr_truncated) = snapshot(stderr_tail);

        ProcessRun {
            outcome,
            output: CapturedOutput {
                stdout,
                stderr,
                truncated: stdout_truncated || stderr_truncated,
            },
            pid,
            elapsed: start.elapsed(),
        }
    }
}

/// Kill the child and, on unix, the rest of its process group, then reap it.
async fn kill_tree(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pid) = pid {
            kill_group(pid);
        }
    }
    if let Err(e) = child.kill().await {
        warn!(pid = ?pid, error = %e, "Failed to kill Skeinforge process");
    }
}

/// SIGKILL every process in the group led by `pgid`.
#[cfg(unix)]
fn kill_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // A zero or negative id would address our own group.
    if pgid <= 0 {
        return;
    }
    // SAFETY: kill(2) takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            pgid,
            error = %std::io::Error::last_os_error(),
            "Process group already gone"
        );
    }
}

fn snapshot(tail: &SharedTail) -> (Vec<String>, bool) {
    let guard = tail.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    (guard.to_vec(), guard.is_truncated())
}
