//! SteamCMD process supervision
//!
//! Runs one [`ToolInvocation`] at a time, streams the child's stdout and
//! stderr to a [`ProgressSink`] line by line as they arrive, and condenses
//! the run into an [`InvocationOutcome`].
//!
//! The supervisor moves through `NotStarted → Running → {Succeeded, Failed}`.
//! A missing executable fails before `Running` is ever reached. Once running,
//! the fault banner ends the run immediately: the child is killed rather than
//! awaited. Otherwise the run ends when the child exits, after every line it
//! wrote has been forwarded.
//!
//! The read loop itself ([`drive`]) only sees a stream of [`OutputEvent`]s,
//! which keeps it independent of real processes.

pub mod classify;

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::app::models::{ExitStatus, InvocationOutcome, ToolInvocation};
use crate::app::progress::{ProgressSink, Severity};
use crate::errors::{ToolError, ToolResult};

pub use classify::{classify_line, parse_item_report, ItemReport, LineClass};

/// Lifecycle of one supervised run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

impl From<ExitStatus> for SupervisorState {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => SupervisorState::Succeeded,
            ExitStatus::Failure => SupervisorState::Failed,
            ExitStatus::StillRunning => SupervisorState::Running,
        }
    }
}

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One observation of the running child
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Line { stream: OutputStream, text: String },
    Exited { success: bool, code: Option<i32> },
}

impl OutputEvent {
    pub fn stdout(text: impl Into<String>) -> Self {
        OutputEvent::Line {
            stream: OutputStream::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        OutputEvent::Line {
            stream: OutputStream::Stderr,
            text: text.into(),
        }
    }

    pub fn exited(code: i32) -> Self {
        OutputEvent::Exited {
            success: code == 0,
            code: Some(code),
        }
    }
}

/// How the read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEnd {
    /// Fault banner seen; the child may still be alive
    Fault,
    /// Exit status observed
    Exited,
    /// Events ran out without an exit status
    Closed,
}

/// Consume output events until the run reaches a terminal state
///
/// Stops pulling from `events` as soon as the fault banner is seen, so any
/// later events stay unconsumed.
pub async fn drive<S>(events: &mut S, sink: &dyn ProgressSink) -> (InvocationOutcome, LoopEnd)
where
    S: Stream<Item = OutputEvent> + Unpin,
{
    let mut outcome = InvocationOutcome::running();

    while let Some(event) = events.next().await {
        match event {
            OutputEvent::Line { stream, text } => match classify_line(&text) {
                LineClass::Idle => continue,
                LineClass::Fault { before_banner } => {
                    let report = before_banner.trim_end();
                    let error_line = if report.is_empty() {
                        text.trim_end().to_string()
                    } else {
                        report.to_string()
                    };
                    if !report.is_empty() {
                        sink.append_line(report, Severity::Error);
                        outcome.push_line(report.to_string());
                    }
                    warn!("SteamCMD fault banner seen: {}", text.trim_end());
                    outcome.finish_failure(None, Some(error_line));
                    return (outcome, LoopEnd::Fault);
                }
                LineClass::Other => {
                    let severity = match stream {
                        OutputStream::Stdout => Severity::Output,
                        OutputStream::Stderr => Severity::Error,
                    };
                    sink.append_line(&text, severity);
                    outcome.push_line(text);
                }
            },
            OutputEvent::Exited { success, code } => {
                if success {
                    outcome.finish_success(code);
                } else {
                    let error_line = match code {
                        Some(code) => format!("SteamCMD exited with code {}", code),
                        None => "SteamCMD was terminated by a signal".to_string(),
                    };
                    outcome.finish_failure(code, Some(error_line));
                }
                return (outcome, LoopEnd::Exited);
            }
        }
    }

    outcome.finish_failure(
        None,
        Some("SteamCMD output ended without an exit status".to_string()),
    );
    (outcome, LoopEnd::Closed)
}

/// Forward lines from one pipe, tolerating non-UTF-8 output
async fn pump_lines<R>(reader: R, stream: OutputStream, tx: mpsc::UnboundedSender<OutputEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if tx.send(OutputEvent::Line { stream, text }).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!("Stopped reading SteamCMD {:?}: {}", stream, e);
                break;
            }
        }
    }
}

/// Runs SteamCMD invocations and reports their output to a sink
#[derive(Clone)]
pub struct ProcessSupervisor {
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor").finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self { sink }
    }

    /// Run one invocation to completion
    ///
    /// # Errors
    ///
    /// Returns `ToolError::NotInstalled` if the executable does not exist and
    /// `ToolError::Spawn` if it cannot be started. A run that starts but
    /// fails is an `Ok` outcome with `ExitStatus::Failure`.
    pub async fn run(&self, invocation: &ToolInvocation) -> ToolResult<InvocationOutcome> {
        let (state_tx, _state_rx) = watch::channel(SupervisorState::NotStarted);
        run_supervised(invocation, self.sink.as_ref(), &state_tx).await
    }

    /// Run one invocation on a background task
    pub fn spawn(&self, invocation: ToolInvocation) -> RunHandle {
        let (state_tx, state_rx) = watch::channel(SupervisorState::NotStarted);
        let sink = Arc::clone(&self.sink);
        let join =
            tokio::spawn(async move { run_supervised(&invocation, sink.as_ref(), &state_tx).await });
        RunHandle {
            join,
            state: state_rx,
        }
    }
}

/// Handle to a run started with [`ProcessSupervisor::spawn`]
#[derive(Debug)]
pub struct RunHandle {
    join: JoinHandle<ToolResult<InvocationOutcome>>,
    state: watch::Receiver<SupervisorState>,
}

impl RunHandle {
    /// Current lifecycle state
    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the run; the child is killed when its task is dropped
    pub fn abort(&self) {
        self.join.abort();
    }

    /// Wait for the run to finish
    pub async fn wait(self) -> ToolResult<InvocationOutcome> {
        self.join.await.map_err(|e| ToolError::TaskFailed {
            reason: e.to_string(),
        })?
    }
}

async fn run_supervised(
    invocation: &ToolInvocation,
    sink: &dyn ProgressSink,
    state: &watch::Sender<SupervisorState>,
) -> ToolResult<InvocationOutcome> {
    let executable = invocation.executable();
    if !executable.is_file() {
        error!("SteamCMD not found at {}", executable.display());
        return Err(ToolError::NotInstalled {
            path: executable.to_path_buf(),
        });
    }

    let batch = invocation.batch();
    info!(
        "Running SteamCMD for batch {} ({} items)",
        batch.index() + 1,
        batch.len()
    );
    debug!("Command line: {}", invocation.redacted_command_line());

    let mut command = Command::new(executable);
    command
        .args(invocation.args())
        .current_dir(executable.parent().unwrap_or_else(|| Path::new(".")))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = command.spawn().map_err(|source| ToolError::Spawn {
        path: executable.to_path_buf(),
        source,
    })?;
    state.send_replace(SupervisorState::Running);

    let stdout = child
        .stdout
        .take()
        .ok_or(ToolError::StreamCapture { stream: "stdout" })?;
    let stderr = child
        .stderr
        .take()
        .ok_or(ToolError::StreamCapture { stream: "stderr" })?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let stdout_task = tokio::spawn(pump_lines(stdout, OutputStream::Stdout, tx.clone()));
    let stderr_task = tokio::spawn(pump_lines(stderr, OutputStream::Stderr, tx.clone()));

    // Exit is reported only after both pipes are drained, so every line
    // precedes it in the channel. Dropping `cancel_tx` kills the child.
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let status = tokio::select! {
            status = child.wait() => status,
            _ = cancel_rx => {
                if let Err(e) = child.kill().await {
                    debug!("Failed to kill SteamCMD: {}", e);
                }
                return;
            }
        };

        let _ = stdout_task.await;
        let _ = stderr_task.await;

        let event = match status {
            Ok(status) => OutputEvent::Exited {
                success: status.success(),
                code: status.code(),
            },
            Err(e) => {
                warn!("Failed to wait on SteamCMD: {}", e);
                OutputEvent::Exited {
                    success: false,
                    code: None,
                }
            }
        };
        let _ = tx.send(event);
    });

    let mut events = futures::stream::poll_fn(move |cx| rx.poll_recv(cx));
    let (outcome, end) = drive(&mut events, sink).await;

    if end == LoopEnd::Fault {
        let _ = cancel_tx.send(());
    }

    state.send_replace(SupervisorState::from(outcome.exit_status));
    match outcome.exit_status {
        ExitStatus::Success => info!("SteamCMD batch {} finished", batch.index() + 1),
        _ => warn!(
            "SteamCMD batch {} failed: {}",
            batch.index() + 1,
            outcome.error_line.as_deref().unwrap_or("unknown error")
        ),
    }

    Ok(outcome)
}
