//! Connector processes: single stages and the two-stage pipe between a tap
//! and a target.
//!
//! The pipe between stages is an OS pipe handed straight to the downstream
//! process; nothing flowing through it is buffered in this process. Both
//! children are spawned with kill-on-drop so abandoning a wait (deadline or
//! error) terminates them.

use std::borrow::Cow;
use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Failure to run a stage to completion (as opposed to a stage that ran and
/// exited unsuccessfully).
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn {}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for {}", program.display())]
    Wait {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("did not finish within {}s", after.as_secs())]
    TimedOut { after: Duration },
}

/// Where a stage's stderr goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sink {
    /// Passed through to the operator's terminal.
    #[default]
    Inherit,
    /// Collected and returned with the stage output.
    Capture,
}

/// One command in a pipeline: program, arguments, extra environment and
/// stderr sink. Stdin/stdout are decided by the stage's position.
#[derive(Debug, Clone)]
pub struct Stage {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    stderr: Sink,
}

impl Stage {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            stderr: Sink::Inherit,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn stderr(mut self, sink: Sink) -> Self {
        self.stderr = sink;
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn arg_list(&self) -> &[OsString] {
        &self.args
    }

    /// Shell-style rendering for operator logs. Environment is omitted since
    /// it may carry secrets.
    #[must_use]
    pub fn render(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|part| shell_quote(&part.to_string_lossy()).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .kill_on_drop(true);
        cmd.stderr(match self.stderr {
            Sink::Inherit => Stdio::inherit(),
            Sink::Capture => Stdio::piped(),
        });
        cmd
    }

    fn spawn_error(&self, source: io::Error) -> ProcessError {
        ProcessError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    fn wait_error(&self, source: io::Error) -> ProcessError {
        ProcessError::Wait {
            program: self.program.clone(),
            source,
        }
    }

    /// Run the stage alone with stdin closed, capturing stdout (and stderr
    /// when its sink is [`Sink::Capture`]).
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] if the program can't be spawned or awaited,
    /// or runs past `timeout`.
    pub async fn output(&self, timeout: Option<Duration>) -> Result<StageOutput, ProcessError> {
        let mut cmd = self.command();
        cmd.stdin(Stdio::null()).stdout(Stdio::piped());
        let child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        drop(cmd);

        with_deadline(timeout, async {
            let output = child
                .wait_with_output()
                .await
                .map_err(|e| self.wait_error(e))?;
            Ok(StageOutput::from(output))
        })
        .await
    }
}

/// Exit status and captured streams of a finished stage.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl StageOutput {
    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim_end().to_string()
    }
}

impl From<std::process::Output> for StageOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Outcome of a two-stage run: upstream exit status plus the downstream
/// stage's status and captured output.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub upstream_status: ExitStatus,
    pub downstream: StageOutput,
}

/// `upstream | downstream`, with the downstream stdout captured.
#[derive(Debug, Clone)]
pub struct Pipeline {
    upstream: Stage,
    downstream: Stage,
}

impl Pipeline {
    #[must_use]
    pub fn new(upstream: Stage, downstream: Stage) -> Self {
        Self {
            upstream,
            downstream,
        }
    }

    /// Shell rendering, optionally with the captured output's destination.
    #[must_use]
    pub fn render(&self, redirect: Option<&Path>) -> String {
        let mut line = format!("{} | {}", self.upstream.render(), self.downstream.render());
        if let Some(path) = redirect {
            line.push_str(" > ");
            line.push_str(&shell_quote(&path.to_string_lossy()));
        }
        line
    }

    /// Spawn both stages, stream upstream stdout into downstream stdin, and
    /// wait for both to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] if either stage can't be spawned or awaited,
    /// or the pair runs past `timeout`.
    pub async fn run(&self, timeout: Option<Duration>) -> Result<PipelineOutcome, ProcessError> {
        let mut producer_cmd = self.upstream.command();
        producer_cmd.stdin(Stdio::null()).stdout(Stdio::piped());
        let mut producer = producer_cmd
            .spawn()
            .map_err(|e| self.upstream.spawn_error(e))?;
        drop(producer_cmd);

        let pipe: Stdio = producer
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("upstream stdout was not captured"))
            .and_then(TryInto::try_into)
            .map_err(|e| self.upstream.spawn_error(e))?;

        let mut consumer_cmd = self.downstream.command();
        consumer_cmd.stdin(pipe).stdout(Stdio::piped());
        let consumer = consumer_cmd
            .spawn()
            .map_err(|e| self.downstream.spawn_error(e))?;
        // Release the parent's copy of the pipe so EOF and EPIPE propagate.
        drop(consumer_cmd);

        with_deadline(timeout, async {
            let (upstream_status, downstream) =
                tokio::join!(producer.wait(), consumer.wait_with_output());
            let upstream_status = upstream_status.map_err(|e| self.upstream.wait_error(e))?;
            let downstream = downstream.map_err(|e| self.downstream.wait_error(e))?;
            Ok(PipelineOutcome {
                upstream_status,
                downstream: downstream.into(),
            })
        })
        .await
    }
}

async fn with_deadline<T, F>(timeout: Option<Duration>, fut: F) -> Result<T, ProcessError>
where
    F: Future<Output = Result<T, ProcessError>>,
{
    match timeout {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| ProcessError::TimedOut { after })?,
        None => fut.await,
    }
}

fn shell_quote(arg: &str) -> Cow<'_, str> {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@+%".contains(c));
    if plain {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}

/// Human-readable exit status (`exit code 3`, `killed by signal`).
#[must_use]
pub fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
