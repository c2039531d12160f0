//! A single running worker interpreter and its stdio plumbing.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::WorkerError;
use crate::protocol::{ChildCommand, ChildReply};

use super::{BOOTSTRAP, WORKER_TARGET, WorkerSettings};

/// A spawned interpreter speaking the worker protocol.
///
/// Stdout is read on a helper thread and forwarded over a channel so reply
/// waits can be bounded. Stderr is drained on a second thread into the log.
/// Dropping the value kills and reaps the process.
#[derive(Debug)]
pub(super) struct RunningChild {
    process: Child,
    stdin: ChildStdin,
    replies: Receiver<std::io::Result<String>>,
}

impl RunningChild {
    /// Spawns the configured interpreter with piped stdio.
    pub(super) fn spawn(settings: &WorkerSettings) -> Result<Self, WorkerError> {
        let program = settings.program();
        let mut command = Command::new(program);
        command.args(settings.args());
        match settings.script() {
            Some(script) => command.arg(script),
            None => command.arg("-c").arg(BOOTSTRAP),
        };
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut process = command
            .spawn()
            .map_err(|err| WorkerError::spawn(program, err))?;
        let pid = process.id();

        let (Some(stdin), Some(stdout)) = (process.stdin.take(), process.stdout.take()) else {
            reap(&mut process);
            return Err(WorkerError::SpawnFailed {
                program: program.to_owned(),
                message: String::from("worker stdio was not captured"),
                source: None,
            });
        };
        let stderr = process.stderr.take();

        let replies = match start_forwarders(pid, stdout, stderr) {
            Ok(replies) => replies,
            Err(err) => {
                reap(&mut process);
                return Err(WorkerError::spawn(program, err));
            }
        };

        debug!(target: WORKER_TARGET, pid, program, "worker process started");
        Ok(Self {
            process,
            stdin,
            replies,
        })
    }

    /// Process identifier, for logging.
    pub(super) fn pid(&self) -> u32 {
        self.process.id()
    }

    /// Returns false once the process has exited.
    pub(super) fn is_running(&mut self) -> bool {
        matches!(self.process.try_wait(), Ok(None))
    }

    /// Writes one command and waits for its reply.
    pub(super) fn exchange(
        &mut self,
        command: &ChildCommand<'_>,
        timeout: Option<Duration>,
    ) -> Result<ChildReply, WorkerError> {
        let mut line = serde_json::to_vec(command).map_err(WorkerError::SerializeCommand)?;
        line.push(b'\n');
        self.stdin
            .write_all(&line)
            .and_then(|()| self.stdin.flush())
            .map_err(WorkerError::io)?;

        let received = match timeout {
            Some(limit) => self.replies.recv_timeout(limit).map_err(|err| match err {
                RecvTimeoutError::Timeout => WorkerError::Timeout {
                    timeout_secs: limit.as_secs(),
                },
                RecvTimeoutError::Disconnected => WorkerError::ChildExited,
            })?,
            None => self.replies.recv().map_err(|_| WorkerError::ChildExited)?,
        };
        let reply_line = received.map_err(WorkerError::io)?;

        serde_json::from_str(reply_line.trim()).map_err(|err| WorkerError::InvalidReply {
            message: format!("{} reply was not valid JSON: {err}", command.kind()),
            source: Some(err),
        })
    }
}

impl Drop for RunningChild {
    fn drop(&mut self) {
        debug!(target: WORKER_TARGET, pid = self.pid(), "stopping worker process");
        reap(&mut self.process);
    }
}

/// Kills the process and waits for it so no zombie is left behind.
fn reap(process: &mut Child) {
    drop(process.kill());
    drop(process.wait());
}

/// Starts the stdout and stderr forwarding threads.
fn start_forwarders(
    pid: u32,
    stdout: impl Read + Send + 'static,
    stderr: Option<impl Read + Send + 'static>,
) -> std::io::Result<Receiver<std::io::Result<String>>> {
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name(format!("worker-{pid}-stdout"))
        .spawn(move || forward_replies(stdout, &sender))?;

    if let Some(reader) = stderr {
        thread::Builder::new()
            .name(format!("worker-{pid}-stderr"))
            .spawn(move || drain_stderr(pid, reader))?;
    }
    Ok(receiver)
}

/// Forwards stdout lines until EOF or until the receiver is gone.
fn forward_replies(stdout: impl Read, sender: &Sender<std::io::Result<String>>) {
    for line in BufReader::new(stdout).lines() {
        let failed = line.is_err();
        if sender.send(line).is_err() || failed {
            break;
        }
    }
}

/// Drains stderr to avoid blocking the child on a full pipe buffer.
fn drain_stderr(pid: u32, stderr: impl Read) {
    for line in BufReader::new(stderr).lines() {
        match line {
            Ok(text) if !text.trim().is_empty() => {
                debug!(target: WORKER_TARGET, pid, stderr = %text.trim_end(), "worker stderr output");
            }
            Ok(_) => {}
            Err(error) => {
                warn!(target: WORKER_TARGET, pid, %error, "failed to read worker stderr");
                break;
            }
        }
    }
}
