//! Bounded-time execution of external tools.
//!
//! The checker and the reformatter are both black boxes reached through a
//! child process. Every invocation carries a deadline; a child that outlives
//! it is killed and reported as [`ProcessError::Timeout`], which callers treat
//! the same as an unavailable tool. The deadline also covers draining the
//! output pipes, which a backgrounded grandchild may keep open.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{program}` did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error talking to `{program}`: {source}")]
    Io {
        program: String,
        source: std::io::Error,
    },
}

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// A single external invocation: program, arguments, optional stdin and deadline.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    program: &'a str,
    args: Vec<&'a str>,
    stdin: Option<&'a str>,
    current_dir: Option<&'a Path>,
    timeout: Duration,
}

impl<'a> Invocation<'a> {
    pub fn new(program: &'a str, timeout: Duration) -> Self {
        Self {
            program,
            args: Vec::new(),
            stdin: None,
            current_dir: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: &'a str) -> Self {
        self.args.push(arg);
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = &'a str>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn stdin(mut self, input: &'a str) -> Self {
        self.stdin = Some(input);
        self
    }

    pub fn current_dir(mut self, dir: &'a Path) -> Self {
        self.current_dir = Some(dir);
        self
    }

    /// Run to completion or until the deadline, whichever comes first.
    pub fn run(&self) -> Result<ProcessOutput, ProcessError> {
        let mut cmd = Command::new(self.program);
        cmd.args(&self.args)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: self.program.to_string(),
            source,
        })?;

        // Feed stdin and drain both pipes on their own threads so a chatty
        // child can never block on a full pipe while we poll.
        if let (Some(mut pipe), Some(input)) = (child.stdin.take(), self.stdin) {
            let input = input.to_string();
            thread::spawn(move || {
                // A child that exits early closes the pipe; that is not our error.
                let _ = pipe.write_all(input.as_bytes());
            });
        }
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProcessError::Timeout {
                        program: self.program.to_string(),
                        timeout: self.timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    let _ = child.kill();
                    return Err(ProcessError::Io {
                        program: self.program.to_string(),
                        source,
                    });
                }
            }
        };

        Ok(ProcessOutput {
            status,
            stdout: self.collect(stdout, deadline)?,
            stderr: self.collect(stderr, deadline)?,
        })
    }

    /// Wait for a reader to hit end-of-file, but no later than `deadline`.
    fn collect(
        &self,
        reader: Option<Receiver<Vec<u8>>>,
        deadline: Instant,
    ) -> Result<String, ProcessError> {
        let Some(reader) = reader else {
            return Ok(String::new());
        };
        match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
            Err(RecvTimeoutError::Timeout) => Err(ProcessError::Timeout {
                program: self.program.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}
