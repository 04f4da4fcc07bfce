//! Oracle backed by an external command.
//!
//! Each request spawns the configured program, writes the request as JSON
//! (`{"prompt": ..., "schema": ...}`) to its stdin and reads the answer
//! from its stdout. Which model sits behind the command is none of the
//! contest's business.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{Oracle, OracleError, OracleRequest, OracleResponse};

/// Poll interval while waiting on a child with a deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns a command per request.
#[derive(Debug, Clone)]
pub struct ProcessOracle {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl ProcessOracle {
    pub fn new(program: impl Into<String>) -> Self {
        ProcessOracle { program: program.into(), args: Vec::new(), envs: Vec::new(), timeout: None }
    }

    /// Appends a command-line argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Kills the child and fails the call once `timeout` elapses.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn wait(&self, child: &mut Child, deadline: Option<Instant>) -> Result<ExitStatus, OracleError> {
        let (Some(timeout), Some(deadline)) = (self.timeout, deadline) else {
            return child.wait().map_err(transport);
        };
        loop {
            if let Some(status) = child.try_wait().map_err(transport)? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                warn!(program = %self.program, ?timeout, "oracle command timed out");
                let _ = child.kill();
                let _ = child.wait();
                return Err(OracleError::Transport(format!(
                    "'{}' timed out after {:?}",
                    self.program, timeout
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn transport(e: std::io::Error) -> OracleError {
    OracleError::Transport(e.to_string())
}

impl Oracle for ProcessOracle {
    fn generate(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        let payload = serde_json::to_vec(request).map_err(|e| OracleError::Transport(e.to_string()))?;
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| OracleError::Transport(format!("failed to start '{}': {}", self.program, e)))?;

        // Drain stdout concurrently so a chatty child cannot block on a full pipe.
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| OracleError::Transport("child stdout unavailable".to_string()))?;
        let reader = thread::spawn(move || {
            let mut out = String::new();
            stdout.read_to_string(&mut out).map(|_| out)
        });

        // The request is written from its own thread: a child that never
        // reads stdin must not hold the call past the deadline.
        let writer = child
            .stdin
            .take()
            .map(|mut stdin| thread::spawn(move || stdin.write_all(&payload)));

        let status = self.wait(&mut child, deadline)?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The child may answer without reading the whole request.
                Ok(Err(e)) => debug!(program = %self.program, error = %e, "request not fully written"),
                Err(_) => return Err(OracleError::Transport("stdin writer panicked".to_string())),
            }
        }
        let output = reader
            .join()
            .map_err(|_| OracleError::Transport("stdout reader panicked".to_string()))?
            .map_err(transport)?;

        if !status.success() {
            return Err(OracleError::Transport(format!("'{}' exited with {}", self.program, status)));
        }
        debug!(program = %self.program, bytes = output.len(), "oracle command answered");
        Ok(OracleResponse::Text(output))
    }
}
