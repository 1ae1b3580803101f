//! Out-of-process JS/TS helper pool
//!
//! A bounded set of `lattice-jshelper` processes, each serving one request
//! at a time over newline-delimited JSON. The pool spans the parse phase:
//! acquired when the front-ends start, shut down on every exit path. A
//! timed-out request costs one worker (killed and respawned) and surfaces
//! as a per-file parse failure; the pool itself survives.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{Receiver, RecvTimeoutError, channel};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};

use lattice_core::config::HelperConfig;

use crate::extractor::FrontEndError;
use crate::jsproto::{HelperHello, HelperRequest, HelperResponse};
use crate::records::FileRecord;

struct Worker {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<std::io::Result<String>>,
}

impl Worker {
    fn kill(mut self) {
        drop(self.stdin);
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

struct Inner {
    idle: VecDeque<Worker>,
    live: usize,
}

pub struct JsHelperPool {
    inner: Mutex<Inner>,
    available: Condvar,
    command: Vec<String>,
    timeout: Duration,
}

impl JsHelperPool {
    /// Launch the configured number of helper processes. Failure to start
    /// the first one means the helper is unavailable for this run.
    pub fn start(config: &HelperConfig) -> Result<Self> {
        let command = match &config.command {
            Some(command) if !command.is_empty() => command.clone(),
            _ => default_command()?,
        };
        let timeout = Duration::from_millis(config.timeout_ms);

        let first = spawn_worker(&command, timeout)?;
        let mut idle = VecDeque::new();
        idle.push_back(first);
        for _ in 1..config.pool_size {
            match spawn_worker(&command, timeout) {
                Ok(worker) => idle.push_back(worker),
                Err(err) => {
                    warn!(error = %err, "helper worker failed to start, continuing with fewer");
                    break;
                }
            }
        }
        let live = idle.len();
        debug!(workers = live, "helper pool started");

        Ok(JsHelperPool {
            inner: Mutex::new(Inner { idle, live }),
            available: Condvar::new(),
            command,
            timeout,
        })
    }

    fn acquire(&self) -> Option<Worker> {
        let mut inner = self.inner.lock().ok()?;
        loop {
            if let Some(worker) = inner.idle.pop_front() {
                return Some(worker);
            }
            if inner.live == 0 {
                return None;
            }
            inner = self.available.wait(inner).ok()?;
        }
    }

    fn release(&self, worker: Worker) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.idle.push_back(worker);
        }
        self.available.notify_one();
    }

    /// Retire a broken worker and try to backfill its slot.
    fn retire(&self, worker: Worker) {
        worker.kill();
        let replacement = spawn_worker(&self.command, self.timeout);
        if let Ok(mut inner) = self.inner.lock() {
            match replacement {
                Ok(worker) => inner.idle.push_back(worker),
                Err(err) => {
                    warn!(error = %err, "could not respawn helper worker");
                    inner.live = inner.live.saturating_sub(1);
                }
            }
        }
        self.available.notify_all();
    }

    /// One synchronous request. Expiry or a broken pipe is a per-file
    /// failure; the pool keeps serving.
    pub fn request(&self, request: &HelperRequest) -> Result<FileRecord, FrontEndError> {
        let mut worker = self
            .acquire()
            .ok_or_else(|| FrontEndError::parse("helper pool exhausted"))?;

        let frame = match serde_json::to_string(request) {
            Ok(frame) => frame,
            Err(err) => {
                self.release(worker);
                return Err(FrontEndError::parse(format!("request encoding: {err}")));
            }
        };
        if let Err(err) = writeln!(worker.stdin, "{frame}").and_then(|_| worker.stdin.flush()) {
            self.retire(worker);
            return Err(FrontEndError::parse(format!("helper write failed: {err}")));
        }

        let deadline = std::time::Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match worker.lines.recv_timeout(remaining) {
                Ok(Ok(line)) => {
                    let response: HelperResponse = match serde_json::from_str(&line) {
                        Ok(response) => response,
                        Err(err) => {
                            self.retire(worker);
                            return Err(FrontEndError::parse(format!(
                                "helper response decoding: {err}"
                            )));
                        }
                    };
                    if response.id != request.id {
                        // Stale answer from an earlier, abandoned request.
                        continue;
                    }
                    self.release(worker);
                    return match (response.ok, response.record) {
                        (true, Some(record)) => Ok(record),
                        _ => Err(FrontEndError {
                            stage: response
                                .stage
                                .unwrap_or(lattice_core::diagnostics::ParseStage::Parse),
                            message: response
                                .error
                                .unwrap_or_else(|| "helper reported failure".to_string()),
                        }),
                    };
                }
                Ok(Err(err)) => {
                    self.retire(worker);
                    return Err(FrontEndError::parse(format!("helper read failed: {err}")));
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.retire(worker);
                    return Err(FrontEndError::parse(format!(
                        "helper request timed out after {:?}",
                        self.timeout
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.retire(worker);
                    return Err(FrontEndError::parse("helper process exited"));
                }
            }
        }
    }

    /// Kill every worker. Called once the parse phase completes.
    pub fn shutdown(self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.live = 0;
            while let Some(worker) = inner.idle.pop_front() {
                worker.kill();
            }
        }
        self.available.notify_all();
    }
}

fn spawn_worker(command: &[String], startup_timeout: Duration) -> Result<Worker> {
    let mut child = Command::new(&command[0])
        .args(&command[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("spawning helper `{}`", command[0]))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("helper stdin unavailable"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("helper stdout unavailable"))?;

    let (sender, lines) = channel();
    std::thread::spawn(move || {
        let reader = BufReader::new(stdout);
        for line in reader.lines() {
            let failed = line.is_err();
            if sender.send(line).is_err() || failed {
                break;
            }
        }
    });

    // The helper announces itself before serving.
    let hello = lines
        .recv_timeout(startup_timeout.max(Duration::from_secs(2)))
        .map_err(|_| anyhow!("helper did not report ready"))?
        .context("helper hello read failed")?;
    let hello: HelperHello =
        serde_json::from_str(&hello).context("helper hello was not understood")?;
    if !hello.ready {
        let worker = Worker {
            child,
            stdin,
            lines,
        };
        worker.kill();
        return Err(anyhow!("helper reported not ready"));
    }
    debug!(version = %hello.version, "helper worker ready");

    Ok(Worker {
        child,
        stdin,
        lines,
    })
}

/// The bundled helper binary sits next to the current executable (or one
/// directory up, when running from a test harness build layout).
fn default_command() -> Result<Vec<String>> {
    let name = format!("lattice-jshelper{}", std::env::consts::EXE_SUFFIX);
    let exe = std::env::current_exe().context("resolving current executable")?;
    let mut candidates = Vec::new();
    if let Some(dir) = exe.parent() {
        candidates.push(dir.join(&name));
        if let Some(parent) = dir.parent() {
            candidates.push(parent.join(&name));
        }
    }
    candidates
        .iter()
        .find(|path| path.is_file())
        .map(|path| vec![path.to_string_lossy().into_owned()])
        .ok_or_else(|| anyhow!("helper binary `{name}` not found next to the current executable"))
}
