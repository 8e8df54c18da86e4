//! # Statement Scheduler
//!
//! Executes a script's infinite-loop body one top-level statement at a time
//! on a tokio task, so a loop that never returns cannot block the host.
//! Pause and stop take effect at the next statement boundary.

use super::{ScriptRuntime, SharedRuntime};
use crate::config::SchedulerConfig;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Split a loop body into top-level statements. `elif`/`else` lines always
/// join the preceding statement so conditional chains run as one unit.
pub fn partition_statements(body: &str) -> Vec<String> {
    let indent_of = |line: &str| line.len() - line.trim_start().len();
    let base = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(indent_of)
        .min()
        .unwrap_or(0);

    let mut statements = Vec::new();
    let mut current = String::new();

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let dedented = line.get(base..).unwrap_or(trimmed);
        let top_level = indent_of(line) == base;

        if top_level && !is_continuation(trimmed) {
            if !current.trim().is_empty() {
                statements.push(std::mem::take(&mut current));
            }
            current = dedented.to_string();
        } else if top_level || !current.is_empty() {
            current.push('\n');
            current.push_str(dedented);
        }
    }
    if !current.trim().is_empty() {
        statements.push(current);
    }
    statements
}

fn is_continuation(line: &str) -> bool {
    line.starts_with("elif ") || line.starts_with("elif:") || line.starts_with("else:")
}

/// Duration of a statement that is nothing but `time.sleep_ms(N)` or
/// `time.sleep(S)`
pub fn sleep_duration(statement: &str) -> Option<Duration> {
    let statement = statement.trim();
    if let Some(ms) = call_argument(statement, "time.sleep_ms") {
        if !ms.is_empty() && ms.bytes().all(|b| b.is_ascii_digit()) {
            return ms.parse().ok().map(Duration::from_millis);
        }
        return None;
    }
    let seconds = call_argument(statement, "time.sleep")?;
    if seconds.is_empty() || !seconds.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    let seconds: f64 = seconds.parse().ok()?;
    Some(Duration::from_millis((seconds * 1000.0).floor() as u64))
}

fn call_argument<'a>(statement: &'a str, callee: &str) -> Option<&'a str> {
    statement.strip_prefix(callee)?.strip_prefix('(')?.strip_suffix(')')
}

/// Position in a partitioned loop body. Each step runs one statement and
/// says how long to wait before the next.
#[derive(Debug, Clone)]
pub struct LoopCursor {
    statements: Vec<String>,
    index: usize,
    config: SchedulerConfig,
}

impl LoopCursor {
    pub fn new(statements: Vec<String>, config: SchedulerConfig) -> Self {
        Self { statements, index: 0, config }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Execute the current statement and advance, wrapping at the end.
    /// Failing statements are skipped after a backoff.
    pub fn step(&mut self, runtime: &mut dyn ScriptRuntime) -> Duration {
        let Some(statement) = self.statements.get(self.index) else {
            return self.config.error_backoff();
        };

        let delay = match sleep_duration(statement) {
            Some(wait) => {
                tracing::trace!("[SCHEDULER] Sleeping for {}ms", wait.as_millis());
                wait
            }
            None => match runtime.run(statement) {
                Ok(()) => self.config.statement_delay(),
                Err(e) => {
                    tracing::error!("[SCHEDULER] Statement {} failed: {}", self.index, e);
                    tracing::debug!("[SCHEDULER] Problematic statement:\n{}", statement);
                    self.config.error_backoff()
                }
            },
        };

        self.index = (self.index + 1) % self.statements.len();
        delay
    }
}

/// Owns the task that drives a [`LoopCursor`]
pub struct StatementScheduler {
    config: SchedulerConfig,
    state_tx: watch::Sender<RunState>,
    handle: Option<JoinHandle<()>>,
}

impl StatementScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (state_tx, _) = watch::channel(RunState::Idle);
        Self { config, state_tx, handle: None }
    }

    pub fn state(&self) -> RunState {
        *self.state_tx.borrow()
    }

    /// Run `statements` from the first one. Any previous run is cancelled
    /// before the new task is spawned.
    pub fn start(&mut self, statements: Vec<String>, runtime: SharedRuntime) {
        self.cancel();

        if statements.is_empty() {
            tracing::warn!("[SCHEDULER] Loop body has no statements, nothing to run");
            self.set_state(RunState::Stopped);
            return;
        }

        tracing::info!("[SCHEDULER] Starting loop over {} statements", statements.len());
        let cursor = LoopCursor::new(statements, self.config.clone());
        self.set_state(RunState::Running);
        let state_rx = self.state_tx.subscribe();
        self.handle = Some(tokio::spawn(drive(cursor, runtime, state_rx)));
    }

    pub fn pause(&self) {
        if self.state() == RunState::Running {
            tracing::info!("[SCHEDULER] Paused");
            self.set_state(RunState::Paused);
        }
    }

    pub fn resume(&self) {
        if self.state() == RunState::Paused {
            tracing::info!("[SCHEDULER] Resumed");
            self.set_state(RunState::Running);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state() == RunState::Paused
    }

    pub fn stop(&mut self) {
        self.cancel();
        if self.state() != RunState::Idle {
            self.set_state(RunState::Stopped);
            tracing::info!("[SCHEDULER] Stopped");
        }
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn set_state(&self, state: RunState) {
        self.state_tx.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }
}

impl Drop for StatementScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn drive(mut cursor: LoopCursor, runtime: SharedRuntime, mut state_rx: watch::Receiver<RunState>) {
    loop {
        // Hold here while paused
        loop {
            let state = *state_rx.borrow_and_update();
            match state {
                RunState::Running => break,
                RunState::Paused => {}
                RunState::Idle | RunState::Stopped => return,
            }
            if state_rx.changed().await.is_err() {
                return;
            }
        }

        let delay = {
            let mut runtime = runtime.lock().await;
            cursor.step(runtime.as_mut())
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = state_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}
