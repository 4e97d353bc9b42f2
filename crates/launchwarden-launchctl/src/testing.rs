//! Scripted runner and elevator for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::action::CommandPlan;
use crate::error::ElevationError;
use crate::escalator::Elevator;
use crate::runner::{CommandOutput, CommandRunner};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A [`CommandRunner`] that answers from a script and records every call.
///
/// Responses are matched against the space-joined arguments: an exact match
/// wins, then the longest registered prefix ending at a word boundary.
/// Unmatched calls succeed with empty output.
#[derive(Default)]
pub struct FakeRunner {
    responses: Mutex<Vec<(String, CommandOutput)>>,
    invocations: Mutex<Vec<Vec<String>>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, args: &str, output: CommandOutput) -> &Self {
        lock(&self.responses).push((args.to_string(), output));
        self
    }

    /// Successful output for `args`.
    pub fn respond_ok(&self, args: &str, text: &str) -> &Self {
        self.respond(args, CommandOutput::new(0, text))
    }

    /// Make every call take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    pub fn invocations(&self) -> Vec<Vec<String>> {
        lock(&self.invocations).clone()
    }

    /// Number of calls whose joined arguments start with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        lock(&self.invocations)
            .iter()
            .filter(|args| matches_prefix(&args.join(" "), prefix))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.invocations).len()
    }

    fn lookup(&self, joined: &str) -> CommandOutput {
        let responses = lock(&self.responses);
        if let Some((_, out)) = responses.iter().rev().find(|(key, _)| key == joined) {
            return out.clone();
        }
        responses
            .iter()
            .rev()
            .filter(|(key, _)| matches_prefix(joined, key))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, out)| out.clone())
            .unwrap_or_else(|| CommandOutput::new(0, ""))
    }
}

fn matches_prefix(joined: &str, prefix: &str) -> bool {
    joined == prefix || joined.starts_with(&format!("{} ", prefix))
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, _program: &str, args: &[String]) -> CommandOutput {
        lock(&self.invocations).push(args.to_vec());
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lookup(&args.join(" "))
    }
}

/// An [`Elevator`] with a fixed outcome that records the plans it receives.
pub struct FakeElevator {
    outcome: Mutex<Result<(), ElevationError>>,
    plans: Mutex<Vec<CommandPlan>>,
    calls: AtomicUsize,
}

impl FakeElevator {
    pub fn succeeding() -> Arc<Self> {
        Self::with_outcome(Ok(()))
    }

    pub fn cancelling() -> Arc<Self> {
        Self::with_outcome(Err(ElevationError::Cancelled))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::with_outcome(Err(ElevationError::Failed(message.to_string())))
    }

    fn with_outcome(outcome: Result<(), ElevationError>) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(outcome),
            plans: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_outcome(&self, outcome: Result<(), ElevationError>) {
        *lock(&self.outcome) = outcome;
    }

    pub fn plans(&self) -> Vec<CommandPlan> {
        lock(&self.plans).clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Elevator for FakeElevator {
    async fn run_elevated(&self, plan: &CommandPlan) -> Result<(), ElevationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.plans).push(plan.clone());
        lock(&self.outcome).clone()
    }
}
