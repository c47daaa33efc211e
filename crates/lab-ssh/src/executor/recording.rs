//! Recording executor for tests and dry runs.
//!
//! Nothing is sent anywhere. Each invocation is recorded and answered with
//! the next queued result, or the default result once the queue is empty.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::{SshExecutor, SshInvocation};
use crate::types::CommandResult;

#[derive(Debug, Default)]
struct RecordingState {
    invocations: Vec<SshInvocation>,
    results: VecDeque<CommandResult>,
}

/// An executor that records invocations and replays scripted results.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    state: Mutex<RecordingState>,
    default_result: CommandResult,
}

impl RecordingExecutor {
    /// Create an executor answering `("", "", 0)`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor answering with `result` when nothing is queued.
    #[must_use]
    pub fn with_default(result: CommandResult) -> Self {
        Self {
            state: Mutex::default(),
            default_result: result,
        }
    }

    /// Queue a result for the next invocation.
    pub fn push_result(&self, result: CommandResult) {
        self.lock().results.push_back(result);
    }

    /// Queue a result, builder style.
    #[must_use]
    pub fn then(self, result: CommandResult) -> Self {
        self.push_result(result);
        self
    }

    /// All recorded invocations, oldest first.
    #[must_use]
    pub fn invocations(&self) -> Vec<SshInvocation> {
        self.lock().invocations.clone()
    }

    /// The most recent invocation.
    #[must_use]
    pub fn last_invocation(&self) -> Option<SshInvocation> {
        self.lock().invocations.last().cloned()
    }

    /// Number of recorded invocations.
    #[must_use]
    pub fn invocation_count(&self) -> usize {
        self.lock().invocations.len()
    }

    /// Forget recorded invocations and queued results.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.invocations.clear();
        state.results.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SshExecutor for RecordingExecutor {
    fn execute_ssh_command(&self, invocation: &SshInvocation) -> CommandResult {
        let mut state = self.lock();
        state.invocations.push(invocation.clone());
        let result = state
            .results
            .pop_front()
            .unwrap_or_else(|| self.default_result.clone());
        tracing::debug!(
            alias = %invocation.connection.alias,
            command = %invocation.command,
            return_code = result.return_code,
            "Recorded SSH invocation"
        );
        result
    }
}
