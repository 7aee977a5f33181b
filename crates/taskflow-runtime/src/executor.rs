use crate::{Completion, ExpandedTask, TaskContext};
use chrono::Utc;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use taskflow_core::{
    ErrorPolicy, EventBus, ExecutionEvent, ExecutionId, StepResult, TaskError, TaskResult,
    Value,
};

/// Receives the finalized result and whether it was finalized before every
/// task reported.
type StepDone = Box<dyn FnOnce(StepResult, bool) + Send>;

/// Runs the expanded tasks of one step concurrently
pub struct StepExecutor {
    step: usize,
    policy: ErrorPolicy,
    execution_id: ExecutionId,
    events: Arc<EventBus>,
}

impl StepExecutor {
    pub fn new(
        step: usize,
        policy: ErrorPolicy,
        execution_id: ExecutionId,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            step,
            policy,
            execution_id,
            events,
        }
    }

    /// Launch every task and deliver the step result to `on_done` exactly
    /// once.
    ///
    /// Under [`ErrorPolicy::StopImmediately`] the first reported error
    /// finalizes the step: tasks not launched yet are skipped and late
    /// completions are discarded.
    pub fn run<F>(&self, tasks: Vec<ExpandedTask>, previous: Option<Arc<StepResult>>, on_done: F)
    where
        F: FnOnce(StepResult) + Send + 'static,
    {
        let started = Instant::now();
        let step = self.step;
        let execution_id = self.execution_id;
        let events = Arc::clone(&self.events);
        let total = tasks.len();

        self.events.emit(ExecutionEvent::StepStarted {
            execution_id,
            step,
            tasks: total,
            timestamp: Utc::now(),
        });
        tracing::info!(step, tasks = total, "starting step");

        let finish: StepDone = Box::new(move |result, finalized_early| {
            let duration_ms = started.elapsed().as_millis() as u64;
            let failed = result.has_errors();
            events.emit(ExecutionEvent::StepCompleted {
                execution_id,
                step,
                failed,
                finalized_early,
                duration_ms,
                timestamp: Utc::now(),
            });
            tracing::info!(step, failed, finalized_early, "step completed in {}ms", duration_ms);
            on_done(result);
        });

        if tasks.is_empty() {
            finish(StepResult::default(), false);
            return;
        }

        let collector = Arc::new(StepCollector::new(
            step,
            total,
            self.policy,
            execution_id,
            Arc::clone(&self.events),
            finish,
        ));

        for (index, ExpandedTask { task, args }) in tasks.into_iter().enumerate() {
            if collector.is_finalized() {
                tracing::debug!(step, skipped = total - index, "step finalized, not launching remaining tasks");
                break;
            }

            tracing::debug!(step, task = index, name = task.name(), "launching task");
            let ctx = TaskContext {
                completion: Completion::new(index, Arc::clone(&collector)),
                previous: previous.clone(),
            };

            let error = match panic::catch_unwind(AssertUnwindSafe(|| task.call(ctx, args))) {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                // The outcome is already recorded, so the panic cannot be.
                Err(payload) if collector.is_reported(index) => panic::resume_unwind(payload),
                Err(payload) => Some(TaskError::Panicked(panic_message(payload.as_ref()))),
            };

            if let Some(error) = error {
                tracing::error!(step, task = index, "task failed synchronously: {}", error);
                collector.complete(index, TaskResult { error: Some(error), data: Value::Null });
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Per-step result slots shared by the completion handles of a step
pub(crate) struct StepCollector {
    step: usize,
    policy: ErrorPolicy,
    execution_id: ExecutionId,
    events: Arc<EventBus>,
    state: Mutex<CollectorState>,
}

struct CollectorState {
    result: StepResult,
    reported: Vec<bool>,
    remaining: usize,
    /// Taken when the step is finalized.
    on_done: Option<StepDone>,
}

impl StepCollector {
    fn new(
        step: usize,
        len: usize,
        policy: ErrorPolicy,
        execution_id: ExecutionId,
        events: Arc<EventBus>,
        on_done: StepDone,
    ) -> Self {
        Self {
            step,
            policy,
            execution_id,
            events,
            state: Mutex::new(CollectorState {
                result: StepResult::with_len(len),
                reported: vec![false; len],
                remaining: len,
                on_done: Some(on_done),
            }),
        }
    }

    fn is_finalized(&self) -> bool {
        self.state.lock().on_done.is_none()
    }

    fn is_reported(&self, index: usize) -> bool {
        self.state.lock().reported.get(index).copied().unwrap_or(false)
    }

    /// Record the outcome of task `index`. Only the first report of a task
    /// counts, and nothing counts once the step is finalized.
    pub(crate) fn complete(&self, index: usize, outcome: TaskResult) {
        let step = self.step;
        let failed = outcome.error.is_some();

        let finalized = {
            let mut state = self.state.lock();
            if state.on_done.is_none() {
                tracing::warn!(step, task = index, "discarding completion of a finalized step");
                return;
            }
            if state.reported.get(index).copied().unwrap_or(true) {
                tracing::warn!(step, task = index, "task already completed, ignoring");
                return;
            }

            state.reported[index] = true;
            state.result.record(index, outcome);
            state.remaining -= 1;

            // Published under the lock so it precedes the step's completion.
            tracing::debug!(step, task = index, failed, "task completed");
            self.events.emit(ExecutionEvent::TaskCompleted {
                execution_id: self.execution_id,
                step,
                task: index,
                failed,
                timestamp: Utc::now(),
            });

            let early = failed && self.policy.finalizes_early() && state.remaining > 0;
            if state.remaining == 0 || early {
                let on_done = state.on_done.take();
                let result = std::mem::take(&mut state.result);
                on_done.map(|on_done| (on_done, result, early))
            } else {
                None
            }
        };

        if let Some((on_done, result, early)) = finalized {
            on_done(result, early);
        }
    }
}
