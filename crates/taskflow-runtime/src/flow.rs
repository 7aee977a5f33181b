use crate::{ArgGroup, Step, StepExecutor, Task, TaskSlot};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use taskflow_core::{
    ErrorPolicy, EventBus, ExecutionEvent, ExecutionId, FlowConfig, FlowError, Result,
    StepResult, Value,
};
use tokio::sync::{broadcast, oneshot};

/// Receives the result of the last executed step, or `None` if no step ran.
pub type FinalCallback = Box<dyn FnOnce(Option<StepResult>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Idle,
    Running,
    Finished,
}

/// A linear sequence of steps, each running its tasks concurrently
///
/// Build the flow with [`run`](Flow::run) (new step) and [`and`](Flow::and)
/// (parallel task in the current step), attach argument directives to the
/// most recently added task, then [`start`](Flow::start) it. Steps are
/// removed from the queue as they begin, so a finished flow is empty and
/// starting it again reports `None` right away.
///
/// Builder calls made while the flow is running are not supported.
pub struct Flow {
    shared: Arc<FlowShared>,
}

struct FlowShared {
    state: Mutex<FlowState>,
    events: Arc<EventBus>,
}

struct FlowState {
    steps: VecDeque<Step>,
    policy: ErrorPolicy,
    phase: FlowPhase,
}

impl Flow {
    pub fn new() -> Self {
        Self::with_config(FlowConfig::default())
    }

    pub fn with_config(config: FlowConfig) -> Self {
        let events = Arc::new(EventBus::new(config.event_buffer_size));
        Self {
            shared: Arc::new(FlowShared {
                state: Mutex::new(FlowState {
                    steps: VecDeque::new(),
                    policy: config.error_policy,
                    phase: FlowPhase::Idle,
                }),
                events,
            }),
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.shared.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.shared.events.subscribe()
    }

    /// Append a new step whose first task is `task`.
    pub fn run(&mut self, task: impl Task + 'static) -> &mut Self {
        self.run_shared(Arc::new(task))
    }

    pub fn run_shared(&mut self, task: Arc<dyn Task>) -> &mut Self {
        self.shared
            .state
            .lock()
            .steps
            .push_back(Step::new(TaskSlot::new(task)));
        self
    }

    /// Add a task running in parallel with the current step.
    pub fn and(&mut self, task: impl Task + 'static) -> Result<&mut Self> {
        self.and_shared(Arc::new(task))
    }

    pub fn and_shared(&mut self, task: Arc<dyn Task>) -> Result<&mut Self> {
        {
            let mut state = self.shared.state.lock();
            let step = state.steps.back_mut().ok_or_else(|| {
                FlowError::InvalidArgument("and() requires a preceding run()".to_string())
            })?;
            step.push(TaskSlot::new(task));
        }
        Ok(self)
    }

    /// Fixed arguments passed to every invocation of the last added task.
    pub fn bind_args<I, V>(&mut self, args: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let args = args.into_iter().map(Into::into).collect();
        self.with_last_slot("bind_args", |slot| {
            slot.bind_args(args);
            Ok(())
        })
    }

    /// Run the last added task once per element, each element supplying
    /// that invocation's arguments.
    pub fn for_each<I, G>(&mut self, elements: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = G>,
        G: Into<ArgGroup>,
    {
        let groups = elements.into_iter().map(Into::into).collect();
        self.with_last_slot("for_each", |slot| {
            slot.for_each(groups);
            Ok(())
        })
    }

    /// Run the last added task `n` times with identical arguments.
    pub fn times(&mut self, n: usize) -> Result<&mut Self> {
        self.with_last_slot("times", |slot| slot.times(n))
    }

    fn with_last_slot<F>(&mut self, method: &str, apply: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut TaskSlot) -> Result<()>,
    {
        {
            let mut state = self.shared.state.lock();
            let slot = state
                .steps
                .back_mut()
                .and_then(Step::last_slot_mut)
                .ok_or_else(|| {
                    FlowError::InvalidArgument(format!("{}() requires a preceding run()", method))
                })?;
            apply(slot)?;
        }
        Ok(self)
    }

    /// Takes effect at the next step boundary.
    pub fn set_error_policy(&mut self, policy: ErrorPolicy) -> &mut Self {
        self.shared.state.lock().policy = policy;
        self
    }

    pub fn stop_immediately(&mut self) -> &mut Self {
        self.set_error_policy(ErrorPolicy::StopImmediately)
    }

    pub fn stop_after_step(&mut self) -> &mut Self {
        self.set_error_policy(ErrorPolicy::StopAfterStep)
    }

    pub fn never_stop(&mut self) -> &mut Self {
        self.set_error_policy(ErrorPolicy::NeverStop)
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.shared.state.lock().policy
    }

    pub fn phase(&self) -> FlowPhase {
        self.shared.state.lock().phase
    }

    /// Steps still queued.
    pub fn step_count(&self) -> usize {
        self.shared.state.lock().steps.len()
    }

    /// Start executing the queued steps.
    ///
    /// `on_done` is called once with the last step's result when the queue
    /// drains or a step with errors halts the flow. With no steps queued it
    /// is called with `None` before `start` returns. If a task never
    /// completes, neither does the flow. A panic in `on_done` propagates to
    /// the thread that finished the flow.
    pub fn start<F>(&self, on_done: F) -> Result<()>
    where
        F: FnOnce(Option<StepResult>) + Send + 'static,
    {
        let (steps, policy) = {
            let mut state = self.shared.state.lock();
            if state.phase == FlowPhase::Running {
                return Err(FlowError::AlreadyRunning);
            }
            state.phase = FlowPhase::Running;
            (state.steps.len(), state.policy)
        };

        let on_done: FinalCallback = Box::new(on_done);
        let driver = Arc::new(FlowDriver {
            shared: Arc::clone(&self.shared),
            execution_id: ExecutionId::new_v4(),
            started: Instant::now(),
            steps_run: AtomicUsize::new(0),
            on_done: Mutex::new(Some(on_done)),
            drive: Mutex::new(DriveState {
                active: true,
                pending: None,
            }),
        });

        self.shared.events.emit(ExecutionEvent::FlowStarted {
            execution_id: driver.execution_id,
            steps,
            policy,
            timestamp: Utc::now(),
        });
        tracing::info!(execution_id = %driver.execution_id, steps, ?policy, "starting flow");

        driver.drive(None);
        Ok(())
    }

    /// Start without observing the outcome.
    pub fn start_detached(&self) -> Result<()> {
        self.start(|_| {})
    }

    /// Run the flow to completion and return the last step's result.
    ///
    /// Fails with [`FlowError::Stalled`] when every outstanding task dropped
    /// its completion handle, since the flow can then never finish.
    pub async fn execute(&self) -> Result<Option<StepResult>> {
        let (tx, rx) = oneshot::channel();
        self.start(move |outcome| {
            let _ = tx.send(outcome);
        })?;
        rx.await.map_err(|_| FlowError::Stalled)
    }
}

impl Default for Flow {
    fn default() -> Self {
        Self::new()
    }
}

/// State of one execution, kept alive by the completion handles of the
/// running step.
struct FlowDriver {
    shared: Arc<FlowShared>,
    execution_id: ExecutionId,
    started: Instant,
    steps_run: AtomicUsize,
    on_done: Mutex<Option<FinalCallback>>,
    drive: Mutex<DriveState>,
}

struct DriveState {
    /// A `drive` loop is running on some thread.
    active: bool,
    /// Result of a step that finished while the loop was running.
    pending: Option<StepResult>,
}

impl FlowDriver {
    /// Called once the running step is finalized, possibly from inside
    /// `drive` when the step's tasks completed synchronously. The result is
    /// then left for the running loop instead of recursing into the next step.
    fn step_finished(self: &Arc<Self>, result: StepResult) {
        {
            let mut drive = self.drive.lock();
            if drive.active {
                drive.pending = Some(result);
                return;
            }
            drive.active = true;
        }
        self.drive(Some(result));
    }

    /// Launch steps until one is left waiting on outstanding completions or
    /// the flow finishes.
    fn drive(self: &Arc<Self>, mut last: Option<StepResult>) {
        while self.launch_next(last) {
            let mut drive = self.drive.lock();
            match drive.pending.take() {
                Some(result) => last = Some(result),
                None => {
                    drive.active = false;
                    return;
                }
            }
        }
    }

    /// Start the next step, or finish the flow and return false.
    fn launch_next(self: &Arc<Self>, last: Option<StepResult>) -> bool {
        let (next, policy, halted) = {
            let mut state = self.shared.state.lock();
            let policy = state.policy;
            let halted = last
                .as_ref()
                .is_some_and(|result| policy.halts_on_error() && result.has_errors());
            let next = if halted { None } else { state.steps.pop_front() };
            if next.is_none() {
                state.phase = FlowPhase::Finished;
            }
            (next, policy, halted)
        };

        let Some(step) = next else {
            self.finish(last, halted);
            return false;
        };

        let index = self.steps_run.fetch_add(1, Ordering::SeqCst);
        let executor = StepExecutor::new(
            index,
            policy,
            self.execution_id,
            Arc::clone(&self.shared.events),
        );
        let tasks = step.expand();
        let previous = last.map(Arc::new);
        let driver = Arc::clone(self);
        executor.run(tasks, previous, move |result| driver.step_finished(result));
        true
    }

    fn finish(&self, last: Option<StepResult>, halted: bool) {
        let steps_run = self.steps_run.load(Ordering::SeqCst);
        let duration_ms = self.started.elapsed().as_millis() as u64;

        self.shared.events.emit(ExecutionEvent::FlowCompleted {
            execution_id: self.execution_id,
            steps_run,
            halted,
            duration_ms,
            timestamp: Utc::now(),
        });
        if halted {
            tracing::warn!(execution_id = %self.execution_id, steps_run, "flow halted on step errors");
        } else {
            tracing::info!(execution_id = %self.execution_id, steps_run, "flow completed in {}ms", duration_ms);
        }

        let on_done = self.on_done.lock().take();
        if let Some(on_done) = on_done {
            on_done(last);
        }
    }
}

impl Drop for FlowDriver {
    fn drop(&mut self) {
        if self.on_done.get_mut().is_some() {
            tracing::warn!(execution_id = %self.execution_id, "flow stalled, no task can complete anymore");
            self.shared.state.lock().phase = FlowPhase::Finished;
        }
    }
}
