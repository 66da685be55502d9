use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::{interval, sleep};
use tracing::{debug, info, warn};

use crate::execution::ExecutionInstance;
use crate::executor::{ExecutorError, ExecutorRegistry};
use crate::job::{JobId, JobSpec};
use crate::observability::Metrics;
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("job requires executor kind {got:?}, this dispatcher serves {expected:?}")]
    WrongExecutor { got: String, expected: String },

    #[error("job not found in queue: {0}")]
    NotFound(JobId),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("job {job} failed after {attempts} attempt(s)")]
    RunFailed { job: JobId, attempts: u32 },
}

/// Retry policy applied per activation group: each failed attempt backs
/// off exponentially before the next one, up to `max_attempts` total.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: StdDuration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: StdDuration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> StdDuration {
        self.backoff_base * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

struct QueueEntry {
    spec: JobSpec,
    /// Re-armed with `schedule.next(now)` after every dispatch. Dependent
    /// jobs carry no schedule and are never polled.
    next_due: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct DispatchState {
    queue: HashMap<JobId, QueueEntry>,
    running: bool,
}

enum RunOutcome {
    Skipped,
    Succeeded,
    Failed { attempts: u32 },
}

/// One dispatcher per executor kind. Owns the queue of jobs bound to that
/// kind, ticks once a second while running, and funnels every run through
/// an in-flight table so a job has at most one live run system-wide.
pub struct Dispatcher {
    kind: String,
    store: Store,
    registry: Arc<ExecutorRegistry>,
    metrics: Arc<Metrics>,
    retry: RetryPolicy,
    /// Caps simultaneously executing runs across all jobs of this kind.
    permits: Semaphore,
    state: Mutex<DispatchState>,
    in_flight: Mutex<HashSet<JobId>>,
}

impl Dispatcher {
    pub fn new(
        kind: impl Into<String>,
        store: Store,
        registry: Arc<ExecutorRegistry>,
        metrics: Arc<Metrics>,
        retry: RetryPolicy,
        concurrency: usize,
    ) -> Self {
        Self {
            kind: kind.into(),
            store,
            registry,
            metrics,
            retry,
            permits: Semaphore::new(concurrency.max(1)),
            state: Mutex::new(DispatchState::default()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    fn state(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn in_flight(&self) -> MutexGuard<'_, HashSet<JobId>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues every stored job bound to this dispatcher's kind. Used at
    /// startup to resume previously registered jobs.
    pub fn load_from_store(&self) -> Result<usize, StoreError> {
        let mut loaded = 0;
        for job in self.store.get_jobs()? {
            if job.executor == self.kind {
                // Kind already checked, register cannot refuse.
                let _ = self.register(job);
                loaded += 1;
            }
        }
        debug!(kind = %self.kind, jobs = loaded, "loaded jobs from store");
        Ok(loaded)
    }

    /// Adds a job to the queue. Fails when the job names a different
    /// executor kind than this dispatcher serves.
    pub fn register(&self, spec: JobSpec) -> Result<(), DispatchError> {
        if spec.executor != self.kind {
            return Err(DispatchError::WrongExecutor {
                got: spec.executor,
                expected: self.kind.clone(),
            });
        }

        let next_due = spec.schedule.as_ref().map(|s| s.next(Utc::now()));
        let id = spec.id.clone();
        self.state().queue.insert(id, QueueEntry { spec, next_due });
        self.metrics.job_registered();
        Ok(())
    }

    /// Removes a job from the queue, returning its spec.
    pub fn deregister(&self, id: &JobId) -> Result<JobSpec, DispatchError> {
        self.state()
            .queue
            .remove(id)
            .map(|entry| entry.spec)
            .ok_or_else(|| DispatchError::NotFound(id.clone()))
    }

    pub fn queue_len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    /// Starts the tick loop. Idempotent; a second call while running is a
    /// no-op.
    pub fn start(self: Arc<Self>) {
        {
            let mut state = self.state();
            if state.running {
                return;
            }
            state.running = true;
        }
        info!(kind = %self.kind, "starting dispatch loop");
        tokio::spawn(self.tick_loop());
    }

    /// Stops dispatching new work. Runs already dispatched keep going;
    /// there is no cancellation for in-flight work.
    pub fn stop(&self) {
        let mut state = self.state();
        if state.running {
            info!(kind = %self.kind, "stopping dispatch loop");
            state.running = false;
        }
    }

    async fn tick_loop(self: Arc<Self>) {
        let mut ticker = interval(StdDuration::from_secs(1));
        loop {
            ticker.tick().await;
            if !self.is_running() {
                info!(kind = %self.kind, "dispatch loop shut down");
                return;
            }

            let due = self.collect_due(Utc::now());
            if due.is_empty() {
                continue;
            }
            debug!(kind = %self.kind, jobs = due.len(), "jobs due");

            // Each due job runs on its own task; one job failing never
            // blocks the others in the same tick.
            for spec in due {
                let dispatcher = Arc::clone(&self);
                tokio::spawn(async move {
                    let id = spec.id.clone();
                    if let Err(e) = dispatcher.run(spec).await {
                        warn!(job = %id, error = %e, "run failed");
                    }
                });
            }
        }
    }

    /// Snapshot of jobs due at `now`, re-arming each one's next activation
    /// as it is taken. Only top-level jobs are polled; dependent jobs are
    /// triggered by their parent's completion.
    fn collect_due(&self, now: DateTime<Utc>) -> Vec<JobSpec> {
        let mut due = Vec::new();
        let mut state = self.state();
        for entry in state.queue.values_mut() {
            if entry.spec.parent_job.is_some() {
                continue;
            }
            let Some(next_due) = entry.next_due else {
                continue;
            };
            if now > next_due {
                if let Some(schedule) = &entry.spec.schedule {
                    entry.next_due = Some(schedule.next(now));
                }
                due.push(entry.spec.clone());
            }
        }
        due
    }

    /// Runs a job now, honoring per-job exclusivity: if a run for this job
    /// is already in flight the call succeeds immediately without executing
    /// again. On a successful final attempt, dependent jobs are triggered.
    pub async fn run(self: Arc<Self>, spec: JobSpec) -> Result<(), DispatchError> {
        if !self.in_flight().insert(spec.id.clone()) {
            debug!(job = %spec.id, "run already in flight, skipping");
            return Ok(());
        }

        let outcome = self.run_attempts(&spec).await;
        self.in_flight().remove(&spec.id);

        match outcome? {
            RunOutcome::Skipped => Ok(()),
            RunOutcome::Succeeded => {
                Self::trigger_dependents(&self, &spec);
                Ok(())
            }
            RunOutcome::Failed { attempts } => Err(DispatchError::RunFailed {
                job: spec.id.clone(),
                attempts,
            }),
        }
    }

    async fn run_attempts(&self, spec: &JobSpec) -> Result<RunOutcome, DispatchError> {
        if spec.disabled {
            debug!(job = %spec.id, "job disabled, skipping run");
            return Ok(RunOutcome::Skipped);
        }

        // The semaphore is never closed; acquire only waits for a permit.
        let Ok(_permit) = self.permits.acquire().await else {
            return Ok(RunOutcome::Skipped);
        };

        let executor = self.registry.resolve(&spec.executor)?;
        let mut instance = ExecutionInstance::new(spec.id.clone());

        loop {
            instance.started_at = Some(Utc::now());
            self.store.set_execution(&instance)?;
            self.metrics.run_dispatched();

            let success = match executor.execute(spec, &instance).await {
                Ok(report) => {
                    instance.success = report.success;
                    instance.output = report.output;
                    instance.executor_attributes = report.attributes;
                    report.success
                }
                Err(e) => {
                    warn!(job = %spec.id, attempt = instance.attempt, error = %e, "executor error");
                    instance.success = false;
                    instance.output = e.to_string().into_bytes();
                    false
                }
            };
            instance.finished_at = Some(Utc::now());
            self.store.set_execution(&instance)?;
            self.record_outcome(&spec.id, success);

            if success {
                return Ok(RunOutcome::Succeeded);
            }
            self.metrics.run_failed();

            if instance.attempt >= self.retry.max_attempts {
                return Ok(RunOutcome::Failed {
                    attempts: instance.attempt,
                });
            }

            let delay = self.retry.backoff(instance.attempt);
            debug!(
                job = %spec.id,
                attempt = instance.attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying after backoff"
            );
            sleep(delay).await;
            instance = instance.retry();
        }
    }

    /// Folds a run outcome into the stored job's counters. The store's
    /// monotonic merge keeps a concurrent stale writer from regressing
    /// them. A missing job (deleted mid-run) is logged and ignored.
    fn record_outcome(&self, id: &JobId, success: bool) {
        let mut job = match self.store.get_job(id) {
            Ok(job) => job,
            Err(e) => {
                warn!(job = %id, error = %e, "cannot update counters");
                return;
            }
        };

        let now = Utc::now();
        if success {
            job.success_count += 1;
            job.last_success = Some(now);
        } else {
            job.error_count += 1;
            job.last_error = Some(now);
        }
        if let Err(e) = self.store.set_job(job) {
            warn!(job = %id, error = %e, "failed to store updated counters");
        }
    }

    /// Triggered only by a successful parent run; each dependent fails or
    /// succeeds on its own task.
    fn trigger_dependents(this: &Arc<Self>, spec: &JobSpec) {
        for dep_id in &spec.dependent_jobs {
            let dep = match this.store.get_job(dep_id) {
                Ok(dep) => dep,
                Err(e) => {
                    warn!(parent = %spec.id, dependent = %dep_id, error = %e, "cannot trigger dependent");
                    continue;
                }
            };
            debug!(parent = %spec.id, dependent = %dep_id, "triggering dependent job");
            let dispatcher = Arc::clone(this);
            tokio::spawn(async move {
                let id = dep.id.clone();
                if let Err(e) = dispatcher.run(dep).await {
                    warn!(job = %id, error = %e, "dependent run failed");
                }
            });
        }
    }
}
