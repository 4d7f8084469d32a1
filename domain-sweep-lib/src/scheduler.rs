//! Bounded-concurrency sweep scheduler.
//!
//! Tasks are admitted in order through a counting semaphore holding one
//! permit per allowed in-flight lookup. Every admitted task runs on its own
//! tokio task and, once its lookup settles, writes exactly one record
//! through the shared [`Ledger`] before giving its permit back. A run is
//! finished when every admitted task has done so.
//!
//! Lookup failures (checker errors, panics, timeouts) stay inside their
//! task and become failed records. Failures of the store itself are fatal:
//! admission stops, in-flight tasks drain, and the error is returned.

use crate::checker::Checker;
use crate::error::SweepError;
use crate::store::{DurableStore, Ledger, RecordMap};
use crate::types::{Outcome, Progress, Record, RunSummary, SweepConfig, Task};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Observer called once per completed task, after its record is stored.
pub type ProgressFn = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Runs sweep tasks against a checker with a fixed concurrency budget.
pub struct Scheduler {
    checker: Arc<dyn Checker>,
    ledger: Arc<Mutex<Ledger>>,
    budget: usize,
    timeout: Option<Duration>,
    skip_known: bool,
    on_progress: Option<ProgressFn>,
}

impl Scheduler {
    /// Create a scheduler over `store`, loading its current contents.
    ///
    /// Fails if the store cannot be loaded (e.g. [`SweepError::CorruptStore`]).
    pub fn new(checker: Arc<dyn Checker>, store: Box<dyn DurableStore>) -> Result<Self, SweepError> {
        let ledger = Ledger::open(store)?;
        Ok(Self {
            checker,
            ledger: Arc::new(Mutex::new(ledger)),
            budget: SweepConfig::default().concurrency,
            timeout: None,
            skip_known: false,
            on_progress: None,
        })
    }

    /// Create a scheduler taking budget, timeout and skip policy from `config`.
    pub fn with_config(
        checker: Arc<dyn Checker>,
        store: Box<dyn DurableStore>,
        config: &SweepConfig,
    ) -> Result<Self, SweepError> {
        Ok(Self::new(checker, store)?
            .with_budget(config.concurrency)
            .with_timeout(config.timeout)
            .with_skip_known(config.skip_known))
    }

    /// Maximum number of lookups in flight (at least 1).
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget.max(1);
        self
    }

    /// Per-lookup deadline; expired lookups are recorded as failures.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Skip tasks whose key is already stored.
    pub fn with_skip_known(mut self, enabled: bool) -> Self {
        self.skip_known = enabled;
        self
    }

    pub fn on_progress<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Progress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(observer));
        self
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Copy of the current result map.
    pub fn records(&self) -> Result<RecordMap, SweepError> {
        let ledger = self
            .ledger
            .lock()
            .map_err(|_| SweepError::internal("Result ledger lock poisoned"))?;
        Ok(ledger.records().clone())
    }

    /// Run `tasks` to completion.
    ///
    /// Every distinct suffix is validated against the checker first; an
    /// unsupported suffix fails the run before any lookup is made.
    pub async fn run(&self, tasks: Vec<Task>) -> Result<RunSummary, SweepError> {
        let started = Instant::now();

        self.validate_suffixes(&tasks)?;
        let (tasks, skipped) = self.drop_known(tasks)?;
        let total = tasks.len();

        tracing::info!(total, skipped, budget = self.budget, "starting sweep");

        let semaphore = Arc::new(Semaphore::new(self.budget));
        let stats = Arc::new(RunStats::default());
        let mut running: JoinSet<Result<(), SweepError>> = JoinSet::new();
        let mut fatal: Option<SweepError> = None;

        for task in tasks {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| SweepError::internal("Admission semaphore closed"))?;

            if stats.aborted() {
                break;
            }

            while let Some(joined) = running.try_join_next() {
                if let Err(e) = settle(joined) {
                    fatal.get_or_insert(e);
                }
            }
            if fatal.is_some() {
                break;
            }

            tracing::debug!(task = %task, "admitted");
            let job = Job {
                checker: Arc::clone(&self.checker),
                ledger: Arc::clone(&self.ledger),
                stats: Arc::clone(&stats),
                timeout: self.timeout,
                on_progress: self.on_progress.clone(),
                total,
            };
            running.spawn(async move {
                let result = job.execute(task).await;
                drop(permit);
                result
            });
        }

        while let Some(joined) = running.join_next().await {
            if let Err(e) = settle(joined) {
                fatal.get_or_insert(e);
            }
        }

        if let Some(e) = fatal {
            tracing::error!(error = %e, "sweep aborted");
            return Err(e);
        }

        let summary = stats.summary(total, skipped, started.elapsed());
        tracing::info!(
            completed = summary.completed(),
            available = summary.available,
            unavailable = summary.unavailable,
            failed = summary.failed,
            "sweep finished"
        );
        Ok(summary)
    }

    fn validate_suffixes(&self, tasks: &[Task]) -> Result<(), SweepError> {
        let mut seen = HashSet::new();
        for task in tasks {
            if seen.insert(task.suffix.as_str()) {
                self.checker.validate_suffix(&task.suffix)?;
            }
        }
        Ok(())
    }

    fn drop_known(&self, tasks: Vec<Task>) -> Result<(Vec<Task>, usize), SweepError> {
        if !self.skip_known {
            return Ok((tasks, 0));
        }

        let ledger = self
            .ledger
            .lock()
            .map_err(|_| SweepError::internal("Result ledger lock poisoned"))?;
        let before = tasks.len();
        let pending: Vec<Task> = tasks
            .into_iter()
            .filter(|task| !ledger.contains(&task.key()))
            .collect();
        let skipped = before - pending.len();
        Ok((pending, skipped))
    }
}

/// Everything one admitted task needs, moved into its tokio task.
struct Job {
    checker: Arc<dyn Checker>,
    ledger: Arc<Mutex<Ledger>>,
    stats: Arc<RunStats>,
    timeout: Option<Duration>,
    on_progress: Option<ProgressFn>,
    total: usize,
}

impl Job {
    async fn execute(self, task: Task) -> Result<(), SweepError> {
        self.stats.enter();

        let outcome = self.lookup(&task).await;
        let committed = self.commit(Record::from_outcome(&task, &outcome)).await;

        self.stats.leave();
        if committed.is_err() {
            self.stats.abort();
        }
        committed?;

        let completed = self.stats.tally(&outcome);
        tracing::info!(
            status = %outcome.status(),
            name = %task.name,
            suffix = %task.suffix,
            message = %outcome.detail(),
            "checked"
        );

        if let Some(observer) = &self.on_progress {
            observer(&Progress {
                task,
                outcome,
                completed,
                total: self.total,
            });
        }
        Ok(())
    }

    /// Run the checker, folding every failure mode into an outcome.
    async fn lookup(&self, task: &Task) -> Outcome {
        let call = AssertUnwindSafe(self.checker.check(task)).catch_unwind();

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(task = %task, ?limit, "lookup timed out");
                    return Outcome::TransportError {
                        detail: SweepError::timeout("registrar lookup", limit).to_string(),
                    };
                }
            },
            None => call.await,
        };

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                if e.is_fatal() {
                    tracing::error!(task = %task, error = %e, "checker returned a non-transport error");
                } else {
                    tracing::warn!(task = %task, error = %e, "lookup failed");
                }
                Outcome::TransportError {
                    detail: e.to_string(),
                }
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::warn!(task = %task, panic = %message, "checker panicked");
                Outcome::TransportError {
                    detail: format!("checker panicked: {}", message),
                }
            }
        }
    }

    /// Upsert and save under the ledger lock, off the async workers.
    async fn commit(&self, record: Record) -> Result<(), SweepError> {
        let ledger = Arc::clone(&self.ledger);
        tokio::task::spawn_blocking(move || {
            let mut ledger = ledger
                .lock()
                .map_err(|_| SweepError::internal("Result ledger lock poisoned"))?;
            ledger.commit(record)
        })
        .await
        .map_err(|e| SweepError::internal(format!("Store writer failed: {}", e)))?
    }
}

#[derive(Default)]
struct RunStats {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
    available: AtomicUsize,
    unavailable: AtomicUsize,
    failed: AtomicUsize,
    /// Set by a task whose commit failed, before it frees its permit
    aborted: AtomicBool,
}

impl RunStats {
    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    fn aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Count a stored outcome; returns the number of completions so far.
    fn tally(&self, outcome: &Outcome) -> usize {
        let counter = match outcome {
            Outcome::Available { .. } => &self.available,
            Outcome::Unavailable { .. } => &self.unavailable,
            Outcome::TransportError { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn summary(&self, total: usize, skipped: usize, duration: Duration) -> RunSummary {
        RunSummary {
            total,
            available: self.available.load(Ordering::SeqCst),
            unavailable: self.unavailable.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            skipped,
            peak_in_flight: self.peak.load(Ordering::SeqCst),
            duration,
        }
    }
}

fn settle(joined: Result<Result<(), SweepError>, JoinError>) -> Result<(), SweepError> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(SweepError::internal(format!("Sweep task failed: {}", e))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
