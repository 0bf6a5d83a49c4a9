//! # Batch Executor
//!
//! Runs one operation over many repositories and collects an [`Outcome`]
//! for each of them.
//!
//! ## Dispatch
//!
//! Batches smaller than [`SEQUENTIAL_THRESHOLD`](crate::defaults::SEQUENTIAL_THRESHOLD)
//! items, or any batch when single-threaded mode is requested, run in input
//! order on the calling thread. Larger batches go to a dedicated rayon pool
//! sized to the available cores. Either way the returned outcomes are in
//! input order, even though pooled items finish in any order.
//!
//! ## Isolation
//!
//! A worker that returns an error or panics produces a `Failed` outcome for
//! its own item. Nothing it does can stop the other items or lose their
//! outcomes.
//!
//! ## Output
//!
//! Workers write into a per-item [`Report`]; the executor prints it through
//! the [`Console`] once the item finishes. The pooled path prints under the
//! console's shared lock, the sequential path under [`NoLock`].
//!
//! The executor knows nothing about dry-run or confirmation. Confirmation
//! happens before a batch is built; dry-run is handled inside each worker.

use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use rayon::prelude::*;

use crate::defaults::SEQUENTIAL_THRESHOLD;
use crate::error::Result;
use crate::host::RemoteRepo;
use crate::output::{Console, NoLock, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Clone,
    Pull,
    UpdateBranch,
    PruneBranch,
    Relock,
    TemplateSync,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Clone => "clone",
            Operation::Pull => "pull",
            Operation::UpdateBranch => "update branches",
            Operation::PruneBranch => "prune branches",
            Operation::Relock => "relock dependencies",
            Operation::TemplateSync => "template sync",
        };
        f.write_str(name)
    }
}

/// Something a batch can work on.
pub trait WorkTarget: Send + Sync {
    fn label(&self) -> String;
}

impl WorkTarget for PathBuf {
    fn label(&self) -> String {
        self.display().to_string()
    }
}

impl WorkTarget for RemoteRepo {
    fn label(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone)]
pub struct WorkItem<T> {
    pub target: T,
    pub operation: Operation,
}

impl<T> WorkItem<T> {
    pub fn new(target: T, operation: Operation) -> Self {
        Self { target, operation }
    }

    /// One item per target, all with the same operation.
    pub fn batch(targets: impl IntoIterator<Item = T>, operation: Operation) -> Vec<Self> {
        targets
            .into_iter()
            .map(|target| Self::new(target, operation))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub item: String,
    pub operation: Operation,
    pub status: Status,
    /// Last line the worker reported, or the failure.
    pub message: String,
    /// Every line the worker reported, in order.
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} skipped, {} failed",
            self.success, self.skipped, self.failed
        )
    }
}

/// Outcomes of one batch, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<Outcome>,
}

impl BatchReport {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for outcome in &self.outcomes {
            match outcome.status {
                Status::Success => summary.success += 1,
                Status::Skipped => summary.skipped += 1,
                Status::Failed => summary.failed += 1,
            }
        }
        summary
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.status == Status::Failed)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// How a confirmed-or-not batch ended.
#[derive(Debug, Clone)]
pub enum BatchRun {
    /// The user said no; nothing was touched.
    Declined,
    Completed(BatchReport),
}

impl BatchRun {
    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            BatchRun::Declined => None,
            BatchRun::Completed(report) => Some(report),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchExecutor {
    console: Console,
    single_threaded: bool,
    threshold: usize,
    pool_size: Option<usize>,
}

impl BatchExecutor {
    pub fn new(console: Console, single_threaded: bool) -> Self {
        Self {
            console,
            single_threaded,
            threshold: SEQUENTIAL_THRESHOLD,
            pool_size: None,
        }
    }

    /// Override the number of pool threads (defaults to available cores).
    pub fn with_pool_size(mut self, threads: usize) -> Self {
        self.pool_size = Some(threads.max(1));
        self
    }

    pub fn runs_sequentially(&self, item_count: usize) -> bool {
        self.single_threaded || item_count < self.threshold
    }

    /// Run `worker` once per item.
    ///
    /// The worker writes its messages into the supplied [`Report`] and returns
    /// the item's status. An `Err` or a panic becomes a `Failed` outcome.
    pub fn run<T, F>(&self, items: &[WorkItem<T>], worker: F) -> BatchReport
    where
        T: WorkTarget,
        F: Fn(&WorkItem<T>, &mut Report) -> Result<Status> + Sync,
    {
        if items.is_empty() {
            return BatchReport::default();
        }

        if self.runs_sequentially(items.len()) {
            return self.run_sequential(items, &worker);
        }

        let threads = self.pool_size.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        });
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("git-mirror-worker-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Could not start worker pool ({}); running sequentially", e);
                return self.run_sequential(items, &worker);
            }
        };

        debug!("Running {} items on {} threads", items.len(), threads);
        let outcomes = pool.install(|| {
            items
                .par_iter()
                .map(|item| process(item, &worker, &self.console))
                .collect()
        });
        BatchReport { outcomes }
    }

    fn run_sequential<T, F>(&self, items: &[WorkItem<T>], worker: &F) -> BatchReport
    where
        T: WorkTarget,
        F: Fn(&WorkItem<T>, &mut Report) -> Result<Status>,
    {
        debug!("Running {} items sequentially", items.len());
        let console = self.console.with_lock(Arc::new(NoLock));
        BatchReport {
            outcomes: items
                .iter()
                .map(|item| process(item, worker, &console))
                .collect(),
        }
    }
}

fn process<T, F>(item: &WorkItem<T>, worker: &F, console: &Console) -> Outcome
where
    T: WorkTarget,
    F: Fn(&WorkItem<T>, &mut Report) -> Result<Status>,
{
    let label = item.target.label();
    let mut report = Report::new();
    let result = panic::catch_unwind(AssertUnwindSafe(|| worker(item, &mut report)));
    let status = match result {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            report.danger(format!("Failed to {} {}: {}", item.operation, label, e));
            Status::Failed
        }
        Err(payload) => {
            report.danger(format!(
                "Failed to {} {}: worker panicked: {}",
                item.operation,
                label,
                panic_message(payload.as_ref())
            ));
            Status::Failed
        }
    };
    console.emit(&report);
    Outcome {
        message: report.last_text().unwrap_or(&label).to_string(),
        lines: report.texts(),
        item: label,
        operation: item.operation,
        status,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
