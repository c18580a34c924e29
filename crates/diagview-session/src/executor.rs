//! Where render jobs run.
//!
//! [`PoolExecutor`] is the production choice. [`ManualExecutor`] queues jobs until the caller
//! runs them, which makes completion order fully scriptable in tests and simulations.
//! [`InlineExecutor`] runs each job on the calling thread.

use crate::{Error, Result};
use futures::executor::ThreadPool;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type RenderJob = Box<dyn FnOnce() + Send + 'static>;

pub trait RenderExecutor: Send + Sync {
    fn execute(&self, job: RenderJob);
}

/// Fixed-size worker pool built on `futures`' thread pool.
pub struct PoolExecutor {
    pool: ThreadPool,
}

impl PoolExecutor {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = ThreadPool::builder()
            .pool_size(workers.max(1))
            .name_prefix("diagview-render-")
            .create()
            .map_err(Error::Executor)?;
        Ok(Self { pool })
    }
}

impl RenderExecutor for PoolExecutor {
    fn execute(&self, job: RenderJob) {
        self.pool.spawn_ok(async move { job() });
    }
}

/// Runs each job immediately on the thread that submits it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl RenderExecutor for InlineExecutor {
    fn execute(&self, job: RenderJob) {
        job();
    }
}

/// Holds submitted jobs until they are run explicitly.
///
/// Clones share the same queue, so a test can keep one handle while the session owns another.
#[derive(Clone, Default)]
pub struct ManualExecutor {
    queue: Arc<Mutex<VecDeque<RenderJob>>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<RenderJob>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }

    /// Runs the oldest queued job. Returns `false` if there was none.
    pub fn run_next(&self) -> bool {
        let job = self.queue().pop_front();
        run(job)
    }

    /// Runs the most recently queued job.
    pub fn run_last(&self) -> bool {
        let job = self.queue().pop_back();
        run(job)
    }

    /// Runs the job at `index` in submission order, leaving the others queued.
    pub fn run_at(&self, index: usize) -> bool {
        let job = self.queue().remove(index);
        run(job)
    }

    /// Runs queued jobs (including ones they submit) until the queue is empty.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl RenderExecutor for ManualExecutor {
    fn execute(&self, job: RenderJob) {
        self.queue().push_back(job);
    }
}

// The queue lock is released before the job runs.
fn run(job: Option<RenderJob>) -> bool {
    match job {
        Some(job) => {
            job();
            true
        }
        None => false,
    }
}

pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Calls `f`, turning a panic into `Err(message)`.
pub(crate) fn catch_panic<T>(f: impl FnOnce() -> T) -> std::result::Result<T, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}
