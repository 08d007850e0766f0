use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use tracing::debug;

/// Count of jobs enqueued but not yet finished, with a condition variable
/// signalled when it drops to zero.
#[derive(Debug, Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn lock(&self) -> MutexGuard<'_, usize> {
        // A panicking job cannot leave the counter half-updated.
        self.count.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Decrements the pending count when a job finishes, even by unwinding.
struct JobGuard(Arc<Pending>);

impl Drop for JobGuard {
    fn drop(&mut self) {
        let mut count = self.0.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// Fixed-size pool that runs fire-and-forget jobs and can be waited on.
///
/// Backed by a dedicated rayon [`ThreadPool`](rayon::ThreadPool); jobs run in
/// no particular order.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    threads: usize,
    pending: Arc<Pending>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .field("queued", &self.queued())
            .finish()
    }
}

fn build_thread_pool(threads: usize) -> crate::Result<rayon::ThreadPool> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|i| format!("fractal-worker-{i}"))
        .build()?)
}

impl WorkerPool {
    pub fn new(threads: usize) -> crate::Result<Self> {
        let threads = threads.max(1);
        Ok(Self {
            pool: build_thread_pool(threads)?,
            threads,
            pending: Arc::new(Pending::default()),
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Jobs enqueued and not yet finished (running ones included).
    pub fn queued(&self) -> usize {
        *self.pending.lock()
    }

    /// Wait for outstanding jobs, then rebuild the pool if the size changed.
    pub fn reset(&mut self, threads: usize) -> crate::Result<()> {
        self.wait_for_all();
        let threads = threads.max(1);
        if threads != self.threads {
            debug!(from = self.threads, to = threads, "resizing worker pool");
            self.pool = build_thread_pool(threads)?;
            self.threads = threads;
        }
        Ok(())
    }

    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        *self.pending.lock() += 1;
        let guard = JobGuard(Arc::clone(&self.pending));
        self.pool.spawn(move || {
            let _guard = guard;
            job();
        });
    }

    /// Block until every enqueued job has finished.
    pub fn wait_for_all(&self) {
        let mut count = self.pending.lock();
        while *count > 0 {
            count = self
                .pending
                .idle
                .wait(count)
                .unwrap_or_else(|e| e.into_inner());
        }
    }
}
