//! Worker pool of single-threaded event loops.
//!
//! Each worker is a `current_thread` tokio runtime parked on its own
//! named OS thread. [`WorkerPool::next`] hands workers out round-robin as
//! [`ExecutionContext`]s; anything spawned on a context runs on that one
//! thread.
//!
//! The pool is the only resource shared across requests. It is created
//! explicitly and torn down by [`WorkerPool::close`], which also runs on
//! drop.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::CirrusError;

/// Worker count used when none is configured.
pub fn default_worker_threads() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

// ── ExecutionContext ─────────────────────────────────────────────

/// Handle to one worker's event loop.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    index: usize,
    handle: Handle,
    thread_id: ThreadId,
    closed: Arc<AtomicBool>,
}

impl ExecutionContext {
    /// Position of this worker in its pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns `true` when called from this worker's thread.
    pub fn in_context(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Spawn `future` on this worker.
    pub fn spawn<F>(&self, future: F) -> Result<JoinHandle<F::Output>, CirrusError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.is_closed() {
            return Err(CirrusError::PoolClosed);
        }
        Ok(self.handle.spawn(future))
    }

    /// Run `future` on this worker and wait for its output.
    pub async fn run<F>(&self, future: F) -> Result<F::Output, CirrusError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = self.spawn(future)?;
        handle.await.map_err(|e| {
            if e.is_cancelled() {
                CirrusError::PoolClosed
            } else {
                CirrusError::from(e)
            }
        })
    }
}

// ── WorkerPool ───────────────────────────────────────────────────

#[derive(Debug)]
struct Worker {
    context: ExecutionContext,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

#[derive(Debug)]
pub struct WorkerPool {
    workers: Mutex<Vec<Worker>>,
    contexts: Vec<ExecutionContext>,
    next: AtomicUsize,
    closed: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Start `threads` workers; `0` means one per available core.
    pub fn new(threads: usize) -> Result<Self, CirrusError> {
        let threads = if threads == 0 {
            default_worker_threads()
        } else {
            threads
        };
        let closed = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| CirrusError::Task(format!("worker runtime: {e}")))?;
            let handle = runtime.handle().clone();
            let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

            let thread = thread::Builder::new()
                .name(format!("cirrus-worker-{index}"))
                .spawn(move || {
                    runtime.block_on(async {
                        let _ = shutdown_rx.await;
                    });
                })
                .map_err(|e| CirrusError::Task(format!("worker thread: {e}")))?;

            workers.push(Worker {
                context: ExecutionContext {
                    index,
                    handle,
                    thread_id: thread.thread().id(),
                    closed: closed.clone(),
                },
                shutdown: Some(shutdown_tx),
                thread: Some(thread),
            });
        }

        tracing::debug!(threads, "worker pool started");
        Ok(Self {
            contexts: workers.iter().map(|w| w.context.clone()).collect(),
            workers: Mutex::new(workers),
            next: AtomicUsize::new(0),
            closed,
        })
    }

    /// Next worker, round-robin.
    pub fn next(&self) -> Result<ExecutionContext, CirrusError> {
        if self.is_closed() {
            return Err(CirrusError::PoolClosed);
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.contexts.len();
        Ok(self.contexts[i].clone())
    }

    /// Worker at `index`, if it exists.
    pub fn context(&self, index: usize) -> Option<ExecutionContext> {
        self.contexts.get(index).cloned()
    }

    /// The worker the calling thread belongs to, if any.
    pub fn current(&self) -> Option<ExecutionContext> {
        self.contexts.iter().find(|c| c.in_context()).cloned()
    }

    /// The calling thread's worker, or the next one round-robin.
    pub fn current_or_next(&self) -> Result<ExecutionContext, CirrusError> {
        if self.is_closed() {
            return Err(CirrusError::PoolClosed);
        }
        match self.current() {
            Some(ctx) => Ok(ctx),
            None => self.next(),
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop every worker. Idempotent.
    ///
    /// Work still running on a worker is cancelled. Threads are joined
    /// unless `close` is called from a worker thread itself.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        for worker in workers.iter_mut() {
            if let Some(tx) = worker.shutdown.take() {
                let _ = tx.send(());
            }
        }
        for worker in workers.iter_mut() {
            if worker.context.in_context() {
                continue;
            }
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    tracing::warn!(worker = worker.context.index, "worker thread panicked");
                }
            }
        }
        tracing::debug!(threads = workers.len(), "worker pool closed");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}
