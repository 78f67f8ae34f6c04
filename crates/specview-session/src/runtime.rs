//! Task runtime (C9): a fixed worker pool consuming a FIFO of boxed
//! tasks, with three independent cooperative cancel scopes per session.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender};

/// Default worker count, matching the original's fixed-size pool.
pub const DEFAULT_WORKERS: usize = 3;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Per-session cooperative cancel flags. Long-running loops
/// (histogram/spectral fill, moments, animation) poll the relevant flag
/// at well-defined checkpoints rather than being preempted.
#[derive(Debug, Default)]
pub struct CancelFlags {
    base: AtomicBool,
    histogram: AtomicBool,
    animation: AtomicBool,
}

impl CancelFlags {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn cancel_base(&self) {
        self.base.store(true, Ordering::SeqCst);
    }
    pub fn cancel_histogram(&self) {
        self.histogram.store(true, Ordering::SeqCst);
    }
    pub fn cancel_animation(&self) {
        self.animation.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.base.store(false, Ordering::SeqCst);
        self.histogram.store(false, Ordering::SeqCst);
        self.animation.store(false, Ordering::SeqCst);
    }

    pub fn is_base_cancelled(&self) -> bool {
        self.base.load(Ordering::SeqCst)
    }
    pub fn is_histogram_cancelled(&self) -> bool {
        self.base.load(Ordering::SeqCst) || self.histogram.load(Ordering::SeqCst)
    }
    pub fn is_animation_cancelled(&self) -> bool {
        self.base.load(Ordering::SeqCst) || self.animation.load(Ordering::SeqCst)
    }
}

/// Tracks outstanding tasks captured against a session so the manager
/// never tears one down while work referencing it is in flight.
#[derive(Debug, Default)]
pub struct SessionRefcount(AtomicUsize);

impl SessionRefcount {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
    pub fn decrement(&self) -> usize {
        self.0.fetch_sub(1, Ordering::SeqCst) - 1
    }
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fixed worker pool draining a FIFO of tasks. Dropping the runtime (or
/// calling [`TaskRuntime::shutdown`]) broadcasts a poison pill; each
/// worker drains whatever is already queued, then exits.
pub struct TaskRuntime {
    sender: Sender<Task>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskRuntime {
    pub fn new(worker_count: usize) -> Self {
        let (sender, receiver): (Sender<Task>, Receiver<Task>) = bounded(4096);
        let mut workers = Vec::with_capacity(worker_count.max(1));
        for id in 0..worker_count.max(1) {
            let receiver = receiver.clone();
            workers.push(
                std::thread::Builder::new()
                    .name(format!("specview-worker-{id}"))
                    .spawn(move || {
                        while let Ok(task) = receiver.recv() {
                            task();
                        }
                        tracing::debug!(worker = id, "task runtime worker drained and exiting");
                    })
                    .expect("failed to spawn task runtime worker"),
            );
        }
        Self { sender, workers }
    }

    /// Enqueues a task. Returns `Err` (and drops the task) if the
    /// runtime has already been shut down.
    pub fn submit(&self, task: Task) -> bool {
        self.sender.send(task).is_ok()
    }

    /// Closes the queue and waits for every worker to drain it.
    pub fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

impl Default for TaskRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

/// Configures the rayon global thread pool used for data-parallel loops
/// within a task (the "OpenMP thread pool" of the original). Nested
/// parallel regions are naturally suppressed by rayon's work-stealing
/// scheduler rather than requiring an explicit guard.
pub fn configure_compute_pool(thread_limit: usize) -> std::result::Result<(), rayon::ThreadPoolBuildError> {
    let limit = thread_limit.max(1).min(num_cpus());
    rayon::ThreadPoolBuilder::new().num_threads(limit).build_global()
}

fn num_cpus() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn submitted_tasks_all_run() {
        let runtime = TaskRuntime::new(2);
        let (tx, rx) = mpsc::channel();
        for i in 0..10 {
            let tx = tx.clone();
            runtime.submit(Box::new(move || {
                tx.send(i).unwrap();
            }));
        }
        drop(tx);
        let mut seen: Vec<i32> = rx.iter().collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        runtime.shutdown();
    }

    #[test]
    fn cancel_scopes_are_independent() {
        let flags = CancelFlags::new();
        flags.cancel_histogram();
        assert!(flags.is_histogram_cancelled());
        assert!(!flags.is_animation_cancelled());
        assert!(!flags.is_base_cancelled());
    }

    #[test]
    fn base_cancel_implies_all_scopes() {
        let flags = CancelFlags::new();
        flags.cancel_base();
        assert!(flags.is_histogram_cancelled());
        assert!(flags.is_animation_cancelled());
    }

    #[test]
    fn refcount_reaches_zero_after_matching_decrements() {
        let rc = SessionRefcount::new();
        rc.increment();
        rc.increment();
        assert_eq!(rc.decrement(), 1);
        assert_eq!(rc.decrement(), 0);
    }
}
