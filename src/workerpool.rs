//! A bounded, FIFO worker pool for parallelizing diff matching and
//! insert-to-repeat rewriting.
//!
//! The reference implementation (`Threader`) spun each worker in a loop that
//! repeatedly tried to lock a shared deque and spun if it couldn't — a
//! busy-wait that pegs every worker's core at 100% even when idle. Here each
//! worker blocks on a condition variable instead, waking only when a job is
//! pushed or the pool is told to stop.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::util::count_cores;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    queue_cv: Condvar,
    counts: Mutex<Counts>,
    counts_cv: Condvar,
    alive: std::sync::atomic::AtomicBool,
    keep_open: std::sync::atomic::AtomicBool,
}

#[derive(Default)]
struct Counts {
    submitted: u64,
    completed: u64,
}

/// A fixed-size pool of worker threads that execute submitted closures.
///
/// Jobs are popped from the queue in FIFO order but run in parallel, so the
/// pool makes no guarantee about the order in which they *finish*. Callers
/// that need a total order over side effects (the [`crate::differ`] module
/// does) must impose it themselves, e.g. with their own collection mutex.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn a pool of `max_threads` workers, clamped to
    /// `[1, hardware_parallelism]`.
    pub fn new(max_threads: usize) -> Self {
        let max_threads = max_threads.clamp(1, count_cores());

        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            queue_cv: Condvar::new(),
            counts: Mutex::new(Counts::default()),
            counts_cv: Condvar::new(),
            alive: std::sync::atomic::AtomicBool::new(true),
            keep_open: std::sync::atomic::AtomicBool::new(true),
        });

        let workers = (0..max_threads)
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || worker_loop(shared))
            })
            .collect();

        Self { shared, workers }
    }

    /// Push a job onto the queue. Increments the submitted-job counter
    /// immediately, before any worker has had a chance to pick it up.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut counts = self.shared.counts.lock().unwrap();
            counts.submitted += 1;
        }
        {
            let mut queue = self.shared.queue.lock().unwrap();
            queue.push_back(Box::new(job));
        }
        self.shared.queue_cv.notify_one();
    }

    /// `true` iff every submitted job has finished running.
    pub fn is_idle(&self) -> bool {
        let counts = self.shared.counts.lock().unwrap();
        counts.submitted == counts.completed
    }

    /// Block the calling thread until every submitted job has finished.
    pub fn wait_idle(&self) {
        let counts = self.shared.counts.lock().unwrap();
        let _unused = self
            .shared
            .counts_cv
            .wait_while(counts, |c| c.submitted != c.completed)
            .unwrap();
    }

    /// Stop accepting new work once the queue drains; in-flight jobs run to
    /// completion, queued-but-unstarted jobs still get picked up.
    pub fn prepare_for_shutdown(&self) {
        self.shared
            .keep_open
            .store(false, std::sync::atomic::Ordering::SeqCst);
        self.shared.queue_cv.notify_all();
    }

    /// Force an immediate stop: drops any still-pending jobs and joins every
    /// worker thread. In-flight jobs are not interrupted — they cannot be,
    /// since the pool has no way to preempt a running closure.
    pub fn shutdown(&mut self) {
        self.shared
            .alive
            .store(false, std::sync::atomic::Ordering::SeqCst);
        self.shared
            .keep_open
            .store(false, std::sync::atomic::Ordering::SeqCst);
        self.shared.queue_cv.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        self.shared.queue.lock().unwrap().clear();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }
                if !shared.alive.load(std::sync::atomic::Ordering::SeqCst)
                    || !shared.keep_open.load(std::sync::atomic::Ordering::SeqCst)
                {
                    break None;
                }
                queue = shared.queue_cv.wait(queue).unwrap();
            }
        };

        let Some(job) = job else {
            return;
        };

        job();

        let mut counts = shared.counts.lock().unwrap();
        counts.completed += 1;
        if counts.submitted == counts.completed {
            shared.counts_cv.notify_all();
        }
    }
}
