use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::debug;

use crate::queue::BlockingQueue;

use super::worker;
use super::{FineGrainedPool, Shared};

pub(crate) type ThreadNameFn = Arc<dyn Fn() -> String + Send + Sync + 'static>;

fn default_thread_name_fn() -> ThreadNameFn {
    let counter = Arc::new(AtomicUsize::new(0));

    Arc::new(move || {
        let prev = counter.fetch_add(1, Ordering::Relaxed);
        format!("stepwise-worker-{}", prev)
    })
}

/// Configures and builds a [`FineGrainedPool`].
///
/// ```
/// use stepwise::pool::Builder;
///
/// let pool = Builder::new()
///     .worker_threads(2)
///     .thread_name("ingest")
///     .try_build()
///     .expect("failed to start pool");
/// assert_eq!(pool.worker_count(), 2);
/// ```
pub struct Builder {
    /// The number of worker threads.
    ///
    /// Defaults to 1 worker per CPU core.
    worker_threads: Option<usize>,

    /// Name fn used for threads spawned by the pool.
    thread_name: ThreadNameFn,

    /// Stack size used for threads spawned by the pool.
    thread_stack_size: Option<usize>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            worker_threads: None,
            thread_name: default_thread_name_fn(),
            thread_stack_size: None,
        }
    }

    pub fn worker_threads(&mut self, val: usize) -> &mut Self {
        assert!(val > 0, "Worker threads cannot be set to 0");
        self.worker_threads = Some(val);
        self
    }

    /// Sets the name of threads spawned by the pool.
    ///
    /// The default name is "stepwise-worker-{N}".
    pub fn thread_name(&mut self, val: impl Into<String>) -> &mut Self {
        let val = val.into();
        self.thread_name = Arc::new(move || val.clone());
        self
    }

    /// Sets a function used to generate the name of threads spawned by the
    /// pool.
    pub fn thread_name_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.thread_name = Arc::new(f);
        self
    }

    /// Sets the stack size (in bytes) for worker threads.
    ///
    /// The actual stack size may be greater than this value if the platform
    /// specifies a minimal stack size.
    pub fn thread_stack_size(&mut self, val: usize) -> &mut Self {
        self.thread_stack_size = Some(val);
        self
    }

    /// Spawns the workers and returns the ready pool.
    ///
    /// If a spawn fails mid-construction, the already-started workers are
    /// signalled and joined before the error propagates.
    pub fn try_build(&mut self) -> io::Result<FineGrainedPool> {
        let threads = self.worker_threads.unwrap_or_else(detect_parallelism);

        let shared = Arc::new(Shared {
            tasks: BlockingQueue::new(),
            is_working: AtomicBool::new(true),
        });

        let mut workers = Vec::with_capacity(threads);
        for _ in 0..threads {
            let mut builder = thread::Builder::new().name((self.thread_name)());
            if let Some(stack_size) = self.thread_stack_size {
                builder = builder.stack_size(stack_size);
            }

            let spawned = builder.spawn({
                let shared = Arc::clone(&shared);
                move || worker::run(shared)
            });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shared.is_working.store(false, Ordering::Release);
                    shared.tasks.disable_wait();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(e);
                }
            }
        }

        debug!(threads, "fine-grained pool started");
        Ok(FineGrainedPool::from_parts(shared, workers))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

fn detect_parallelism() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
