//! Worker pools and per-thread decoder reuse.
//!
//! Two pools drive every DNG read: a small I/O pool whose workers own one
//! container decoder per source path (amortizing the open cost across
//! reads), and a processing pool sized to the machine for the CPU-bound
//! encode. Tasks are plain closures fed over an mpsc channel; results come
//! back through a [`TaskHandle`].
//!
//! Task panics are caught and logged on the worker so a failing render
//! can never take the process down; the submitter observes a dropped
//! result channel.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{debug, error};

use crate::container::{ContainerDecoder, DecoderFactory};
use crate::error::VfsError;

/// Default worker count for the I/O pool.
pub const DEFAULT_IO_THREADS: usize = 4;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size pool of worker threads executing submitted closures.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `threads` named workers.
    pub fn new(name: &str, threads: usize) -> Result<Self, VfsError> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(threads);
        for i in 0..threads.max(1) {
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("{name}-{i}"))
                .spawn(move || loop {
                    let job = { receiver.lock().unwrap().recv() };
                    match job {
                        Ok(job) => {
                            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                                error!("worker task panicked");
                            }
                        }
                        Err(_) => break,
                    }
                })
                .map_err(|e| VfsError::Internal(format!("failed to spawn worker: {e}")))?;
            workers.push(handle);
        }

        debug!(name, threads = workers.len(), "worker pool started");

        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// A pool sized to the machine's available parallelism.
    pub fn with_default_size(name: &str) -> Result<Self, VfsError> {
        let threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(DEFAULT_IO_THREADS);
        Self::new(name, threads)
    }

    /// Submit a task and get a handle on its eventual result.
    pub fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let job: Job = Box::new(move || {
            let _ = tx.send(task());
        });

        if let Some(sender) = &self.sender {
            let _ = sender.send(job);
        }

        TaskHandle { receiver: rx }
    }

    /// Number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel drains queued work, then workers exit.
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// The pending result of a submitted task.
pub struct TaskHandle<T> {
    receiver: Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Block until the task completes.
    ///
    /// Fails if the task panicked or the pool shut down before running it.
    pub fn wait(self) -> Result<T, VfsError> {
        self.receiver
            .recv()
            .map_err(|_| VfsError::Internal("worker task dropped without a result".to_string()))
    }
}

/// Keyed decoder pool: one open decoder per (worker thread, source path).
///
/// I/O workers call [`with_decoder`](Self::with_decoder) from inside pool
/// tasks; the first call on a given thread opens the container, later
/// calls reuse it without touching other threads' instances.
pub struct DecoderPool {
    factory: Arc<dyn DecoderFactory>,
    decoders: Mutex<HashMap<(ThreadId, PathBuf), Arc<Mutex<Box<dyn ContainerDecoder>>>>>,
}

impl DecoderPool {
    pub fn new(factory: Arc<dyn DecoderFactory>) -> Self {
        Self {
            factory,
            decoders: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` with this thread's decoder for `path`, opening it if needed.
    pub fn with_decoder<R>(
        &self,
        path: &Path,
        f: impl FnOnce(&mut dyn ContainerDecoder) -> Result<R, VfsError>,
    ) -> Result<R, VfsError> {
        let key = (thread::current().id(), path.to_path_buf());

        let decoder = {
            let mut decoders = self.decoders.lock().unwrap();
            match decoders.get(&key) {
                Some(decoder) => Arc::clone(decoder),
                None => {
                    debug!(path = %path.display(), "opening decoder for worker thread");
                    let opened = Arc::new(Mutex::new(self.factory.open(path)?));
                    decoders.insert(key, Arc::clone(&opened));
                    opened
                }
            }
        };

        let mut guard = decoder.lock().unwrap();
        f(&mut **guard)
    }

    /// Drop every thread's decoder for `path` (source unmounted).
    pub fn evict_source(&self, path: &Path) {
        let mut decoders = self.decoders.lock().unwrap();
        decoders.retain(|(_, source), _| source != path);
    }

    /// Number of currently open decoders across all threads.
    pub fn open_count(&self) -> usize {
        self.decoders.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{AudioChunk, RawFrame};
    use crate::entry::Timestamp;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_submit_returns_result() {
        let pool = WorkerPool::new("test", 2).unwrap();
        let handle = pool.submit(|| 40 + 2);
        assert_eq!(handle.wait().unwrap(), 42);
    }

    #[test]
    fn test_tasks_run_concurrently_across_workers() {
        let pool = WorkerPool::new("test", 4).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                pool.submit(move || {
                    thread::sleep(Duration::from_millis(10));
                    i * 2
                })
            })
            .collect();

        let results: Vec<i32> = handles.into_iter().map(|h| h.wait().unwrap()).collect();
        assert_eq!(results, vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[test]
    fn test_panicking_task_does_not_kill_pool() {
        let pool = WorkerPool::new("test", 1).unwrap();

        let bad = pool.submit(|| -> i32 { panic!("boom") });
        assert!(bad.wait().is_err());

        // Same single worker still serves new tasks.
        let good = pool.submit(|| 7);
        assert_eq!(good.wait().unwrap(), 7);
    }

    #[test]
    fn test_drop_drains_queued_work() {
        let pool = WorkerPool::new("test", 1).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                thread::sleep(Duration::from_millis(5));
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        drop(pool);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_zero_threads_clamped_to_one() {
        let pool = WorkerPool::new("test", 0).unwrap();
        assert_eq!(pool.thread_count(), 1);
        assert_eq!(pool.submit(|| 1).wait().unwrap(), 1);
    }

    struct CountingDecoder;

    impl ContainerDecoder for CountingDecoder {
        fn frame_timestamps(&mut self) -> Result<Vec<Timestamp>, VfsError> {
            Ok(vec![0])
        }
        fn load_frame(&mut self, _timestamp: Timestamp) -> Result<RawFrame, VfsError> {
            Err(VfsError::Io("no frames".to_string()))
        }
        fn container_metadata(&mut self) -> Result<serde_json::Value, VfsError> {
            Ok(serde_json::json!({}))
        }
        fn load_audio(&mut self) -> Result<Vec<AudioChunk>, VfsError> {
            Ok(Vec::new())
        }
        fn audio_channels(&self) -> u32 {
            0
        }
        fn audio_sample_rate_hz(&self) -> u32 {
            0
        }
    }

    struct CountingFactory {
        opens: Arc<AtomicUsize>,
    }

    impl DecoderFactory for CountingFactory {
        fn open(&self, _path: &Path) -> Result<Box<dyn ContainerDecoder>, VfsError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingDecoder))
        }
    }

    #[test]
    fn test_decoder_reused_on_same_thread() {
        let opens = Arc::new(AtomicUsize::new(0));
        let pool = DecoderPool::new(Arc::new(CountingFactory {
            opens: Arc::clone(&opens),
        }));
        let path = Path::new("/clips/a.mcraw");

        for _ in 0..5 {
            pool.with_decoder(path, |d| d.frame_timestamps()).unwrap();
        }

        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(pool.open_count(), 1);
    }

    #[test]
    fn test_decoder_per_source_path() {
        let opens = Arc::new(AtomicUsize::new(0));
        let pool = DecoderPool::new(Arc::new(CountingFactory {
            opens: Arc::clone(&opens),
        }));

        pool.with_decoder(Path::new("/a.mcraw"), |d| d.frame_timestamps())
            .unwrap();
        pool.with_decoder(Path::new("/b.mcraw"), |d| d.frame_timestamps())
            .unwrap();

        assert_eq!(opens.load(Ordering::SeqCst), 2);
        assert_eq!(pool.open_count(), 2);
    }

    #[test]
    fn test_decoder_per_thread() {
        let opens = Arc::new(AtomicUsize::new(0));
        let pool = Arc::new(DecoderPool::new(Arc::new(CountingFactory {
            opens: Arc::clone(&opens),
        })));

        pool.with_decoder(Path::new("/a.mcraw"), |d| d.frame_timestamps())
            .unwrap();

        let worker = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                pool.with_decoder(Path::new("/a.mcraw"), |d| d.frame_timestamps())
            })
        };
        worker.join().unwrap().unwrap();

        assert_eq!(opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_evict_source() {
        let opens = Arc::new(AtomicUsize::new(0));
        let pool = DecoderPool::new(Arc::new(CountingFactory {
            opens: Arc::clone(&opens),
        }));

        pool.with_decoder(Path::new("/a.mcraw"), |d| d.frame_timestamps())
            .unwrap();
        pool.with_decoder(Path::new("/b.mcraw"), |d| d.frame_timestamps())
            .unwrap();
        pool.evict_source(Path::new("/a.mcraw"));

        assert_eq!(pool.open_count(), 1);
    }

    #[test]
    fn test_factory_error_propagates() {
        struct FailingFactory;
        impl DecoderFactory for FailingFactory {
            fn open(&self, path: &Path) -> Result<Box<dyn ContainerDecoder>, VfsError> {
                Err(VfsError::InvalidFormat(format!(
                    "cannot open {}",
                    path.display()
                )))
            }
        }

        let pool = DecoderPool::new(Arc::new(FailingFactory));
        let err = pool
            .with_decoder(Path::new("/bad.mcraw"), |d| d.frame_timestamps())
            .unwrap_err();
        assert!(matches!(err, VfsError::InvalidFormat(_)));
    }
}
