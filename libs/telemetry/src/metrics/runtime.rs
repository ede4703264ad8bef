use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const STOP_POLL: Duration = Duration::from_millis(250);

/// Runs a periodic job on a dedicated OS thread, off the async workers.
pub struct Runtime {
    interval: Duration,
    stop: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Runtime {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stop: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Starting twice is a no-op.
    pub fn start<F>(&self, job: F) -> std::io::Result<()>
    where
        F: Fn() + Send + 'static,
    {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Ok(());
        }

        let stop = Arc::clone(&self.stop);
        let interval = self.interval;
        let thread = std::thread::Builder::new()
            .name("telemetry-refresh".to_string())
            .spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    job();

                    let next = Instant::now() + interval;
                    while Instant::now() < next {
                        if stop.load(Ordering::Relaxed) {
                            return;
                        }
                        std::thread::sleep(STOP_POLL.min(interval));
                    }
                }
            })?;

        *handle = Some(thread);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some() && !self.stop.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.stop();
    }
}
