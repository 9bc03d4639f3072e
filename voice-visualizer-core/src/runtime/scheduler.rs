use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::clock::{Clock, ManualClock};

/// Work run on every tick of a repeating task.
///
/// Receives the task's own token so it can re-check cancellation under
/// whatever lock it takes.
pub type Tick = Box<dyn FnMut(&CancelToken) + Send + 'static>;

/// How often a repeating task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Once per display frame.
    Frame,
    /// At a fixed period.
    Every(Duration),
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Owning handle to a repeating task. Dropping it cancels the task.
///
/// Handles from `ThreadScheduler` also own the worker thread; `join` waits
/// for it to exit.
#[derive(Debug)]
pub struct TaskHandle {
    token: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            worker: None,
        }
    }

    pub fn with_worker(token: CancelToken, worker: JoinHandle<()>) -> Self {
        Self {
            token,
            worker: Some(worker),
        }
    }

    /// Flag the task cancelled and wake its worker. Does not wait.
    pub fn cancel(&self) {
        self.token.cancel();
        if let Some(worker) = self.worker.as_ref() {
            worker.thread().unpark();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Cancel and wait for the worker thread to finish its current tick.
    ///
    /// Must not be called while holding a lock the tick takes.
    pub fn join(mut self) {
        self.cancel();
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            return;
        }
        let name = worker.thread().name().unwrap_or("task").to_string();
        if worker.join().is_err() {
            log::error!("{} thread panicked", name);
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Join every handle in turn. Call after releasing any lock the ticks take.
pub fn join_all(handles: impl IntoIterator<Item = TaskHandle>) {
    for handle in handles {
        handle.join();
    }
}

/// Runs self-rescheduling tasks until their handle is cancelled.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, name: &'static str, cadence: Cadence, tick: Tick) -> TaskHandle;
}

/// One named thread per task, parked between ticks.
///
/// Cancelling a handle unparks the thread so it exits without waiting out
/// the rest of its period.
#[derive(Debug, Clone)]
pub struct ThreadScheduler {
    frame_interval: Duration,
    live: Arc<AtomicUsize>,
}

impl ThreadScheduler {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            frame_interval,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Worker threads that have not exited yet, across every clone.
    pub fn live_threads(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, name: &'static str, cadence: Cadence, mut tick: Tick) -> TaskHandle {
        let token = CancelToken::new();
        let period = match cadence {
            Cadence::Frame => self.frame_interval,
            Cadence::Every(period) => period,
        };

        let running = token.clone();
        let live = Arc::clone(&self.live);
        live.fetch_add(1, Ordering::SeqCst);
        let spawned = thread::Builder::new().name(name.into()).spawn(move || {
            let mut next = Instant::now() + period;
            while !running.is_cancelled() {
                let now = Instant::now();
                if now < next {
                    thread::park_timeout(next - now);
                    continue;
                }
                next += period;
                tick(&running);
            }
            live.fetch_sub(1, Ordering::SeqCst);
        });

        match spawned {
            Ok(worker) => TaskHandle::with_worker(token, worker),
            Err(e) => {
                log::error!("failed to spawn {} thread: {}", name, e);
                self.live.fetch_sub(1, Ordering::SeqCst);
                token.cancel();
                TaskHandle::new(token)
            }
        }
    }
}

struct Entry {
    name: &'static str,
    token: CancelToken,
    cadence: Cadence,
    next_due: Duration,
    tick: Arc<Mutex<Tick>>,
}

/// Host-driven scheduler.
///
/// Frame tasks run on `run_frame`; interval tasks run inside `advance`, with
/// the shared `ManualClock` set to each task's due instant before it fires.
#[derive(Clone)]
pub struct ManualScheduler {
    entries: Arc<Mutex<Vec<Entry>>>,
    clock: ManualClock,
}

impl ManualScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            clock,
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Run every live frame task once. Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let due: Vec<(CancelToken, Arc<Mutex<Tick>>)> = {
            let mut entries = self.entries.lock();
            entries.retain(|e| !e.token.is_cancelled());
            entries
                .iter()
                .filter(|e| e.cadence == Cadence::Frame)
                .map(|e| (e.token.clone(), Arc::clone(&e.tick)))
                .collect()
        };

        let mut ran = 0;
        for (token, tick) in due {
            if token.is_cancelled() {
                continue;
            }
            let mut tick = tick.lock();
            (*tick)(&token);
            ran += 1;
        }
        ran
    }

    /// Move the clock forward, firing interval tasks in due order.
    pub fn advance(&self, by: Duration) {
        let target = self.clock.now() + by;
        loop {
            let next = {
                let mut entries = self.entries.lock();
                entries.retain(|e| !e.token.is_cancelled());
                let earliest = entries
                    .iter_mut()
                    .filter_map(|e| {
                        let cadence = e.cadence;
                        match cadence {
                            Cadence::Every(period) if e.next_due <= target => Some((period, e)),
                            _ => None,
                        }
                    })
                    .min_by_key(|(_, e)| e.next_due);
                earliest.map(|(period, e)| {
                    let due = e.next_due;
                    e.next_due += period;
                    (due, e.token.clone(), Arc::clone(&e.tick))
                })
            };

            let Some((due, token, tick)) = next else {
                break;
            };
            if due > self.clock.now() {
                self.clock.set(due);
            }
            let mut tick = tick.lock();
            (*tick)(&token);
        }
        self.clock.set(target);
    }

    /// Tasks whose handles have not been cancelled.
    pub fn active_tasks(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| !e.token.is_cancelled())
            .count()
    }

    /// Names of live tasks, for leak assertions.
    pub fn active_task_names(&self) -> Vec<&'static str> {
        self.entries
            .lock()
            .iter()
            .filter(|e| !e.token.is_cancelled())
            .map(|e| e.name)
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, name: &'static str, cadence: Cadence, tick: Tick) -> TaskHandle {
        let token = CancelToken::new();
        let next_due = match cadence {
            Cadence::Frame => Duration::ZERO,
            Cadence::Every(period) => self.clock.now() + period,
        };
        self.entries.lock().push(Entry {
            name,
            token: token.clone(),
            cadence,
            next_due,
            tick: Arc::new(Mutex::new(tick)),
        });
        TaskHandle::new(token)
    }
}
