// src/attempt/timer.rs

use std::{fmt, sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant},
};

/// Colour band of the remaining-time indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// At least 60% of the time left.
    Nominal,
    /// Between 30% and 60% left.
    Warning,
    /// Less than 30% left.
    Critical,
}

impl Severity {
    pub fn for_percentage(percentage_remaining: f64) -> Self {
        if percentage_remaining < 30.0 {
            Severity::Critical
        } else if percentage_remaining < 60.0 {
            Severity::Warning
        } else {
            Severity::Nominal
        }
    }
}

/// Snapshot of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerProgress {
    pub remaining_seconds: u32,
    pub total_seconds: u32,
}

impl TimerProgress {
    pub fn minutes(&self) -> u32 {
        self.remaining_seconds / 60
    }

    pub fn seconds(&self) -> u32 {
        self.remaining_seconds % 60
    }

    pub fn percentage_remaining(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        f64::from(self.remaining_seconds) / f64::from(self.total_seconds) * 100.0
    }

    pub fn severity(&self) -> Severity {
        Severity::for_percentage(self.percentage_remaining())
    }
}

impl fmt::Display for TimerProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes(), self.seconds())
    }
}

/// Result of feeding one elapsed second into a [`CountdownState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running(u32),
    /// Reached zero on this tick. Returned once per countdown.
    Expired,
    /// Already expired earlier.
    Idle,
}

/// Countdown bookkeeping without any clock attached.
#[derive(Debug, Clone)]
pub struct CountdownState {
    total: u32,
    remaining: u32,
    fired: bool,
}

impl CountdownState {
    pub fn new(total_seconds: u32) -> Self {
        Self {
            total: total_seconds,
            remaining: total_seconds,
            fired: false,
        }
    }

    pub fn tick(&mut self) -> Tick {
        if self.fired {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.fired = true;
            Tick::Expired
        } else {
            Tick::Running(self.remaining)
        }
    }

    pub fn progress(&self) -> TimerProgress {
        TimerProgress {
            remaining_seconds: self.remaining,
            total_seconds: self.total,
        }
    }
}

/// Read-only view of a running countdown, cheap to clone and hand to a display task.
#[derive(Debug, Clone)]
pub struct TimerWatch {
    total: u32,
    remaining: watch::Receiver<u32>,
}

impl TimerWatch {
    pub fn progress(&self) -> TimerProgress {
        TimerProgress {
            remaining_seconds: *self.remaining.borrow(),
            total_seconds: self.total,
        }
    }

    /// Waits for the next tick. Errors once the countdown has been cancelled or finished.
    pub async fn changed(&mut self) -> Result<TimerProgress, watch::error::RecvError> {
        self.remaining.changed().await?;
        Ok(self.progress())
    }
}

const TICK: Duration = Duration::from_secs(1);

type ExpiryHook = Arc<dyn Fn() + Send + Sync>;

/// One-second countdown running on the tokio runtime.
///
/// The expiry hook runs at most once per run. Cancelling, restarting or dropping
/// the countdown aborts its task, so a discarded countdown can never fire.
pub struct Countdown {
    watch: TimerWatch,
    on_expire: Option<ExpiryHook>,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    /// Starts a countdown with no hook; await [`Countdown::expired`] instead.
    pub fn start(duration_seconds: u32) -> Self {
        Self::spawn(duration_seconds, None)
    }

    /// Starts a countdown that calls `on_expire` when it reaches zero.
    pub fn with_expiry<F>(duration_seconds: u32, on_expire: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::spawn(duration_seconds, Some(Arc::new(on_expire)))
    }

    fn spawn(duration_seconds: u32, on_expire: Option<ExpiryHook>) -> Self {
        let (tx, rx) = watch::channel(duration_seconds);
        // First tick is one second after the call, not after the task is first polled.
        let first_tick = Instant::now() + TICK;
        let task = tokio::spawn(run(
            CountdownState::new(duration_seconds),
            first_tick,
            tx,
            on_expire.clone(),
        ));

        Self {
            watch: TimerWatch {
                total: duration_seconds,
                remaining: rx,
            },
            on_expire,
            task: Some(task),
        }
    }

    pub fn progress(&self) -> TimerProgress {
        self.watch.progress()
    }

    pub fn remaining(&self) -> u32 {
        self.progress().remaining_seconds
    }

    pub fn watch(&self) -> TimerWatch {
        self.watch.clone()
    }

    /// True while the countdown task is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Resolves when the countdown reaches zero. Never resolves after a cancel.
    pub async fn expired(&mut self) {
        let closed = self
            .watch
            .remaining
            .wait_for(|remaining| *remaining == 0)
            .await
            .is_err();

        if closed {
            std::future::pending::<()>().await;
        }
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Cancels the current run and starts again from `duration_seconds`,
    /// keeping the same expiry hook.
    pub fn restart(&mut self, duration_seconds: u32) {
        self.cancel();
        *self = Self::spawn(duration_seconds, self.on_expire.take());
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Countdown")
            .field("progress", &self.progress())
            .field("running", &self.is_running())
            .finish()
    }
}

async fn run(
    mut state: CountdownState,
    first_tick: Instant,
    tx: watch::Sender<u32>,
    on_expire: Option<ExpiryHook>,
) {
    let mut ticker = time::interval_at(first_tick, TICK);

    loop {
        ticker.tick().await;
        match state.tick() {
            Tick::Running(remaining) => {
                tx.send_replace(remaining);
            }
            Tick::Expired => {
                tx.send_replace(0);
                if let Some(hook) = &on_expire {
                    hook();
                }
                break;
            }
            Tick::Idle => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let hook = {
            let fired = fired.clone();
            move || {
                fired.fetch_add(1, Ordering::SeqCst);
            }
        };
        (fired, hook)
    }

    #[test]
    fn state_expires_exactly_once() {
        let mut state = CountdownState::new(2);
        assert_eq!(state.tick(), Tick::Running(1));
        assert_eq!(state.tick(), Tick::Expired);
        assert_eq!(state.tick(), Tick::Idle);
        assert_eq!(state.tick(), Tick::Idle);
        assert_eq!(state.progress().remaining_seconds, 0);
    }

    #[test]
    fn progress_formatting_and_bands() {
        let p = TimerProgress {
            remaining_seconds: 75,
            total_seconds: 100,
        };
        assert_eq!(p.to_string(), "01:15");
        assert_eq!(p.severity(), Severity::Nominal);

        let band = |remaining| {
            TimerProgress {
                remaining_seconds: remaining,
                total_seconds: 100,
            }
            .severity()
        };
        assert_eq!(band(60), Severity::Nominal);
        assert_eq!(band(59), Severity::Warning);
        assert_eq!(band(30), Severity::Warning);
        assert_eq!(band(29), Severity::Critical);
        assert_eq!(band(0), Severity::Critical);
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_and_fires_once() {
        let (fired, hook) = counter();
        let countdown = Countdown::with_expiry(3, hook);

        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(countdown.remaining(), 2);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(countdown.remaining(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!countdown.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_expiry() {
        let (fired, hook) = counter();
        let mut countdown = Countdown::with_expiry(3, hook);

        time::sleep(Duration::from_millis(1500)).await;
        countdown.cancel();
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(countdown.remaining(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cancels() {
        let (fired, hook) = counter();
        let countdown = Countdown::with_expiry(2, hook);
        drop(countdown);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_begins_a_fresh_run() {
        let (fired, hook) = counter();
        let mut countdown = Countdown::with_expiry(2, hook);

        time::sleep(Duration::from_millis(1500)).await;
        countdown.restart(5);
        assert_eq!(countdown.remaining(), 5);

        time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(countdown.remaining(), 2);

        time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clock_starts_when_requested() {
        let countdown = Countdown::start(5);
        // Time moves before the countdown task is first polled.
        time::advance(Duration::from_millis(2500)).await;
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(countdown.remaining(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_future_resolves_at_zero() {
        let mut countdown = Countdown::start(4);
        let start = Instant::now();
        countdown.expired().await;
        assert!(start.elapsed() >= Duration::from_secs(4));
        assert_eq!(countdown.progress().percentage_remaining(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn watch_reports_ticks() {
        let countdown = Countdown::start(10);
        let mut watch = countdown.watch();
        let progress = watch.changed().await.unwrap();
        assert_eq!(progress.remaining_seconds, 9);
        assert_eq!(progress.percentage_remaining(), 90.0);
    }
}
