//! Cooperative periodic task.
//!
//! One named loop ticking at a fixed cadence. Each iteration runs the
//! tick callback, then waits for at most one period. The wait can be cut
//! short by a notification, and a stop request ends the loop at the next
//! tick boundary. Firmware never stops it; the loop runs for the life of
//! the device.

use core::ops::ControlFlow;

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Bounded, interruptible wait between ticks.
#[allow(async_fn_in_trait)]
pub trait Wait {
    /// Wait up to `timeout_ms`, returning early when notified.
    async fn wait_for(&mut self, timeout_ms: u64) -> WakeReason;
}

/// Why a wait returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeReason {
    /// The full period elapsed.
    Timeout,
    /// Woken early; tick again now.
    Notified,
    /// Stop requested; the loop ends.
    Stop,
}

/// Lifecycle of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskState {
    NotStarted,
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug)]
pub struct TaskConfig {
    pub name: &'static str,
    pub period_ms: u64,
}

/// Passed to the tick callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickContext {
    /// Zero-based tick counter.
    pub tick: u64,
    /// Milliseconds since `start`.
    pub elapsed_ms: u64,
}

/// Owns the loop lifecycle and its wait primitive.
pub struct TaskHandle<C, W> {
    config: TaskConfig,
    clock: C,
    waiter: W,
    state: TaskState,
    started_at_ms: u64,
    ticks: u64,
    stop_requested: bool,
}

impl<C: Clock, W: Wait> TaskHandle<C, W> {
    pub fn new(config: TaskConfig, clock: C, waiter: W) -> Self {
        Self {
            config,
            clock,
            waiter,
            state: TaskState::NotStarted,
            started_at_ms: 0,
            ticks: 0,
            stop_requested: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.config.name
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.started_at_ms)
    }

    /// Move to `Running` and record the start time.
    ///
    /// Returns `false` if the task was already started or stopped.
    pub fn start(&mut self) -> bool {
        if self.state != TaskState::NotStarted {
            return false;
        }
        self.started_at_ms = self.clock.now_ms();
        self.state = TaskState::Running;
        info!("Task '{}' started ({} ms period)", self.config.name, self.config.period_ms);
        true
    }

    /// Ask the loop to stop before its next tick.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Run one iteration: callback, then a bounded wait.
    pub async fn tick<F>(&mut self, f: &mut F) -> ControlFlow<()>
    where
        F: FnMut(TickContext) -> ControlFlow<()>,
    {
        if self.state != TaskState::Running {
            return ControlFlow::Break(());
        }
        if self.stop_requested {
            return self.stop();
        }

        let ctx = TickContext {
            tick: self.ticks,
            elapsed_ms: self.elapsed_ms(),
        };
        self.ticks += 1;
        if f(ctx).is_break() {
            return self.stop();
        }

        match self.waiter.wait_for(self.config.period_ms).await {
            WakeReason::Timeout => ControlFlow::Continue(()),
            WakeReason::Notified => {
                trace!("Task '{}' woken early", self.config.name);
                ControlFlow::Continue(())
            }
            WakeReason::Stop => self.stop(),
        }
    }

    /// Start the task and tick until it stops.
    pub async fn run<F>(&mut self, mut f: F) -> TaskState
    where
        F: FnMut(TickContext) -> ControlFlow<()>,
    {
        self.start();
        while self.tick(&mut f).await.is_continue() {}
        self.state
    }

    fn stop(&mut self) -> ControlFlow<()> {
        self.state = TaskState::Stopped;
        info!("Task '{}' stopped after {} ticks", self.config.name, self.ticks);
        ControlFlow::Break(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use embassy_futures::block_on;
    use heapless::Vec;

    struct FakeClock<'a>(&'a Cell<u64>);

    impl Clock for FakeClock<'_> {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }
    }

    /// Advances the shared clock by the full timeout, or returns a
    /// scripted reason once the script runs out of timeouts.
    struct FakeWait<'a> {
        now: &'a Cell<u64>,
        script: Vec<WakeReason, 8>,
        waits: Vec<u64, 16>,
    }

    impl Wait for FakeWait<'_> {
        async fn wait_for(&mut self, timeout_ms: u64) -> WakeReason {
            self.waits.push(timeout_ms).unwrap();
            let reason = if self.script.is_empty() {
                WakeReason::Timeout
            } else {
                self.script.remove(0)
            };
            if reason == WakeReason::Timeout {
                self.now.set(self.now.get() + timeout_ms);
            }
            reason
        }
    }

    fn config() -> TaskConfig {
        TaskConfig {
            name: "test",
            period_ms: 1000,
        }
    }

    fn task<'a>(
        now: &'a Cell<u64>,
        script: &[WakeReason],
    ) -> TaskHandle<FakeClock<'a>, FakeWait<'a>> {
        TaskHandle::new(
            config(),
            FakeClock(now),
            FakeWait {
                now,
                script: Vec::from_slice(script).unwrap(),
                waits: Vec::new(),
            },
        )
    }

    #[test]
    fn lifecycle_transitions() {
        let now = Cell::new(500);
        let mut t = task(&now, &[]);
        assert_eq!(t.state(), TaskState::NotStarted);
        assert!(t.start());
        assert_eq!(t.state(), TaskState::Running);
        assert!(!t.start());
        t.request_stop();
        let flow = block_on(t.tick(&mut |_| ControlFlow::Continue(())));
        assert!(flow.is_break());
        assert_eq!(t.state(), TaskState::Stopped);
        assert_eq!(t.ticks(), 0);
    }

    #[test]
    fn tick_before_start_does_nothing() {
        let now = Cell::new(0);
        let mut t = task(&now, &[]);
        let mut called = false;
        let flow = block_on(t.tick(&mut |_| {
            called = true;
            ControlFlow::Continue(())
        }));
        assert!(flow.is_break());
        assert!(!called);
        assert_eq!(t.state(), TaskState::NotStarted);
    }

    #[test]
    fn ticks_at_fixed_cadence_with_elapsed_time() {
        let now = Cell::new(10_000);
        let mut t = task(&now, &[]);
        let mut seen: Vec<TickContext, 8> = Vec::new();

        let state = block_on(t.run(|ctx| {
            seen.push(ctx).unwrap();
            if ctx.tick == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }));

        assert_eq!(state, TaskState::Stopped);
        let elapsed: Vec<u64, 8> = seen.iter().map(|c| c.elapsed_ms).collect();
        assert_eq!(elapsed.as_slice(), &[0, 1000, 2000, 3000]);
        assert_eq!(t.waiter.waits.as_slice(), &[1000, 1000, 1000]);
    }

    #[test]
    fn early_wake_ticks_again_without_time_passing() {
        let now = Cell::new(0);
        let mut t = task(&now, &[WakeReason::Notified]);
        let mut elapsed: Vec<u64, 8> = Vec::new();

        block_on(t.run(|ctx| {
            elapsed.push(ctx.elapsed_ms).unwrap();
            if ctx.tick == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }));

        assert_eq!(elapsed.as_slice(), &[0, 0, 1000]);
    }

    #[test]
    fn stop_wake_ends_loop() {
        let now = Cell::new(0);
        let mut t = task(&now, &[WakeReason::Timeout, WakeReason::Stop]);
        let mut count = 0;
        let state = block_on(t.run(|_| {
            count += 1;
            ControlFlow::Continue(())
        }));
        assert_eq!(state, TaskState::Stopped);
        assert_eq!(count, 2);
        assert_eq!(t.ticks(), 2);
    }

    #[test]
    fn stopped_task_cannot_restart() {
        let now = Cell::new(0);
        let mut t = task(&now, &[WakeReason::Stop]);
        block_on(t.run(|_| ControlFlow::Continue(())));
        assert!(!t.start());
        assert_eq!(t.state(), TaskState::Stopped);
    }
}
