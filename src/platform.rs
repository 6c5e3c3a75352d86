//! Embassy-backed clock and wait for the periodic task driver.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Timer};

use usb_hid_vcp::task::{Clock, Wait, WakeReason};

/// Out-of-band requests for the periodic task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum TaskSignal {
    /// Tick again without waiting out the period.
    Wake,
    /// End the loop at the next tick boundary.
    Stop,
}

/// Notification channel into the heartbeat task.
pub static TASK_SIGNAL: Signal<CriticalSectionRawMutex, TaskSignal> = Signal::new();

/// Milliseconds since boot from the RTC time driver.
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

/// Timer wait that a [`TaskSignal`] can cut short.
pub struct SignalWait {
    signal: &'static Signal<CriticalSectionRawMutex, TaskSignal>,
}

impl SignalWait {
    pub const fn new(signal: &'static Signal<CriticalSectionRawMutex, TaskSignal>) -> Self {
        Self { signal }
    }
}

impl Wait for SignalWait {
    async fn wait_for(&mut self, timeout_ms: u64) -> WakeReason {
        match select(Timer::after_millis(timeout_ms), self.signal.wait()).await {
            Either::First(()) => WakeReason::Timeout,
            Either::Second(TaskSignal::Wake) => WakeReason::Notified,
            Either::Second(TaskSignal::Stop) => WakeReason::Stop,
        }
    }
}
