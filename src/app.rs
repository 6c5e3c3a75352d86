//! The composite application tick.
//!
//! Runs inside the periodic task: log a heartbeat, mirror it to the
//! serial port when a host has it open, then drive the HID cursor.

use core::fmt::Write;
use core::ops::ControlFlow;

use heapless::String;

use crate::cdc::CdcTransport;
use crate::hid::{tick_hid, HidCursorState, HidTick, HidTransport};
use crate::task::TickContext;
use crate::ChannelId;

/// Fits the heartbeat line for any `u64` elapsed time.
pub const HEARTBEAT_CAPACITY: usize = 64;

/// Format the heartbeat line for `elapsed_ms`.
///
/// `"[12.345] Hello from the task!\r\n"`
pub fn heartbeat_line(elapsed_ms: u64) -> String<HEARTBEAT_CAPACITY> {
    let mut line = String::new();
    let _ = write!(
        line,
        "[{}.{:03}] Hello from the task!\r\n",
        elapsed_ms / 1000,
        elapsed_ms % 1000
    );
    line
}

/// What one application tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Heartbeat bytes queued to the CDC port (0 when no host).
    pub cdc_bytes: usize,
    pub hid: HidTick,
}

/// Application state owned by the periodic task.
pub struct CompositeApp {
    cdc_channel: ChannelId,
    hid_channel: ChannelId,
    cursor: HidCursorState,
}

impl CompositeApp {
    /// The cursor starts at rest.
    pub const fn new(cdc_channel: ChannelId, hid_channel: ChannelId) -> Self {
        Self {
            cdc_channel,
            hid_channel,
            cursor: HidCursorState::new(),
        }
    }

    pub const fn cursor(&self) -> &HidCursorState {
        &self.cursor
    }

    /// One heartbeat tick.
    pub fn tick<C, H>(&mut self, ctx: TickContext, cdc: &mut C, hid: &mut H) -> TickReport
    where
        C: CdcTransport + ?Sized,
        H: HidTransport + ?Sized,
    {
        let line = heartbeat_line(ctx.elapsed_ms);
        debug!("{}", line.as_str());

        let mut cdc_bytes = 0;
        if cdc.connected(self.cdc_channel) {
            cdc_bytes = cdc.write_enqueue(self.cdc_channel, line.as_bytes());
            cdc.write_flush(self.cdc_channel, 0);
        }

        let hid = tick_hid(self.hid_channel, &mut self.cursor, hid);
        TickReport { cdc_bytes, hid }
    }

    /// Tick callback for [`crate::task::TaskHandle`]; never asks to stop.
    pub fn on_tick<C, H>(&mut self, ctx: TickContext, cdc: &mut C, hid: &mut H) -> ControlFlow<()>
    where
        C: CdcTransport + ?Sized,
        H: HidTransport + ?Sized,
    {
        self.tick(ctx, cdc, hid);
        ControlFlow::Continue(())
    }
}
