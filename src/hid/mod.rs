//! HID channel: periodic mouse reports with a triangular cursor sweep.
//!
//! Invoked once per task tick. When the endpoint is busy the tick is
//! skipped; a missed report is never queued or retried.

pub mod mouse;

#[cfg(test)]
mod tests;

use crate::ChannelId;
use mouse::MouseReport;

/// Report ID used for mouse reports (0 = no report ID prefix).
pub const MOUSE_REPORT_ID: u8 = 0;

/// Transport operations the HID channel needs.
pub trait HidTransport {
    /// Non-blocking readiness check of the interrupt IN endpoint.
    fn endpoint_ready(&self, channel: ChannelId) -> bool;

    /// Queue one mouse report. Only called after `endpoint_ready`.
    fn send_report(&mut self, channel: ChannelId, report_id: u8, report: &MouseReport) -> bool;
}

/// Cursor and gamepad-style axes driven by the tick.
///
/// Only `x` moves; the other axes stay at zero and are reserved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HidCursorState {
    pub x: i8,
    pub y: i8,
    pub z: i8,
    pub rz: i8,
    pub rx: i8,
    pub ry: i8,
    pub hat: u8,
    pub buttons: u32,
}

impl HidCursorState {
    /// All axes at rest.
    pub const fn new() -> Self {
        Self {
            x: 0,
            y: 0,
            z: 0,
            rz: 0,
            rx: 0,
            ry: 0,
            hat: 0,
            buttons: 0,
        }
    }

    /// Mouse report for the current position.
    ///
    /// `z` drives the vertical wheel and `rz` the horizontal one; only the
    /// low 8 button bits fit a mouse report.
    pub fn report(&self) -> MouseReport {
        MouseReport {
            buttons: self.buttons as u8,
            x: self.x,
            y: self.y,
            wheel: self.z,
            pan: self.rz,
        }
    }

    /// Step `x` one position along the waveform.
    pub fn advance(&mut self) {
        self.x = next_x(self.x);
    }
}

/// Next x position: `-127 -> 0 -> 127 -> -127`.
///
/// Values off the cycle re-enter it at 0.
pub const fn next_x(x: i8) -> i8 {
    match x {
        -127 => 0,
        0 => 127,
        127 => -127,
        _ => 0,
    }
}

/// Outcome of one HID tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidTick {
    /// The report was handed to the transport.
    Sent(MouseReport),
    /// Endpoint not ready; nothing was sent and the cursor did not move.
    Skipped,
}

/// Emit one mouse report if the endpoint is ready, then advance `x`.
pub fn tick_hid<T>(channel: ChannelId, cursor: &mut HidCursorState, transport: &mut T) -> HidTick
where
    T: HidTransport + ?Sized,
{
    if !transport.endpoint_ready(channel) {
        trace!("HID {}: endpoint busy, skipping tick", channel);
        return HidTick::Skipped;
    }

    let report = cursor.report();
    if !transport.send_report(channel, MOUSE_REPORT_ID, &report) {
        // Readiness was confirmed, so this is a transport fault.
        warn!("HID {}: report rejected after ready", channel);
    }
    cursor.advance();
    HidTick::Sent(report)
}

/// HID report type of a class request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportType {
    Input,
    Output,
    Feature,
}

/// GET_REPORT from the host. No report data is served; the host falls
/// back to the interrupt endpoint.
///
/// Returns the number of bytes placed in `buf`.
pub fn on_get_report(
    channel: ChannelId,
    report_id: u8,
    report_type: ReportType,
    _buf: &mut [u8],
) -> usize {
    debug!(
        "HID {}: GET_REPORT id={} type={}",
        channel,
        report_id,
        report_type
    );
    0
}

/// SET_REPORT from the host. Accepted and ignored.
pub fn on_set_report(channel: ChannelId, report_id: u8, report_type: ReportType, data: &[u8]) {
    debug!(
        "HID {}: SET_REPORT id={} type={} len={}",
        channel,
        report_id,
        report_type,
        data.len()
    );
}

/// HID class request from the host, as dispatched by the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidRequest<'a> {
    GetReport { report_id: u8, report_type: ReportType },
    SetReport { report_id: u8, report_type: ReportType, data: &'a [u8] },
}

/// Route a class request on `channel` to its handler.
///
/// Returns the number of bytes placed in `buf` (always 0 for SET_REPORT).
pub fn on_report_requested(channel: ChannelId, request: HidRequest<'_>, buf: &mut [u8]) -> usize {
    match request {
        HidRequest::GetReport {
            report_id,
            report_type,
        } => on_get_report(channel, report_id, report_type, buf),
        HidRequest::SetReport {
            report_id,
            report_type,
            data,
        } => {
            on_set_report(channel, report_id, report_type, data);
            0
        }
    }
}
