//! Unit tests for the HID channel.
//!
//! These tests run on the host (not embedded) and verify the cursor
//! waveform, report serialisation, and readiness gating.

use super::mouse::{MouseReport, MOUSE_REPORT_DESCRIPTOR, MOUSE_REPORT_SIZE};
use super::*;

// ═══════════════════════════════════════════════════════════════════════════
// Mock transport
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct MockHid {
    ready: bool,
    sent: heapless::Vec<(ChannelId, u8, MouseReport), 16>,
}

impl HidTransport for MockHid {
    fn endpoint_ready(&self, _channel: ChannelId) -> bool {
        self.ready
    }

    fn send_report(&mut self, channel: ChannelId, report_id: u8, report: &MouseReport) -> bool {
        self.sent.push((channel, report_id, *report)).is_ok()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Mouse Report Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn mouse_report_default_is_idle() {
    let report = MouseReport::default();
    assert!(report.is_idle());
}

#[test]
fn mouse_report_is_not_idle_when_panning() {
    let report = MouseReport {
        pan: -1,
        ..MouseReport::default()
    };
    assert!(!report.is_idle());
}

#[test]
fn mouse_report_serialize_layout() {
    let report = MouseReport {
        buttons: 0x05,
        x: -127,
        y: 20,
        wheel: -3,
        pan: 1,
    };
    let mut buf = [0u8; 8];
    let written = report.serialize(&mut buf);
    assert_eq!(written, MOUSE_REPORT_SIZE);
    assert_eq!(&buf[..5], &[0x05, 0x81, 20, 0xFD, 0x01]);
}

#[test]
fn mouse_report_serialize_buffer_too_small() {
    let mut buf = [0u8; 4];
    assert_eq!(MouseReport::default().serialize(&mut buf), 0);
}

#[test]
fn report_descriptor_is_balanced() {
    let opens = MOUSE_REPORT_DESCRIPTOR
        .windows(2)
        .filter(|w| w[0] == 0xA1)
        .count();
    let closes = MOUSE_REPORT_DESCRIPTOR.iter().filter(|&&b| b == 0xC0).count();
    assert_eq!(opens, 2);
    assert_eq!(closes, 2);
    assert_eq!(MOUSE_REPORT_DESCRIPTOR.len(), 67);
}

// ═══════════════════════════════════════════════════════════════════════════
// Waveform Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn waveform_has_period_three_from_any_phase() {
    for start in [-127i8, 0, 127] {
        let mut x = start;
        let mut seq = [0i8; 7];
        for slot in seq.iter_mut() {
            *slot = x;
            x = next_x(x);
        }
        assert_eq!(seq[0], seq[3]);
        assert_eq!(seq[1], seq[4]);
        assert_eq!(seq[2], seq[5]);
        assert_eq!(seq[3], seq[6]);
    }
}

#[test]
fn waveform_sequence_from_rest() {
    let mut cursor = HidCursorState::new();
    let mut seen = [0i8; 6];
    for slot in seen.iter_mut() {
        *slot = cursor.x;
        cursor.advance();
    }
    assert_eq!(seen, [0, 127, -127, 0, 127, -127]);
}

#[test]
fn off_cycle_value_reenters_at_zero() {
    assert_eq!(next_x(5), 0);
    assert_eq!(next_x(-128), 0);
    assert_eq!(next_x(next_x(42)), 127);
}

#[test]
fn cursor_starts_at_rest() {
    let cursor = HidCursorState::new();
    assert_eq!(cursor, HidCursorState::default());
    assert!(cursor.report().is_idle());
}

#[test]
fn cursor_report_maps_axes() {
    let cursor = HidCursorState {
        x: 127,
        z: 2,
        rz: -2,
        buttons: 0x1_01,
        ..HidCursorState::new()
    };
    let report = cursor.report();
    assert_eq!(report.x, 127);
    assert_eq!(report.wheel, 2);
    assert_eq!(report.pan, -2);
    assert_eq!(report.buttons, 0x01);
}

// ═══════════════════════════════════════════════════════════════════════════
// Tick Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn not_ready_sends_nothing() {
    let mut hid = MockHid::default();
    let mut cursor = HidCursorState::new();
    for _ in 0..5 {
        assert_eq!(tick_hid(0, &mut cursor, &mut hid), HidTick::Skipped);
    }
    assert!(hid.sent.is_empty());
    assert_eq!(cursor.x, 0);
}

#[test]
fn ready_sends_current_then_advances() {
    let mut hid = MockHid {
        ready: true,
        ..MockHid::default()
    };
    let mut cursor = HidCursorState {
        x: 127,
        ..HidCursorState::new()
    };

    let tick = tick_hid(0, &mut cursor, &mut hid);
    assert!(matches!(tick, HidTick::Sent(r) if r.x == 127));
    assert_eq!(hid.sent.len(), 1);
    assert_eq!(hid.sent[0].0, 0);
    assert_eq!(hid.sent[0].1, MOUSE_REPORT_ID);
    assert_eq!(hid.sent[0].2.x, 127);
    assert_eq!(cursor.x, -127);

    tick_hid(0, &mut cursor, &mut hid);
    assert_eq!(hid.sent[1].2.x, -127);
}

#[test]
fn skipped_ticks_are_not_replayed() {
    let mut hid = MockHid::default();
    let mut cursor = HidCursorState::new();
    tick_hid(0, &mut cursor, &mut hid);
    tick_hid(0, &mut cursor, &mut hid);
    hid.ready = true;
    tick_hid(0, &mut cursor, &mut hid);
    assert_eq!(hid.sent.len(), 1);
    assert_eq!(hid.sent[0].2.x, 0);
}

#[test]
fn other_axes_stay_at_zero() {
    let mut hid = MockHid {
        ready: true,
        ..MockHid::default()
    };
    let mut cursor = HidCursorState::new();
    for _ in 0..6 {
        tick_hid(0, &mut cursor, &mut hid);
    }
    for (_, _, report) in &hid.sent {
        assert_eq!((report.y, report.wheel, report.pan, report.buttons), (0, 0, 0, 0));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Class Request Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn get_report_serves_no_data() {
    let mut buf = [0xAAu8; 8];
    assert_eq!(on_get_report(0, 0, ReportType::Input, &mut buf), 0);
    assert_eq!(buf, [0xAA; 8]);
}

#[test]
fn set_report_is_accepted() {
    on_set_report(0, 0, ReportType::Output, &[0x01, 0x02]);
}

#[test]
fn report_requests_dispatch_by_kind() {
    let mut buf = [0x55u8; 4];
    let get = HidRequest::GetReport {
        report_id: 0,
        report_type: ReportType::Feature,
    };
    assert_eq!(on_report_requested(0, get, &mut buf), 0);

    let set = HidRequest::SetReport {
        report_id: 0,
        report_type: ReportType::Output,
        data: &[0x01],
    };
    assert_eq!(on_report_requested(0, set, &mut buf), 0);
    assert_eq!(buf, [0x55; 4]);
}
