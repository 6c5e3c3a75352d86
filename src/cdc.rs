//! CDC-ACM channel: loopback echo and line-state observation.
//!
//! Both handlers are invoked from the transport's own dispatch and run to
//! completion without suspending. Every successful receive window is
//! echoed verbatim on the same channel and flushed immediately.

use core::fmt;

use crate::config::CDC_RX_BUFSIZE;
use crate::{ChannelId, Result};

/// Transport operations the CDC channel needs.
pub trait CdcTransport {
    /// Bounded, non-blocking read of pending bytes into `buf`.
    fn read(&mut self, channel: ChannelId, buf: &mut [u8]) -> Result<usize>;

    /// Queue bytes for transmission. Returns how many were accepted.
    fn write_enqueue(&mut self, channel: ChannelId, data: &[u8]) -> usize;

    /// Start transmitting queued bytes. Fire-and-forget.
    fn write_flush(&mut self, channel: ChannelId, timeout_ms: u32);

    /// Whether a host has the port open (DTR asserted).
    fn connected(&self, channel: ChannelId) -> bool;
}

/// DTR/RTS as last reported by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineState {
    pub dtr: bool,
    pub rts: bool,
}

/// Events the transport dispatches to a CDC channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CdcEvent {
    /// Data is waiting to be read.
    Received,
    LineStateChanged(LineState),
}

/// Result of handling a receive event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxOutcome {
    /// `n` bytes were read and queued back to the host.
    Echoed(usize),
    /// The read failed; nothing was written back.
    ReadError,
}

/// Per-interface transient state.
pub struct CdcChannelState {
    /// Last receive window; one spare byte past the capacity.
    buf: [u8; CDC_RX_BUFSIZE + 1],
    len: usize,
    line: LineState,
}

impl CdcChannelState {
    pub const fn new() -> Self {
        Self {
            buf: [0; CDC_RX_BUFSIZE + 1],
            len: 0,
            line: LineState {
                dtr: false,
                rts: false,
            },
        }
    }

    /// Bytes of the last successful receive.
    pub fn last_received(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub const fn line_state(&self) -> LineState {
        self.line
    }
}

impl Default for CdcChannelState {
    fn default() -> Self {
        Self::new()
    }
}

/// One CDC-ACM port.
pub struct CdcChannel {
    id: ChannelId,
    state: CdcChannelState,
}

impl CdcChannel {
    pub const fn new(id: ChannelId) -> Self {
        Self {
            id,
            state: CdcChannelState::new(),
        }
    }

    pub const fn id(&self) -> ChannelId {
        self.id
    }

    pub const fn state(&self) -> &CdcChannelState {
        &self.state
    }

    /// Dispatch one transport event.
    pub fn handle<T>(&mut self, event: CdcEvent, transport: &mut T) -> Option<RxOutcome>
    where
        T: CdcTransport + ?Sized,
    {
        match event {
            CdcEvent::Received => Some(self.on_receive(transport)),
            CdcEvent::LineStateChanged(line) => {
                self.on_line_state_changed(line.dtr, line.rts);
                None
            }
        }
    }

    /// Read one window and echo it back.
    ///
    /// A failed read is logged and dropped; the transport owns retries.
    pub fn on_receive<T>(&mut self, transport: &mut T) -> RxOutcome
    where
        T: CdcTransport + ?Sized,
    {
        let ch = self.id;
        let n = match transport.read(ch, &mut self.state.buf[..CDC_RX_BUFSIZE]) {
            Ok(n) => n.min(CDC_RX_BUFSIZE),
            Err(e) => {
                error!("CDC {}: {}", ch, e);
                self.state.len = 0;
                return RxOutcome::ReadError;
            }
        };
        self.state.len = n;

        let data = &self.state.buf[..n];
        info!("Data from channel {}: {}", ch, HexBytes(data));

        let queued = transport.write_enqueue(ch, data);
        if queued < n {
            warn!("CDC {}: echo truncated ({}/{})", ch, queued, n);
        }
        transport.write_flush(ch, 0);
        RxOutcome::Echoed(n)
    }

    /// Record a DTR/RTS change. No effect on the data path.
    pub fn on_line_state_changed(&mut self, dtr: bool, rts: bool) {
        self.state.line = LineState { dtr, rts };
        info!(
            "Line state changed on channel {}: DTR:{}, RTS:{}",
            self.id,
            dtr,
            rts
        );
    }
}

/// Lower-case, space separated hex rendering of a byte slice.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HexBytes<'_> {
    fn format(&self, f: defmt::Formatter) {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                defmt::write!(f, " ");
            }
            defmt::write!(f, "{=u8:02x}", *b);
        }
    }
}
