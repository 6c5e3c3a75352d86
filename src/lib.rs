//! Composite USB device logic for usb-hid-vcp.
//!
//! One USB link carries two functions: a CDC-ACM virtual serial port that
//! echoes whatever the host sends, and a HID mouse that sweeps the cursor
//! along a fixed waveform once per second.
//!
//! Everything in this crate is pure protocol logic and runs on the host
//! for testing (no embedded hardware required):
//!
//! - [`descriptor`] - device, configuration, and string descriptor tables
//! - [`cdc`] - receive / line-state handlers for the serial channel
//! - [`hid`] - per-tick mouse report generation
//! - [`task`] - the cooperative periodic task driver
//! - [`app`] - the heartbeat tick tying the channels together
//!
//! Usage: `cargo test`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and wires these handlers to the Embassy USB stack.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod app;
pub mod cdc;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod hid;
pub mod task;

pub use error::{Error, Result};

/// Logical channel (CDC port or HID instance) on the composite device.
pub type ChannelId = u8;
