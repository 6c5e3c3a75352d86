//! USB Device subsystem - presents the composite CDC + HID device to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`. The device is built from the library's descriptor
//! model and exposes:
//!
//! - Interfaces 0-1: CDC-ACM virtual serial port (echo loopback)
//! - Interface 2:    HID mouse (periodic reports)
//!
//! `port` adapts the Embassy endpoints to the library's transport traits
//! so the channel handlers never touch the USB stack directly.

pub mod device;
pub mod port;
