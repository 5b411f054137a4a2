//! # measlink
//!
//! A portable, no_std Rust measurement pipeline for multi-channel instruments: pulse counters
//! and a serial instrument on one side, a WiFi companion chip, an SD card, a serial port and
//! an in-memory display cache on the other.
//!
//! The crate provides:
//! - a reusable component lifecycle (`Reset → Initialized → Starting → Running → Stopped`)
//! - COBS byte stuffing and CRC-32 for a robust wire protocol over an unreliable serial line
//! - the `Length | Source | Value | CRC32` measurement frame
//! - a non-blocking, byte-incremental frame receiver
//! - a coordinator that polls sources and fans measurements out to recorders, with
//!   fixed-capacity registries and no allocation
//!
//! ## Crate features
//! | Feature      | Description |
//! |--------------|-------------|
//! | `std`        | Disables `#![no_std]`; enables `std` in `thiserror`, `critical-section` and `log` |
//! | `delay-loop` | Adds `timer::run_cycle_loop` driven by `embedded_hal::delay::DelayNs` |
//! | `defmt-0-3`  | Uses `defmt` logging and derives `defmt::Format` on public types |
//! | `log`        | Uses `log` logging |
//!
//! ## Wire format
//!
//! ```text
//! 0x00 | COBS( Length:u16 BE | Source:u8 | Value:1|2|4 bytes LE | CRC32:u32 BE ) | 0x00
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use measlink::prelude::*;
//!
//! static BNC1: PulseCount = PulseCount::new();
//!
//! let mut bnc1 = PulseCounterSource::new(MeasurementDeviceId::PulseCounter1, &BNC1);
//! let mut wifi = WiFiRecorder::new(usart1);
//! let mut cache = CacheRecorder::new();
//!
//! let mut coordinator: MeasurementCoordinator<'_, Board> = MeasurementCoordinator::new();
//! coordinator.add_source(Source::PulseCounter(&mut bnc1))?;
//! coordinator.store_mut().add_observer(Recorder::WiFi(&mut wifi))?;
//! coordinator.store_mut().add_observer(Recorder::Cache(&mut cache))?;
//! coordinator.init()?;
//! coordinator.start()?;
//!
//! loop {
//!     coordinator.tick()?; // once per measurement period
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - Everything runs in one cooperative context; only [`pulse::PulseCount`] is touched from
//!   interrupts
//! - Serial transmits block for at most their timeout; receiving never blocks
//! - Registry capacities and buffer sizes are fixed in [`consts`]

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

pub use critical_section;
pub use heapless;

pub mod cobs;
pub mod consts;
pub mod coordinator;
pub mod crc;
pub mod error;
pub mod frame;
pub mod lifecycle;
pub mod measurement;
pub mod platform;
pub mod pulse;
pub mod receiver;
pub mod recorder;
pub mod registry;
pub mod sdcard;
pub mod serial;
pub mod source;
pub mod store;
pub mod timer;

#[cfg(test)]
mod mocks;

/// The types most applications need.
pub mod prelude {
    pub use crate::coordinator::{CycleReport, MeasurementCoordinator};
    pub use crate::lifecycle::{Component, ComponentState};
    pub use crate::measurement::{Measurement, MeasurementDeviceId, MeasurementValue};
    pub use crate::platform::Platform;
    pub use crate::pulse::{PulseCount, PulseCounter};
    pub use crate::receiver::{FrameReceiver, RxStatus, RxSubstatus};
    pub use crate::recorder::{
        CacheRecorder, MeasurementReader, Recorder, SdCardRecorder, SdRecordFormat,
        SerialRecorder, WiFiRecorder,
    };
    pub use crate::sdcard::{FileOpenMode, SdCard};
    pub use crate::serial::SerialPort;
    pub use crate::source::{PulseCounterSource, SerialSource, Source};
}
