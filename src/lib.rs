//! Sweep watch face for the PineTime
//!
//! A translucent sector sweeps around the face over the hour and the hour is painted large in
//! the middle. The face redraws every second while the watch is in use and drops to
//! trigger-only redraws in ambient mode.
//!
//! The library is hardware independent and builds on the host; the `firmware` feature adds the
//! nRF52832 pieces used by the `pinetime-sweep` binary.
//!
//! # Features
//!
//! - `defmt` - log through defmt and derive `defmt::Format` on public types
//! - `firmware` - PineTime board support (embassy-nrf, mipidsi, ...)

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod error;
mod mocks;
pub mod system;
pub mod ui;

pub use error::WatchError;
pub use system::{
    controller::{FrameStats, LifecycleEvent, Mode, WatchFaceController},
    power::{PowerConfig, PowerManager, PowerState},
    scheduler::{EmbassyScheduler, Scheduler, TaskHandle, TaskKind},
    time::{ClockReading, ClockSource, TimeManager, TimeReference},
};
pub use ui::{FaceStyle, Geometry, SweepWatchface, WatchFace, WatchFaceState};

// Every type the logging macros print must stay `defmt::Format` whenever defmt is on
#[cfg(feature = "defmt")]
const _: () = {
    fn loggable<T: defmt::Format>() {}
    let _ = loggable::<WatchError>;
    let _ = loggable::<Geometry>;
    let _ = loggable::<Mode>;
    let _ = loggable::<LifecycleEvent>;
    let _ = loggable::<FrameStats>;
    let _ = loggable::<PowerState>;
    let _ = loggable::<ClockReading>;
    let _ = loggable::<TaskKind>;
    let _ = loggable::<TaskHandle>;
};
