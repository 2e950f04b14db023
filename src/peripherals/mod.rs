//! PineTime board peripherals

pub mod backlight;
pub mod button;
pub mod display;
