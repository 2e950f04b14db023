//! Side button of the PineTime

use debouncr::{debounce_2, Debouncer, Edge, Repeat2};
use embassy_nrf::{
    gpio::{Input, Output},
    peripherals::{P0_13, P0_15},
};
use embassy_time::{Duration, Timer};

pub struct Button {
    /// Button detection pin (high/low)
    sense: Input<'static, P0_13>,
    /// Button enable pin
    enable: Output<'static, P0_15>,
    debouncer: Debouncer<u8, Repeat2>,
}

impl Button {
    /// Configure button on boot
    pub fn init(sense: Input<'static, P0_13>, enable: Output<'static, P0_15>) -> Self {
        Self {
            sense,
            enable,
            debouncer: debounce_2(false),
        }
    }

    /// Sample the button once; true on a debounced rising edge.
    pub async fn pressed(&mut self) -> bool {
        self.enable.set_high();
        // The button needs a short time to give stable outputs
        Timer::after(Duration::from_micros(1)).await;

        let edge = self.debouncer.update(self.sense.is_high());

        // Button consumes around 34µA when P0.15 is left high.
        self.enable.set_low();

        edge == Some(Edge::Rising)
    }
}
