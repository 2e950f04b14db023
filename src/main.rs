#![no_std]
#![no_main]

mod peripherals;

// Panic handler and debugging
use defmt::unwrap;

use defmt_rtt as _;
use panic_probe as _;

// Device
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::{
    bind_interrupts,
    gpio::{Input, Level, Output, OutputDrive, Pin, Pull},
    peripherals::SPI2,
    spim,
};
use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, channel::Channel, signal::Signal};
use embassy_time::{Ticker, Timer};

bind_interrupts!(struct Irqs {
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<SPI2>;
});

// Crate
use peripherals::{backlight::Backlight, button::Button, display::Display};
use pinetime_sweep::{
    system::config::{SystemConfig, BUTTON_POLL, TICK_PERIOD, TIMEZONE},
    EmbassyScheduler, LifecycleEvent, PowerConfig, PowerManager, SweepWatchface, TimeManager,
    TimeReference, WatchFaceController,
};

// Include current UTC epoch at compile time
include!(concat!(env!("OUT_DIR"), "/utc.rs"));

// Communication channels
static EVENTS: Channel<ThreadModeRawMutex, LifecycleEvent, 4> = Channel::new();
static BUTTON_PRESSED: Signal<ThreadModeRawMutex, ()> = Signal::new();

/// Owns the LCD and runs the watch face.
#[embassy_executor::task(pool_size = 1)]
async fn render(display: Display) {
    let mut clock = TimeManager::init();
    match TimeReference::from_timestamp(UTC_EPOCH, TIMEZONE) {
        Some(reference) => clock.set_time(reference),
        None => defmt::warn!("Build time out of range, clock starts at epoch"),
    }

    let mut face = unwrap!(WatchFaceController::start(
        display,
        SweepWatchface::default(),
        clock,
        EmbassyScheduler::default(),
    ));
    defmt::info!("Watch face running");
    face.run(EVENTS.receiver()).await
}

/// Polls the button state every 10ms
#[embassy_executor::task(pool_size = 1)]
async fn poll_button(mut button: Button) {
    loop {
        if button.pressed().await {
            BUTTON_PRESSED.signal(());
        }

        Timer::after(BUTTON_POLL).await;
    }
}

/// Turns button presses and inactivity into lifecycle events, and drives the backlight.
#[embassy_executor::task(pool_size = 1)]
async fn power(mut backlight: Backlight) {
    let mut manager = PowerManager::new(PowerConfig::default());
    backlight.set(manager.brightness());

    loop {
        let event = match manager.idle_timeout() {
            Some(timeout) => match select(BUTTON_PRESSED.wait(), Timer::after(timeout)).await {
                Either::First(()) => Some(manager.on_button()),
                Either::Second(()) => manager.on_idle(),
            },
            None => {
                BUTTON_PRESSED.wait().await;
                Some(manager.on_button())
            }
        };

        if backlight.get_brightness() != manager.brightness() {
            backlight.set(manager.brightness());
        }
        if let Some(event) = event {
            EVENTS.send(event).await;
        }
    }
}

/// Coarse periodic time tick
#[embassy_executor::task(pool_size = 1)]
async fn time_tick() {
    let mut tick = Ticker::every(TICK_PERIOD);
    loop {
        tick.next().await;
        EVENTS.send(LifecycleEvent::TimeTick).await;
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(SystemConfig::new());
    defmt::info!("Initializing");

    // Initialize Backlight, off until the power task takes over
    let backlight = Backlight::init(
        Output::new(p.P0_14.degrade(), Level::High, OutputDrive::Standard),
        Output::new(p.P0_22.degrade(), Level::High, OutputDrive::Standard),
        Output::new(p.P0_23.degrade(), Level::High, OutputDrive::Standard),
        0,
    );

    // Initialize Button
    let button = Button::init(
        Input::new(p.P0_13, Pull::None),
        Output::new(p.P0_15, Level::Low, OutputDrive::Standard),
    );

    // Initialize SPI
    let mut spim_config = spim::Config::default();
    // Use SPI at 8MHz (the fastest clock available on the nRF52832),
    // otherwise refreshing will be super slow.
    spim_config.frequency = spim::Frequency::M8;
    // SPI must be used in mode 3. Mode 0 (the default) won't work.
    spim_config.mode = spim::MODE_3;

    let spim = spim::Spim::new(p.SPI2, Irqs, p.P0_02, p.P0_04, p.P0_03, spim_config);

    // Initialize LCD
    let display = unwrap!(Display::init(
        spim,
        Output::new(p.P0_25.degrade(), Level::High, OutputDrive::Standard),
        Output::new(p.P0_18.degrade(), Level::Low, OutputDrive::Standard),
        Output::new(p.P0_26.degrade(), Level::Low, OutputDrive::Standard),
    ));

    defmt::info!("Initialization finished");

    // Schedule tasks
    unwrap!(spawner.spawn(render(display)));
    unwrap!(spawner.spawn(poll_button(button)));
    unwrap!(spawner.spawn(power(backlight)));
    unwrap!(spawner.spawn(time_tick()));
}
