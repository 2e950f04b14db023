//! General system configuration

use embassy_nrf::config::{Config, Debug, HfclkSource, LfclkSource};
use embassy_time::Duration;

/// Local time offset from UTC, in seconds
pub const TIMEZONE: i32 = 3_600;

/// Period of the coarse time tick delivered to the face
pub const TICK_PERIOD: Duration = Duration::from_secs(60);

/// Side button poll interval
pub const BUTTON_POLL: Duration = Duration::from_millis(10);

pub struct SystemConfig {}

impl SystemConfig {
    /// Create new system configuration
    pub fn new() -> Config {
        // Generate default config, required because Config is set as
        // `non_exhaustive`
        let mut config = Config::default();

        // Set high-frequency and low-frequency clock sources to external
        config.hfclk_source = HfclkSource::ExternalXtal;
        config.lfclk_source = LfclkSource::ExternalXtal;

        // Enable DC/DC regulator to massively reduce runtime current consumption
        config.dcdc.reg1 = true;

        // Allow debugging
        config.debug = Debug::Allowed;

        config
    }
}
