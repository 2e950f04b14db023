//! Power management
//!
//! Maps user activity onto the display lifecycle: the face drops into ambient mode after a
//! period without input, and the side button cycles between awake and asleep.

use embassy_time::Duration;

use super::controller::LifecycleEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Full brightness, continuous redraw
    Active,
    /// Dimmed, redraw on ticks only
    Ambient,
    /// Backlight off, nothing visible
    Sleep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerConfig {
    /// Inactivity before entering ambient mode
    pub ambient_timeout: Duration,
    /// Backlight level (0-7) while active
    pub active_brightness: u8,
    /// Backlight level (0-7) in ambient mode
    pub ambient_brightness: u8,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            ambient_timeout: Duration::from_secs(15),
            active_brightness: 5,
            ambient_brightness: 1,
        }
    }
}

pub struct PowerManager {
    state: PowerState,
    config: PowerConfig,
}

impl PowerManager {
    pub fn new(config: PowerConfig) -> Self {
        Self {
            state: PowerState::Active,
            config,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Backlight level for the current state
    pub fn brightness(&self) -> u8 {
        match self.state {
            PowerState::Active => self.config.active_brightness,
            PowerState::Ambient => self.config.ambient_brightness,
            PowerState::Sleep => 0,
        }
    }

    /// How long to wait for input before [`PowerManager::on_idle`] applies
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.state {
            PowerState::Active => Some(self.config.ambient_timeout),
            PowerState::Ambient | PowerState::Sleep => None,
        }
    }

    /// Side button pressed
    pub fn on_button(&mut self) -> LifecycleEvent {
        let (next, event) = match self.state {
            PowerState::Active => (PowerState::Sleep, LifecycleEvent::VisibilityChanged { hidden: true }),
            PowerState::Ambient => (PowerState::Active, LifecycleEvent::AmbientModeChanged { ambient: false }),
            PowerState::Sleep => (PowerState::Active, LifecycleEvent::VisibilityChanged { hidden: false }),
        };
        self.transition(next);
        event
    }

    /// No input for [`PowerManager::idle_timeout`]
    pub fn on_idle(&mut self) -> Option<LifecycleEvent> {
        match self.state {
            PowerState::Active => {
                self.transition(PowerState::Ambient);
                Some(LifecycleEvent::AmbientModeChanged { ambient: true })
            }
            PowerState::Ambient | PowerState::Sleep => None,
        }
    }

    fn transition(&mut self, next: PowerState) {
        info!("Power state {} -> {}", self.state, next);
        self.state = next;
    }
}
