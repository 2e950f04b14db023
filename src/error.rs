//! Error types

/// Unrecoverable start-up failures.
///
/// Failures while painting a single frame are not represented here: the controller logs them
/// and skips the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchError {
    /// The clock source could not produce a valid wall-clock time
    ClockUnavailable,
    /// The drawing surface has no pixels
    EmptySurface,
    /// The LCD controller did not accept its init sequence
    DisplayInit,
}

impl core::fmt::Display for WatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ClockUnavailable => write!(f, "Clock source unavailable"),
            Self::EmptySurface => write!(f, "Drawing surface has zero size"),
            Self::DisplayInit => write!(f, "Display initialization failed"),
        }
    }
}
