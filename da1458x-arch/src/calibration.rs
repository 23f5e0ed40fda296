//! Periodic radio calibration.
//!
//! Runs from the BLE-powered loop right after a connection or advertising event
//! has ended, when the idle window before the next event is long enough and the
//! interval has elapsed on the BLE half-slot clock.

use crate::stack::BleEvent;

/// The BLE base time counter is 27 bits wide.
pub const CLOCK_MASK: u32 = 0x07FF_FFFF;

/// Half-slots (312.5 us) per second.
pub const HALFSLOTS_PER_SEC: u32 = 3200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationConfig {
    pub(crate) enabled: bool,
    pub(crate) interval: u32,
    pub(crate) min_idle: u32,
}

impl CalibrationConfig {
    /// Every 15 s, in windows of at least 10 ms.
    pub const fn new() -> Self {
        Self {
            enabled: true,
            interval: 15 * HALFSLOTS_PER_SEC,
            min_idle: 32,
        }
    }

    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Calibration interval in half-slots.
    pub const fn interval(mut self, halfslots: u32) -> Self {
        self.interval = halfslots & CLOCK_MASK;
        self
    }

    /// Shortest idle window (half-slots) a calibration may use.
    pub const fn min_idle(mut self, halfslots: u32) -> Self {
        self.min_idle = halfslots;
        self
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Calibration timer.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    config: CalibrationConfig,
    last: u32,
}

impl Calibration {
    pub const fn new(config: CalibrationConfig, now: u32) -> Self {
        Self {
            config,
            last: now & CLOCK_MASK,
        }
    }

    /// Half-slots since the last calibration, across counter wrap.
    pub const fn elapsed(&self, now: u32) -> u32 {
        now.wrapping_sub(self.last) & CLOCK_MASK
    }

    /// Whether to calibrate now. Restarts the interval when it returns `true`.
    pub fn poll(&mut self, now: u32, idle: u32, last_event: BleEvent) -> bool {
        if !self.config.enabled || last_event != BleEvent::EventEnd || idle < self.config.min_idle {
            return false;
        }
        if self.elapsed(now) < self.config.interval {
            return false;
        }
        self.last = now & CLOCK_MASK;
        true
    }
}
