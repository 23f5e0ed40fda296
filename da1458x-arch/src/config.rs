//! Architecture configuration.
//!
//! [`ArchConfig`] is built with const builder methods so it can live in a
//! `static`:
//!
//! ```ignore
//! use da1458x_arch::{ArchConfig, SleepState};
//! use da1458x_hal::{ChipVariant, RetentionMask};
//!
//! static CONFIG: ArchConfig = ArchConfig::new(ChipVariant::Da14531)
//!     .default_sleep(SleepState::ExtSleep)
//!     .retained(RetentionMask::RAM1)
//!     .latch_pads_in_sleep(true);
//! ```

use da1458x_hal::patch::PatchEntry;
use da1458x_hal::watchdog;
use da1458x_hal::{ChipVariant, RetentionMask};

use crate::calibration::CalibrationConfig;
use crate::sleep::SleepState;

/// RAM blocks kept in extended sleep on top of the mandatory ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetentionPolicy {
    /// Always retained.
    pub retained: RetentionMask,
    /// Reloaded from OTP on wakeup, so dropped in OTP-copy sleep.
    pub otp_mirrored: RetentionMask,
}

/// What happens to the ROM random generator state at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RngPolicy {
    /// Keep the state across the ROM data wipe.
    Preserve,
    /// Seed it.
    Reseed(u32),
}

/// Handler for a message the ROM kernel would otherwise drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MsgHandler {
    pub task: u16,
    pub msg_id: u16,
    /// Code address of the handler.
    pub handler: u32,
}

/// Parameters the ROM reads through its configuration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RomCfg {
    /// Longest extended sleep, half-slots.
    pub max_sleep_halfslots: u32,
    /// Sleep clock accuracy, ppm.
    pub sleep_clock_ppm: u32,
    /// Time from wakeup to radio ready, us.
    pub wakeup_time_us: u32,
    /// Heap size granted to the ROM stack, bytes.
    pub rom_heap_size: u32,
}

impl RomCfg {
    pub const DEFAULT: Self = Self {
        max_sleep_halfslots: 10 * 3200,
        sleep_clock_ppm: 500,
        wakeup_time_us: 625,
        rom_heap_size: 0x400,
    };

    pub(crate) const fn words(&self) -> [u32; 4] {
        [
            self.max_sleep_halfslots,
            self.sleep_clock_ppm,
            self.wakeup_time_us,
            self.rom_heap_size,
        ]
    }
}

impl Default for RomCfg {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Tables the ROM resolves through pointer variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RomHooks {
    /// Function addresses the ROM calls back into, in ROM index order.
    pub functions: &'static [u32],
    pub handlers: &'static [MsgHandler],
}

impl RomHooks {
    pub const EMPTY: Self = Self {
        functions: &[],
        handlers: &[],
    };
}

/// Complete architecture configuration.
#[derive(Debug, Clone, Copy)]
pub struct ArchConfig {
    pub(crate) variant: ChipVariant,
    pub(crate) default_sleep: SleepState,
    pub(crate) retention: RetentionPolicy,
    pub(crate) watchdog_period: u32,
    pub(crate) latch_pads_in_sleep: bool,
    pub(crate) rng: RngPolicy,
    pub(crate) hooks: RomHooks,
    pub(crate) rom_cfg: RomCfg,
    pub(crate) patches: &'static [PatchEntry],
    pub(crate) calibration: CalibrationConfig,
}

impl ArchConfig {
    /// Defaults: sleep off, no extra retention, ROM state preserved, no patches.
    pub const fn new(variant: ChipVariant) -> Self {
        Self {
            variant,
            default_sleep: SleepState::Off,
            retention: RetentionPolicy {
                retained: RetentionMask::NONE,
                otp_mirrored: RetentionMask::NONE,
            },
            watchdog_period: watchdog::DEFAULT_PERIOD,
            latch_pads_in_sleep: false,
            rng: RngPolicy::Preserve,
            hooks: RomHooks::EMPTY,
            rom_cfg: RomCfg::DEFAULT,
            patches: &[],
            calibration: CalibrationConfig::new(),
        }
    }

    /// Sleep mode applied at start-up.
    pub const fn default_sleep(mut self, state: SleepState) -> Self {
        self.default_sleep = state;
        self
    }

    /// Blocks retained in every extended sleep.
    pub const fn retained(mut self, blocks: RetentionMask) -> Self {
        self.retention.retained = blocks;
        self
    }

    /// Blocks holding OTP-mirrored code, dropped in OTP-copy sleep.
    pub const fn otp_mirrored(mut self, blocks: RetentionMask) -> Self {
        self.retention.otp_mirrored = blocks;
        self
    }

    /// Watchdog reload value after every pass (default 0xFF).
    pub const fn watchdog_period(mut self, period: u32) -> Self {
        self.watchdog_period = period;
        self
    }

    /// Hold pad states during extended sleep.
    pub const fn latch_pads_in_sleep(mut self, latch: bool) -> Self {
        self.latch_pads_in_sleep = latch;
        self
    }

    pub const fn rng(mut self, policy: RngPolicy) -> Self {
        self.rng = policy;
        self
    }

    pub const fn hooks(mut self, hooks: RomHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub const fn rom_cfg(mut self, cfg: RomCfg) -> Self {
        self.rom_cfg = cfg;
        self
    }

    /// ROM patches installed at start-up and after stateful hibernation.
    pub const fn patches(mut self, patches: &'static [PatchEntry]) -> Self {
        self.patches = patches;
        self
    }

    pub const fn calibration(mut self, config: CalibrationConfig) -> Self {
        self.calibration = config;
        self
    }

    pub const fn variant(&self) -> ChipVariant {
        self.variant
    }

    pub const fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }
}
