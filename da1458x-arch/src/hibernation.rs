//! Hibernation and deep sleep.
//!
//! These entries do not come back to the caller on hardware: hibernation and
//! deep sleep wake through a reset. Stateful hibernation wakes through the
//! reset handler as well, which jumps into [`Arch::resume_from_hibernation`]
//! using the context saved here. On the host mock the wait returns at once,
//! so every entry hands back a [`Suspended`] token instead.

use da1458x_hal::ram::retention as ram_retention;
use da1458x_hal::sysctrl::{self, Regulation, Remap, Trims, VbatHl};
use da1458x_hal::{watchdog, ChipVariant, CpuContext, Family, Hardware, Registers, RetentionMask};

use crate::app::AppCallbacks;
use crate::config::RetentionPolicy;
use crate::error::PowerModeError;
use crate::rom;
use crate::scheduler::Arch;
use crate::stack::BleStack;

/// Wake pins P0_1..P0_5.
const WAKE_PINS: u8 = 0x1F;

/// Trims and debugger state programmed by the booter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BooterSnapshot {
    pub debugger_enabled: bool,
    pub trims: Trims,
}

impl BooterSnapshot {
    pub fn capture(bus: &impl Registers) -> Self {
        Self {
            debugger_enabled: sysctrl::debugger_enabled(bus),
            trims: sysctrl::read_trims(bus),
        }
    }

    pub fn restore(&self, bus: &mut impl Registers) {
        sysctrl::write_trims(bus, &self.trims);
        sysctrl::set_debugger_enabled(bus, self.debugger_enabled);
    }
}

/// Supply configuration that hibernation overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct SupplyState {
    dcdc: bool,
    vbat: VbatHl,
}

impl SupplyState {
    fn capture(bus: &impl Registers) -> Self {
        Self {
            dcdc: sysctrl::dcdc_enabled(bus),
            vbat: sysctrl::vbat_hl(bus),
        }
    }

    fn restore(&self, bus: &mut impl Registers) {
        sysctrl::set_dcdc(bus, self.dcdc);
        sysctrl::set_vbat_hl(bus, self.vbat);
    }
}

/// State carried through stateful hibernation in retained RAM.
#[derive(Debug, Default)]
pub(crate) struct Retained {
    snapshot: Option<BooterSnapshot>,
    context: Option<CpuContext>,
    supply: Option<SupplyState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SuspendKind {
    Hibernation,
    StatefulHibernation,
    DeepSleep,
}

/// The core executed the wait of a one-way low-power entry.
///
/// On hardware the call never returns; code after it runs only on the host.
#[must_use = "execution does not continue past a low-power entry on hardware"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Suspended {
    kind: SuspendKind,
}

impl Suspended {
    pub fn kind(&self) -> SuspendKind {
        self.kind
    }
}

/// Hibernation of the low-power family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HibernationConfig {
    /// Wake pins, bit 0 = P0_1.
    pub wakeup_pins: u8,
    pub active_high: bool,
    /// Blocks kept powered.
    pub retained: RetentionMask,
    /// What address 0 maps to on wakeup.
    pub remap: Remap,
    /// Latch the pads for the duration.
    pub pad_latch: bool,
}

impl HibernationConfig {
    pub const fn new(wakeup_pins: u8) -> Self {
        Self {
            wakeup_pins,
            active_high: true,
            retained: RetentionMask::NONE,
            remap: Remap::Otp,
            pad_latch: false,
        }
    }

    pub const fn active_high(mut self, active_high: bool) -> Self {
        self.active_high = active_high;
        self
    }

    pub const fn retained(mut self, retained: RetentionMask) -> Self {
        self.retained = retained;
        self
    }

    pub const fn remap(mut self, remap: Remap) -> Self {
        self.remap = remap;
        self
    }

    pub const fn pad_latch(mut self, pad_latch: bool) -> Self {
        self.pad_latch = pad_latch;
        self
    }

    pub fn validate(&self, variant: ChipVariant) -> Result<(), PowerModeError> {
        if variant.family() != Family::LowPower {
            return Err(PowerModeError::WrongFamily {
                required: Family::LowPower,
            });
        }
        if self.wakeup_pins & !WAKE_PINS != 0 {
            return Err(PowerModeError::WakePinsOutOfRange(self.wakeup_pins));
        }
        if let Some(block) = self.remap.ram_block() {
            if !self.retained.contains_block(block) {
                return Err(PowerModeError::RemapNotRetained(self.remap));
            }
        }
        Ok(())
    }
}

/// Hibernation that resumes execution from retained RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatefulHibernationConfig {
    pub hibernation: HibernationConfig,
}

impl StatefulHibernationConfig {
    pub const fn new(wakeup_pins: u8) -> Self {
        Self {
            hibernation: HibernationConfig::new(wakeup_pins).remap(Remap::Ram3),
        }
    }

    pub const fn active_high(mut self, active_high: bool) -> Self {
        self.hibernation = self.hibernation.active_high(active_high);
        self
    }

    pub const fn retained(mut self, retained: RetentionMask) -> Self {
        self.hibernation = self.hibernation.retained(retained);
        self
    }

    pub const fn remap(mut self, remap: Remap) -> Self {
        self.hibernation = self.hibernation.remap(remap);
        self
    }

    pub const fn pad_latch(mut self, pad_latch: bool) -> Self {
        self.hibernation = self.hibernation.pad_latch(pad_latch);
        self
    }

    /// Also requires a RAM remap target and every mandatory block, the blocks
    /// of the program image and every configured retained block to stay
    /// powered.
    pub fn validate(
        &self,
        variant: ChipVariant,
        policy: &RetentionPolicy,
    ) -> Result<(), PowerModeError> {
        let cfg = &self.hibernation;
        cfg.validate(variant)?;
        if cfg.remap.ram_block().is_none() {
            return Err(PowerModeError::RemapNotRam(cfg.remap));
        }
        let layout = variant.layout();
        let required = layout.mandatory_blocks()
            | layout.image_blocks()
            | (policy.retained & layout.all_blocks());
        let missing = required & !cfg.retained;
        if !missing.is_empty() {
            return Err(PowerModeError::MandatoryNotRetained { missing });
        }
        Ok(())
    }
}

/// Deep sleep of the full family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeepSleepConfig {
    pub retained: RetentionMask,
    pub pad_latch: bool,
}

impl DeepSleepConfig {
    pub const fn new() -> Self {
        Self {
            retained: RetentionMask::NONE,
            pad_latch: false,
        }
    }

    pub const fn retained(mut self, retained: RetentionMask) -> Self {
        self.retained = retained;
        self
    }

    pub const fn pad_latch(mut self, pad_latch: bool) -> Self {
        self.pad_latch = pad_latch;
        self
    }

    pub fn validate(&self, variant: ChipVariant) -> Result<(), PowerModeError> {
        if variant.family() != Family::Full {
            return Err(PowerModeError::WrongFamily {
                required: Family::Full,
            });
        }
        Ok(())
    }
}

impl Default for DeepSleepConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, H, S, A> Arch<'a, H, S, A>
where
    H: Hardware,
    S: BleStack,
    A: AppCallbacks,
{
    /// Enter hibernation. Wakeup goes through a cold boot.
    ///
    /// # Panics
    ///
    /// Panics when `config` fails [`HibernationConfig::validate`].
    pub fn enter_hibernation(&mut self, config: &HibernationConfig) -> Suspended {
        if let Err(err) = config.validate(self.config.variant) {
            panic!("invalid hibernation config: {:?}", err);
        }
        info!("hibernation, wake pins {:#x}", config.wakeup_pins);

        self.hw.disable_interrupts();
        self.hibernate(config);
        Suspended {
            kind: SuspendKind::Hibernation,
        }
    }

    /// Enter hibernation, keeping enough state to continue where this call
    /// was made.
    ///
    /// # Panics
    ///
    /// Panics when `config` fails [`StatefulHibernationConfig::validate`].
    pub fn enter_stateful_hibernation(&mut self, config: &StatefulHibernationConfig) -> Suspended {
        if let Err(err) = config.validate(self.config.variant, &self.config.retention) {
            panic!("invalid hibernation config: {:?}", err);
        }
        info!("stateful hibernation, remap {:?}", config.hibernation.remap);

        let context = self.hw.save_context();
        self.hw.disable_interrupts();

        if sysctrl::ble_clock_enabled(&self.hw) {
            sysctrl::ble_request_deep_sleep(&mut self.hw);
            sysctrl::set_ble_clock(&mut self.hw, false);
        }
        sysctrl::set_radio_domain_down(&mut self.hw, true);

        self.retained = Retained {
            snapshot: Some(BooterSnapshot::capture(&self.hw)),
            context: Some(context),
            supply: Some(SupplyState::capture(&self.hw)),
        };

        self.hibernate(&config.hibernation);
        Suspended {
            kind: SuspendKind::StatefulHibernation,
        }
    }

    fn hibernate(&mut self, config: &HibernationConfig) {
        watchdog::freeze(&mut self.hw);
        self.hw.disable_all_irqs();
        self.hw.clear_pending_irqs();

        sysctrl::configure_hibernation_wakeup(&mut self.hw, config.wakeup_pins, config.active_high);
        sysctrl::remap_address0(&mut self.hw, config.remap);
        ram_retention::set_retention_mode(&mut self.hw, Family::LowPower, config.retained);
        if config.pad_latch {
            sysctrl::latch_pads(&mut self.hw, true);
        }
        sysctrl::set_hibernation(&mut self.hw, true);

        let vbat = match sysctrl::regulation(&self.hw) {
            Regulation::Boost => VbatHl::Disconnect,
            Regulation::Buck => VbatHl::Connect,
        };
        sysctrl::set_vbat_hl(&mut self.hw, vbat);
        sysctrl::set_por_vbat(&mut self.hw, false);

        self.hw.set_sleep_deep(true);
        self.hw.wait_for_interrupt();
    }

    /// Enter deep sleep. Wakeup goes through a reset.
    ///
    /// # Panics
    ///
    /// Panics on a low-power family chip.
    pub fn enter_deep_sleep(&mut self, config: &DeepSleepConfig) -> Suspended {
        if let Err(err) = config.validate(self.config.variant) {
            panic!("invalid deep sleep config: {:?}", err);
        }
        info!("deep sleep, retained {:?}", config.retained);

        self.hw.disable_interrupts();
        sysctrl::request_domains_sleep(&mut self.hw, true);
        ram_retention::set_retention_mode(&mut self.hw, Family::Full, config.retained);
        sysctrl::set_reset_on_wakeup(&mut self.hw, true);
        if config.pad_latch {
            sysctrl::latch_pads(&mut self.hw, true);
        }

        self.hw.set_sleep_deep(true);
        self.hw.wait_for_interrupt();
        Suspended {
            kind: SuspendKind::DeepSleep,
        }
    }

    /// Continue after stateful hibernation, from the reset handler.
    ///
    /// Registers are back at their reset values; RAM, including `self`, is as
    /// it was when [`enter_stateful_hibernation`](Self::enter_stateful_hibernation)
    /// waited.
    pub fn resume_from_hibernation(&mut self) {
        let snapshot = self.retained.snapshot.take().unwrap_or(self.booter);
        snapshot.restore(&mut self.hw);
        sysctrl::xtal32m_start(&mut self.hw);

        if sysctrl::hibernation_enabled(&self.hw) {
            sysctrl::set_hibernation(&mut self.hw, false);
        }
        if let Some(supply) = self.retained.supply.take() {
            supply.restore(&mut self.hw);
        }

        self.hw.set_sleep_deep(false);
        watchdog::resume(&mut self.hw);
        watchdog::reload(&mut self.hw, self.config.watchdog_period);
        ram_retention::set_all_normal(&mut self.hw, self.config.variant.family());

        // Patch registers lose their content; the patch table in RAM did not.
        if let Err(err) = rom::patch_func(&mut self.hw, self.config.variant.layout(), self.config.patches) {
            panic!("ROM patch reinstall failed: {:?}", err);
        }

        self.app.init_peripherals();
        if sysctrl::pads_latched(&self.hw) {
            sysctrl::latch_pads(&mut self.hw, false);
        }

        if S::PRESENT {
            sysctrl::set_radio_domain_down(&mut self.hw, false);
            sysctrl::set_ble_clock(&mut self.hw, true);
            self.stack.reinit_radio();
            self.stack.resume_lld();
        }

        match self.retained.context.take() {
            Some(ctx) => self.hw.restore_context(&ctx),
            None => self.hw.enable_interrupts(),
        }
        info!("resumed from hibernation");
    }
}
