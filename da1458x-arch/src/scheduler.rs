//! The main loop.
//!
//! One pass of [`Arch::iterate`]:
//!
//! 1. while the radio is powered, run the BLE scheduler (and a due radio
//!    calibration) and ask the application whether to keep going
//! 2. let the application run its own work until it agrees to sleep
//! 3. with interrupts disabled, decide the sleep mode from the stack's answer,
//!    the sleep policy and the application's veto
//! 4. wait, then undo whatever the sleep entry changed
//!
//! Interrupts stay disabled from the decision until after the wait, so an
//! interrupt that arrives in between wakes the core instead of being lost.

use da1458x_hal::ram::retention::{self as ram_retention, RetentionMask};
use da1458x_hal::{chip, sysctrl, watchdog, Hardware};

use crate::app::{Action, AppCallbacks};
use crate::calibration::Calibration;
use crate::config::ArchConfig;
use crate::hibernation::{BooterSnapshot, Retained};
use crate::retention;
use crate::rom;
use crate::sleep::{PowerManager, SleepMode, SleepState};
use crate::stack::BleStack;

/// The architecture layer: hardware, BLE stack, application and sleep policy.
pub struct Arch<'a, H, S, A>
where
    H: Hardware,
    S: BleStack,
    A: AppCallbacks,
{
    pub(crate) hw: H,
    pub(crate) stack: S,
    pub(crate) app: A,
    pub(crate) power: &'a PowerManager,
    pub(crate) config: ArchConfig,
    pub(crate) calibration: Calibration,
    /// Trims and debugger state left by the booter at cold boot.
    pub(crate) booter: BooterSnapshot,
    /// State kept across stateful hibernation.
    pub(crate) retained: Retained,
    last_retention: RetentionMask,
}

impl<'a, H, S, A> Arch<'a, H, S, A>
where
    H: Hardware,
    S: BleStack,
    A: AppCallbacks,
{
    /// Cold-boot initialisation.
    ///
    /// # Panics
    ///
    /// Panics when the chip is not the configured variant or the ROM setup
    /// fails.
    pub fn new(mut hw: H, stack: S, mut app: A, power: &'a PowerManager, config: ArchConfig) -> Self {
        if let Some(found) = chip::detect(&hw) {
            assert!(
                found == config.variant,
                "configured for {:?}, running on {:?}",
                config.variant,
                found
            );
        }

        let booter = BooterSnapshot::capture(&hw);
        rom::init(&mut hw, config.variant.layout(), &config);
        power.set_sleep_mode(config.default_sleep);
        watchdog::reload(&mut hw, config.watchdog_period);
        app.init_peripherals();

        let calibration = Calibration::new(config.calibration, stack.time_halfslots());
        info!("arch ready, sleep {:?}", config.default_sleep);
        Self {
            hw,
            stack,
            app,
            power,
            config,
            calibration,
            booter,
            retained: Retained::default(),
            last_retention: RetentionMask::NONE,
        }
    }

    /// Run the main loop forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.iterate();
        }
    }

    /// One pass of the main loop. Returns the mode that was entered.
    pub fn iterate(&mut self) -> SleepMode {
        loop {
            self.schedule_while_ble_on();
            if self.app.on_system_powered() == Action::GotoSleep {
                break;
            }
        }

        self.hw.disable_interrupts();
        self.app.before_sleep();

        let mode = self.sleep_mode();
        match mode {
            SleepMode::ExtSleep | SleepMode::ExtSleepOtpCopy => self.extended_sleep(mode),
            SleepMode::Idle => self.hw.wait_for_interrupt(),
            SleepMode::Active => {}
        }

        self.hw.enable_interrupts();
        watchdog::reload(&mut self.hw, self.config.watchdog_period);
        mode
    }

    fn schedule_while_ble_on(&mut self) {
        while self.stack.radio_powered() {
            self.stack.schedule();

            let now = self.stack.time_halfslots();
            let idle = self.stack.idle_halfslots();
            if self.calibration.poll(now, idle, self.stack.last_event()) {
                debug!("radio calibration at {}", now);
                self.stack.calibrate_radio();
            }

            if self.app.on_ble_powered() == Action::GotoSleep {
                break;
            }
        }
    }

    fn sleep_mode(&mut self) -> SleepMode {
        let policy = self.power.snapshot();
        let allowed = policy.sleep_enabled();

        let mut mode = self.stack.power_down(allowed, policy.ext_wakeup());
        if mode.is_extended() && !allowed {
            mode = SleepMode::Idle;
        }
        if mode == SleepMode::ExtSleep && policy.mode() == SleepState::ExtSleepOtpCopy {
            mode = SleepMode::ExtSleepOtpCopy;
        }
        if mode.is_extended() {
            mode = self.app.validate_sleep(mode);
        }
        mode
    }

    fn extended_sleep(&mut self, mode: SleepMode) {
        let family = self.config.variant.family();
        let mask = retention::compute(
            self.config.variant.layout(),
            &self.config.retention,
            mode,
            self.stack.non_retained_heap(),
        );

        self.hw.set_sleep_deep(true);
        sysctrl::request_domains_sleep(&mut self.hw, true);
        if self.config.latch_pads_in_sleep {
            sysctrl::latch_pads(&mut self.hw, true);
        }
        sysctrl::set_otp_copy(&mut self.hw, mode == SleepMode::ExtSleepOtpCopy);
        ram_retention::set_retention_mode(&mut self.hw, family, mask);
        self.last_retention = mask;
        self.app.going_to_sleep(mode);

        let debugger = sysctrl::debugger_attached(&self.hw);
        if debugger {
            watchdog::freeze(&mut self.hw);
        }
        self.power.with(|p| p.set_sleeping(true));
        self.hw.wait_for_interrupt();
        self.power.with(|p| p.set_sleeping(false));
        if debugger {
            watchdog::resume(&mut self.hw);
        }

        self.resume_from_sleep();
    }

    fn resume_from_sleep(&mut self) {
        self.hw.set_sleep_deep(false);
        sysctrl::set_otp_copy(&mut self.hw, false);
        ram_retention::set_all_normal(&mut self.hw, self.config.variant.family());
        sysctrl::set_periph_domain_down(&mut self.hw, false);
        sysctrl::set_radio_domain_down(&mut self.hw, false);
        self.app.init_peripherals();
        if self.config.latch_pads_in_sleep {
            sysctrl::latch_pads(&mut self.hw, false);
        }
        self.app.resume_from_sleep();
    }

    /// Retention mask programmed for the last extended sleep.
    pub fn last_retention(&self) -> RetentionMask {
        self.last_retention
    }

    pub fn config(&self) -> &ArchConfig {
        &self.config
    }

    pub fn power(&self) -> &'a PowerManager {
        self.power
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::NoCallbacks;
    use crate::calibration::CalibrationConfig;
    use crate::stack::{BleEvent, NoRadio};
    use crate::testing::{FakeStack, RecordingApp};
    use da1458x_hal::mock::{Event, MockChip};
    use da1458x_hal::ram::RamSlice;
    use da1458x_hal::regs::{pmu_ctrl, sys_ctrl};
    use da1458x_hal::{ChipVariant, Cpu, Reg, Registers};

    fn arch<S: BleStack, A: AppCallbacks>(
        power: &PowerManager,
        variant: ChipVariant,
        stack: S,
        app: A,
        config: ArchConfig,
    ) -> Arch<'_, MockChip, S, A> {
        let mut arch = Arch::new(MockChip::new(variant), stack, app, power, config);
        arch.hw_mut().clear_events();
        arch
    }

    fn wfi(chip: &MockChip) -> usize {
        chip.position(|e| matches!(e, Event::Wfi { .. })).unwrap()
    }

    #[test]
    fn interrupts_stay_disabled_across_the_wait() {
        let power = PowerManager::new(SleepState::Off);
        let config = ArchConfig::new(ChipVariant::Da14531).default_sleep(SleepState::ExtSleep);
        let mut arch = arch(&power, ChipVariant::Da14531, NoRadio, NoCallbacks, config);

        assert_eq!(arch.iterate(), SleepMode::ExtSleep);

        let chip = arch.hw();
        let disabled = chip.position(|e| *e == Event::InterruptsDisabled).unwrap();
        let enabled = chip.position(|e| *e == Event::InterruptsEnabled).unwrap();
        let wait = wfi(chip);
        assert!(disabled < wait && wait < enabled);
        assert_eq!(
            chip.events()[wait],
            Event::Wfi {
                interrupts_enabled: false,
                sleep_deep: true
            }
        );
        assert!(!chip.sleep_deep());
        assert!(chip.interrupts_enabled());
        assert_eq!(chip.read(Reg::Watchdog), 0xFF);
    }

    #[test]
    fn disabled_sleep_caps_at_idle() {
        let power = PowerManager::new(SleepState::Off);
        let config = ArchConfig::new(ChipVariant::Da14531);
        let mut arch = arch(&power, ChipVariant::Da14531, NoRadio, NoCallbacks, config);

        assert_eq!(arch.iterate(), SleepMode::Idle);
        assert_eq!(
            arch.hw().events()[wfi(arch.hw())],
            Event::Wfi {
                interrupts_enabled: false,
                sleep_deep: false
            }
        );
        assert_eq!(arch.hw().read(Reg::RamPwrCtrl), 0);
    }

    #[test]
    fn forced_region_keeps_the_device_idle() {
        let power = PowerManager::new(SleepState::Off);
        let config = ArchConfig::new(ChipVariant::Da14585).default_sleep(SleepState::ExtSleep);
        let stack = FakeStack::sleeping(SleepMode::ExtSleep);
        let mut arch = arch(&power, ChipVariant::Da14585, stack, NoCallbacks, config);

        let guard = power.hold_active();
        assert_eq!(arch.iterate(), SleepMode::Idle);
        assert_eq!(arch.stack().power_down_args, [(false, false)]);
        drop(guard);

        power.enable_ext_wakeup();
        assert_eq!(arch.iterate(), SleepMode::ExtSleep);
        assert_eq!(arch.stack().power_down_args[1], (true, true));
    }

    #[test]
    fn watchdog_frozen_only_with_debugger() {
        let power = PowerManager::new(SleepState::Off);
        let config = ArchConfig::new(ChipVariant::Da14531).default_sleep(SleepState::ExtSleep);
        let mut arch = arch(&power, ChipVariant::Da14531, NoRadio, NoCallbacks, config);

        arch.iterate();
        assert!(arch.hw().position(|e| matches!(e, Event::Write(Reg::SetFreeze, _))).is_none());

        arch.hw_mut().set_debugger_attached(true);
        arch.hw_mut().clear_events();
        arch.iterate();
        let chip = arch.hw();
        let frozen = chip.position(|e| matches!(e, Event::Write(Reg::SetFreeze, _))).unwrap();
        let resumed = chip.position(|e| matches!(e, Event::Write(Reg::ResetFreeze, _))).unwrap();
        assert!(frozen < wfi(chip) && wfi(chip) < resumed);
        assert!(!chip.watchdog_frozen());
    }

    #[test]
    fn otp_copy_policy_upgrades_extended_sleep() {
        let power = PowerManager::new(SleepState::Off);
        let config = ArchConfig::new(ChipVariant::Da14531)
            .default_sleep(SleepState::ExtSleepOtpCopy)
            .latch_pads_in_sleep(true);
        let mut arch = arch(&power, ChipVariant::Da14531, NoRadio, RecordingApp::default(), config);

        assert_eq!(arch.iterate(), SleepMode::ExtSleepOtpCopy);
        assert_eq!(arch.app().validated, [SleepMode::ExtSleepOtpCopy]);

        let chip = arch.hw();
        let armed = chip
            .position(|e| matches!(e, Event::Write(Reg::SysCtrl, v) if v & sys_ctrl::OTP_COPY != 0))
            .unwrap();
        let latched = chip.position(|e| *e == Event::Write(Reg::PadLatch, 1)).unwrap();
        assert!(armed < wfi(chip) && latched < wfi(chip));
        assert!(!chip.bit(Reg::SysCtrl, sys_ctrl::OTP_COPY));
        assert_eq!(chip.read(Reg::PadLatch), 0);
    }

    #[test]
    fn heap_block_is_retained() {
        let power = PowerManager::new(SleepState::Off);
        let variant = ChipVariant::Da14531;
        let config = ArchConfig::new(variant).default_sleep(SleepState::ExtSleep);
        let mut stack = FakeStack::sleeping(SleepMode::ExtSleep);
        stack.heap = Some(RamSlice::new(variant.layout().ram_blocks[1].base, 0x200));
        let mut arch = arch(&power, variant, stack, NoCallbacks, config);

        arch.iterate();
        assert_eq!(
            arch.last_retention(),
            RetentionMask::RAM1 | RetentionMask::RAM2 | RetentionMask::RAM3
        );
        // Every block retained, written before the wait.
        let chip = arch.hw();
        let programmed = chip
            .position(|e| *e == Event::Write(Reg::RamPwrCtrl, 0b01_01_01))
            .unwrap();
        assert!(programmed < wfi(chip));
    }

    #[test]
    fn default_config_keeps_the_program_image_powered() {
        let power = PowerManager::new(SleepState::Off);
        let variant = ChipVariant::Da14531;
        let config = ArchConfig::new(variant).default_sleep(SleepState::ExtSleep);
        let mut arch = arch(&power, variant, NoRadio, NoCallbacks, config);

        arch.iterate();
        assert!(arch.last_retention().contains(RetentionMask::RAM1));
        // RAM1 and RAM3 retained, RAM2 off.
        let chip = arch.hw();
        let programmed = chip
            .position(|e| *e == Event::Write(Reg::RamPwrCtrl, 0b01_10_01))
            .unwrap();
        assert!(programmed < wfi(chip));
    }

    #[test]
    fn otp_copy_may_drop_a_mirrored_image_block() {
        let power = PowerManager::new(SleepState::Off);
        let variant = ChipVariant::Da14531;
        let config = ArchConfig::new(variant)
            .default_sleep(SleepState::ExtSleepOtpCopy)
            .otp_mirrored(RetentionMask::RAM1);
        let mut arch = arch(&power, variant, NoRadio, NoCallbacks, config);

        assert_eq!(arch.iterate(), SleepMode::ExtSleepOtpCopy);
        assert_eq!(arch.last_retention(), RetentionMask::RAM3);
    }

    #[test]
    fn app_veto_skips_the_wait() {
        let power = PowerManager::new(SleepState::Off);
        let config = ArchConfig::new(ChipVariant::Da14585).default_sleep(SleepState::ExtSleep);
        let app = RecordingApp {
            validate_to: Some(SleepMode::Active),
            ..RecordingApp::default()
        };
        let mut arch = arch(&power, ChipVariant::Da14585, NoRadio, app, config);
        arch.app_mut().calls.clear();

        assert_eq!(arch.iterate(), SleepMode::Active);
        assert_eq!(arch.hw().wfi_count(), 0);
        assert_eq!(arch.app().calls, ["system_powered", "before_sleep", "validate_sleep"]);
        assert!(arch.hw().interrupts_enabled());
    }

    #[test]
    fn callbacks_run_in_loop_order() {
        let power = PowerManager::new(SleepState::Off);
        let config = ArchConfig::new(ChipVariant::Da14585)
            .default_sleep(SleepState::ExtSleep)
            .calibration(CalibrationConfig::disabled());
        let mut stack = FakeStack::sleeping(SleepMode::ExtSleep);
        stack.radio_passes = 2;
        let app = RecordingApp {
            keep_ble_powered: 1,
            ..RecordingApp::default()
        };
        let mut arch = arch(&power, ChipVariant::Da14585, stack, app, config);
        arch.app_mut().calls.clear();

        arch.iterate();
        assert_eq!(
            arch.app().calls,
            [
                "ble_powered",
                "ble_powered",
                "system_powered",
                "before_sleep",
                "validate_sleep",
                "going_to_sleep",
                "init_peripherals",
                "resume_from_sleep",
            ]
        );
        assert_eq!(arch.stack().schedules, 2);
        assert!(!arch.hw().bit(Reg::PmuCtrl, pmu_ctrl::PERIPH_SLEEP));
    }

    #[test]
    fn calibration_runs_after_event_end() {
        let power = PowerManager::new(SleepState::Off);
        let config = ArchConfig::new(ChipVariant::Da14531)
            .calibration(CalibrationConfig::new().interval(1000).min_idle(8));
        let mut stack = FakeStack::sleeping(SleepMode::Idle);
        stack.radio_passes = 1;
        stack.last_event = BleEvent::EventEnd;
        stack.idle = 100;
        let mut arch = arch(&power, ChipVariant::Da14531, stack, NoCallbacks, config);

        arch.stack_mut().time = 1500;
        arch.iterate();
        assert_eq!(arch.stack().calibrations, 1);

        arch.stack_mut().radio_passes = 1;
        arch.stack_mut().time = 1600;
        arch.iterate();
        assert_eq!(arch.stack().calibrations, 1);
    }

    #[test]
    fn sleeping_is_reported_only_inside_the_wait() {
        let power = PowerManager::new(SleepState::Off);
        let config = ArchConfig::new(ChipVariant::Da14531).default_sleep(SleepState::ExtSleep);
        let mut arch = arch(&power, ChipVariant::Da14531, NoRadio, NoCallbacks, config);
        arch.iterate();
        assert_eq!(power.state(), SleepState::ExtSleep);
    }

    #[test]
    #[should_panic(expected = "configured for")]
    fn wrong_variant_is_fatal() {
        let power = PowerManager::new(SleepState::Off);
        let config = ArchConfig::new(ChipVariant::Da14585);
        let _ = Arch::new(MockChip::new(ChipVariant::Da14531), NoRadio, NoCallbacks, &power, config);
    }
}
