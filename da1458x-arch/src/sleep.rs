//! Sleep-mode policy.
//!
//! [`SleepPolicy`] holds the configured sleep mode, the forced-active nesting
//! and the request deferred while forced active. [`PowerManager`] is the single
//! per-device instance, shared between the main loop and interrupt handlers.
//!
//! Inside a forced-active region mode requests are not applied: the last one is
//! kept and applied when the outermost region ends. Outside, they take effect
//! immediately.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Sleep state of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepState {
    /// Never sleep deeper than idle.
    #[default]
    Off,
    /// Extended sleep, code stays in retained RAM.
    ExtSleep,
    /// Extended sleep, code mirrored from OTP on wakeup.
    ExtSleepOtpCopy,
    /// Currently inside the low-power wait. Reported only, never configured.
    Sleeping,
}

impl SleepState {
    /// Two-bit mode code: `Off = 0`, `ExtSleep = 1`, `ExtSleepOtpCopy = 2`.
    ///
    /// `Sleeping` has no code of its own and reports as `Off`.
    pub const fn code(self) -> u8 {
        match self {
            Self::ExtSleep => 1,
            Self::ExtSleepOtpCopy => 2,
            Self::Off | Self::Sleeping => 0,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::ExtSleep),
            2 => Some(Self::ExtSleepOtpCopy),
            _ => None,
        }
    }

    pub const fn is_extended(self) -> bool {
        matches!(self, Self::ExtSleep | Self::ExtSleepOtpCopy)
    }
}

/// Mode the main loop enters after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepMode {
    /// Keep running.
    Active,
    /// Clock-gated WFI.
    Idle,
    ExtSleep,
    ExtSleepOtpCopy,
}

impl SleepMode {
    pub const fn is_extended(self) -> bool {
        matches!(self, Self::ExtSleep | Self::ExtSleepOtpCopy)
    }
}

/// The sleep-mode state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SleepPolicy {
    mode: SleepState,
    /// Inside the low-power wait.
    sleeping: bool,
    ext_wakeup: bool,
    /// Open forced-active regions.
    hold: u32,
    /// Code of the mode at the first `force_active`, plus one; 0 = none.
    forced: u8,
    /// Request received while forced active.
    pending: Option<SleepState>,
}

impl SleepPolicy {
    pub const fn new(mode: SleepState) -> Self {
        let mode = match mode {
            SleepState::Sleeping => SleepState::Off,
            other => other,
        };
        Self {
            mode,
            sleeping: false,
            ext_wakeup: false,
            hold: 0,
            forced: 0,
            pending: None,
        }
    }

    /// Forbid extended sleep.
    pub fn disable_sleep(&mut self) {
        self.request(SleepState::Off);
    }

    /// Allow extended sleep, with or without OTP copy on wakeup.
    pub fn set_extended_sleep(&mut self, otp_copy: bool) {
        self.request(if otp_copy {
            SleepState::ExtSleepOtpCopy
        } else {
            SleepState::ExtSleep
        });
    }

    /// Open a forced-active region.
    ///
    /// The first region remembers the configured mode; sleep stays off until
    /// the last region closes.
    pub fn force_active(&mut self) {
        self.hold = self.hold.saturating_add(1);
        if self.forced == 0 {
            self.forced = self.mode.code() + 1;
        }
    }

    /// Close a forced-active region.
    ///
    /// When the last region closes, a deferred request wins; otherwise the mode
    /// remembered by [`force_active`](Self::force_active) is decoded back
    /// (`1` = extended sleep, `2` = extended sleep with OTP copy, anything
    /// else leaves the mode alone). Closing a region that was never opened
    /// changes nothing.
    pub fn restore_sleep_mode(&mut self) {
        self.hold = self.hold.saturating_sub(1);
        if self.hold > 0 {
            return;
        }

        let forced = core::mem::take(&mut self.forced);
        if let Some(state) = self.pending.take() {
            trace!("sleep: applying deferred {:?}", state);
            self.apply(state);
            return;
        }
        match forced.saturating_sub(1) {
            1 => self.apply(SleepState::ExtSleep),
            2 => self.apply(SleepState::ExtSleepOtpCopy),
            _ => {}
        }
    }

    /// Configured mode as its two-bit code.
    pub fn get_sleep_mode(&self) -> u8 {
        self.mode.code()
    }

    /// Configure `state`. `Sleeping` is not a configurable mode and is ignored.
    pub fn set_sleep_mode(&mut self, state: SleepState) {
        match state {
            SleepState::Off => self.disable_sleep(),
            SleepState::ExtSleep => self.set_extended_sleep(false),
            SleepState::ExtSleepOtpCopy => self.set_extended_sleep(true),
            SleepState::Sleeping => {}
        }
    }

    /// Observable state, `Sleeping` while the main loop waits.
    pub fn state(&self) -> SleepState {
        if self.sleeping {
            SleepState::Sleeping
        } else {
            self.mode
        }
    }

    /// Configured mode.
    pub fn mode(&self) -> SleepState {
        self.mode
    }

    /// Extended sleep is allowed right now.
    pub fn sleep_enabled(&self) -> bool {
        self.hold == 0 && self.mode.is_extended()
    }

    pub fn forced_active(&self) -> bool {
        self.hold > 0
    }

    pub fn pending(&self) -> Option<SleepState> {
        self.pending
    }

    pub fn enable_ext_wakeup(&mut self) {
        self.ext_wakeup = true;
    }

    pub fn disable_ext_wakeup(&mut self) {
        self.ext_wakeup = false;
    }

    /// Only an external event may wake the device.
    pub fn ext_wakeup(&self) -> bool {
        self.ext_wakeup
    }

    pub(crate) fn set_sleeping(&mut self, sleeping: bool) {
        self.sleeping = sleeping;
    }

    fn request(&mut self, state: SleepState) {
        if self.forced == 0 {
            self.apply(state);
        } else {
            self.pending = Some(state);
        }
    }

    fn apply(&mut self, state: SleepState) {
        if self.mode != state {
            debug!("sleep mode {:?} -> {:?}", self.mode, state);
        }
        self.mode = state;
    }
}

impl Default for SleepPolicy {
    fn default() -> Self {
        Self::new(SleepState::Off)
    }
}

/// The per-device sleep policy, safe to use from interrupt handlers.
///
/// # Example
///
/// ```ignore
/// use da1458x_arch::sleep::{PowerManager, SleepState};
///
/// static POWER: PowerManager = PowerManager::new(SleepState::ExtSleep);
///
/// fn on_uart_rx() {
///     let _awake = POWER.hold_active();
///     // ... transfer; sleep is re-allowed when `_awake` drops
/// }
/// ```
pub struct PowerManager {
    inner: Mutex<CriticalSectionRawMutex, RefCell<SleepPolicy>>,
}

impl PowerManager {
    pub const fn new(mode: SleepState) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(SleepPolicy::new(mode))),
        }
    }

    /// Run `f` with exclusive access to the policy.
    pub fn with<R>(&self, f: impl FnOnce(&mut SleepPolicy) -> R) -> R {
        self.inner.lock(|policy| f(&mut policy.borrow_mut()))
    }

    /// Copy of the current policy state.
    pub fn snapshot(&self) -> SleepPolicy {
        self.inner.lock(|policy| policy.borrow().clone())
    }

    pub fn disable_sleep(&self) {
        self.with(|p| p.disable_sleep())
    }

    pub fn set_extended_sleep(&self, otp_copy: bool) {
        self.with(|p| p.set_extended_sleep(otp_copy))
    }

    pub fn force_active(&self) {
        self.with(|p| p.force_active())
    }

    pub fn restore_sleep_mode(&self) {
        self.with(|p| p.restore_sleep_mode())
    }

    pub fn get_sleep_mode(&self) -> u8 {
        self.with(|p| p.get_sleep_mode())
    }

    pub fn set_sleep_mode(&self, state: SleepState) {
        self.with(|p| p.set_sleep_mode(state))
    }

    pub fn state(&self) -> SleepState {
        self.with(|p| p.state())
    }

    pub fn enable_ext_wakeup(&self) {
        self.with(|p| p.enable_ext_wakeup())
    }

    pub fn disable_ext_wakeup(&self) {
        self.with(|p| p.disable_ext_wakeup())
    }

    pub fn ext_wakeup(&self) -> bool {
        self.with(|p| p.ext_wakeup())
    }

    /// Keep the device out of extended sleep until the guard drops.
    pub fn hold_active(&self) -> ActiveGuard<'_> {
        ActiveGuard::acquire(self)
    }
}

/// RAII forced-active region.
/// Calls `restore_sleep_mode()` on drop.
pub struct ActiveGuard<'a>(&'a PowerManager);

impl<'a> ActiveGuard<'a> {
    /// Acquire: calls `force_active()`, opening a region.
    pub fn acquire(power: &'a PowerManager) -> Self {
        power.force_active();
        Self(power)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.restore_sleep_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{quickcheck, Arbitrary, Gen};

    #[test]
    fn extended_sleep_from_off() {
        let mut policy = SleepPolicy::new(SleepState::Off);
        policy.set_extended_sleep(false);
        assert_eq!(policy.get_sleep_mode(), 1);
        assert!(policy.sleep_enabled());
    }

    #[test]
    fn request_inside_forced_region_is_deferred() {
        let mut policy = SleepPolicy::new(SleepState::ExtSleep);
        policy.force_active();
        policy.disable_sleep();
        assert_eq!(policy.get_sleep_mode(), 1);
        assert!(!policy.sleep_enabled());
        assert_eq!(policy.pending(), Some(SleepState::Off));

        policy.restore_sleep_mode();
        assert_eq!(policy.get_sleep_mode(), 0);
        assert_eq!(policy.pending(), None);
    }

    #[test]
    fn nested_regions_restore_on_last_close() {
        let mut policy = SleepPolicy::new(SleepState::ExtSleepOtpCopy);
        policy.force_active();
        policy.force_active();
        policy.restore_sleep_mode();
        assert!(policy.forced_active());
        assert!(!policy.sleep_enabled());

        policy.restore_sleep_mode();
        assert!(!policy.forced_active());
        assert_eq!(policy.mode(), SleepState::ExtSleepOtpCopy);
        assert!(policy.sleep_enabled());
    }

    #[test]
    fn unbalanced_restore_is_a_no_op() {
        let mut policy = SleepPolicy::new(SleepState::ExtSleep);
        let before = policy.clone();
        policy.restore_sleep_mode();
        assert_eq!(policy, before);
    }

    #[test]
    fn disable_twice_equals_once() {
        let mut once = SleepPolicy::new(SleepState::ExtSleep);
        once.disable_sleep();
        let mut twice = once.clone();
        twice.disable_sleep();
        assert_eq!(once, twice);
    }

    #[test]
    fn sleeping_is_reported_but_not_configurable() {
        let mut policy = SleepPolicy::new(SleepState::ExtSleep);
        policy.set_sleep_mode(SleepState::Sleeping);
        assert_eq!(policy.mode(), SleepState::ExtSleep);

        policy.set_sleeping(true);
        assert_eq!(policy.state(), SleepState::Sleeping);
        assert_eq!(policy.get_sleep_mode(), 1);
        policy.set_sleeping(false);
        assert_eq!(policy.state(), SleepState::ExtSleep);
    }

    #[test]
    fn guard_brackets_a_region() {
        let power = PowerManager::new(SleepState::ExtSleep);
        {
            let _outer = power.hold_active();
            let _inner = power.hold_active();
            power.set_extended_sleep(true);
            assert!(!power.snapshot().sleep_enabled());
        }
        assert_eq!(power.state(), SleepState::ExtSleepOtpCopy);
        assert!(power.snapshot().sleep_enabled());
    }

    #[test]
    fn ext_wakeup_flag() {
        let power = PowerManager::new(SleepState::Off);
        assert!(!power.ext_wakeup());
        power.enable_ext_wakeup();
        assert!(power.ext_wakeup());
        power.disable_ext_wakeup();
        assert!(!power.ext_wakeup());
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Disable,
        Extended(bool),
        Force,
        Restore,
    }

    impl Arbitrary for Op {
        fn arbitrary(g: &mut Gen) -> Self {
            match u8::arbitrary(g) % 4 {
                0 => Op::Disable,
                1 => Op::Extended(bool::arbitrary(g)),
                2 => Op::Force,
                _ => Op::Restore,
            }
        }
    }

    fn state_from(n: u8) -> SleepState {
        SleepState::from_code(n % 3).unwrap()
    }

    quickcheck! {
        fn paired_regions_leave_the_mode_alone(initial: u8, depths: Vec<u8>) -> bool {
            let mut policy = SleepPolicy::new(state_from(initial));
            let before = policy.get_sleep_mode();
            for depth in depths {
                let depth = depth % 8;
                for _ in 0..depth {
                    policy.force_active();
                }
                for _ in 0..depth {
                    policy.restore_sleep_mode();
                }
            }
            policy.get_sleep_mode() == before && !policy.forced_active()
        }

        fn last_request_wins_once_released(initial: u8, ops: Vec<Op>) -> bool {
            let mut policy = SleepPolicy::new(state_from(initial));
            let mut expected = policy.mode();
            for op in &ops {
                match *op {
                    Op::Disable => {
                        policy.disable_sleep();
                        expected = SleepState::Off;
                    }
                    Op::Extended(otp) => {
                        policy.set_extended_sleep(otp);
                        expected = if otp { SleepState::ExtSleepOtpCopy } else { SleepState::ExtSleep };
                    }
                    Op::Force => policy.force_active(),
                    Op::Restore => policy.restore_sleep_mode(),
                }
                if !policy.forced_active() && policy.mode() != expected {
                    return false;
                }
            }
            while policy.forced_active() {
                policy.restore_sleep_mode();
            }
            policy.mode() == expected && policy.sleep_enabled() == expected.is_extended()
        }

        fn code_round_trip(initial: u8, forced: bool) -> bool {
            let mut policy = SleepPolicy::new(state_from(initial));
            if forced {
                policy.force_active();
            }
            let before = policy.clone();
            policy.set_sleep_mode(SleepState::from_code(policy.get_sleep_mode()).unwrap());
            policy.get_sleep_mode() == before.get_sleep_mode()
                && (forced || policy == before)
        }
    }
}
