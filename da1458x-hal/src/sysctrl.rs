//! System control helpers: debugger, pads, address remap, trims, supply and
//! radio power domains.
//!
//! Free functions over the register file, one concern each. Callers sequence
//! them; nothing here decides policy.

use crate::regs::{
    ble_deepslcntl, clk_radio, clk_xtal32m, hibern_ctrl, pad_latch, pmu_ctrl, power_aon_ctrl,
    power_ctrl, sys_ctrl, sys_stat, Reg, Registers,
};

/// Whether a debugger currently holds the debug power domain up.
#[inline]
pub fn debugger_attached(bus: &impl Registers) -> bool {
    bus.bit(Reg::SysStat, sys_stat::DBG_IS_UP)
}

/// SWD interface enable.
#[inline]
pub fn debugger_enabled(bus: &impl Registers) -> bool {
    bus.bit(Reg::SysCtrl, sys_ctrl::DEBUGGER_ENABLE)
}

pub fn set_debugger_enabled(bus: &mut impl Registers, enabled: bool) {
    bus.set_bits(Reg::SysCtrl, sys_ctrl::DEBUGGER_ENABLE, enabled);
}

/// Latch (`true`) or release (`false`) the state of every pad.
pub fn latch_pads(bus: &mut impl Registers, latched: bool) {
    bus.set_bits(Reg::PadLatch, pad_latch::LATCH, latched);
}

pub fn pads_latched(bus: &impl Registers) -> bool {
    bus.bit(Reg::PadLatch, pad_latch::LATCH)
}

/// Arm (or disarm) OTP-to-RAM mirroring for the next wakeup.
pub fn set_otp_copy(bus: &mut impl Registers, armed: bool) {
    bus.set_bits(Reg::SysCtrl, sys_ctrl::OTP_COPY, armed);
}

/// Memory seen at address 0 after the next reset or wakeup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Remap {
    Rom = 0,
    Otp = 1,
    Ram1 = 2,
    Ram3 = 3,
}

impl Remap {
    /// RAM block index the remap target lives in, if it is RAM.
    pub const fn ram_block(self) -> Option<usize> {
        match self {
            Self::Ram1 => Some(0),
            Self::Ram3 => Some(2),
            Self::Rom | Self::Otp => None,
        }
    }
}

pub fn remap_address0(bus: &mut impl Registers, target: Remap) {
    bus.set_field(Reg::SysCtrl, sys_ctrl::REMAP_ADR0, target as u32);
}

/// Oscillator and reference trim values programmed by the booter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Trims {
    pub bandgap: u32,
    pub rc32m: u32,
    pub xtal32m: u32,
    pub rcx: u32,
}

pub fn read_trims(bus: &impl Registers) -> Trims {
    Trims {
        bandgap: bus.read(Reg::Bandgap),
        rc32m: bus.read(Reg::ClkRc32m),
        xtal32m: bus.read(Reg::XtalTrim),
        rcx: bus.read(Reg::ClkRcx),
    }
}

pub fn write_trims(bus: &mut impl Registers, trims: &Trims) {
    bus.write(Reg::Bandgap, trims.bandgap);
    bus.write(Reg::ClkRc32m, trims.rc32m);
    bus.write(Reg::XtalTrim, trims.xtal32m);
    bus.write(Reg::ClkRcx, trims.rcx);
}

/// Enable XTAL32M and wait until it has settled.
pub fn xtal32m_start(bus: &mut impl Registers) {
    bus.set_bits(Reg::ClkXtal32m, clk_xtal32m::ENABLE, true);
    while !bus.bit(Reg::SysStat, sys_stat::XTAL32M_SETTLED) {}
}

/// DC-DC converter topology, strapped at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Regulation {
    /// Single-cell supply, VBAT_LOW powered.
    Boost,
    /// VBAT_HIGH powered.
    Buck,
}

pub fn regulation(bus: &impl Registers) -> Regulation {
    if bus.bit(Reg::PowerCtrl, power_ctrl::BOOST_SELECTED) {
        Regulation::Boost
    } else {
        Regulation::Buck
    }
}

pub fn dcdc_enabled(bus: &impl Registers) -> bool {
    bus.bit(Reg::PowerCtrl, power_ctrl::DCDC_ENABLE)
}

pub fn set_dcdc(bus: &mut impl Registers, enabled: bool) {
    bus.set_bits(Reg::PowerCtrl, power_ctrl::DCDC_ENABLE, enabled);
}

/// VBAT_HIGH rail connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VbatHl {
    /// Hardware decides.
    Auto,
    Connect,
    Disconnect,
}

pub fn set_vbat_hl(bus: &mut impl Registers, mode: VbatHl) {
    let value = match mode {
        VbatHl::Auto => power_aon_ctrl::VBAT_HL_AUTO,
        VbatHl::Connect => power_aon_ctrl::VBAT_HL_CONNECT_FORCE,
        VbatHl::Disconnect => power_aon_ctrl::VBAT_HL_DISCONNECT,
    };
    bus.set_field(Reg::PowerAonCtrl, power_aon_ctrl::VBAT_HL_CONNECT, value);
}

pub fn vbat_hl(bus: &impl Registers) -> VbatHl {
    match bus.field(Reg::PowerAonCtrl, power_aon_ctrl::VBAT_HL_CONNECT) {
        power_aon_ctrl::VBAT_HL_CONNECT_FORCE => VbatHl::Connect,
        power_aon_ctrl::VBAT_HL_DISCONNECT => VbatHl::Disconnect,
        _ => VbatHl::Auto,
    }
}

/// VBAT power-on-reset detection.
pub fn set_por_vbat(bus: &mut impl Registers, enabled: bool) {
    bus.set_bits(Reg::PowerAonCtrl, power_aon_ctrl::POR_VBAT_ENABLE, enabled);
}

/// Hibernation wakeup pins (bit 0 = P0_1) and level.
pub fn configure_hibernation_wakeup(bus: &mut impl Registers, pins: u8, active_high: bool) {
    bus.set_field(Reg::HibernCtrl, hibern_ctrl::WKUP_MASK, pins as u32);
    bus.set_bits(Reg::HibernCtrl, hibern_ctrl::WKUP_POLARITY, active_high);
}

pub fn set_hibernation(bus: &mut impl Registers, enabled: bool) {
    bus.set_bits(Reg::HibernCtrl, hibern_ctrl::HIBERNATION_ENABLE, enabled);
}

pub fn hibernation_enabled(bus: &impl Registers) -> bool {
    bus.bit(Reg::HibernCtrl, hibern_ctrl::HIBERNATION_ENABLE)
}

/// Power the radio domain down (`true`) or up, waiting for the status bit.
pub fn set_radio_domain_down(bus: &mut impl Registers, down: bool) {
    bus.set_bits(Reg::PmuCtrl, pmu_ctrl::RADIO_SLEEP, down);
    while bus.bit(Reg::SysStat, sys_stat::RAD_IS_DOWN) != down {}
}

/// Power the peripheral domain down (`true`) or up, waiting for the status bit.
pub fn set_periph_domain_down(bus: &mut impl Registers, down: bool) {
    bus.set_bits(Reg::PmuCtrl, pmu_ctrl::PERIPH_SLEEP, down);
    while bus.bit(Reg::SysStat, sys_stat::PER_IS_DOWN) != down {}
}

/// Have the radio and peripheral domains power down (`true`) with the core.
///
/// No status wait: the PMU acts on these bits when the core enters deep sleep.
pub fn request_domains_sleep(bus: &mut impl Registers, sleep: bool) {
    bus.set_bits(Reg::PmuCtrl, pmu_ctrl::RADIO_SLEEP | pmu_ctrl::PERIPH_SLEEP, sleep);
}

/// Full family: wake from deep sleep through a reset.
pub fn set_reset_on_wakeup(bus: &mut impl Registers, enabled: bool) {
    bus.set_bits(Reg::PmuCtrl, pmu_ctrl::RESET_ON_WAKEUP, enabled);
}

pub fn set_ble_clock(bus: &mut impl Registers, enabled: bool) {
    bus.set_bits(Reg::ClkRadio, clk_radio::BLE_ENABLE, enabled);
}

pub fn ble_clock_enabled(bus: &impl Registers) -> bool {
    bus.bit(Reg::ClkRadio, clk_radio::BLE_ENABLE)
}

/// Put the BLE core into deep sleep and wait until it reports so.
pub fn ble_request_deep_sleep(bus: &mut impl Registers) {
    bus.set_bits(Reg::BleDeepSlCntl, ble_deepslcntl::DEEP_SLEEP_ON, true);
    while !bus.bit(Reg::BleDeepSlCntl, ble_deepslcntl::DEEP_SLEEP_STAT) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::ChipVariant;
    use crate::mock::MockChip;

    #[test]
    fn trims_round_trip() {
        let mut chip = MockChip::new(ChipVariant::Da14531);
        let trims = Trims {
            bandgap: 0x1234,
            rc32m: 0x0567,
            xtal32m: 0x0089,
            rcx: 0x00AB,
        };
        write_trims(&mut chip, &trims);
        assert_eq!(read_trims(&chip), trims);
    }

    #[test]
    fn remap_targets_map_to_blocks() {
        let mut chip = MockChip::new(ChipVariant::Da14531);
        chip.write(Reg::SysCtrl, sys_ctrl::DEBUGGER_ENABLE);
        remap_address0(&mut chip, Remap::Ram3);
        assert_eq!(chip.field(Reg::SysCtrl, sys_ctrl::REMAP_ADR0), 3);
        assert!(debugger_enabled(&chip));
        assert_eq!(Remap::Ram3.ram_block(), Some(2));
        assert_eq!(Remap::Otp.ram_block(), None);
    }

    #[test]
    fn vbat_policy_and_regulation() {
        let mut chip = MockChip::new(ChipVariant::Da14531);
        assert_eq!(regulation(&chip), Regulation::Buck);
        chip.poke(Reg::PowerCtrl, power_ctrl::BOOST_SELECTED);
        assert_eq!(regulation(&chip), Regulation::Boost);

        set_por_vbat(&mut chip, true);
        set_vbat_hl(&mut chip, VbatHl::Disconnect);
        assert_eq!(vbat_hl(&chip), VbatHl::Disconnect);
        assert!(chip.bit(Reg::PowerAonCtrl, power_aon_ctrl::POR_VBAT_ENABLE));
    }

    #[test]
    fn power_domains_report_status() {
        let mut chip = MockChip::new(ChipVariant::Da14585);
        set_radio_domain_down(&mut chip, true);
        set_periph_domain_down(&mut chip, true);
        assert!(chip.bit(Reg::SysStat, sys_stat::RAD_IS_DOWN));
        assert!(chip.bit(Reg::SysStat, sys_stat::PER_IS_DOWN));
        set_radio_domain_down(&mut chip, false);
        assert!(!chip.bit(Reg::SysStat, sys_stat::RAD_IS_DOWN));

        ble_request_deep_sleep(&mut chip);
        xtal32m_start(&mut chip);
        assert!(chip.bit(Reg::SysStat, sys_stat::XTAL32M_SETTLED));
    }
}
