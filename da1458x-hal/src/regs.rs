//! Register file of the power, clock and patch blocks.
//!
//! Only the registers touched by the sleep/retention/patch core are modelled.
//! Access goes through the [`Registers`] trait so the same logic drives the
//! real MMIO backend and the host mock.

/// A memory-mapped register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reg {
    ClkRadio,
    ClkRc32m,
    ClkRcx,
    ClkXtal32m,
    XtalTrim,
    Bandgap,
    PmuCtrl,
    SysCtrl,
    SysStat,
    RamPwrCtrl,
    PowerCtrl,
    PowerAonCtrl,
    HibernCtrl,
    PadLatch,
    Watchdog,
    SetFreeze,
    ResetFreeze,
    BleDeepSlCntl,
    ChipId,
    PatchValid,
    /// Patch match address of slot `n`.
    PatchAddr(u8),
}

/// Number of patch-address registers implemented by the hardware.
pub const PATCH_ADDR_REGS: usize = 32;

impl Reg {
    /// Registers with a fixed index, patch slots excluded.
    const FIXED: usize = 20;

    /// Total number of distinct registers, patch slots included.
    pub const COUNT: usize = Self::FIXED + PATCH_ADDR_REGS;

    /// Bus address.
    pub const fn addr(self) -> usize {
        match self {
            Self::ClkRadio => 0x5000_0008,
            Self::PmuCtrl => 0x5000_0010,
            Self::SysCtrl => 0x5000_0012,
            Self::SysStat => 0x5000_0014,
            Self::RamPwrCtrl => 0x5000_0018,
            Self::PowerAonCtrl => 0x5000_0020,
            Self::ClkRc32m => 0x5000_0024,
            Self::ClkRcx => 0x5000_0026,
            Self::ClkXtal32m => 0x5000_0028,
            Self::XtalTrim => 0x5000_002A,
            Self::Bandgap => 0x5000_0030,
            Self::PowerCtrl => 0x5000_0050,
            Self::HibernCtrl => 0x5000_0300,
            Self::PadLatch => 0x5000_030C,
            Self::Watchdog => 0x5000_3100,
            Self::ChipId => 0x5000_3200,
            Self::SetFreeze => 0x5000_3300,
            Self::ResetFreeze => 0x5000_3302,
            Self::BleDeepSlCntl => 0x4000_0030,
            Self::PatchValid => 0x4000_8400,
            Self::PatchAddr(n) => 0x4000_8404 + 4 * n as usize,
        }
    }

    /// `true` for 32-bit registers, `false` for 16-bit ones.
    pub const fn is_wide(self) -> bool {
        matches!(
            self,
            Self::BleDeepSlCntl | Self::ChipId | Self::PatchValid | Self::PatchAddr(_)
        )
    }

    /// Dense index, used by register-file backends.
    pub const fn index(self) -> usize {
        match self {
            Self::ClkRadio => 0,
            Self::ClkRc32m => 1,
            Self::ClkRcx => 2,
            Self::ClkXtal32m => 3,
            Self::XtalTrim => 4,
            Self::Bandgap => 5,
            Self::PmuCtrl => 6,
            Self::SysCtrl => 7,
            Self::SysStat => 8,
            Self::RamPwrCtrl => 9,
            Self::PowerCtrl => 10,
            Self::PowerAonCtrl => 11,
            Self::HibernCtrl => 12,
            Self::PadLatch => 13,
            Self::Watchdog => 14,
            Self::SetFreeze => 15,
            Self::ResetFreeze => 16,
            Self::BleDeepSlCntl => 17,
            Self::ChipId => 18,
            Self::PatchValid => 19,
            Self::PatchAddr(n) => Self::FIXED + n as usize,
        }
    }
}

/// Register access.
pub trait Registers {
    fn read(&self, reg: Reg) -> u32;

    fn write(&mut self, reg: Reg, value: u32);

    fn modify(&mut self, reg: Reg, f: impl FnOnce(u32) -> u32) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// Set or clear every bit of `mask`.
    fn set_bits(&mut self, reg: Reg, mask: u32, on: bool) {
        self.modify(reg, |v| if on { v | mask } else { v & !mask });
    }

    /// Write `value` into the field selected by `mask` (right-aligned value).
    fn set_field(&mut self, reg: Reg, mask: u32, value: u32) {
        let shift = mask.trailing_zeros();
        self.modify(reg, |v| (v & !mask) | ((value << shift) & mask));
    }

    /// Read the field selected by `mask`, right-aligned.
    fn field(&self, reg: Reg, mask: u32) -> u32 {
        (self.read(reg) & mask) >> mask.trailing_zeros()
    }

    fn bit(&self, reg: Reg, mask: u32) -> bool {
        self.read(reg) & mask != 0
    }
}

pub mod clk_radio {
    pub const BLE_ENABLE: u32 = 1 << 7;
}

pub mod clk_xtal32m {
    pub const ENABLE: u32 = 1 << 0;
}

pub mod pmu_ctrl {
    pub const PERIPH_SLEEP: u32 = 1 << 0;
    pub const RADIO_SLEEP: u32 = 1 << 1;
    /// Full family: wake from deep sleep through a reset.
    pub const RESET_ON_WAKEUP: u32 = 1 << 3;
    /// Full family: one bit per RAM block, set = retained.
    pub const RETENTION_MODE: u32 = 0xF << 4;
}

pub mod sys_ctrl {
    /// Memory mapped at address 0 after wakeup.
    pub const REMAP_ADR0: u32 = 0x7;
    pub const DEBUGGER_ENABLE: u32 = 1 << 7;
    /// Mirror OTP into RAM on the next wakeup.
    pub const OTP_COPY: u32 = 1 << 8;
}

pub mod sys_stat {
    pub const RAD_IS_DOWN: u32 = 1 << 0;
    pub const PER_IS_DOWN: u32 = 1 << 2;
    pub const DBG_IS_UP: u32 = 1 << 7;
    pub const XTAL32M_SETTLED: u32 = 1 << 9;
}

/// Low-power family: two bits per RAM block.
pub mod ram_pwr_ctrl {
    pub const FIELD_BITS: u32 = 2;
    pub const FIELD_MASK: u32 = 0b11;
    pub const NORMAL: u32 = 0b00;
    pub const RETAINED: u32 = 0b01;
    pub const OFF: u32 = 0b10;
}

pub mod power_ctrl {
    pub const DCDC_ENABLE: u32 = 1 << 0;
    /// Strap: set when the chip runs in boost (single-cell) mode.
    pub const BOOST_SELECTED: u32 = 1 << 15;
}

pub mod power_aon_ctrl {
    pub const VBAT_HL_CONNECT: u32 = 0x3;
    pub const VBAT_HL_AUTO: u32 = 0;
    pub const VBAT_HL_CONNECT_FORCE: u32 = 1;
    pub const VBAT_HL_DISCONNECT: u32 = 2;
    pub const POR_VBAT_ENABLE: u32 = 1 << 2;
}

pub mod hibern_ctrl {
    pub const HIBERNATION_ENABLE: u32 = 1 << 0;
    /// Set: wake on high level, clear: wake on low level.
    pub const WKUP_POLARITY: u32 = 1 << 1;
    /// P0_1..P0_5 wake enables.
    pub const WKUP_MASK: u32 = 0x1F << 2;
}

pub mod pad_latch {
    /// Set: pads hold their current state.
    pub const LATCH: u32 = 1 << 0;
}

pub mod freeze {
    pub const WDOG: u32 = 1 << 3;
}

pub mod ble_deepslcntl {
    pub const DEEP_SLEEP_ON: u32 = 1 << 2;
    pub const SOFT_WAKEUP_REQ: u32 = 1 << 4;
    pub const DEEP_SLEEP_STAT: u32 = 1 << 15;
}

pub mod chip_id {
    pub const FAMILY_MASK: u32 = 0xFFFF_0000;
    pub const DA14531: u32 = 0x0531_0000;
    pub const DA14585: u32 = 0x0585_0000;
}
