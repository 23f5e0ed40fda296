//! Host-side simulated chip.
//!
//! [`MockChip`] implements [`Registers`], [`Cpu`] and [`Memory`] over plain
//! arrays so that sleep, retention and ROM setup code runs in host tests. It
//! models the few hardware reactions that code waits on (status bits follow
//! their control bits) and records an [`Event`] trace for ordering checks.

use crate::chip::ChipVariant;
use crate::cpu::Cpu;
use crate::ram::Memory;
use crate::regs::{
    ble_deepslcntl, clk_xtal32m, freeze, pmu_ctrl, power_ctrl, sys_stat, Reg, Registers,
};

/// Base of the simulated RAM.
pub const RAM_BASE: usize = 0x07FC_0000;
/// Simulated RAM size, large enough for every family.
pub const RAM_SIZE: usize = 0x1_8000;

/// Something the code under test did to the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Write(Reg, u32),
    InterruptsDisabled,
    InterruptsEnabled,
    /// `wfi` executed, with the core state at that moment.
    Wfi {
        interrupts_enabled: bool,
        sleep_deep: bool,
    },
}

#[derive(Debug, Clone)]
pub struct MockChip {
    variant: ChipVariant,
    regs: [u32; Reg::COUNT],
    ram: Vec<u8>,
    interrupts_enabled: bool,
    sleep_deep: bool,
    irq_enabled: u32,
    irq_pending: u32,
    watchdog_frozen: bool,
    events: Vec<Event>,
}

impl MockChip {
    /// Chip fresh out of reset.
    pub fn new(variant: ChipVariant) -> Self {
        let mut regs = [0; Reg::COUNT];
        regs[Reg::ChipId.index()] = match variant {
            ChipVariant::Da14531 => crate::regs::chip_id::DA14531 | 0x0101,
            ChipVariant::Da14585 => crate::regs::chip_id::DA14585 | 0x0201,
        };
        Self {
            variant,
            regs,
            ram: vec![0; RAM_SIZE],
            interrupts_enabled: true,
            sleep_deep: false,
            irq_enabled: 0,
            irq_pending: 0,
            watchdog_frozen: false,
            events: Vec::new(),
        }
    }

    pub fn variant(&self) -> ChipVariant {
        self.variant
    }

    /// Store a register value without side effects or trace.
    pub fn poke(&mut self, reg: Reg, value: u32) {
        self.regs[reg.index()] = value;
    }

    /// Raw register file, indexed by [`Reg::index`].
    pub fn registers(&self) -> &[u32; Reg::COUNT] {
        &self.regs
    }

    /// `len` bytes of simulated RAM starting at `addr`.
    pub fn bytes(&self, addr: usize, len: usize) -> &[u8] {
        let start = self.offset(addr, len);
        &self.ram[start..start + len]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Index of the first event matching `pred`.
    pub fn position(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events.iter().position(pred)
    }

    /// Number of `wfi` executed so far.
    pub fn wfi_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Wfi { .. }))
            .count()
    }

    pub fn set_debugger_attached(&mut self, attached: bool) {
        let stat = &mut self.regs[Reg::SysStat.index()];
        if attached {
            *stat |= sys_stat::DBG_IS_UP;
        } else {
            *stat &= !sys_stat::DBG_IS_UP;
        }
    }

    pub fn watchdog_frozen(&self) -> bool {
        self.watchdog_frozen
    }

    pub fn sleep_deep(&self) -> bool {
        self.sleep_deep
    }

    pub fn pending_irqs(&self) -> u32 {
        self.irq_pending
    }

    pub fn set_pending_irqs(&mut self, mask: u32) {
        self.irq_pending = mask;
    }

    /// Power-on reset of the core and of every register outside the
    /// always-on domain, as on wakeup from hibernation. RAM is kept.
    pub fn reset(&mut self) {
        const ALWAYS_ON: [Reg; 5] = [
            Reg::ChipId,
            Reg::HibernCtrl,
            Reg::PadLatch,
            Reg::PowerAonCtrl,
            Reg::RamPwrCtrl,
        ];
        let strap = self.regs[Reg::PowerCtrl.index()] & power_ctrl::BOOST_SELECTED;
        let mut regs = [0; Reg::COUNT];
        for reg in ALWAYS_ON {
            regs[reg.index()] = self.regs[reg.index()];
        }
        regs[Reg::PowerCtrl.index()] = strap;
        regs[Reg::SysStat.index()] = self.regs[Reg::SysStat.index()] & sys_stat::DBG_IS_UP;
        self.regs = regs;
        self.interrupts_enabled = true;
        self.sleep_deep = false;
        self.irq_enabled = 0;
        self.irq_pending = 0;
        self.watchdog_frozen = false;
    }

    fn offset(&self, addr: usize, len: usize) -> usize {
        assert!(
            addr >= RAM_BASE && addr + len <= RAM_BASE + RAM_SIZE,
            "MockChip: access {:#x}..{:#x} outside simulated RAM",
            addr,
            addr + len,
        );
        addr - RAM_BASE
    }

    fn mirror(&mut self, status: u32, on: bool) {
        let stat = &mut self.regs[Reg::SysStat.index()];
        if on {
            *stat |= status;
        } else {
            *stat &= !status;
        }
    }
}

impl Registers for MockChip {
    fn read(&self, reg: Reg) -> u32 {
        self.regs[reg.index()]
    }

    fn write(&mut self, reg: Reg, value: u32) {
        let value = if reg.is_wide() { value } else { value & 0xFFFF };
        self.events.push(Event::Write(reg, value));
        match reg {
            Reg::ChipId => return,
            Reg::SetFreeze if value & freeze::WDOG != 0 => self.watchdog_frozen = true,
            Reg::ResetFreeze if value & freeze::WDOG != 0 => self.watchdog_frozen = false,
            Reg::PmuCtrl => {
                self.mirror(sys_stat::RAD_IS_DOWN, value & pmu_ctrl::RADIO_SLEEP != 0);
                self.mirror(sys_stat::PER_IS_DOWN, value & pmu_ctrl::PERIPH_SLEEP != 0);
            }
            Reg::ClkXtal32m => {
                self.mirror(sys_stat::XTAL32M_SETTLED, value & clk_xtal32m::ENABLE != 0);
            }
            Reg::BleDeepSlCntl => {
                let value = if value & ble_deepslcntl::SOFT_WAKEUP_REQ != 0 {
                    value & !(ble_deepslcntl::SOFT_WAKEUP_REQ | ble_deepslcntl::DEEP_SLEEP_ON)
                } else {
                    value
                };
                let stat = if value & ble_deepslcntl::DEEP_SLEEP_ON != 0 {
                    value | ble_deepslcntl::DEEP_SLEEP_STAT
                } else {
                    value & !ble_deepslcntl::DEEP_SLEEP_STAT
                };
                self.regs[reg.index()] = stat;
                return;
            }
            _ => {}
        }
        self.regs[reg.index()] = value;
    }
}

impl Cpu for MockChip {
    fn disable_interrupts(&mut self) {
        self.interrupts_enabled = false;
        self.events.push(Event::InterruptsDisabled);
    }

    fn enable_interrupts(&mut self) {
        self.interrupts_enabled = true;
        self.events.push(Event::InterruptsEnabled);
    }

    fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }

    fn set_sleep_deep(&mut self, enable: bool) {
        self.sleep_deep = enable;
    }

    fn wait_for_interrupt(&mut self) {
        self.events.push(Event::Wfi {
            interrupts_enabled: self.interrupts_enabled,
            sleep_deep: self.sleep_deep,
        });
    }

    fn irq_mask(&self) -> u32 {
        self.irq_enabled
    }

    fn disable_all_irqs(&mut self) {
        self.irq_enabled = 0;
    }

    fn clear_pending_irqs(&mut self) {
        self.irq_pending = 0;
    }

    fn enable_irqs(&mut self, mask: u32) {
        self.irq_enabled |= mask;
    }
}

impl Memory for MockChip {
    fn read_u32(&self, addr: usize) -> u32 {
        let start = self.offset(addr, 4);
        let mut word = [0; 4];
        word.copy_from_slice(&self.ram[start..start + 4]);
        u32::from_le_bytes(word)
    }

    fn write_u32(&mut self, addr: usize, value: u32) {
        let start = self.offset(addr, 4);
        self.ram[start..start + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn fill(&mut self, addr: usize, len: usize, value: u8) {
        let start = self.offset(addr, len);
        self.ram[start..start + len].fill(value);
    }

    fn write_bytes(&mut self, addr: usize, data: &[u8]) {
        let start = self.offset(addr, data.len());
        self.ram[start..start + data.len()].copy_from_slice(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_registers_truncate() {
        let mut chip = MockChip::new(ChipVariant::Da14531);
        chip.write(Reg::SysCtrl, 0x1_0180);
        assert_eq!(chip.read(Reg::SysCtrl), 0x0180);
        chip.write(Reg::PatchValid, 0x1_0000);
        assert_eq!(chip.read(Reg::PatchValid), 0x1_0000);
    }

    #[test]
    fn context_round_trip() {
        let mut chip = MockChip::new(ChipVariant::Da14531);
        chip.enable_irqs(0b1011);
        chip.disable_interrupts();
        let ctx = chip.save_context();

        chip.enable_interrupts();
        chip.disable_all_irqs();
        chip.enable_irqs(0xFF);
        chip.restore_context(&ctx);

        assert_eq!(chip.irq_mask(), 0b1011);
        assert!(!chip.interrupts_enabled());
    }

    #[test]
    #[should_panic(expected = "outside simulated RAM")]
    fn out_of_range_access_panics() {
        let chip = MockChip::new(ChipVariant::Da14531);
        chip.read_u32(RAM_BASE + RAM_SIZE);
    }
}
