//! On-chip backend: volatile register access and the Cortex-M core.

use cortex_m::peripheral::NVIC;

use crate::cpu::Cpu;
use crate::ram::{Memory, SystemRam};
use crate::regs::{Reg, Registers};

/// The physical chip.
pub struct Mmio {
    ram: SystemRam,
}

impl Mmio {
    /// # Safety
    ///
    /// Only one `Mmio` may exist. The power, clock and patch registers as well
    /// as the SCB/NVIC are then driven exclusively through it.
    pub unsafe fn steal() -> Self {
        Self {
            ram: SystemRam::steal(),
        }
    }
}

impl Registers for Mmio {
    #[inline]
    fn read(&self, reg: Reg) -> u32 {
        unsafe {
            if reg.is_wide() {
                core::ptr::read_volatile(reg.addr() as *const u32)
            } else {
                core::ptr::read_volatile(reg.addr() as *const u16) as u32
            }
        }
    }

    #[inline]
    fn write(&mut self, reg: Reg, value: u32) {
        unsafe {
            if reg.is_wide() {
                core::ptr::write_volatile(reg.addr() as *mut u32, value)
            } else {
                core::ptr::write_volatile(reg.addr() as *mut u16, value as u16)
            }
        }
    }
}

impl Cpu for Mmio {
    #[inline]
    fn disable_interrupts(&mut self) {
        cortex_m::interrupt::disable();
    }

    #[inline]
    fn enable_interrupts(&mut self) {
        unsafe { cortex_m::interrupt::enable() }
    }

    fn interrupts_enabled(&self) -> bool {
        cortex_m::register::primask::read().is_inactive()
    }

    fn set_sleep_deep(&mut self, enable: bool) {
        let mut scb = unsafe { cortex_m::Peripherals::steal() }.SCB;
        if enable {
            scb.set_sleepdeep();
        } else {
            scb.clear_sleepdeep();
        }
    }

    #[inline]
    fn wait_for_interrupt(&mut self) {
        cortex_m::asm::dsb();
        cortex_m::asm::wfi();
    }

    fn irq_mask(&self) -> u32 {
        unsafe { (*NVIC::PTR).iser[0].read() }
    }

    fn disable_all_irqs(&mut self) {
        unsafe { (*NVIC::PTR).icer[0].write(u32::MAX) }
    }

    fn clear_pending_irqs(&mut self) {
        unsafe { (*NVIC::PTR).icpr[0].write(u32::MAX) }
    }

    fn enable_irqs(&mut self, mask: u32) {
        unsafe { (*NVIC::PTR).iser[0].write(mask) }
    }
}

impl Memory for Mmio {
    #[inline]
    fn read_u32(&self, addr: usize) -> u32 {
        self.ram.read_u32(addr)
    }

    #[inline]
    fn write_u32(&mut self, addr: usize, value: u32) {
        self.ram.write_u32(addr, value)
    }

    #[inline]
    fn fill(&mut self, addr: usize, len: usize, value: u8) {
        self.ram.fill(addr, len, value)
    }

    #[inline]
    fn write_bytes(&mut self, addr: usize, data: &[u8]) {
        self.ram.write_bytes(addr, data)
    }
}
