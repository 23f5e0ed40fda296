//! Core-level operations: global interrupt mask, NVIC lines, SLEEPDEEP and WFI.

/// Interrupt state captured before stateful hibernation and restored on
/// resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CpuContext {
    /// Global interrupts were enabled when the context was taken.
    pub interrupts_enabled: bool,
    /// NVIC enabled lines (`ISER[0]`).
    pub irq_mask: u32,
}

/// Cortex-M0/M0+ core control.
pub trait Cpu {
    /// Mask all interrupts (`cpsid i`).
    fn disable_interrupts(&mut self);

    /// Unmask interrupts (`cpsie i`).
    fn enable_interrupts(&mut self);

    fn interrupts_enabled(&self) -> bool;

    /// `SCB.SCR.SLEEPDEEP`.
    fn set_sleep_deep(&mut self, enable: bool);

    /// Wait for interrupt. A pending interrupt wakes the core even while
    /// interrupts are masked.
    fn wait_for_interrupt(&mut self);

    /// NVIC enabled lines.
    fn irq_mask(&self) -> u32;

    /// Disable every NVIC line (`ICER`).
    fn disable_all_irqs(&mut self);

    /// Clear every pending NVIC line (`ICPR`).
    fn clear_pending_irqs(&mut self);

    /// Re-enable the NVIC lines of `mask` (`ISER`).
    fn enable_irqs(&mut self, mask: u32);

    fn save_context(&self) -> CpuContext {
        CpuContext {
            interrupts_enabled: self.interrupts_enabled(),
            irq_mask: self.irq_mask(),
        }
    }

    /// Restore the NVIC lines and global interrupt state of `ctx`.
    fn restore_context(&mut self, ctx: &CpuContext) {
        self.disable_all_irqs();
        self.enable_irqs(ctx.irq_mask);
        if ctx.interrupts_enabled {
            self.enable_interrupts();
        } else {
            self.disable_interrupts();
        }
    }
}
