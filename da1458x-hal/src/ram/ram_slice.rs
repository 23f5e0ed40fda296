//! Bounds-checked RAM slice accessor for block operations.
//!
//! [`RamSlice`] names a region by base address and length and performs
//! `clear()`, `copy_at()` and word accesses through a [`Memory`] backend.
//! [`SystemRam`] is the volatile backend used on the chip; the host mock
//! provides a simulated one.

/// Byte-addressed memory backend.
pub trait Memory {
    fn read_u32(&self, addr: usize) -> u32;

    fn write_u32(&mut self, addr: usize, value: u32);

    /// Fill `len` bytes starting at `addr` with `value`.
    fn fill(&mut self, addr: usize, len: usize, value: u8);

    /// Copy `data` to `addr`.
    fn write_bytes(&mut self, addr: usize, data: &[u8]);
}

/// Volatile access to the physical address space.
#[derive(Debug)]
pub struct SystemRam(());

impl SystemRam {
    /// # Safety
    ///
    /// Every address later passed to the backend must be valid, writable RAM
    /// that no live Rust reference aliases (ROM data region, exchange memory,
    /// retained tables).
    pub const unsafe fn steal() -> Self {
        Self(())
    }
}

impl Memory for SystemRam {
    #[inline]
    fn read_u32(&self, addr: usize) -> u32 {
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    #[inline]
    fn write_u32(&mut self, addr: usize, value: u32) {
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }

    #[inline]
    fn fill(&mut self, addr: usize, len: usize, value: u8) {
        unsafe { core::ptr::write_bytes(addr as *mut u8, value, len) }
    }

    #[inline]
    fn write_bytes(&mut self, addr: usize, data: &[u8]) {
        unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), addr as *mut u8, data.len()) }
    }
}

/// A slice of RAM defined by base address and length in bytes.
///
/// # Usage
///
/// ```ignore
/// use da1458x_hal::ram::{RamSlice, SystemRam};
///
/// let mut ram = unsafe { SystemRam::steal() };
/// let em = RamSlice::new(0x07FC_9000, 0x1800);
/// em.clear(&mut ram);
/// em.write_u32(&mut ram, 0x40, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamSlice {
    addr: usize,
    len: usize,
}

impl RamSlice {
    #[inline]
    pub const fn new(addr: usize, len: usize) -> Self {
        Self { addr, len }
    }

    /// Slice covering `start..end`.
    #[inline]
    pub const fn from_range(start: usize, end: usize) -> Self {
        Self {
            addr: start,
            len: end - start,
        }
    }

    #[inline]
    pub const fn addr(&self) -> usize {
        self.addr
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn end(&self) -> usize {
        self.addr + self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` when `addr` lies inside the slice.
    #[inline]
    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.addr && addr < self.addr + self.len
    }

    /// Clear the entire region to zero.
    #[inline]
    pub fn clear(&self, mem: &mut impl Memory) {
        mem.fill(self.addr, self.len, 0);
    }

    /// Copy a byte slice into this region at the given byte offset.
    ///
    /// # Panics
    ///
    /// Panics if `offset + data.len() > len`.
    #[inline]
    pub fn copy_at(&self, mem: &mut impl Memory, offset: usize, data: &[u8]) {
        assert!(
            offset + data.len() <= self.len,
            "RamSlice copy_at overflow: offset {} + {} bytes > len {}",
            offset,
            data.len(),
            self.len,
        );
        mem.write_bytes(self.addr + offset, data);
    }

    /// Read a word at the given byte offset.
    ///
    /// # Panics
    ///
    /// Panics if the word does not fit or is unaligned.
    #[inline]
    pub fn read_u32(&self, mem: &impl Memory, offset: usize) -> u32 {
        self.check_word(offset);
        mem.read_u32(self.addr + offset)
    }

    /// Write a word at the given byte offset.
    ///
    /// # Panics
    ///
    /// Panics if the word does not fit or is unaligned.
    #[inline]
    pub fn write_u32(&self, mem: &mut impl Memory, offset: usize, value: u32) {
        self.check_word(offset);
        mem.write_u32(self.addr + offset, value);
    }

    /// Write consecutive words starting at the given byte offset.
    pub fn write_words(&self, mem: &mut impl Memory, offset: usize, words: &[u32]) {
        for (i, word) in words.iter().enumerate() {
            self.write_u32(mem, offset + 4 * i, *word);
        }
    }

    /// Create a sub-slice at `offset` bytes with `len` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len > self.len`.
    #[inline]
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len,
            "RamSlice slice overflow: offset {} + {} > len {}",
            offset,
            len,
            self.len,
        );
        Self {
            addr: self.addr + offset,
            len,
        }
    }

    #[inline]
    fn check_word(&self, offset: usize) {
        assert!(
            offset + 4 <= self.len,
            "RamSlice word overflow: offset {} + 4 bytes > len {}",
            offset,
            self.len,
        );
        debug_assert!(
            (self.addr + offset) % 4 == 0,
            "RamSlice: unaligned word access at {:#x}",
            self.addr + offset,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::ChipVariant;
    use crate::mock::MockChip;

    const BASE: usize = 0x07FC_4000;

    #[test]
    fn clear_only_touches_the_region() {
        let mut chip = MockChip::new(ChipVariant::Da14531);
        chip.fill(BASE - 4, 16, 0xAA);

        RamSlice::new(BASE, 8).clear(&mut chip);

        assert_eq!(chip.read_u32(BASE - 4), 0xAAAA_AAAA);
        assert_eq!(chip.read_u32(BASE), 0);
        assert_eq!(chip.read_u32(BASE + 4), 0);
        assert_eq!(chip.read_u32(BASE + 8), 0xAAAA_AAAA);
    }

    #[test]
    fn words_are_little_endian() {
        let mut chip = MockChip::new(ChipVariant::Da14531);
        let region = RamSlice::new(BASE, 16);
        region.write_words(&mut chip, 4, &[0x0403_0201, 0x0807_0605]);
        region.copy_at(&mut chip, 12, &[0xEF, 0xBE]);

        assert_eq!(chip.bytes(BASE + 4, 8), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(region.read_u32(&chip, 12), 0x0000_BEEF);
    }

    #[test]
    #[should_panic(expected = "copy_at overflow")]
    fn copy_past_end_panics() {
        let mut chip = MockChip::new(ChipVariant::Da14531);
        RamSlice::new(BASE, 4).copy_at(&mut chip, 2, &[0; 4]);
    }

    #[test]
    fn sub_slices_and_ranges() {
        let region = RamSlice::from_range(BASE, BASE + 0x100);
        assert_eq!(region.len(), 0x100);
        let sub = region.slice(0x10, 0x20);
        assert_eq!(sub.addr(), BASE + 0x10);
        assert_eq!(sub.end(), BASE + 0x30);
        assert!(sub.contains(BASE + 0x2F));
        assert!(!sub.contains(BASE + 0x30));
    }
}
