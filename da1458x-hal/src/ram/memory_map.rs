//! SRAM memory map of the DA1458x families.
//!
//! The per-family [`MemoryLayout`] constants are generated by `build.rs` from
//! `data/memory_layout.toml`, which mirrors the scatter-file placement.

use super::retention::RetentionMask;
use super::RamSlice;

/// A physical RAM block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RamRegion {
    pub base: usize,
    pub size: usize,
}

impl RamRegion {
    pub const fn new(base: usize, size: usize) -> Self {
        Self { base, size }
    }

    pub const fn end(&self) -> usize {
        self.base + self.size
    }

    /// `true` when `start..end` shares at least one byte with the block.
    /// An empty range shares none.
    pub const fn overlaps(&self, start: usize, end: usize) -> bool {
        start < end && start < self.end() && end > self.base
    }
}

/// Build-time exchange-memory parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EmGeometry {
    pub connections: usize,
    pub tx_buffers: usize,
    pub rx_buffers: usize,
    pub tx_buf_size: usize,
    pub rx_buf_size: usize,
}

/// Offsets of the exchange-memory areas, relative to `em_base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EmOffsets {
    /// Control structures.
    pub cs: usize,
    pub tx_desc: usize,
    pub rx_desc: usize,
    pub tx_buf: usize,
    pub rx_buf: usize,
    pub end: usize,
}

/// Link-time memory layout of one chip family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    pub ram_base: usize,
    pub ram_end: usize,
    pub ram_blocks: &'static [RamRegion],
    /// Program image: code, `.data`, `.bss` and the stack. Execution resumes
    /// in it after extended sleep and stateful hibernation.
    pub image_base: usize,
    pub image_size: usize,
    /// Function-address, ROM-config and message-handler tables.
    pub arch_tables_base: usize,
    pub arch_tables_size: usize,
    /// Replacement values of the ROM patch slots.
    pub patch_table_base: usize,
    pub patch_slots: usize,
    /// BLE exchange memory.
    pub em_base: usize,
    pub em_size: usize,
    /// ROM scratch/data region, runs up to the end of RAM.
    pub rom_data_base: usize,
    pub hci_cmd_desc_tab: usize,
    pub llm_local_cmds: usize,
    pub llm_local_le_feats: usize,
    pub llm_local_le_states: usize,
    pub rom_func_addr_table_var: usize,
    pub rom_cfg_table_var: usize,
    pub custom_msg_handlers_var: usize,
    /// State word of the ROM pseudo-random generator.
    pub rom_rand_state: usize,
    pub em_geometry: EmGeometry,
    pub em_linked: EmOffsets,
}

impl MemoryLayout {
    /// Exchange memory actually used by the linked image.
    pub const fn em(&self) -> RamSlice {
        RamSlice::new(self.em_base, self.em_linked.end)
    }

    /// ROM scratch/data region.
    pub const fn rom_data(&self) -> RamSlice {
        RamSlice::from_range(self.rom_data_base, self.ram_end)
    }

    pub const fn image(&self) -> RamSlice {
        RamSlice::new(self.image_base, self.image_size)
    }

    pub const fn arch_tables(&self) -> RamSlice {
        RamSlice::new(self.arch_tables_base, self.arch_tables_size)
    }

    /// Index of the block containing `addr`.
    pub fn block_of(&self, addr: usize) -> Option<usize> {
        self.ram_blocks
            .iter()
            .position(|b| addr >= b.base && addr < b.end())
    }

    /// Blocks sharing at least one byte with `addr..addr + len`.
    pub fn blocks_covering(&self, addr: usize, len: usize) -> RetentionMask {
        let end = addr.saturating_add(len);
        self.ram_blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.overlaps(addr, end))
            .fold(RetentionMask::NONE, |mask, (i, _)| mask | RetentionMask::block(i))
    }

    /// Blocks that must keep power in every sleep mode: ROM data, exchange
    /// memory, the patch value table and the ROM-resolved tables.
    pub fn mandatory_blocks(&self) -> RetentionMask {
        self.blocks_covering(self.em_base, self.ram_end - self.em_base)
            | self.blocks_covering(self.patch_table_base, 8 * self.patch_slots)
            | self.blocks_covering(self.arch_tables_base, self.arch_tables_size)
    }

    /// Blocks holding the program image.
    pub fn image_blocks(&self) -> RetentionMask {
        self.blocks_covering(self.image_base, self.image_size)
    }

    /// Every block of the family.
    pub fn all_blocks(&self) -> RetentionMask {
        RetentionMask::first(self.ram_blocks.len())
    }
}

include!(concat!(env!("OUT_DIR"), "/memory_map_generated.rs"));
