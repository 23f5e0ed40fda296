//! Generates `memory_map_generated.rs` from `data/memory_layout.toml`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::{env, fs};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

const LAYOUT_FILE: &str = "data/memory_layout.toml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Family {
    ram_base: u32,
    ram_blocks: Vec<u32>,
    image_base: u32,
    image_size: u32,
    arch_tables_base: u32,
    arch_tables_size: u32,
    patch_table_base: u32,
    patch_slots: u32,
    em_base: u32,
    em_size: u32,
    rom_data_base: u32,
    hci_cmd_desc_tab: u32,
    llm_local_cmds: u32,
    llm_local_le_feats: u32,
    llm_local_le_states: u32,
    rom_func_addr_table_var: u32,
    rom_cfg_table_var: u32,
    custom_msg_handlers_var: u32,
    rom_rand_state: u32,
    em: Em,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Em {
    connections: u32,
    tx_buffers: u32,
    rx_buffers: u32,
    tx_buf_size: u32,
    rx_buf_size: u32,
    linked: EmLinked,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmLinked {
    cs: u32,
    tx_desc: u32,
    rx_desc: u32,
    tx_buf: u32,
    rx_buf: u32,
    end: u32,
}

impl Family {
    fn ram_end(&self) -> u32 {
        self.ram_base + self.ram_blocks.iter().sum::<u32>()
    }

    fn check(&self, name: &str) -> Result<()> {
        let end = self.ram_end();
        let in_ram = |addr: u32| addr >= self.ram_base && addr < end;

        ensure!(
            (1..=8).contains(&self.ram_blocks.len()),
            "{name}: {} RAM blocks, expected 1..=8",
            self.ram_blocks.len()
        );
        ensure!(
            self.image_size > 0 && self.image_base + self.image_size <= self.arch_tables_base,
            "{name}: program image must be non-empty and end below the ROM tables"
        );
        ensure!(
            self.em_base + self.em_size <= self.rom_data_base,
            "{name}: exchange memory overlaps the ROM data region"
        );
        ensure!(
            self.em.linked.end <= self.em_size,
            "{name}: linked EM end {:#x} exceeds EM size {:#x}",
            self.em.linked.end,
            self.em_size
        );
        ensure!(
            self.patch_slots <= 32,
            "{name}: {} patch slots, hardware has at most 32",
            self.patch_slots
        );
        for (field, addr) in [
            ("image_base", self.image_base),
            ("arch_tables_base", self.arch_tables_base),
            ("patch_table_base", self.patch_table_base),
            ("em_base", self.em_base),
            ("rom_data_base", self.rom_data_base),
        ] {
            ensure!(in_ram(addr), "{name}: {field} {addr:#x} outside RAM");
        }
        for (field, addr) in [
            ("hci_cmd_desc_tab", self.hci_cmd_desc_tab),
            ("llm_local_cmds", self.llm_local_cmds),
            ("llm_local_le_feats", self.llm_local_le_feats),
            ("llm_local_le_states", self.llm_local_le_states),
            ("rom_func_addr_table_var", self.rom_func_addr_table_var),
            ("rom_cfg_table_var", self.rom_cfg_table_var),
            ("custom_msg_handlers_var", self.custom_msg_handlers_var),
            ("rom_rand_state", self.rom_rand_state),
        ] {
            ensure!(
                addr >= self.rom_data_base && addr < end && addr % 4 == 0,
                "{name}: {field} {addr:#x} must be a word inside the ROM data region"
            );
        }
        Ok(())
    }

    fn emit(&self, name: &str, out: &mut String) -> Result<()> {
        let ident = name.to_uppercase();
        writeln!(out, "/// Memory layout of the {ident} family.")?;
        writeln!(out, "pub const {ident}: MemoryLayout = MemoryLayout {{")?;
        writeln!(out, "    ram_base: {:#010x},", self.ram_base)?;
        writeln!(out, "    ram_end: {:#010x},", self.ram_end())?;
        writeln!(out, "    ram_blocks: &[")?;
        let mut base = self.ram_base;
        for size in &self.ram_blocks {
            writeln!(out, "        RamRegion::new({base:#010x}, {size:#x}),")?;
            base += size;
        }
        writeln!(out, "    ],")?;
        for (field, value) in [
            ("image_base", self.image_base),
            ("image_size", self.image_size),
            ("arch_tables_base", self.arch_tables_base),
            ("arch_tables_size", self.arch_tables_size),
            ("patch_table_base", self.patch_table_base),
            ("patch_slots", self.patch_slots),
            ("em_base", self.em_base),
            ("em_size", self.em_size),
            ("rom_data_base", self.rom_data_base),
            ("hci_cmd_desc_tab", self.hci_cmd_desc_tab),
            ("llm_local_cmds", self.llm_local_cmds),
            ("llm_local_le_feats", self.llm_local_le_feats),
            ("llm_local_le_states", self.llm_local_le_states),
            ("rom_func_addr_table_var", self.rom_func_addr_table_var),
            ("rom_cfg_table_var", self.rom_cfg_table_var),
            ("custom_msg_handlers_var", self.custom_msg_handlers_var),
            ("rom_rand_state", self.rom_rand_state),
        ] {
            writeln!(out, "    {field}: {value:#x},")?;
        }
        let em = &self.em;
        writeln!(out, "    em_geometry: EmGeometry {{")?;
        writeln!(out, "        connections: {},", em.connections)?;
        writeln!(out, "        tx_buffers: {},", em.tx_buffers)?;
        writeln!(out, "        rx_buffers: {},", em.rx_buffers)?;
        writeln!(out, "        tx_buf_size: {:#x},", em.tx_buf_size)?;
        writeln!(out, "        rx_buf_size: {:#x},", em.rx_buf_size)?;
        writeln!(out, "    }},")?;
        let l = &em.linked;
        writeln!(out, "    em_linked: EmOffsets {{")?;
        writeln!(out, "        cs: {:#x},", l.cs)?;
        writeln!(out, "        tx_desc: {:#x},", l.tx_desc)?;
        writeln!(out, "        rx_desc: {:#x},", l.rx_desc)?;
        writeln!(out, "        tx_buf: {:#x},", l.tx_buf)?;
        writeln!(out, "        rx_buf: {:#x},", l.rx_buf)?;
        writeln!(out, "        end: {:#x},", l.end)?;
        writeln!(out, "    }},")?;
        writeln!(out, "}};")?;
        writeln!(out)?;
        Ok(())
    }
}

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed={LAYOUT_FILE}");

    let text = fs::read_to_string(LAYOUT_FILE).with_context(|| format!("reading {LAYOUT_FILE}"))?;
    let families: BTreeMap<String, Family> =
        toml::from_str(&text).with_context(|| format!("parsing {LAYOUT_FILE}"))?;

    ensure!(
        families.contains_key("da14531") && families.contains_key("da14585"),
        "{LAYOUT_FILE} must describe both the da14531 and da14585 families"
    );

    let mut out = String::from("// @generated by build.rs from data/memory_layout.toml\n\n");
    for (name, family) in &families {
        family.check(name)?;
        family.emit(name, &mut out)?;
    }

    let dest = PathBuf::from(env::var("OUT_DIR")?).join("memory_map_generated.rs");
    fs::write(&dest, out).with_context(|| format!("writing {}", dest.display()))?;
    Ok(())
}
