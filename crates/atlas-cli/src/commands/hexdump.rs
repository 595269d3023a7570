//! Hexdump command implementation.
//!
//! Displays raw bytes of the game process in traditional hexdump format,
//! for checking structure layouts against a live build.

use anyhow::Result;
use atlas_core::{Config, ContextSource, ProcessSource, ReadMemory};

use super::hex_utils::format_line;

pub fn run(config: &Config, address: u64, size: usize, relative: bool, ascii: bool) -> Result<()> {
    let context = ProcessSource::new(config.process.clone()).acquire()?;
    let address = if relative {
        context.base_address() + address
    } else {
        address
    };

    let bytes = context.read_bytes(address, size)?;

    println!("Hexdump at 0x{:X} ({} bytes):", address, size);
    println!();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        println!("{}", format_line(i * 16, chunk, ascii));
    }

    Ok(())
}
