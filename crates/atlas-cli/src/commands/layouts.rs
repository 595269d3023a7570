use std::path::Path;

use anyhow::Result;
use atlas_core::layout::{builtin_layouts, save_layouts};

/// Write the built-in layout set so it can be edited for another build
pub fn run(output: &Path) -> Result<()> {
    let set = builtin_layouts();
    save_layouts(output, &set)?;
    println!("Wrote layout set {} to {}", set.version, output.display());
    Ok(())
}
