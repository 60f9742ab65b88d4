//! Script-dependency execution (spec §4.3): run the declared script, with
//! `dest` as the working directory so relative output paths land inside
//! the dependency's destination.

use std::path::Path;

use anyhow::{Context, Result};

use crate::core::dependency::ScriptDependency;
use crate::util::process::ProcessBuilder;

pub fn fetch(dep: &ScriptDependency, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;

    ProcessBuilder::new(&dep.file)
        .args(&dep.arguments)
        .cwd(dest)
        .exec_and_check()
        .with_context(|| format!("dependency script failed: {}", dep.file.display()))?;

    Ok(())
}
