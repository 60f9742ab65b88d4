//! Local-path dependency validation (spec §4.3): no fetch, just existence.

use std::path::Path;

use anyhow::{bail, Result};

use crate::core::dependency::LocalDependency;

pub fn fetch(dep: &LocalDependency, dest: &Path) -> Result<()> {
    if !dep.path.exists() {
        bail!("local dependency path does not exist: {}", dep.path.display());
    }
    let _ = dest;
    Ok(())
}
