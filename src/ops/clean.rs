//! `clean` route: remove build output for the active configuration, or
//! the whole workspace cache with `--jobs 0`-style "deep" clean is not
//! modeled; spec's `clean` removes the resolved configuration's output
//! directory only.

use anyhow::Result;

use crate::core::command_line::CommandLineInputs;
use crate::ops::workspace;
use crate::util::context::GlobalContext;
use crate::util::shell::{Shell, Status};

pub fn clean(ctx: &GlobalContext, inputs: &CommandLineInputs, shell: &Shell) -> Result<()> {
    let workspace = workspace::load(ctx, inputs)?;
    let output_dir = workspace.build_context.output_dir();

    if output_dir.exists() {
        std::fs::remove_dir_all(&output_dir)?;
        shell.status(Status::Removed, output_dir.display().to_string());
    } else {
        shell.status(Status::Skipped, format!("{} does not exist", output_dir.display()));
    }

    Ok(())
}
