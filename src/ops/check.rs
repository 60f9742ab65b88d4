//! `check` route: confirm the toolchain resolves and the manifest is
//! valid, without fetching dependencies or building anything.

use anyhow::Result;

use crate::core::command_line::CommandLineInputs;
use crate::ops::{validate, workspace};
use crate::util::context::GlobalContext;
use crate::util::shell::{Shell, Status};

pub fn check(ctx: &GlobalContext, inputs: &CommandLineInputs, shell: &Shell) -> Result<()> {
    let workspace = workspace::load(ctx, inputs)?;
    shell.status(
        Status::Info,
        format!(
            "toolchain `{}` resolved ({})",
            workspace.build_context.toolchain.platform().as_str(),
            workspace.build_context.toolchain.compiler_path().display()
        ),
    );

    validate::validate(ctx, inputs, shell)
}
