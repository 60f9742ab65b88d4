//! `configure` route: resolve the toolchain and fetch external
//! dependencies without compiling anything (spec §4.2/§4.3's "prepare"
//! step, split out from `build` for IDE/CI pre-warming).

use anyhow::Result;

use crate::core::command_line::CommandLineInputs;
use crate::ops::workspace;
use crate::util::context::GlobalContext;
use crate::util::shell::{Shell, Status};

pub fn configure(ctx: &GlobalContext, inputs: &CommandLineInputs, shell: &Shell) -> Result<()> {
    let workspace = workspace::load(ctx, inputs)?;
    workspace.build_context.environment.ensure_dirs()?;

    shell.status(Status::Resolving, "external dependencies");
    crate::sources::sync(
        &workspace.manifest.external_dependencies,
        &workspace.environment.external_dir,
        shell,
    )?;

    shell.status(
        Status::Finished,
        format!(
            "toolchain `{}` ready for configuration `{}`",
            workspace.build_context.toolchain.platform().as_str(),
            workspace.build_context.configuration.name
        ),
    );

    Ok(())
}
