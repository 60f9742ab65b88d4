//! `export` route: emit `compile_commands.json` for clangd/IDE
//! consumption (spec §1 treats project-file exporters such as Xcode/VS
//! project writers as external collaborators; the compilation database
//! is the one export artifact the core itself produces).

use anyhow::Result;

use crate::builder::plan::BuildPlan;
use crate::core::command_line::CommandLineInputs;
use crate::ops::workspace;
use crate::util::context::GlobalContext;
use crate::util::shell::{Shell, Status};

pub fn export(ctx: &GlobalContext, inputs: &CommandLineInputs, shell: &Shell) -> Result<()> {
    let workspace = workspace::load(ctx, inputs)?;
    let plan = BuildPlan::new(&workspace.build_context, &workspace.manifest, &inputs.target_selection)?;

    let output_dir = workspace.build_context.output_dir();
    std::fs::create_dir_all(&output_dir)?;
    let path = output_dir.join("compile_commands.json");

    plan.emit_compile_commands(&path)?;
    shell.status(Status::Created, path.display().to_string());

    Ok(())
}
