//! `run`/`build-run` routes: execute an executable target, either after
//! building it or directly against the existing build output (spec §2).

use std::path::PathBuf;
use std::process::Command;

use anyhow::{bail, Context, Result};

use crate::builder::plan::{BuildPlan, BuildStep};
use crate::core::command_line::CommandLineInputs;
use crate::core::manifest::Manifest;
use crate::core::target::TargetKind;
use crate::ops::{build, workspace};
use crate::util::context::GlobalContext;
use crate::util::shell::{Shell, Status};

/// `BuildRun` route: build, then execute the produced executable.
pub fn run(ctx: &GlobalContext, inputs: &CommandLineInputs, shell: &Shell) -> Result<i32> {
    let outcome = build::build(ctx, inputs, shell)?;
    let target_name = select_executable_target(inputs, &outcome.manifest)?;

    let artifact = outcome
        .artifacts
        .iter()
        .find(|a| a.target == target_name)
        .with_context(|| format!("target `{}` produced no executable artifact", target_name))?;

    launch(&artifact.path, &inputs.run_arguments, shell)
}

/// `Run` route: execute the target's expected build output without
/// rebuilding. Errors if that output does not exist on disk.
pub fn run_only(ctx: &GlobalContext, inputs: &CommandLineInputs, shell: &Shell) -> Result<i32> {
    let loaded = workspace::load(ctx, inputs)?;
    let target_name = select_executable_target(inputs, &loaded.manifest)?;

    let plan = BuildPlan::new(&loaded.build_context, &loaded.manifest, &[target_name.clone()])?;
    let path = plan
        .steps
        .iter()
        .find_map(|s| match s {
            BuildStep::Link(l) if l.target == target_name => Some(l.output.clone()),
            _ => None,
        })
        .with_context(|| format!("target `{}` has no link step", target_name))?;

    if !path.exists() {
        bail!("`{}` has not been built yet; run `crucible build` first", path.display());
    }

    launch(&path, &inputs.run_arguments, shell)
}

fn launch(path: &PathBuf, args: &[String], shell: &Shell) -> Result<i32> {
    shell.status(Status::Info, format!("running `{}`", path.display()));

    let status = Command::new(path)
        .args(args)
        .status()
        .with_context(|| format!("failed to launch `{}`", path.display()))?;

    Ok(status.code().unwrap_or(1))
}

/// Pick the target to execute: an explicit single selection, or the sole
/// executable target declared in the manifest when selection was left empty.
fn select_executable_target(inputs: &CommandLineInputs, manifest: &Manifest) -> Result<String> {
    if let [single] = inputs.target_selection.as_slice() {
        return Ok(single.clone());
    }

    let executables: Vec<&str> = manifest
        .targets
        .iter()
        .filter(|(_, target)| matches!(target.kind, TargetKind::Executable(_)))
        .map(|(name, _)| name.as_str())
        .collect();

    match executables.as_slice() {
        [single] => Ok((*single).to_string()),
        [] => bail!("no executable target to run; pass a target name explicitly"),
        _ => bail!(
            "multiple executable targets found ({}); pass a target name explicitly",
            executables.join(", ")
        ),
    }
}
