//! `build`/`rebuild` route (spec §2 Build Manager): fetch external
//! dependencies, plan the target graph, and drive a Compile Strategy.

use anyhow::Result;

use crate::builder::plan::{Artifact, BuildPlan};
use crate::builder::strategy::{self, StrategyKind};
use crate::core::command_line::CommandLineInputs;
use crate::core::manifest::Manifest;
use crate::ops::workspace::{self, LoadedWorkspace};
use crate::sources;
use crate::util::config::load_settings;
use crate::util::context::GlobalContext;
use crate::util::shell::{Shell, Status};

pub struct BuildOutcome {
    pub artifacts: Vec<Artifact>,
    pub plan: BuildPlan,
    pub manifest: Manifest,
}

/// Run the `build`/`BuildRun` route: sync external dependencies, build the
/// plan, and execute it with the configured Compile Strategy.
pub fn build(ctx: &GlobalContext, inputs: &CommandLineInputs, shell: &Shell) -> Result<BuildOutcome> {
    let workspace = workspace::load(ctx, inputs)?;
    run_build(ctx, inputs, shell, &workspace)
}

/// `rebuild` route: wipe the active configuration's output directory,
/// then build as normal.
pub fn rebuild(ctx: &GlobalContext, inputs: &CommandLineInputs, shell: &Shell) -> Result<BuildOutcome> {
    let workspace = workspace::load(ctx, inputs)?;
    let output_dir = workspace.build_context.output_dir();
    if output_dir.exists() {
        std::fs::remove_dir_all(&output_dir)?;
    }
    run_build(ctx, inputs, shell, &workspace)
}

fn run_build(
    ctx: &GlobalContext,
    inputs: &CommandLineInputs,
    shell: &Shell,
    workspace: &LoadedWorkspace,
) -> Result<BuildOutcome> {
    let build_context = &workspace.build_context;

    shell.status(Status::Resolving, "external dependencies");
    sources::sync(&workspace.manifest.external_dependencies, &workspace.environment.external_dir, shell)?;

    build_context.environment.ensure_dirs()?;

    let plan = BuildPlan::new(build_context, &workspace.manifest, &inputs.target_selection)?;

    let kind = active_strategy(ctx, inputs, build_context);

    shell.status(Status::Building, format!("{} target(s)", plan.build_order.len()));

    let compile_commands_path =
        inputs.generate_compile_commands.then(|| build_context.output_dir().join("compile_commands.json"));

    let artifacts = strategy::run(
        kind,
        build_context,
        &plan,
        inputs.max_jobs,
        inputs.keep_going,
        compile_commands_path.as_deref(),
    )?;

    shell.status(Status::Finished, format!("{} artifact(s)", artifacts.len()));

    Ok(BuildOutcome { artifacts, plan, manifest: workspace.manifest.clone() })
}

/// Which Compile Strategy to drive: an explicit override in the active
/// toolchain's settings entry (spec §4.2/§4.6), falling back to native.
fn active_strategy(ctx: &GlobalContext, inputs: &CommandLineInputs, build_context: &crate::builder::context::BuildContext) -> StrategyKind {
    let settings = load_settings(&ctx.global_settings_path(), &ctx.local_settings_path());
    let toolchain_name = inputs
        .toolchain_preference
        .clone()
        .unwrap_or_else(|| build_context.toolchain.platform().as_str().to_string());

    settings
        .toolchain(&toolchain_name)
        .and_then(|t| t.strategy.as_deref())
        .and_then(StrategyKind::parse)
        .unwrap_or(StrategyKind::Native)
}
