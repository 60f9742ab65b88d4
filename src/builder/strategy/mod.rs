//! Compile Strategy abstraction (spec §4.6): three interchangeable
//! back-ends behind one shared interface and state machine.
//!
//! ```text
//! Idle → Initializing → Adding-Targets → Ready
//! Ready → Running → (success) → PostBuild → Done
//! Running → (tool-failure, !keepGoing) → Aborting → Failed
//! Running → (SIGINT) → Aborting → Cancelled
//! ```

pub mod make;
pub mod native;
pub mod ninja;

use std::path::Path;

use anyhow::Result;

use crate::builder::context::BuildContext;
use crate::builder::plan::{Artifact, BuildPlan, BuildStep};

/// The state machine a driven `CompileStrategy` walks through once per
/// build (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    Idle,
    Initializing,
    AddingTargets,
    Ready,
    Running,
    PostBuild,
    Done,
    Aborting,
    Failed,
    Cancelled,
}

/// The shared interface every back-end implements (spec §4.6):
/// `initialize`, `addProject`, `addCompileCommands`, `saveBuildFile`,
/// `buildProject`, `doPostBuild`, `saveCompileCommands`.
pub trait CompileStrategy {
    /// Prepare the back-end for a fresh build (e.g. open the cache
    /// directory, reset any emitted-rule state).
    fn initialize(&mut self, ctx: &BuildContext) -> Result<()>;

    /// Register every project/target from `plan` with the back-end.
    fn add_project(&mut self, ctx: &BuildContext, plan: &BuildPlan) -> Result<()>;

    /// Accumulate `compile_commands.json` entries for `plan`, to be
    /// written out by `save_compile_commands`.
    fn add_compile_commands(&mut self, plan: &BuildPlan) -> Result<()>;

    /// Persist the back-end's build file (`build.ninja`, `Makefile`), or
    /// a no-op for the native scheduler.
    fn save_build_file(&mut self) -> Result<()>;

    /// Drive the actual build and return the produced artifacts.
    fn build_project(
        &mut self,
        ctx: &BuildContext,
        plan: &BuildPlan,
        jobs: Option<usize>,
        keep_going: bool,
    ) -> Result<Vec<Artifact>>;

    /// Post-build: copy `runDependencies`, dump assembly when requested.
    /// Compile-commands regeneration is driven separately via
    /// `save_compile_commands`.
    fn do_post_build(&mut self, ctx: &BuildContext, plan: &BuildPlan) -> Result<()>;

    /// Write the accumulated compile-commands entries to `path`.
    fn save_compile_commands(&mut self, path: &Path) -> Result<()>;
}

/// Post-build step shared by every back-end (spec §4.6): copy each link
/// step's declared `runDependencies` next to its artifact. A copy
/// failure is logged and skipped rather than failing the build, unless
/// every copy for a given target fails.
pub(crate) fn copy_run_dependencies(plan: &BuildPlan) -> Result<()> {
    for step in &plan.steps {
        let BuildStep::Link(link) = step else { continue };
        if link.run_dependencies.is_empty() {
            continue;
        }

        let Some(out_dir) = link.output.parent() else { continue };
        let mut failures = 0;

        for dep in &link.run_dependencies {
            let Some(file_name) = dep.file_name() else { continue };
            let dest = out_dir.join(file_name);
            if let Err(err) = std::fs::copy(dep, &dest) {
                failures += 1;
                tracing::warn!("failed to copy run dependency {} for {}: {}", dep.display(), link.target, err);
            }
        }

        if failures > 0 && failures == link.run_dependencies.len() {
            anyhow::bail!("all run dependencies failed to copy for target `{}`", link.target);
        }
    }
    Ok(())
}

/// Which back-end to drive (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Ninja,
    Makefile,
    Native,
}

impl StrategyKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ninja" => Some(StrategyKind::Ninja),
            "makefile" | "make" => Some(StrategyKind::Makefile),
            "native" => Some(StrategyKind::Native),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Ninja => "ninja",
            StrategyKind::Makefile => "makefile",
            StrategyKind::Native => "native",
        }
    }

    fn build_strategy(&self, ctx: &BuildContext) -> Box<dyn CompileStrategy> {
        match self {
            StrategyKind::Ninja => Box::new(ninja::NinjaStrategy::new(ctx)),
            StrategyKind::Makefile => Box::new(make::MakeStrategy::new(ctx)),
            StrategyKind::Native => Box::new(native::NativeStrategy::new()),
        }
    }
}

/// Run the full state machine for `kind` against `plan` (spec §4.6):
/// initialize → add-targets → [compile-commands] → save-build-file →
/// build → post-build.
pub fn run(
    kind: StrategyKind,
    ctx: &BuildContext,
    plan: &BuildPlan,
    jobs: Option<usize>,
    keep_going: bool,
    emit_compile_commands: Option<&Path>,
) -> Result<Vec<Artifact>> {
    let mut strategy = kind.build_strategy(ctx);

    strategy.initialize(ctx)?;
    strategy.add_project(ctx, plan)?;

    if let Some(path) = emit_compile_commands {
        strategy.add_compile_commands(plan)?;
        strategy.save_compile_commands(path)?;
    }

    strategy.save_build_file()?;

    let artifacts = match strategy.build_project(ctx, plan, jobs, keep_going) {
        Ok(artifacts) => artifacts,
        Err(err) => return Err(err),
    };

    strategy.do_post_build(ctx, plan)?;

    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_strategy_names() {
        assert_eq!(StrategyKind::parse("ninja"), Some(StrategyKind::Ninja));
        assert_eq!(StrategyKind::parse("Make"), Some(StrategyKind::Makefile));
        assert_eq!(StrategyKind::parse("native"), Some(StrategyKind::Native));
        assert_eq!(StrategyKind::parse("bogus"), None);
    }
}
