//! Native in-process Compile Strategy (spec §4.6): the worker-pool
//! scheduler already implemented by `builder::native::NativeBuilder`,
//! wired up behind the shared `CompileStrategy` interface.

use std::path::Path;

use anyhow::Result;

use crate::builder::context::BuildContext;
use crate::builder::native::NativeBuilder;
use crate::builder::plan::{write_compile_commands, Artifact, BuildPlan, BuildStep, CompileStep};

use super::{copy_run_dependencies, CompileStrategy};

#[derive(Default)]
pub struct NativeStrategy {
    compile_steps: Vec<CompileStep>,
}

impl NativeStrategy {
    pub fn new() -> Self {
        NativeStrategy::default()
    }
}

impl CompileStrategy for NativeStrategy {
    fn initialize(&mut self, _ctx: &BuildContext) -> Result<()> {
        Ok(())
    }

    fn add_project(&mut self, _ctx: &BuildContext, _plan: &BuildPlan) -> Result<()> {
        // The scheduler consumes the plan directly in `build_project`;
        // there is no separate build-file state to accumulate.
        Ok(())
    }

    fn add_compile_commands(&mut self, plan: &BuildPlan) -> Result<()> {
        self.compile_steps = plan
            .steps
            .iter()
            .filter_map(|s| match s {
                BuildStep::Compile(step) => Some(step.clone()),
                _ => None,
            })
            .collect();
        Ok(())
    }

    fn save_build_file(&mut self) -> Result<()> {
        Ok(())
    }

    fn build_project(
        &mut self,
        ctx: &BuildContext,
        plan: &BuildPlan,
        jobs: Option<usize>,
        _keep_going: bool,
    ) -> Result<Vec<Artifact>> {
        NativeBuilder::new(ctx).execute(plan, jobs)
    }

    fn do_post_build(&mut self, _ctx: &BuildContext, plan: &BuildPlan) -> Result<()> {
        copy_run_dependencies(plan)
    }

    fn save_compile_commands(&mut self, path: &Path) -> Result<()> {
        write_compile_commands(self.compile_steps.drain(..), path)
    }
}
