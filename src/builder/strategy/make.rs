//! Makefile Compile Strategy (spec §4.6): emits a `Makefile` per
//! configuration and drives it with `make`/`nmake`/`jom`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::builder::context::BuildContext;
use crate::builder::plan::{write_compile_commands, Artifact, BuildPlan, BuildStep, CompileStep};
use crate::util::fs::ensure_dir;
use crate::util::process::{find_executable, ProcessBuilder};

use super::{copy_run_dependencies, CompileStrategy};

pub struct MakeStrategy {
    build_file: PathBuf,
    make_src: String,
    is_msvc_host: bool,
    compile_steps: Vec<CompileStep>,
}

impl MakeStrategy {
    pub fn new(ctx: &BuildContext) -> Self {
        MakeStrategy {
            build_file: ctx.environment.workspace_cache_dir().join("Makefile"),
            make_src: String::new(),
            is_msvc_host: ctx.os() == "windows",
            compile_steps: Vec::new(),
        }
    }

    fn make_program(&self) -> &'static str {
        if self.is_msvc_host {
            "nmake"
        } else {
            "make"
        }
    }
}

impl CompileStrategy for MakeStrategy {
    fn initialize(&mut self, _ctx: &BuildContext) -> Result<()> {
        self.make_src.clear();
        self.make_src.push_str("# generated build file, do not edit\n");
        self.make_src.push_str(".PHONY: all\n\n");
        Ok(())
    }

    fn add_project(&mut self, _ctx: &BuildContext, plan: &BuildPlan) -> Result<()> {
        let mut all_targets = Vec::new();
        let mut rules = String::new();

        for step in &plan.steps {
            match step {
                BuildStep::Compile(c) => {
                    let mut args = Vec::new();
                    for dir in &c.include_dirs {
                        args.push(format!("-I{}", dir.display()));
                    }
                    args.extend(c.defines.iter().cloned());
                    args.extend(c.cflags.iter().cloned());
                    rules.push_str(&format!(
                        "{}: {}\n\t@mkdir -p $(dir $@)\n\tcc {} -c {} -o {}\n\n",
                        c.output.display(),
                        c.source.display(),
                        args.join(" "),
                        c.source.display(),
                        c.output.display()
                    ));
                }
                BuildStep::Archive(a) => {
                    let inputs: Vec<String> = a.objects.iter().map(|o| o.display().to_string()).collect();
                    rules.push_str(&format!(
                        "{}: {}\n\t@mkdir -p $(dir $@)\n\tar rcs {} {}\n\n",
                        a.output.display(),
                        inputs.join(" "),
                        a.output.display(),
                        inputs.join(" ")
                    ));
                    all_targets.push(a.output.display().to_string());
                }
                BuildStep::Link(l) => {
                    let inputs: Vec<String> = l.objects.iter().map(|o| o.display().to_string()).collect();
                    let mut args = Vec::new();
                    for dir in &l.lib_dirs {
                        args.push(format!("-L{}", dir.display()));
                    }
                    args.extend(l.ldflags.iter().cloned());
                    args.extend(l.libs.iter().map(|lib| format!("-l{}", lib)));
                    let shared = if l.kind == "sharedlib" { " -shared" } else { "" };
                    rules.push_str(&format!(
                        "{}: {}\n\t@mkdir -p $(dir $@)\n\tcc{} {} -o {} {}\n\n",
                        l.output.display(),
                        inputs.join(" "),
                        shared,
                        inputs.join(" "),
                        l.output.display(),
                        args.join(" ")
                    ));
                    all_targets.push(l.output.display().to_string());
                }
                BuildStep::CMake(_) | BuildStep::Custom(_) => {}
            }
        }

        self.make_src.push_str(&format!("all: {}\n\n", all_targets.join(" ")));
        self.make_src.push_str(&rules);
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
        if let Some(parent) = self.build_file.parent() {
            ensure_dir(parent)?;
        }
        std::fs::write(&self.build_file, &self.make_src)?;
        Ok(())
    }

    fn build_project(
        &mut self,
        _ctx: &BuildContext,
        plan: &BuildPlan,
        jobs: Option<usize>,
        keep_going: bool,
    ) -> Result<Vec<Artifact>> {
        let program = self.make_program();
        let Some(make) = find_executable(program) else {
            bail!("makefile strategy selected but `{}` was not found on PATH", program);
        };

        let mut cmd = ProcessBuilder::new(make).arg("-f").arg(&self.build_file);
        if !self.is_msvc_host {
            if let Some(j) = jobs {
                cmd = cmd.arg("-j").arg(j.to_string());
            }
            if keep_going {
                cmd = cmd.arg("-k");
            }
        }

        let output = cmd.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} build failed:\n{}", program, stderr);
        }

        Ok(collect_artifacts(plan))
    }

    fn do_post_build(&mut self, _ctx: &BuildContext, plan: &BuildPlan) -> Result<()> {
        copy_run_dependencies(plan)
    }

    fn save_compile_commands(&mut self, path: &Path) -> Result<()> {
        write_compile_commands(self.compile_steps.drain(..), path)
    }
}

fn collect_artifacts(plan: &BuildPlan) -> Vec<Artifact> {
    plan.steps
        .iter()
        .filter_map(|s| match s {
            BuildStep::Archive(a) => Some(Artifact {
                path: a.output.clone(),
                target: a.target.clone(),
            }),
            BuildStep::Link(l) => Some(Artifact {
                path: l.output.clone(),
                target: l.target.clone(),
            }),
            _ => None,
        })
        .collect()
}
