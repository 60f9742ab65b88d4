//! Ninja Compile Strategy (spec §4.6): emits a single `build.ninja` per
//! configuration and drives it with `ninja -f build.ninja`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::builder::context::BuildContext;
use crate::builder::plan::{write_compile_commands, Artifact, BuildPlan, BuildStep, CompileStep};
use crate::util::fs::ensure_dir;
use crate::util::process::{find_executable, ProcessBuilder};

use super::{copy_run_dependencies, CompileStrategy};

pub struct NinjaStrategy {
    build_file: PathBuf,
    ninja_src: String,
    compile_steps: Vec<CompileStep>,
}

impl NinjaStrategy {
    pub fn new(ctx: &BuildContext) -> Self {
        NinjaStrategy {
            build_file: ctx.environment.workspace_cache_dir().join("build.ninja"),
            ninja_src: String::new(),
            compile_steps: Vec::new(),
        }
    }

    fn rule_name(kind: &str, project: &str) -> String {
        format!("{}_{}", kind, project)
    }
}

impl CompileStrategy for NinjaStrategy {
    fn initialize(&mut self, _ctx: &BuildContext) -> Result<()> {
        self.ninja_src.clear();
        self.ninja_src.push_str("# generated build file, do not edit\n");
        self.ninja_src.push_str("ninja_required_version = 1.8\n\n");
        Ok(())
    }

    fn add_project(&mut self, ctx: &BuildContext, plan: &BuildPlan) -> Result<()> {
        let mut rules: BTreeMap<String, String> = BTreeMap::new();
        let mut builds = String::new();

        for step in &plan.steps {
            match step {
                BuildStep::Compile(c) => {
                    let ext = c.source.extension().and_then(|e| e.to_str()).unwrap_or("");
                    let rule_kind = match ext {
                        "c" => "c",
                        "rc" => "rc",
                        _ => "cpp",
                    };
                    let rule = Self::rule_name(rule_kind, &c.target);
                    rules.entry(rule.clone()).or_insert_with(|| {
                        let mut args = Vec::new();
                        for dir in &c.include_dirs {
                            args.push(format!("-I{}", dir.display()));
                        }
                        args.extend(c.defines.iter().cloned());
                        args.extend(c.cflags.iter().cloned());
                        format!(
                            "rule {}\n  command = cc {} -c $in -o $out\n  description = Compile $out\n",
                            rule,
                            args.join(" ")
                        )
                    });
                    builds.push_str(&format!(
                        "build {}: {} {}\n",
                        c.output.display(),
                        rule,
                        c.source.display()
                    ));
                }
                BuildStep::Archive(a) => {
                    let rule = Self::rule_name("link", &a.target);
                    rules.entry(rule.clone()).or_insert_with(|| {
                        format!("rule {}\n  command = ar rcs $out $in\n  description = Archive $out\n", rule)
                    });
                    let inputs: Vec<String> = a.objects.iter().map(|o| o.display().to_string()).collect();
                    builds.push_str(&format!("build {}: {} {}\n", a.output.display(), rule, inputs.join(" ")));
                }
                BuildStep::Link(l) => {
                    let rule = Self::rule_name("link", &l.target);
                    rules.entry(rule.clone()).or_insert_with(|| {
                        let mut args = Vec::new();
                        for dir in &l.lib_dirs {
                            args.push(format!("-L{}", dir.display()));
                        }
                        args.extend(l.ldflags.iter().cloned());
                        args.extend(l.libs.iter().map(|lib| format!("-l{}", lib)));
                        let shared = if l.kind == "sharedlib" { " -shared" } else { "" };
                        format!(
                            "rule {}\n  command = cc{} $in -o $out {}\n  description = Link $out\n",
                            rule,
                            shared,
                            args.join(" ")
                        )
                    });
                    let inputs: Vec<String> = l.objects.iter().map(|o| o.display().to_string()).collect();
                    builds.push_str(&format!("build {}: {} {}\n", l.output.display(), rule, inputs.join(" ")));
                }
                BuildStep::CMake(_) | BuildStep::Custom(_) => {
                    // Run outside ninja by the native dispatcher after the
                    // ninja invocation completes (spec §4.6 leaves these
                    // as external commands, not compiler rules).
                }
            }
        }

        for rule in rules.values() {
            self.ninja_src.push_str(rule);
            self.ninja_src.push('\n');
        }
        self.ninja_src.push_str(&builds);

        ensure_dir(ctx.environment.workspace_cache_dir().as_path())?;
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
        std::fs::write(&self.build_file, &self.ninja_src)?;
        Ok(())
    }

    fn build_project(
        &mut self,
        _ctx: &BuildContext,
        plan: &BuildPlan,
        jobs: Option<usize>,
        keep_going: bool,
    ) -> Result<Vec<Artifact>> {
        let Some(ninja) = find_executable("ninja") else {
            bail!("ninja strategy selected but `ninja` was not found on PATH");
        };

        let mut cmd = ProcessBuilder::new(ninja).arg("-f").arg(&self.build_file);
        if let Some(j) = jobs {
            cmd = cmd.arg("-j").arg(j.to_string());
        }
        if keep_going {
            cmd = cmd.arg("-k").arg("0");
        }

        let output = cmd.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ninja build failed:\n{}", stderr);
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
