//! Build plan generation (spec §4.4/§4.5): turns a manifest's target
//! graph into an ordered, flat list of `BuildStep`s a Compile Strategy
//! executes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use crate::builder::context::BuildContext;
use crate::core::manifest::Manifest;
use crate::core::source_group::{SourceGroup, SourceGroupKind};
use crate::core::target::{BinaryKind, Target, TargetKind};
use crate::util::fs::glob_files;

/// A built artifact: its output path and the target that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub target: String,
}

/// A single compilation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileStep {
    pub source: PathBuf,
    pub output: PathBuf,
    pub target: String,
    pub include_dirs: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub cflags: Vec<String>,
}

/// A static-library archive step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveStep {
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,
    pub package: String,
    pub target: String,
}

/// A shared-library or executable link step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkStep {
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,
    pub package: String,
    pub target: String,
    /// `"staticlib"`, `"sharedlib"`, or `"exe"`.
    pub kind: String,
    pub lib_dirs: Vec<PathBuf>,
    pub libs: Vec<String>,
    pub ldflags: Vec<String>,
    /// Extra files (typically shared libraries) copied next to the
    /// artifact after a successful link (spec §3/§4.6 "runDependencies").
    pub run_dependencies: Vec<PathBuf>,
}

/// A `cmakeProject` target, built by shelling out to CMake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CMakeStep {
    pub package: String,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub args: Vec<String>,
    pub targets: Vec<String>,
}

/// A `script`/`process` target, run as an external command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomStep {
    pub package: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

/// One node of a `BuildPlan` (spec §4.6: the unit a Compile Strategy
/// dispatches on).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BuildStep {
    Compile(CompileStep),
    Archive(ArchiveStep),
    Link(LinkStep),
    CMake(CMakeStep),
    Custom(CustomStep),
}

/// A complete, ordered build plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildPlan {
    pub steps: Vec<BuildStep>,
    /// Target names in dependency order (dependencies first).
    pub build_order: Vec<String>,
}

impl BuildPlan {
    /// Build a plan for `manifest`, restricted to `selection` (and its
    /// transitive dependencies) when non-empty, otherwise every target
    /// with `includeInBuild` set (spec §3).
    pub fn new(ctx: &BuildContext, manifest: &Manifest, selection: &[String]) -> Result<Self> {
        let build_order = topological_order(manifest, selection)?;
        let output_dir = ctx.output_dir();
        let root = &ctx.environment.root;

        let mut steps = Vec::new();

        for name in &build_order {
            let target = manifest
                .targets
                .get(name)
                .ok_or_else(|| anyhow!("unknown target `{}`", name))?;

            match &target.kind {
                TargetKind::Executable(source) | TargetKind::StaticLibrary(source) | TargetKind::SharedLibrary(source) => {
                    append_source_steps(ctx, root, &output_dir, name, target, source, &mut steps)?;
                }
                TargetKind::CmakeProject(c) => {
                    steps.push(BuildStep::CMake(CMakeStep {
                        package: name.clone(),
                        source_dir: root.join(&c.location),
                        build_dir: c
                            .build_file
                            .clone()
                            .unwrap_or_else(|| output_dir.join("cmake").join(name)),
                        args: c.defines.iter().map(|(k, v)| format!("-D{}={}", k, v)).collect(),
                        targets: c.targets.clone(),
                    }));
                }
                TargetKind::Script(s) => {
                    steps.push(BuildStep::Custom(CustomStep {
                        package: name.clone(),
                        program: root.join(&s.file).display().to_string(),
                        args: s.arguments.clone(),
                        cwd: root.clone(),
                        env: Vec::new(),
                    }));
                }
                TargetKind::Process(p) => {
                    steps.push(BuildStep::Custom(CustomStep {
                        package: name.clone(),
                        program: root.join(&p.path).display().to_string(),
                        args: p.arguments.clone(),
                        cwd: root.clone(),
                        env: Vec::new(),
                    }));
                }
                TargetKind::Validation(v) => {
                    bail!("target `{}`: {}", name, v.message);
                }
                TargetKind::ChaletProject(sub) => {
                    // A reference to another workspace, built as its own
                    // sub-plan by the caller (spec §4.1's `extends`
                    // boundary stops at the manifest, not the build
                    // graph); nothing to schedule in *this* plan.
                    let _ = sub;
                }
            }
        }

        Ok(BuildPlan { steps, build_order })
    }

    /// Emit `compile_commands.json` for IDE/clangd integration (spec §6).
    pub fn emit_compile_commands(&self, path: &Path) -> Result<()> {
        let steps: Vec<&CompileStep> = self
            .steps
            .iter()
            .filter_map(|s| match s {
                BuildStep::Compile(step) => Some(step),
                _ => None,
            })
            .collect();
        write_compile_commands(steps.into_iter().cloned(), path)
    }

    pub fn compile_count(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s, BuildStep::Compile(_))).count()
    }

    pub fn link_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, BuildStep::Archive(_) | BuildStep::Link(_)))
            .count()
    }
}

/// Append the compile + archive/link steps for one `SourceTarget`.
fn append_source_steps(
    ctx: &BuildContext,
    root: &Path,
    output_dir: &Path,
    name: &str,
    target: &Target,
    source: &crate::core::target::SourceTarget,
    steps: &mut Vec<BuildStep>,
) -> Result<()> {
    let obj_dir = output_dir.join("obj").join(name);
    let sources = glob_files(root, &source.files)?;
    let excluded = glob_files(root, &source.exclude_files).unwrap_or_default();
    let excluded: HashSet<_> = excluded.into_iter().collect();

    let mut include_dirs: Vec<PathBuf> = source.include_dirs.iter().map(|d| root.join(d)).collect();
    include_dirs.push(root.clone());

    let defines: Vec<String> = source.defines.iter().map(|d| format!("-D{}", d)).collect();

    let mut cflags = ctx.profile_cflags();
    cflags.extend(source.compile_options.iter().cloned());

    let mut objects = Vec::new();

    for file in sources {
        if excluded.contains(&file) {
            continue;
        }
        let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("");
        let Some(kind) = SourceGroupKind::from_extension(ext) else {
            continue;
        };
        let group = SourceGroup::new(&file, root, &obj_dir, kind, ctx.toolchain().object_extension());

        objects.push(group.object_path.clone());

        steps.push(BuildStep::Compile(CompileStep {
            source: group.source_path,
            output: group.object_path,
            target: name.to_string(),
            include_dirs: include_dirs.clone(),
            defines: defines.clone(),
            cflags: cflags.clone(),
        }));
    }

    if objects.is_empty() {
        return Ok(());
    }

    let kind_dir = match source.kind {
        BinaryKind::Executable => "bin",
        BinaryKind::StaticLibrary | BinaryKind::SharedLibrary => "lib",
    };
    let output = output_dir.join(kind_dir).join(output_filename(ctx, name, source.kind));

    let mut lib_dirs: Vec<PathBuf> = source.lib_dirs.iter().map(|d| root.join(d)).collect();
    lib_dirs.push(output_dir.join("lib"));

    let mut ldflags = ctx.profile_ldflags();
    ldflags.extend(source.linker_options.iter().cloned());

    let run_dependencies: Vec<PathBuf> = source.run_dependencies.iter().map(|d| root.join(d)).collect();

    match source.kind {
        BinaryKind::StaticLibrary => {
            steps.push(BuildStep::Archive(ArchiveStep {
                objects,
                output,
                package: target.name.clone(),
                target: name.to_string(),
            }));
        }
        BinaryKind::SharedLibrary => {
            steps.push(BuildStep::Link(LinkStep {
                objects,
                output,
                package: target.name.clone(),
                target: name.to_string(),
                kind: "sharedlib".to_string(),
                lib_dirs,
                libs: source.links.clone(),
                ldflags,
                run_dependencies,
            }));
        }
        BinaryKind::Executable => {
            steps.push(BuildStep::Link(LinkStep {
                objects,
                output,
                package: target.name.clone(),
                target: name.to_string(),
                kind: "exe".to_string(),
                lib_dirs,
                libs: source.links.clone(),
                ldflags,
                run_dependencies,
            }));
        }
    }

    Ok(())
}

fn output_filename(ctx: &BuildContext, name: &str, kind: BinaryKind) -> String {
    let tc = ctx.toolchain();
    match kind {
        BinaryKind::Executable => {
            let ext = tc.exe_extension();
            if ext.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", name, ext)
            }
        }
        BinaryKind::StaticLibrary => format!("{}{}.{}", tc.static_lib_prefix(), name, tc.static_lib_extension()),
        BinaryKind::SharedLibrary => format!("{}{}.{}", tc.shared_lib_prefix(), name, tc.shared_lib_extension()),
    }
}

/// Dependency-first topological order rooted at `selection` (every target
/// when empty), per spec §3's `dependsOn` build-ordering contract.
fn topological_order(manifest: &Manifest, selection: &[String]) -> Result<Vec<String>> {
    let roots: Vec<String> = if selection.is_empty() {
        manifest
            .targets
            .iter()
            .filter(|(_, t)| t.include_in_build)
            .map(|(name, _)| name.clone())
            .collect()
    } else {
        selection.to_vec()
    };

    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut visiting = HashSet::new();

    for root in &roots {
        visit(manifest, root, &mut order, &mut visited, &mut visiting)?;
    }

    Ok(order)
}

fn visit(
    manifest: &Manifest,
    name: &str,
    order: &mut Vec<String>,
    visited: &mut HashSet<String>,
    visiting: &mut HashSet<String>,
) -> Result<()> {
    if visited.contains(name) {
        return Ok(());
    }
    if !visiting.insert(name.to_string()) {
        bail!("dependency cycle detected at target `{}`", name);
    }

    let target = manifest.targets.get(name).ok_or_else(|| anyhow!("unknown target `{}`", name))?;
    for dep in &target.depends_on {
        visit(manifest, dep, order, visited, visiting)?;
    }

    visiting.remove(name);
    visited.insert(name.to_string());
    order.push(name.to_string());
    Ok(())
}

/// `compile_commands.json` entry.
#[derive(Debug, Serialize, Deserialize)]
struct CompileCommand {
    directory: String,
    file: String,
    arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

/// Write a `compile_commands.json` from a set of compile steps. Shared by
/// `BuildPlan::emit_compile_commands` and each Compile Strategy back-end's
/// `save_compile_commands` (spec §4.6).
pub fn write_compile_commands(steps: impl IntoIterator<Item = CompileStep>, path: &Path) -> Result<()> {
    let commands: Vec<CompileCommand> = steps
        .into_iter()
        .map(|step| {
            let mut args = vec!["cc".to_string()];
            for dir in &step.include_dirs {
                args.push(format!("-I{}", dir.display()));
            }
            args.extend(step.defines.iter().cloned());
            args.extend(step.cflags.iter().cloned());
            args.push("-c".to_string());
            args.push(step.source.display().to_string());
            args.push("-o".to_string());
            args.push(step.output.display().to_string());

            CompileCommand {
                directory: step
                    .source
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| ".".to_string()),
                file: step.source.display().to_string(),
                arguments: args,
                output: Some(step.output.display().to_string()),
            }
        })
        .collect();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(&commands)?;
    std::fs::write(path, json)?;

    Ok(())
}
