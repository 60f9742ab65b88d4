//! Shared startup sequence for every route that needs a resolved
//! workspace: find the manifest, parse it, build a `BuildContext` (spec
//! §2's data flow: manifest load → toolchain resolve → env capture).

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::builder::context::BuildContext;
use crate::core::command_line::CommandLineInputs;
use crate::core::manifest::{Manifest, ManifestContext};
use crate::core::workspace::{BuildConfiguration, WorkspaceEnvironment};
use crate::util::context::GlobalContext;

pub struct LoadedWorkspace {
    pub manifest: Manifest,
    pub environment: WorkspaceEnvironment,
    pub build_context: BuildContext,
}

/// Resolve the manifest path for `inputs`: an explicit `--input-file`
/// override, or workspace discovery from the current directory.
pub fn locate_manifest(ctx: &GlobalContext, inputs: &CommandLineInputs) -> Result<PathBuf> {
    if let Some(path) = &inputs.input_file {
        return Ok(path.clone());
    }
    ctx.find_manifest().context(
        "no workspace manifest found; run `crucible init` to create one, \
         or pass --input-file",
    )
}

/// Run the manifest-load → toolchain-resolve sequence shared by every
/// route except `Init`/`SettingsGet`/`SettingsSet`/`SettingsUnset`.
pub fn load(ctx: &GlobalContext, inputs: &CommandLineInputs) -> Result<LoadedWorkspace> {
    let manifest_path = locate_manifest(ctx, inputs)?;
    let root = manifest_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| ctx.cwd().to_path_buf());

    let configuration_name = inputs.build_configuration.clone().unwrap_or_else(|| "Debug".to_string());
    let toolchain_name = inputs.toolchain_preference.clone().unwrap_or_else(|| default_toolchain_name());

    let platform = host_platform();
    let architecture = inputs.architecture_preference.clone().unwrap_or_else(|| host_architecture());
    let is_ci = std::env::var("CI").is_ok();

    let manifest_ctx = ManifestContext::new(
        &platform,
        &architecture,
        &toolchain_name,
        &configuration_name,
        is_ci,
        configuration_name.eq_ignore_ascii_case("debug"),
    );

    let external_dir = root.join("external");
    let manifest = Manifest::load(&manifest_path, &manifest_ctx, &external_dir)
        .with_context(|| format!("failed to load manifest `{}`", manifest_path.display()))?;

    let mut environment = WorkspaceEnvironment::new(root, manifest.workspace_name.clone(), manifest.version.clone());
    environment.search_paths = manifest
        .search_paths
        .iter()
        .map(|p| environment.root.join(p))
        .collect();

    let configuration = manifest
        .configurations
        .get(&configuration_name)
        .cloned()
        .unwrap_or_else(|| default_configuration(&configuration_name));

    let build_context = BuildContext::new(ctx, environment.clone(), &toolchain_name, configuration)?;

    Ok(LoadedWorkspace { manifest, environment, build_context })
}

fn default_configuration(name: &str) -> BuildConfiguration {
    BuildConfiguration::defaults().remove(name).unwrap_or_else(BuildConfiguration::debug)
}

fn default_toolchain_name() -> String {
    if cfg!(target_os = "windows") {
        "msvc".to_string()
    } else if cfg!(target_os = "macos") {
        "apple-llvm".to_string()
    } else {
        "gcc".to_string()
    }
}

fn host_platform() -> String {
    if cfg!(target_os = "windows") {
        "windows".to_string()
    } else if cfg!(target_os = "macos") {
        "macos".to_string()
    } else {
        "linux".to_string()
    }
}

fn host_architecture() -> String {
    std::env::consts::ARCH.to_string()
}
