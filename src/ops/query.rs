//! `query` route: dump workspace/target/configuration/distribution
//! metadata, machine-readable under `--message-format json` and
//! human-readable otherwise (spec §6's manifest model, read-only).

use anyhow::Result;
use serde_json::json;

use crate::core::command_line::CommandLineInputs;
use crate::ops::workspace;
use crate::util::context::GlobalContext;
use crate::util::shell::Shell;

pub fn query(ctx: &GlobalContext, inputs: &CommandLineInputs, shell: &Shell) -> Result<()> {
    let workspace = workspace::load(ctx, inputs)?;
    let manifest = &workspace.manifest;

    let targets: Vec<_> = manifest
        .targets
        .values()
        .map(|t| {
            json!({
                "name": t.name,
                "kind": t.kind_name(),
                "includeInBuild": t.include_in_build,
                "dependsOn": t.depends_on,
            })
        })
        .collect();

    let configurations: Vec<_> = manifest.configurations.values().cloned().collect();

    let distribution: Vec<_> = manifest
        .distribution
        .values()
        .map(|d| json!({ "name": d.name, "includeInDistribution": d.include_in_distribution }))
        .collect();

    let report = json!({
        "workspace": {
            "name": manifest.workspace_name,
            "version": manifest.version,
            "root": workspace.environment.root,
        },
        "activeConfiguration": workspace.build_context.configuration.name,
        "toolchain": workspace.build_context.toolchain.platform().as_str(),
        "targets": targets,
        "configurations": configurations,
        "distribution": distribution,
    });

    if shell.is_json() {
        shell.json_event(&report);
    } else {
        println!("workspace: {} {}", manifest.workspace_name, manifest.version);
        println!("root: {}", workspace.environment.root.display());
        println!("toolchain: {}", workspace.build_context.toolchain.platform().as_str());
        println!("active configuration: {}", workspace.build_context.configuration.name);
        println!();
        println!("targets:");
        for t in manifest.targets.values() {
            println!("  {} ({})", t.name, t.kind_name());
        }
        println!();
        println!("configurations:");
        for c in manifest.configurations.keys() {
            println!("  {}", c);
        }
        println!();
        println!("distribution:");
        for d in manifest.distribution.values() {
            println!("  {} (included: {})", d.name, d.include_in_distribution);
        }
    }

    Ok(())
}
