//! `validate` route: check manifest invariants without building (spec
//! §3's target-name grammar, distribution-eligibility rule, and
//! non-empty configuration set).

use anyhow::{bail, Result};

use crate::core::command_line::CommandLineInputs;
use crate::core::distribution::DistributionKind;
use crate::core::target::Target;
use crate::ops::workspace;
use crate::util::context::GlobalContext;
use crate::util::shell::{Shell, Status};

pub fn validate(ctx: &GlobalContext, inputs: &CommandLineInputs, shell: &Shell) -> Result<()> {
    let workspace = workspace::load(ctx, inputs)?;
    let manifest = &workspace.manifest;
    let mut problems = Vec::new();

    if manifest.configurations.is_empty() {
        problems.push("workspace declares no build configurations".to_string());
    }

    for (name, target) in &manifest.targets {
        if !Target::validate_name(name) {
            problems.push(format!("target `{}` has an invalid name", name));
        }
        for dep in &target.depends_on {
            if !manifest.targets.contains_key(dep) {
                problems.push(format!("target `{}` depends on unknown target `{}`", name, dep));
            }
        }
    }

    for (name, dist) in &manifest.distribution {
        if let DistributionKind::Bundle(b) = &dist.kind {
            match manifest.targets.get(&b.main_executable) {
                Some(t) if t.is_library_or_executable() => {}
                Some(_) => problems.push(format!(
                    "distribution `{}`: `{}` is not a library or executable target",
                    name, b.main_executable
                )),
                None => problems.push(format!(
                    "distribution `{}`: main executable `{}` does not exist",
                    name, b.main_executable
                )),
            }
        }
    }

    if problems.is_empty() {
        shell.status(Status::Finished, "manifest is valid");
        Ok(())
    } else {
        for problem in &problems {
            shell.error(problem);
        }
        bail!("{} validation problem(s) found", problems.len())
    }
}
