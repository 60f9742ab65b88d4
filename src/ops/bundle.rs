//! `bundle` route (spec §6 distribution nodes): assemble each
//! `include_in_distribution` node into the workspace's distribution
//! directory. Platform packagers (`hdiutil`, `makensis`) are treated as
//! external collaborators (spec §1) — invoked when present on `PATH`,
//! otherwise reported as a resolution error naming the missing tool.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::command_line::CommandLineInputs;
use crate::core::distribution::{ArchiveFormat, DistributionKind, DistributionTarget};
use crate::ops::build;
use crate::ops::workspace;
use crate::util::context::GlobalContext;
use crate::util::fs::ensure_dir;
use crate::util::process::{find_executable, ProcessBuilder};
use crate::util::shell::{Shell, Status};

pub fn bundle(ctx: &GlobalContext, inputs: &CommandLineInputs, shell: &Shell) -> Result<()> {
    let outcome = build::build(ctx, inputs, shell)?;
    let workspace = workspace::load(ctx, inputs)?;
    let dist_dir = &workspace.environment.distribution_dir;
    ensure_dir(dist_dir)?;

    for target in workspace.manifest.distribution.values() {
        if !target.include_in_distribution {
            continue;
        }
        shell.status(Status::Building, format!("distribution `{}`", target.name));
        bundle_one(target, &outcome, dist_dir, shell)?;
    }

    Ok(())
}

fn bundle_one(target: &DistributionTarget, outcome: &build::BuildOutcome, dist_dir: &Path, shell: &Shell) -> Result<()> {
    match &target.kind {
        DistributionKind::Bundle(b) => {
            let artifact = outcome
                .artifacts
                .iter()
                .find(|a| a.target == b.main_executable)
                .with_context(|| format!("distribution `{}`: main executable `{}` was not built", target.name, b.main_executable))?;

            let out_dir = match &b.subdirectory {
                Some(sub) => dist_dir.join(sub),
                None => dist_dir.join(&target.name),
            };
            ensure_dir(&out_dir)?;

            let dest = out_dir.join(artifact.path.file_name().unwrap_or_default());
            std::fs::copy(&artifact.path, &dest)
                .with_context(|| format!("failed to copy `{}` into distribution bundle", artifact.path.display()))?;

            for file in &b.include_files {
                if b.exclude_files.contains(file) {
                    continue;
                }
                let dest = out_dir.join(file.file_name().unwrap_or_default());
                std::fs::copy(file, &dest).with_context(|| format!("failed to include `{}` in bundle", file.display()))?;
            }
            Ok(())
        }
        DistributionKind::Archive(a) => {
            let archive_path = dist_dir.join(format!(
                "{}.{}",
                target.name,
                match a.format {
                    ArchiveFormat::Zip => "zip",
                    ArchiveFormat::Tar => "tar.gz",
                }
            ));
            write_archive(&archive_path, &a.include, a.format)
        }
        DistributionKind::Script(s) => {
            let output = ProcessBuilder::new(&s.file).args(&s.arguments).exec()?;
            if !output.status.success() {
                bail!("distribution script `{}` exited with failure", s.file.display());
            }
            Ok(())
        }
        DistributionKind::Process(p) => {
            let output = ProcessBuilder::new(&p.path).args(&p.arguments).exec()?;
            if !output.status.success() {
                bail!("distribution process `{}` exited with failure", p.path.display());
            }
            Ok(())
        }
        DistributionKind::MacosDiskImage(d) => {
            let Some(hdiutil) = find_executable("hdiutil") else {
                bail!("distribution `{}` needs `hdiutil`, which was not found on PATH", target.name);
            };
            let src = dist_dir.join(&d.bundle);
            let out = dist_dir.join(format!("{}.dmg", target.name));
            let status = ProcessBuilder::new(hdiutil)
                .arg("create")
                .arg("-volname")
                .arg(&target.name)
                .arg("-srcfolder")
                .arg(&src)
                .arg("-ov")
                .arg(&out)
                .status()?;
            if !status.success() {
                bail!("hdiutil failed building `{}`", out.display());
            }
            Ok(())
        }
        DistributionKind::WindowsNullsoftInstaller(n) => {
            let Some(makensis) = find_executable("makensis") else {
                bail!("distribution `{}` needs `makensis`, which was not found on PATH", target.name);
            };
            let status = ProcessBuilder::new(makensis).arg(&n.script).status()?;
            if !status.success() {
                bail!("makensis failed building `{}`", target.name);
            }
            Ok(())
        }
        DistributionKind::Validation(v) => {
            for name in &v.targets {
                if !outcome.artifacts.iter().any(|a| &a.target == name) {
                    bail!("distribution `{}`: validation target `{}` was not built", target.name, name);
                }
            }
            shell.note(format!("distribution `{}` validated ({} target(s))", target.name, v.targets.len()));
            Ok(())
        }
    }
}

fn write_archive(path: &Path, include: &[String], format: ArchiveFormat) -> Result<()> {
    match format {
        ArchiveFormat::Zip => {
            let file = std::fs::File::create(path)?;
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            for entry in include {
                let src = Path::new(entry);
                writer.start_file(src.file_name().unwrap_or_default().to_string_lossy(), options)?;
                let mut f = std::fs::File::open(src)?;
                std::io::copy(&mut f, &mut writer)?;
            }
            writer.finish()?;
        }
        ArchiveFormat::Tar => {
            let file = std::fs::File::create(path)?;
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            for entry in include {
                let src = Path::new(entry);
                builder.append_path_with_name(src, src.file_name().unwrap_or_default())?;
            }
            builder.finish()?;
        }
    }
    Ok(())
}
