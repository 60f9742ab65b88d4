//! Dependency Manager: drives each `ExternalDependency` to its destination
//! and reconciles the external-dependency cache (spec §4.3).

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;

use crate::core::dependency::{ExternalDependency, ExternalDependencyKind};
use crate::sources::cache::{ArchiveCacheEntry, CacheEntry, ExternalDependencyCache, GitCacheEntry};
use crate::sources::{archive, git, local, script};
use crate::util::shell::Shell;

/// Fetch every declared dependency, then remove any previously-cached
/// destination that is no longer declared.
pub fn sync(deps: &[ExternalDependency], external_dir: &Path, shell: &Shell) -> Result<()> {
    std::fs::create_dir_all(external_dir)?;
    let mut cache = ExternalDependencyCache::load(external_dir)?;

    let declared: BTreeSet<String> = deps.iter().map(|d| d.destination.to_string_lossy().into_owned()).collect();

    for dep in deps {
        if let Err(err) = fetch_one(dep, &mut cache) {
            shell.error(&format!("failed to fetch `{}`: {err:#}", dep.name));
            if dep.destination.exists() {
                let _ = std::fs::remove_dir_all(&dep.destination);
            }
            cache.remove(&dep.destination);
            return Err(err);
        }
        shell.status(crate::util::shell::Status::Fetching, &format!("{}", dep.name));
    }

    remove_orphans(&declared, external_dir, &mut cache)?;
    cache.save(external_dir)?;

    if external_dir.read_dir().map(|mut it| it.next().is_none()).unwrap_or(false) {
        let _ = std::fs::remove_dir(external_dir);
    }

    Ok(())
}

fn fetch_one(dep: &ExternalDependency, cache: &mut ExternalDependencyCache) -> Result<()> {
    match &dep.kind {
        ExternalDependencyKind::Git(g) => {
            let result = git::fetch(g, &dep.destination)?;
            cache.set(
                &dep.destination,
                CacheEntry::Git(GitCacheEntry {
                    lc: Some(result.last_commit_hash),
                    lb: result.last_branch,
                    c: g.commit.clone(),
                    b: g.branch.clone(),
                    t: g.tag.clone(),
                }),
            );
        }
        ExternalDependencyKind::Archive(a) => {
            let result = archive::fetch(a, &dep.destination)?;
            cache.set(
                &dep.destination,
                CacheEntry::Archive(ArchiveCacheEntry {
                    h: result.hash,
                    u: a.url.clone(),
                    s: a.subdirectory.clone(),
                }),
            );
        }
        ExternalDependencyKind::Local(l) => {
            local::fetch(l, &dep.destination)?;
        }
        ExternalDependencyKind::Script(s) => {
            script::fetch(s, &dep.destination)?;
        }
    }
    Ok(())
}

fn remove_orphans(declared: &BTreeSet<String>, external_dir: &Path, cache: &mut ExternalDependencyCache) -> Result<()> {
    let cached: Vec<String> = cache.known_destinations().map(str::to_string).collect();
    for destination in cached {
        if !declared.contains(&destination) {
            cache.remove(Path::new(&destination));
        }
    }

    for entry in std::fs::read_dir(external_dir)? {
        let entry = entry?;
        if entry.file_name() == ".crucible-external-cache.json" {
            continue;
        }
        let path = entry.path();
        let path_str = path.to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() && !declared.contains(&path_str) {
            std::fs::remove_dir_all(&path)?;
        }
    }

    Ok(())
}
