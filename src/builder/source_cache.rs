//! Build cache and rebuild scheduler (spec §4.4).
//!
//! Grounded on the original build orchestrator's
//! `Cache/WorkspaceInternalCacheFile.cpp` for the overall file grammar
//! (build/theme/version hashes, `#extra-hash` lines, `@id|lastBuildTime`
//! blocks) and `State/SourceFileCache.cpp` for the per-file dirty check.
//! Deliberately hash-free below the workspace level: no source content is
//! ever hashed here, only mtimes and a hash of the compile command-line
//! template (rule 4 below).
//!
//! Cache line grammar:
//! ```text
//! <build-hash>|<last-build-file-write-time>
//! <theme-hash>
//! <version-hash>[|<debug-version-hash>]
//! #<extra-hash>              (zero or more)
//! @<target-id>|<last-build-time>
//! $<command-line-hash>       (optional, one per target block)
//! <mtime>|<absolute-path>    (zero or more until next @ or EOF)
//! ```
//!
//! `WorkspaceCache::{load,save,path}` take the directory the cache file
//! lives under as a plain argument rather than hard-coding it; callers
//! should pass `WorkspaceEnvironment::workspace_cache_dir()` (spec §6:
//! "stored at `<buildDir>/.cache/<workspace-hash>/`") so each workspace
//! root gets its own cache regardless of where `buildDir` is configured.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use indexmap::IndexMap;

use crate::core::source_group::SourceGroup;

const CACHE_FILE_NAME: &str = "crucible.cache";

fn unix_time(t: SystemTime) -> i64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn mtime_of(path: &Path) -> Option<i64> {
    fs::metadata(path).and_then(|m| m.modified()).ok().map(unix_time)
}

/// Per-target record: every source's last-seen write time, the last build
/// time, and the compile command-line hash the target was last built with.
#[derive(Debug, Clone, Default)]
pub struct TargetSourceCache {
    pub last_build_time: i64,
    pub command_line_hash: Option<String>,
    pub last_writes: BTreeMap<PathBuf, i64>,
}

impl TargetSourceCache {
    fn serialize(&self, id: &str, out: &mut String) {
        out.push_str(&format!("@{}|{}\n", id, self.last_build_time));
        if let Some(hash) = &self.command_line_hash {
            out.push_str(&format!("${}\n", hash));
        }
        for (path, mtime) in &self.last_writes {
            out.push_str(&format!("{}|{}\n", mtime, path.display()));
        }
    }

    fn touch(&mut self, path: PathBuf) {
        let mtime = mtime_of(&path).unwrap_or(i64::MAX);
        self.last_writes.insert(path, mtime);
    }

    /// Rules 1, 2, 4, 5 of spec §4.4 for a single source file. Rule 3 (the
    /// `.d` dependency file) is checked separately since it needs no cache
    /// state beyond `last_build_time`. The file's mtime is recorded
    /// regardless of outcome, since it was consulted this run.
    fn is_dirty(&mut self, group: &SourceGroup, command_line_hash: &str, pch_object_path: Option<&Path>) -> bool {
        let command_line_changed = self.command_line_hash.as_deref() != Some(command_line_hash);
        self.command_line_hash = Some(command_line_hash.to_string());

        if !group.object_path.exists() {
            self.touch(group.source_path.clone());
            return true;
        }

        if command_line_changed {
            self.touch(group.source_path.clone());
            return true;
        }

        let source_mtime = mtime_of(&group.source_path).unwrap_or(i64::MAX);
        self.last_writes.insert(group.source_path.clone(), source_mtime);

        if source_mtime > self.last_build_time {
            return true;
        }

        if dependency_file_is_dirty(&group.dependency_file_path, self.last_build_time) {
            return true;
        }

        if let Some(pch_obj) = pch_object_path {
            if let (Some(pch_mtime), Some(obj_mtime)) = (mtime_of(pch_obj), mtime_of(&group.object_path)) {
                if pch_mtime > obj_mtime {
                    return true;
                }
            }
        }

        false
    }
}

/// Rule 3: the `.d` file is absent, or lists a header newer than
/// `last_build_time`.
fn dependency_file_is_dirty(dep_file: &Path, last_build_time: i64) -> bool {
    let Ok(text) = fs::read_to_string(dep_file) else {
        return true;
    };
    parse_makefile_deps(&text)
        .into_iter()
        .any(|header| mtime_of(&header).map(|m| m > last_build_time).unwrap_or(true))
}

/// Parse a GNU-style `.d` file (`target: dep1 dep2 \` continuation lines)
/// into its listed dependency paths, skipping the target itself.
fn parse_makefile_deps(text: &str) -> Vec<PathBuf> {
    let joined = text.replace("\\\n", " ").replace("\\\r\n", " ");
    let mut parts = joined.splitn(2, ':');
    parts.next();
    match parts.next() {
        Some(deps) => deps.split_whitespace().map(PathBuf::from).collect(),
        None => Vec::new(),
    }
}

/// The whole-workspace build cache (spec §4.4).
#[derive(Debug, Clone, Default)]
pub struct WorkspaceCache {
    pub build_hash: String,
    pub last_build_file_write: i64,
    pub theme_hash: String,
    pub version_hash: String,
    pub debug_version_hash: Option<String>,
    pub extra_hashes: Vec<String>,
    pub source_caches: IndexMap<String, TargetSourceCache>,
}

impl WorkspaceCache {
    pub fn path(build_dir: &Path) -> PathBuf {
        build_dir.join(CACHE_FILE_NAME)
    }

    /// Load the cache from `build_dir`, or an empty cache if none exists.
    pub fn load(build_dir: &Path) -> Result<Self> {
        let path = Self::path(build_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    fn parse(text: &str) -> Self {
        let mut cache = WorkspaceCache::default();
        let mut current_id: Option<String> = None;
        let mut header_lines_seen = 0;

        for line in text.lines() {
            if line.is_empty() {
                continue;
            }

            if current_id.is_none() && header_lines_seen < 3 {
                match header_lines_seen {
                    0 => {
                        let mut parts = line.splitn(2, '|');
                        cache.build_hash = parts.next().unwrap_or_default().to_string();
                        cache.last_build_file_write = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
                    }
                    1 => cache.theme_hash = line.to_string(),
                    2 => {
                        let mut parts = line.splitn(2, '|');
                        cache.version_hash = parts.next().unwrap_or_default().to_string();
                        cache.debug_version_hash = parts.next().map(str::to_string);
                    }
                    _ => unreachable!(),
                }
                header_lines_seen += 1;
                continue;
            }

            if let Some(hash) = line.strip_prefix('#') {
                cache.extra_hashes.push(hash.to_string());
                continue;
            }

            if let Some(rest) = line.strip_prefix('@') {
                let mut parts = rest.splitn(2, '|');
                let id = parts.next().unwrap_or_default().to_string();
                let last_build_time = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
                cache.source_caches.insert(
                    id.clone(),
                    TargetSourceCache { last_build_time, command_line_hash: None, last_writes: BTreeMap::new() },
                );
                current_id = Some(id);
                continue;
            }

            let Some(id) = current_id.as_ref() else { continue };
            let Some(tc) = cache.source_caches.get_mut(id) else { continue };

            if let Some(hash) = line.strip_prefix('$') {
                tc.command_line_hash = Some(hash.to_string());
                continue;
            }

            let mut parts = line.splitn(2, '|');
            if let (Some(mtime_s), Some(path_s)) = (parts.next(), parts.next()) {
                if let Ok(mtime) = mtime_s.parse::<i64>() {
                    tc.last_writes.insert(PathBuf::from(path_s), mtime);
                }
            }
        }

        cache
    }

    pub fn save(&self, build_dir: &Path) -> Result<()> {
        fs::create_dir_all(build_dir).with_context(|| format!("failed to create {}", build_dir.display()))?;

        let mut out = String::new();
        out.push_str(&format!("{}|{}\n", self.build_hash, self.last_build_file_write));
        out.push_str(&format!("{}\n", self.theme_hash));
        match &self.debug_version_hash {
            Some(debug) => out.push_str(&format!("{}|{}\n", self.version_hash, debug)),
            None => out.push_str(&format!("{}\n", self.version_hash)),
        }
        for hash in &self.extra_hashes {
            out.push_str(&format!("#{}\n", hash));
        }
        for (id, tc) in &self.source_caches {
            tc.serialize(id, &mut out);
        }

        let path = Self::path(build_dir);
        let mut file = fs::File::create(&path).with_context(|| format!("failed to write {}", path.display()))?;
        file.write_all(out.as_bytes())?;
        Ok(())
    }

    /// Compares `hash` against the cached build-config hash, updating it and
    /// reporting whether it changed (a change invalidates every target).
    pub fn check_build_hash(&mut self, hash: &str) -> bool {
        let changed = self.build_hash != hash;
        self.build_hash = hash.to_string();
        self.last_build_file_write = unix_time(SystemTime::now());
        changed
    }

    pub fn check_theme_hash(&mut self, hash: &str) -> bool {
        let changed = self.theme_hash != hash;
        self.theme_hash = hash.to_string();
        changed
    }

    pub fn check_version_hash(&mut self, hash: &str, debug: bool) -> bool {
        let changed = if debug {
            self.debug_version_hash.as_deref() != Some(hash)
        } else {
            self.version_hash != hash
        };
        if debug {
            self.debug_version_hash = Some(hash.to_string());
        } else {
            self.version_hash = hash.to_string();
        }
        changed
    }

    pub fn add_extra_hash(&mut self, hash: impl Into<String>) {
        let hash = hash.into();
        if !self.extra_hashes.contains(&hash) {
            self.extra_hashes.push(hash);
        }
    }

    /// Drop cache entries (extra hashes, per-target blocks) no longer
    /// referenced by the current build.
    pub fn prune_targets(&mut self, keep: &[String]) {
        self.source_caches.retain(|id, _| keep.contains(id));
    }

    pub fn target_cache_mut(&mut self, target_id: &str) -> &mut TargetSourceCache {
        self.source_caches.entry(target_id.to_string()).or_default()
    }

    /// Rule set for a whole target: dirty if any source is dirty (rules
    /// 1-5) or the target's output artifact is missing.
    pub fn target_is_dirty(
        &mut self,
        target_id: &str,
        groups: &[SourceGroup],
        target_output: &Path,
        command_line_hash: &str,
        pch_object_path: Option<&Path>,
    ) -> bool {
        let mut dirty = !target_output.exists();
        let tc = self.target_cache_mut(target_id);
        for group in groups {
            if tc.is_dirty(group, command_line_hash, pch_object_path) {
                dirty = true;
            }
        }
        dirty
    }

    /// Stamp `target_id`'s last-build-time to now; call after a successful
    /// build so the next run's mtime comparisons (rule 2) use this build.
    pub fn mark_built(&mut self, target_id: &str) {
        let now = unix_time(SystemTime::now());
        self.target_cache_mut(target_id).last_build_time = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source_group::SourceGroupKind;
    use tempfile::TempDir;

    fn group(tmp: &Path, name: &str) -> SourceGroup {
        let src = tmp.join(name);
        std::fs::write(&src, "// source").unwrap();
        SourceGroup::new(&src, tmp, &tmp.join("build"), SourceGroupKind::Cxx, "o")
    }

    #[test]
    fn round_trips_through_disk() {
        let tmp = TempDir::new().unwrap();
        let mut cache = WorkspaceCache::default();
        cache.check_build_hash("abc123");
        cache.check_theme_hash("theme1");
        cache.check_version_hash("v1", false);
        cache.add_extra_hash("extra1");
        let tc = cache.target_cache_mut("app");
        tc.last_build_time = 42;
        tc.command_line_hash = Some("cmdhash".to_string());
        tc.last_writes.insert(PathBuf::from("/ws/main.cpp"), 10);

        cache.save(tmp.path()).unwrap();
        let loaded = WorkspaceCache::load(tmp.path()).unwrap();

        assert_eq!(loaded.build_hash, "abc123");
        assert_eq!(loaded.theme_hash, "theme1");
        assert_eq!(loaded.version_hash, "v1");
        assert_eq!(loaded.extra_hashes, vec!["extra1".to_string()]);
        let loaded_tc = loaded.source_caches.get("app").unwrap();
        assert_eq!(loaded_tc.last_build_time, 42);
        assert_eq!(loaded_tc.command_line_hash.as_deref(), Some("cmdhash"));
        assert_eq!(loaded_tc.last_writes.get(&PathBuf::from("/ws/main.cpp")), Some(&10));
    }

    #[test]
    fn missing_cache_file_yields_empty() {
        let tmp = TempDir::new().unwrap();
        let cache = WorkspaceCache::load(tmp.path()).unwrap();
        assert!(cache.source_caches.is_empty());
        assert!(cache.build_hash.is_empty());
    }

    #[test]
    fn missing_object_file_is_dirty() {
        let tmp = TempDir::new().unwrap();
        let g = group(tmp.path(), "main.cpp");
        let mut cache = WorkspaceCache::default();
        assert!(cache.target_is_dirty("app", &[g], &tmp.path().join("build/app"), "cmd1", None));
    }

    #[test]
    fn command_line_change_forces_dirty() {
        let tmp = TempDir::new().unwrap();
        let g = group(tmp.path(), "main.cpp");
        std::fs::create_dir_all(g.object_path.parent().unwrap()).unwrap();
        std::fs::write(&g.object_path, "obj").unwrap();
        std::fs::write(&g.dependency_file_path, format!("{}:\n", g.object_path.display())).unwrap();
        std::fs::write(&tmp.path().join("build/app"), "bin").unwrap();

        let mut cache = WorkspaceCache::default();
        cache.target_cache_mut("app").last_build_time = unix_time(SystemTime::now()) + 3600;
        assert!(cache.target_is_dirty("app", &[g.clone()], &tmp.path().join("build/app"), "cmd-v1", None));

        // Second run with the same command line and an up-to-date build
        // time is clean.
        assert!(!cache.target_is_dirty("app", &[g], &tmp.path().join("build/app"), "cmd-v1", None));
    }

    #[test]
    fn missing_dependency_file_is_dirty() {
        let tmp = TempDir::new().unwrap();
        let g = group(tmp.path(), "main.cpp");
        std::fs::create_dir_all(g.object_path.parent().unwrap()).unwrap();
        std::fs::write(&g.object_path, "obj").unwrap();
        std::fs::write(&tmp.path().join("build/app"), "bin").unwrap();

        let mut cache = WorkspaceCache::default();
        let far_future = unix_time(SystemTime::now()) + 3600;
        cache.target_cache_mut("app").last_build_time = far_future;
        cache.target_cache_mut("app").command_line_hash = Some("cmd1".to_string());

        // Source mtime is before last_build_time and the command line
        // matches, but the .d file is missing entirely, so rule 3 fires.
        assert!(cache.target_is_dirty("app", &[g], &tmp.path().join("build/app"), "cmd1", None));
    }

    #[test]
    fn parses_makefile_deps_with_continuations() {
        let deps = parse_makefile_deps("main.o: main.cpp \\\n  header1.h \\\n  header2.h\n");
        assert_eq!(
            deps,
            vec![PathBuf::from("main.cpp"), PathBuf::from("header1.h"), PathBuf::from("header2.h")]
        );
    }
}
