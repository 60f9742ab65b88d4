//! `SourceGroup` — the smallest unit handed to a compile strategy — and
//! `SourceOutputs`, the per-target aggregate of groups plus the linked
//! artifact path (spec §3).

use std::collections::BTreeSet;
use std::path::PathBuf;

/// The classification a source file is discovered into (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceGroupKind {
    /// Always ordered first: must finish before any consumer compiles.
    PrecompiledHeader,
    C,
    Cxx,
    ObjC,
    ObjCxx,
    Resource,
}

impl SourceGroupKind {
    pub fn from_extension(ext: &str) -> Option<SourceGroupKind> {
        match ext.to_ascii_lowercase().as_str() {
            "c" => Some(SourceGroupKind::C),
            "cc" | "cpp" | "cxx" | "c++" => Some(SourceGroupKind::Cxx),
            "m" => Some(SourceGroupKind::ObjC),
            "mm" => Some(SourceGroupKind::ObjCxx),
            "rc" => Some(SourceGroupKind::Resource),
            _ => None,
        }
    }
}

/// One source file plus its object and dependency-file paths.
#[derive(Debug, Clone)]
pub struct SourceGroup {
    pub source_path: PathBuf,
    pub object_path: PathBuf,
    pub dependency_file_path: PathBuf,
    pub kind: SourceGroupKind,
}

impl SourceGroup {
    /// Build a group for `source`, relative to `workspace_root`, rooted
    /// under `build_dir` (spec §4.4's object-path assignment rule: the
    /// workspace-root-relative path is preserved so same-basename files in
    /// different directories never collide).
    pub fn new(
        source: &std::path::Path,
        workspace_root: &std::path::Path,
        build_dir: &std::path::Path,
        kind: SourceGroupKind,
        object_extension: &str,
    ) -> Self {
        let relative = pathdiff::diff_paths(source, workspace_root).unwrap_or_else(|| source.to_path_buf());
        let mut object_path = build_dir.join(&relative);
        object_path.set_extension(object_extension.trim_start_matches('.'));
        let dependency_file_path = object_path.with_extension("d");

        SourceGroup {
            source_path: source.to_path_buf(),
            object_path,
            dependency_file_path,
            kind,
        }
    }
}

/// Per-target aggregate: its source groups, the final artifact path, and
/// the set of directories that must exist before compiling starts.
#[derive(Debug, Clone)]
pub struct SourceOutputs {
    pub groups: Vec<SourceGroup>,
    pub target_output: PathBuf,
    pub required_dirs: BTreeSet<PathBuf>,
}

impl SourceOutputs {
    pub fn new(groups: Vec<SourceGroup>, target_output: PathBuf) -> Self {
        let mut required_dirs = BTreeSet::new();
        required_dirs.insert(
            target_output
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default(),
        );
        for g in &groups {
            if let Some(parent) = g.object_path.parent() {
                required_dirs.insert(parent.to_path_buf());
            }
        }
        SourceOutputs {
            groups,
            target_output,
            required_dirs,
        }
    }

    /// Object-path uniqueness invariant (spec §3): no two groups in a
    /// target may share an object path.
    pub fn object_paths_are_unique(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.groups.iter().all(|g| seen.insert(g.object_path.clone()))
    }
}
