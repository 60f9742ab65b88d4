//! `WorkspaceEnvironment` and `BuildConfiguration`: the paths and named
//! compile-option sets shared across every target in a build.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Optimization level, shared by every Command Adapter and translated to
/// the family-specific flag in `builder::adapters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OptimizationLevel {
    None,
    L1,
    L2,
    #[default]
    L3,
    Debug,
    Size,
    Fast,
    CompilerDefault,
}

/// A named set of compile-time options applied uniformly across a build
/// (spec §3, Glossary "Configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfiguration {
    pub name: String,
    #[serde(default)]
    pub debug_symbols: bool,
    #[serde(default)]
    pub enable_profiling: bool,
    #[serde(default)]
    pub link_time_optimization: bool,
    #[serde(default)]
    pub strip_symbols: bool,
    #[serde(default)]
    pub optimization_level: OptimizationLevel,
    #[serde(default)]
    pub sanitize: BTreeSet<String>,
}

impl BuildConfiguration {
    fn named(name: &str) -> Self {
        BuildConfiguration {
            name: name.to_string(),
            debug_symbols: false,
            enable_profiling: false,
            link_time_optimization: false,
            strip_symbols: false,
            optimization_level: OptimizationLevel::CompilerDefault,
            sanitize: BTreeSet::new(),
        }
    }

    pub fn release() -> Self {
        BuildConfiguration {
            optimization_level: OptimizationLevel::L3,
            link_time_optimization: true,
            strip_symbols: true,
            ..BuildConfiguration::named("Release")
        }
    }

    pub fn debug() -> Self {
        BuildConfiguration {
            optimization_level: OptimizationLevel::Debug,
            debug_symbols: true,
            ..BuildConfiguration::named("Debug")
        }
    }

    pub fn rel_with_deb_info() -> Self {
        BuildConfiguration {
            optimization_level: OptimizationLevel::L2,
            debug_symbols: true,
            ..BuildConfiguration::named("RelWithDebInfo")
        }
    }

    pub fn min_size_rel() -> Self {
        BuildConfiguration {
            optimization_level: OptimizationLevel::Size,
            strip_symbols: true,
            ..BuildConfiguration::named("MinSizeRel")
        }
    }

    pub fn profile() -> Self {
        BuildConfiguration {
            optimization_level: OptimizationLevel::L2,
            debug_symbols: true,
            enable_profiling: true,
            ..BuildConfiguration::named("Profile")
        }
    }

    /// The five defaults emitted when a manifest does not override
    /// `configurations` (spec §3).
    pub fn defaults() -> IndexMap<String, BuildConfiguration> {
        let mut map = IndexMap::new();
        for cfg in [
            BuildConfiguration::release(),
            BuildConfiguration::debug(),
            BuildConfiguration::rel_with_deb_info(),
            BuildConfiguration::min_size_rel(),
            BuildConfiguration::profile(),
        ] {
            map.insert(cfg.name.clone(), cfg);
        }
        map
    }
}

/// Resolved paths and identity for a workspace; materialised once per run
/// and read-only thereafter.
#[derive(Debug, Clone)]
pub struct WorkspaceEnvironment {
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub external_dir: PathBuf,
    pub distribution_dir: PathBuf,
    pub build_output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub name: String,
    pub version: String,
    pub search_paths: Vec<PathBuf>,
}

impl WorkspaceEnvironment {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>, version: impl Into<String>) -> Self {
        let root = root.into();
        WorkspaceEnvironment {
            output_dir: root.join("build"),
            external_dir: root.join("external"),
            distribution_dir: root.join("dist"),
            build_output_dir: root.join("build"),
            cache_dir: root.join("build").join(".cache"),
            search_paths: Vec::new(),
            name: name.into(),
            version: version.into(),
            root,
        }
    }

    /// Per-configuration build output directory, e.g. `build/Debug`.
    pub fn configuration_output_dir(&self, configuration: &str) -> PathBuf {
        self.build_output_dir.join(configuration)
    }

    /// Per-workspace cache directory keyed by a hash of the workspace root
    /// path, per spec §6 ("Stored at `<buildDir>/.cache/<workspace-hash>/`").
    pub fn workspace_cache_dir(&self) -> PathBuf {
        self.cache_dir.join(workspace_hash(&self.root))
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::create_dir_all(&self.external_dir)?;
        std::fs::create_dir_all(self.workspace_cache_dir())?;
        Ok(())
    }
}

fn workspace_hash(root: &Path) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    root.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
