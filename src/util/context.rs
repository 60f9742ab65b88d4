//! Global context for Crucible runs.
//!
//! Centralises access to settings-layer paths and environment, per spec
//! §3's data-flow: CLI inputs → DotEnv → global settings → local settings.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::manifest::{find_manifest as find_manifest_file, ManifestDiscoveryError};

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> = LazyLock::new(|| ProjectDirs::from("com", "crucible", "crucible"));

/// Global context containing resolved paths and environment flags.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    cwd: PathBuf,
    home: PathBuf,
    verbose: bool,
    color: bool,
}

impl GlobalContext {
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = if let Some(dirs) = PROJECT_DIRS.as_ref() {
            dirs.cache_dir().to_path_buf()
        } else {
            directories::UserDirs::new()
                .map(|d| d.home_dir().join(".crucible"))
                .unwrap_or_else(|| PathBuf::from(".crucible"))
        };

        Ok(GlobalContext { cwd, home, verbose: false, color: true })
    }

    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// The per-user data directory (~/.crucible or the platform cache dir).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Where fetched git/archive dependencies are cached across workspaces.
    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    pub fn git_cache_dir(&self) -> PathBuf {
        self.cache_dir().join("git")
    }

    /// The global settings file path (spec §6, settings layering).
    pub fn global_settings_path(&self) -> PathBuf {
        self.home.join("settings.json")
    }

    /// The local (per-workspace) settings file path.
    pub fn local_settings_path(&self) -> PathBuf {
        self.cwd.join(".crucible").join("settings.json")
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Find the workspace manifest starting from `cwd` and searching
    /// upward (spec §4.1).
    pub fn find_manifest(&self) -> Result<PathBuf, ManifestDiscoveryError> {
        find_manifest_file(&self.cwd)
    }

    /// Find the workspace root (the directory containing the manifest).
    pub fn find_workspace_root(&self) -> Result<PathBuf, ManifestDiscoveryError> {
        self.find_manifest().map(|p| p.parent().unwrap().to_path_buf())
    }

    pub fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::create_dir_all(path).with_context(|| format!("failed to create directory: {}", path.display()))?;
        }
        Ok(())
    }
}

impl Default for GlobalContext {
    fn default() -> Self {
        Self::new().expect("failed to create default GlobalContext")
    }
}
