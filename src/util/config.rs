//! The settings file (spec §6): JSON, stored at the global and local
//! settings paths (`GlobalContext::global_settings_path`/
//! `local_settings_path`). Local settings override global on a per-key
//! basis. Tolerant of unknown keys on load, per spec.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One resolved toolchain, cached under `toolchains.<name>` (spec §4.2).
/// Detection is skipped on subsequent runs unless the toolchain name,
/// architecture, or a cached executable path has changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolchainConfig {
    pub strategy: Option<String>,
    pub build_path_style: Option<String>,
    pub version: Option<String>,
    pub architecture: Option<String>,
    pub archiver: Option<PathBuf>,
    pub compiler_cpp: Option<PathBuf>,
    pub compiler_c: Option<PathBuf>,
    pub compiler_windows_resource: Option<PathBuf>,
    pub linker: Option<PathBuf>,
    pub profiler: Option<PathBuf>,
    pub disassembler: Option<PathBuf>,
    pub cmake: Option<PathBuf>,
    pub make: Option<PathBuf>,
    pub ninja: Option<PathBuf>,
}

impl ToolchainConfig {
    /// Whether this entry carries enough to skip auto-detection: a C or
    /// C++ compiler override.
    pub fn has_overrides(&self) -> bool {
        self.compiler_c.is_some() || self.compiler_cpp.is_some()
    }
}

/// Ancillary tool paths (spec §6: git, curl, tar, unzip, codesign, hdiutil,
/// install_name_tool, instruments, ldd, otool, …), and macOS SDK paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, transparent)]
pub struct ToolPaths(pub BTreeMap<String, PathBuf>);

impl ToolPaths {
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.0.get(name).map(PathBuf::as_path)
    }
}

/// Workspace-wide defaults (the `settings` top-level key).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkspaceSettings {
    pub default_architecture: Option<String>,
    pub default_configuration: Option<String>,
    pub signing_identity: Option<String>,
    pub jobs: Option<usize>,
    pub show_commands: Option<bool>,
}

/// The settings file (spec §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub settings: WorkspaceSettings,
    pub toolchains: BTreeMap<String, ToolchainConfig>,
    pub tools: ToolPaths,
    #[serde(rename = "appleSdks")]
    pub apple_sdks: BTreeMap<String, PathBuf>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse settings file: {}", path.display()))
    }

    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|err| {
                tracing::warn!("failed to load settings from {}: {err:#}", path.display());
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Written atomically: serialize to a sibling temp file, then rename
    /// over the destination.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("failed to serialize settings")?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Merge `other` (the more specific, local file) over `self`, `other`
    /// taking precedence key-by-key.
    pub fn merge(&mut self, other: Settings) {
        if other.settings.default_architecture.is_some() {
            self.settings.default_architecture = other.settings.default_architecture;
        }
        if other.settings.default_configuration.is_some() {
            self.settings.default_configuration = other.settings.default_configuration;
        }
        if other.settings.signing_identity.is_some() {
            self.settings.signing_identity = other.settings.signing_identity;
        }
        if other.settings.jobs.is_some() {
            self.settings.jobs = other.settings.jobs;
        }
        if other.settings.show_commands.is_some() {
            self.settings.show_commands = other.settings.show_commands;
        }
        for (name, tc) in other.toolchains {
            self.toolchains.insert(name, tc);
        }
        for (name, path) in other.tools.0 {
            self.tools.0.insert(name, path);
        }
        for (name, path) in other.apple_sdks {
            self.apple_sdks.insert(name, path);
        }
    }

    pub fn toolchain(&self, name: &str) -> Option<&ToolchainConfig> {
        self.toolchains.get(name)
    }

    pub fn set_toolchain(&mut self, name: impl Into<String>, config: ToolchainConfig) {
        self.toolchains.insert(name.into(), config);
    }
}

/// Load merged settings from the global and local locations (spec §6:
/// "load is tolerant of unknown keys").
pub fn load_settings(global_path: &Path, local_path: &Path) -> Settings {
    let mut settings = Settings::default();
    if global_path.exists() {
        settings.merge(Settings::load_or_default(global_path));
    }
    if local_path.exists() {
        settings.merge(Settings::load_or_default(local_path));
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_or_default_yields_defaults_for_missing_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load_or_default(&tmp.path().join("settings.json"));
        assert!(settings.toolchains.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");

        let mut settings = Settings::default();
        settings.set_toolchain(
            "llvm",
            ToolchainConfig {
                compiler_cpp: Some(PathBuf::from("/usr/bin/clang++")),
                compiler_c: Some(PathBuf::from("/usr/bin/clang")),
                ..Default::default()
            },
        );
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(
            loaded.toolchain("llvm").unwrap().compiler_cpp,
            Some(PathBuf::from("/usr/bin/clang++"))
        );
    }

    #[test]
    fn local_settings_override_global_per_key() {
        let mut global = Settings::default();
        global.settings.jobs = Some(4);
        global.set_toolchain("gcc", ToolchainConfig { version: Some("11".to_string()), ..Default::default() });

        let mut local = Settings::default();
        local.settings.jobs = Some(8);

        let mut merged = global.clone();
        merged.merge(local);

        assert_eq!(merged.settings.jobs, Some(8));
        assert_eq!(merged.toolchain("gcc").unwrap().version.as_deref(), Some("11"));
    }

    #[test]
    fn unknown_keys_are_tolerated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{"settings":{},"futureField":{"nested":true}}"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert!(settings.toolchains.is_empty());
    }
}
