//! Distribution manifest nodes: the deployable-artifact side of a
//! workspace (`distribution` top-level key, spec §6).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleTarget {
    pub main_executable: String,
    #[serde(default)]
    pub subdirectory: Option<String>,
    #[serde(default)]
    pub include_files: Vec<PathBuf>,
    #[serde(default)]
    pub exclude_files: Vec<PathBuf>,
    pub configuration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveDistribution {
    pub include: Vec<String>,
    pub format: ArchiveFormat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    Zip,
    Tar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDistribution {
    pub file: PathBuf,
    #[serde(default)]
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDistribution {
    pub path: PathBuf,
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// macOS `.dmg` image; the actual `hdiutil` invocation is treated as an
/// external collaborator (spec §1's list of out-of-scope tools) — this
/// struct models the declarative inputs only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacosDiskImageDistribution {
    pub bundle: String,
    #[serde(default)]
    pub pathbar_visible: bool,
    #[serde(default)]
    pub icon_size: Option<u32>,
    #[serde(default)]
    pub background: Option<PathBuf>,
}

/// Windows NSIS installer; `makensis` invocation is an external
/// collaborator the same way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowsNullsoftInstallerDistribution {
    pub script: PathBuf,
    pub title: String,
    #[serde(default)]
    pub plugin_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationDistribution {
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DistributionKind {
    Bundle(BundleTarget),
    Archive(ArchiveDistribution),
    Script(ScriptDistribution),
    Process(ProcessDistribution),
    MacosDiskImage(MacosDiskImageDistribution),
    WindowsNullsoftInstaller(WindowsNullsoftInstallerDistribution),
    Validation(ValidationDistribution),
}

#[derive(Debug, Clone)]
pub struct DistributionTarget {
    pub name: String,
    pub include_in_distribution: bool,
    pub kind: DistributionKind,
}
