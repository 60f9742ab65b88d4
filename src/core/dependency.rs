//! `ExternalDependency`: the four kinds of dependency the fetcher in
//! `sources` knows how to materialise under `external/<name>` (spec §4.3).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitDependency {
    pub repository: String,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub commit: Option<String>,
    #[serde(default)]
    pub submodules: bool,
    /// Shallow clone (`--depth 1`); implied single-branch.
    #[serde(default = "default_true")]
    pub shallow: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveDependency {
    pub url: String,
    pub subdirectory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDependency {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDependency {
    pub file: PathBuf,
    #[serde(default)]
    pub arguments: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// A named external dependency plus its destination path under
/// `externalDir/<name>`.
#[derive(Debug, Clone)]
pub struct ExternalDependency {
    pub name: String,
    pub destination: PathBuf,
    pub kind: ExternalDependencyKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExternalDependencyKind {
    Git(GitDependency),
    Archive(ArchiveDependency),
    Local(LocalDependency),
    Script(ScriptDependency),
}

impl ExternalDependency {
    pub fn new(name: impl Into<String>, external_dir: &std::path::Path, kind: ExternalDependencyKind) -> Self {
        let name = name.into();
        let destination = external_dir.join(&name);
        ExternalDependency { name, destination, kind }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExternalDependencyKind::Git(_) => "git",
            ExternalDependencyKind::Archive(_) => "archive",
            ExternalDependencyKind::Local(_) => "local",
            ExternalDependencyKind::Script(_) => "script",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn destination_nests_under_external_dir() {
        let dep = ExternalDependency::new(
            "fmt",
            Path::new("/proj/external"),
            ExternalDependencyKind::Git(GitDependency {
                repository: "https://example/fmt.git".to_string(),
                branch: Some("master".to_string()),
                tag: None,
                commit: None,
                submodules: false,
                shallow: true,
            }),
        );
        assert_eq!(dep.destination, Path::new("/proj/external/fmt"));
        assert_eq!(dep.kind_name(), "git");
    }
}
