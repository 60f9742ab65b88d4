//! The build-graph node types (`IBuildTarget` in the spec's vocabulary).
//!
//! The legacy source models this as a class hierarchy rooted at
//! `IBuildTarget`; here it is a sum type with pattern-match dispatch
//! instead (spec §9, Design Notes).

pub mod language;

pub use language::{CStandard, CppStandard, Language};

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// `StaticLibrary`/`SharedLibrary`/`Executable` — the artifact kind a
/// `SourceTarget` produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryKind {
    Executable,
    StaticLibrary,
    SharedLibrary,
}

/// Warning preset tag, or an explicit flag list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Warnings {
    Preset(String),
    List(Vec<String>),
}

impl Default for Warnings {
    fn default() -> Self {
        Warnings::Preset("none".to_string())
    }
}

/// MSVC C runtime linkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum MsvcRuntime {
    #[default]
    Dynamic,
    Static,
}

impl MsvcRuntime {
    /// The release-mode `/M{D,T}` flag (spec §4.5 policy matrix).
    pub fn as_flag(&self) -> &'static str {
        match self {
            MsvcRuntime::Dynamic => "/MD",
            MsvcRuntime::Static => "/MT",
        }
    }

    /// The debug-mode `/M{D,T}d` flag.
    pub fn as_debug_flag(&self) -> &'static str {
        match self {
            MsvcRuntime::Dynamic => "/MDd",
            MsvcRuntime::Static => "/MTd",
        }
    }
}

/// Non-MSVC C++ runtime selection (libstdc++ vs libc++).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CppRuntime {
    #[default]
    Default,
    Libstdcxx,
    Libcxx,
}

impl CppRuntime {
    /// The GNU-family `-stdlib=` flag, or `None` for the platform default.
    pub fn as_flag(&self) -> Option<&'static str> {
        match self {
            CppRuntime::Default => None,
            CppRuntime::Libstdcxx => Some("-stdlib=libstdc++"),
            CppRuntime::Libcxx => Some("-stdlib=libc++"),
        }
    }
}

/// Windows PE subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowsSubsystem {
    Console,
    Windows,
}

/// Windows-only fields, present only when the target opts in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowsOptions {
    pub subsystem: Option<WindowsSubsystem>,
    pub entry_point: Option<String>,
    pub manifest: Option<PathBuf>,
    pub icon: Option<PathBuf>,
}

/// macOS-only fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacosOptions {
    pub frameworks: Vec<String>,
    pub framework_paths: Vec<PathBuf>,
}

/// C++-wide feature toggles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CppFeatures {
    pub modules: bool,
    pub concepts: bool,
    pub coroutines: bool,
    pub filesystem: bool,
}

/// The heavy `IBuildTarget` variant: compiles sources into an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTarget {
    pub language: Language,
    pub kind: BinaryKind,

    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub exclude_files: Vec<String>,
    #[serde(default)]
    pub configure_files: Vec<String>,

    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub lib_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub static_links: Vec<String>,

    #[serde(default)]
    pub warnings: Warnings,
    #[serde(default)]
    pub compile_options: Vec<String>,
    #[serde(default)]
    pub linker_options: Vec<String>,

    pub precompiled_header: Option<PathBuf>,

    pub cpp_standard: Option<String>,
    pub c_standard: Option<String>,

    #[serde(default = "default_true")]
    pub threads: bool,
    #[serde(default = "default_true")]
    pub exceptions: bool,
    #[serde(default = "default_true")]
    pub rtti: bool,
    #[serde(default)]
    pub fast_math: bool,
    #[serde(default)]
    pub static_runtime_library: bool,

    #[serde(default)]
    pub cpp_features: CppFeatures,

    #[serde(default)]
    pub windows: WindowsOptions,
    #[serde(default)]
    pub macos: MacosOptions,

    /// Extra files copied next to the built artifact after a successful
    /// link (spec §3 supplement, "runDependencies").
    #[serde(default)]
    pub run_dependencies: Vec<PathBuf>,
}

fn default_true() -> bool {
    true
}

/// A reference to another workspace's manifest, built as a sub-project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubprojectTarget {
    pub location: PathBuf,
    #[serde(default)]
    pub target: Option<String>,
}

/// A CMake-driven external/vendored project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CMakeTarget {
    pub location: PathBuf,
    #[serde(default)]
    pub defines: BTreeMap<String, String>,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub build_file: Option<PathBuf>,
}

/// A target that runs an arbitrary script during the build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptTarget {
    pub file: PathBuf,
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// A target that runs an already-built executable (e.g. a codegen step).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTarget {
    pub path: PathBuf,
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// A target whose sole purpose is to fail the build with a message when
/// its condition holds (e.g. asserting an unsupported toolchain/platform
/// combination was selected).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationTarget {
    pub message: String,
}

/// The per-variant payload of a build-graph node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TargetKind {
    Executable(SourceTarget),
    StaticLibrary(SourceTarget),
    SharedLibrary(SourceTarget),
    ChaletProject(SubprojectTarget),
    CmakeProject(CMakeTarget),
    Script(ScriptTarget),
    Process(ProcessTarget),
    Validation(ValidationTarget),
}

/// A named node in the build graph (`IBuildTarget`): common fields plus a
/// polymorphic payload.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub include_in_build: bool,
    pub output_description: Option<String>,
    pub depends_on: Vec<String>,
    pub kind: TargetKind,
}

impl Target {
    /// The target's kind name as used in diagnostics and `--explain`.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            TargetKind::Executable(_) => "executable",
            TargetKind::StaticLibrary(_) => "staticLibrary",
            TargetKind::SharedLibrary(_) => "sharedLibrary",
            TargetKind::ChaletProject(_) => "chaletProject",
            TargetKind::CmakeProject(_) => "cmakeProject",
            TargetKind::Script(_) => "script",
            TargetKind::Process(_) => "process",
            TargetKind::Validation(_) => "validation",
        }
    }

    /// Returns the `SourceTarget` payload for target kinds that compile
    /// source code (spec: "must be a library/executable kind" for
    /// distribution eligibility).
    pub fn as_source(&self) -> Option<&SourceTarget> {
        match &self.kind {
            TargetKind::Executable(s) | TargetKind::StaticLibrary(s) | TargetKind::SharedLibrary(s) => {
                Some(s)
            }
            _ => None,
        }
    }

    pub fn is_library_or_executable(&self) -> bool {
        self.as_source().is_some()
    }

    /// Validate the target-name grammar invariant from spec §3.
    pub fn validate_name(name: &str) -> bool {
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        if !(first.is_ascii_alphabetic() || first == '_') {
            return false;
        }
        if matches!(first, '.' | '_' | '-' | '+') {
            return false;
        }
        name.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '.' | '-'))
    }
}
