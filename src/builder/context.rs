//! Build context - toolchain, workspace paths, and active configuration.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::builder::toolchain::{detect_toolchain_named, CxxOptions, Toolchain};
use crate::core::target::{CppRuntime, MsvcRuntime};
use crate::core::workspace::{BuildConfiguration, OptimizationLevel, WorkspaceEnvironment};
use crate::util::context::GlobalContext;

/// Build context: the toolchain, workspace paths, and active
/// configuration shared by every Command Adapter and Compile Strategy
/// invocation for one build (spec §3, §4.5).
#[derive(Clone)]
pub struct BuildContext {
    /// Toolchain implementation.
    pub toolchain: Arc<dyn Toolchain>,

    /// Resolved workspace paths.
    pub environment: WorkspaceEnvironment,

    /// Active build configuration.
    pub configuration: BuildConfiguration,

    /// Host operating system (`linux`, `macos`, `windows`, …).
    pub host_os: String,

    /// Host architecture (`x86_64`, `aarch64`, …).
    pub host_arch: String,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("toolchain", &self.toolchain.platform())
            .field("environment", &self.environment)
            .field("configuration", &self.configuration)
            .field("host_os", &self.host_os)
            .field("host_arch", &self.host_arch)
            .finish()
    }
}

impl BuildContext {
    /// Build a context for `toolchain_name`/`configuration` within
    /// `environment`, detecting the toolchain via the settings layering
    /// described in spec §4.2.
    pub fn new(
        ctx: &GlobalContext,
        environment: WorkspaceEnvironment,
        toolchain_name: &str,
        configuration: BuildConfiguration,
    ) -> Result<Self> {
        let toolchain: Arc<dyn Toolchain> = Arc::from(detect_toolchain_named(ctx, toolchain_name)?);

        Ok(BuildContext {
            toolchain,
            environment,
            configuration,
            host_os: host_os().to_string(),
            host_arch: host_arch().to_string(),
        })
    }

    /// Output directory for the active configuration, e.g. `build/Debug`.
    pub fn output_dir(&self) -> std::path::PathBuf {
        self.environment.configuration_output_dir(&self.configuration.name)
    }

    /// External-dependency checkout directory.
    pub fn external_dir(&self) -> &std::path::Path {
        &self.environment.external_dir
    }

    /// Get C++ options for a source target's declared standard/feature
    /// set (spec §4.5's policy matrix), or `None` when the target has no
    /// explicit C++ standard.
    pub fn cxx_options(
        &self,
        cpp_standard: Option<&str>,
        exceptions: bool,
        rtti: bool,
        runtime: CppRuntime,
        msvc_runtime: MsvcRuntime,
    ) -> Option<CxxOptions> {
        let std = cpp_standard.and_then(|s| s.parse::<crate::core::target::CppStandard>().ok())?;
        Some(CxxOptions {
            std: Some(std),
            exceptions,
            rtti,
            runtime: Some(runtime),
            msvc_runtime,
            is_debug: !self.is_release(),
        })
    }

    /// Get compiler flags contributed by the active configuration
    /// (spec §4.5: optimization level, debug symbols, sanitizers).
    pub fn profile_cflags(&self) -> Vec<String> {
        let mut flags = Vec::new();

        match self.configuration.optimization_level {
            OptimizationLevel::None => flags.push("-O0".to_string()),
            OptimizationLevel::L1 => flags.push("-O1".to_string()),
            OptimizationLevel::L2 => flags.push("-O2".to_string()),
            OptimizationLevel::L3 => flags.push("-O3".to_string()),
            OptimizationLevel::Debug => flags.push("-Og".to_string()),
            OptimizationLevel::Size => flags.push("-Os".to_string()),
            OptimizationLevel::Fast => flags.push("-Ofast".to_string()),
            OptimizationLevel::CompilerDefault => {}
        }

        if self.configuration.debug_symbols {
            flags.push("-g".to_string());
        }

        for sanitizer in &self.configuration.sanitize {
            flags.push(format!("-fsanitize={}", sanitizer));
        }

        flags
    }

    /// Get linker flags contributed by the active configuration.
    pub fn profile_ldflags(&self) -> Vec<String> {
        let mut flags = Vec::new();

        if self.configuration.link_time_optimization {
            flags.push("-flto".to_string());
        }

        if self.configuration.strip_symbols {
            flags.push("-s".to_string());
        }

        for sanitizer in &self.configuration.sanitize {
            flags.push(format!("-fsanitize={}", sanitizer));
        }

        flags
    }

    /// Whether the active configuration is the `Release` preset.
    pub fn is_release(&self) -> bool {
        self.configuration.name.eq_ignore_ascii_case("release")
    }

    /// The host OS name.
    pub fn os(&self) -> &str {
        &self.host_os
    }

    /// The active toolchain.
    pub fn toolchain(&self) -> &dyn Toolchain {
        self.toolchain.as_ref()
    }
}

fn host_os() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else {
        "linux"
    }
}

fn host_arch() -> &'static str {
    std::env::consts::ARCH
}
