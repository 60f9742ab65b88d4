//! C build system.
//!
//! This module implements the native C compiler driver and build planning.

pub mod context;
pub mod native;
pub mod plan;
pub mod source_cache;
pub mod strategy;
pub mod toolchain;
pub mod util;

pub use context::BuildContext;
pub use native::NativeBuilder;
pub use plan::{write_compile_commands, Artifact, BuildPlan, BuildStep};
pub use strategy::{CompileStrategy, StrategyKind};
pub use toolchain::{
    detect_toolchain, CommandSpec, GccToolchain, MsvcToolchain, Toolchain, ToolchainPlatform,
};
