//! Crucible - a cross-platform native build orchestrator for C and C++
//!
//! This crate provides the core library functionality for Crucible,
//! including manifest parsing, toolchain resolution, source discovery,
//! external-dependency fetching, and build execution.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities and mocks for Crucible unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides mock implementations for filesystem,
/// process execution, and HTTP operations.
#[cfg(test)]
pub mod test_support;

pub use core::{
    CommandLineInputs, DistributionTarget, ExternalDependency, Manifest, Route, SourceGroup,
    SourceOutputs, SourceTarget, Target,
};

pub use util::context::GlobalContext;
