//! Core data model: the typed representation of a workspace manifest and
//! the frozen user intent that drives a build.

pub mod command_line;
pub mod condition;
pub mod dependency;
pub mod distribution;
pub mod manifest;
pub mod source_group;
pub mod target;
pub mod variables;
pub mod workspace;

pub use command_line::{CommandLineInputs, Route};
pub use dependency::ExternalDependency;
pub use distribution::DistributionTarget;
pub use manifest::{find_manifest, Manifest, ManifestDiscoveryError};
pub use source_group::{SourceGroup, SourceGroupKind, SourceOutputs};
pub use target::{SourceTarget, Target};
pub use workspace::{BuildConfiguration, WorkspaceEnvironment};
