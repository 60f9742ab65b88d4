//! CLI definitions using clap (spec §1's route surface).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell as CompletionShell;

/// Message output format for every route (spec §6's JSON event stream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MessageFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// Machine-readable JSON output
    Json,
}

/// Crucible - a cross-platform native build orchestrator for C and C++.
#[derive(Parser)]
#[command(name = "crucible")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug/info)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Color output: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: String,

    /// Output format for routes that emit structured results
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub message_format: MessageFormat,

    /// Manifest file to use instead of discovering one
    #[arg(long, global = true, value_name = "PATH")]
    pub input_file: Option<PathBuf>,

    /// Settings file to use instead of the default local settings path
    #[arg(long, global = true, value_name = "PATH")]
    pub settings_file: Option<PathBuf>,

    /// Toolchain to use (gcc, msvc, apple-llvm, llvm, …)
    #[arg(long, global = true, value_name = "NAME")]
    pub toolchain: Option<String>,

    /// Build configuration to use (Debug, Release, …)
    #[arg(short = 'c', long = "configuration", global = true, value_name = "NAME")]
    pub configuration: Option<String>,

    /// Target architecture
    #[arg(long, global = true, value_name = "ARCH")]
    pub arch: Option<String>,

    /// Number of parallel compile jobs
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    /// Keep building other targets after one fails
    #[arg(short = 'k', long, global = true)]
    pub keep_going: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the workspace's targets
    Build(TargetArgs),

    /// Build, then run the produced executable
    Run(RunArgs),

    /// Remove the active configuration's build output
    Clean(TargetArgs),

    /// Clean, then build
    Rebuild(TargetArgs),

    /// Assemble distribution bundles
    Bundle(TargetArgs),

    /// Resolve the toolchain and fetch external dependencies
    Configure(TargetArgs),

    /// Emit `compile_commands.json`
    Export(TargetArgs),

    /// Print workspace/target/configuration/distribution metadata
    Query(TargetArgs),

    /// Check manifest invariants without building
    Validate(TargetArgs),

    /// Check toolchain resolution and manifest validity
    Check(TargetArgs),

    /// Read a settings value
    SettingsGet(SettingsGetArgs),

    /// Write a settings value
    SettingsSet(SettingsSetArgs),

    /// Remove a settings value
    SettingsUnset(SettingsUnsetArgs),

    /// Scaffold a new workspace manifest
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Default)]
pub struct TargetArgs {
    /// Specific target(s) to operate on (defaults to all)
    pub targets: Vec<String>,

    /// Disable `compile_commands.json` generation for this build
    #[arg(long)]
    pub no_compile_commands: bool,
}

#[derive(Args)]
pub struct RunArgs {
    /// Target to run (defaults to the workspace's sole executable)
    pub target: Option<String>,

    /// Run the existing build output without rebuilding first
    #[arg(long)]
    pub no_build: bool,

    /// Arguments forwarded to the executable
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct SettingsGetArgs {
    /// Dotted settings key, e.g. `settings.defaultConfiguration`
    pub key: String,
}

#[derive(Args)]
pub struct SettingsSetArgs {
    /// Dotted settings key, e.g. `toolchains.gcc.strategy`
    pub key: String,

    /// Value to set (parsed as JSON when possible, else a plain string)
    pub value: String,
}

#[derive(Args)]
pub struct SettingsUnsetArgs {
    /// Dotted settings key to remove
    pub key: String,
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (defaults to the current directory)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
