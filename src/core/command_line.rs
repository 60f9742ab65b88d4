//! `CommandLineInputs` — the frozen user intent, created once at startup
//! from CLI flags and immutable thereafter (spec §3).

use std::path::PathBuf;

/// The route selected on the command line. The CLI parser (out of scope
/// per spec §1) is responsible for producing one of these; the Build
/// Manager dispatches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Build,
    BuildRun,
    Run,
    Clean,
    Rebuild,
    Bundle,
    Configure,
    Export,
    Query,
    Validate,
    SettingsGet,
    SettingsSet,
    SettingsUnset,
    Init,
    Check,
}

#[derive(Debug, Clone)]
pub struct CommandLineInputs {
    pub route: Route,
    pub input_file: Option<PathBuf>,
    pub settings_file: Option<PathBuf>,
    pub working_directory: PathBuf,
    pub toolchain_preference: Option<String>,
    pub architecture_preference: Option<String>,
    pub build_configuration: Option<String>,
    pub target_selection: Vec<String>,
    pub run_arguments: Vec<String>,
    pub max_jobs: Option<usize>,
    pub quiet: bool,
    pub verbose: bool,
    pub keep_going: bool,
    pub dump_assembly: bool,
    pub generate_compile_commands: bool,
}

impl CommandLineInputs {
    pub fn new(route: Route, working_directory: PathBuf) -> Self {
        CommandLineInputs {
            route,
            input_file: None,
            settings_file: None,
            working_directory,
            toolchain_preference: None,
            architecture_preference: None,
            build_configuration: None,
            target_selection: Vec::new(),
            run_arguments: Vec::new(),
            max_jobs: None,
            quiet: false,
            verbose: false,
            keep_going: false,
            dump_assembly: false,
            generate_compile_commands: true,
        }
    }

    pub fn jobs_or_default(&self) -> usize {
        self.max_jobs
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}
