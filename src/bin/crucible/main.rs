//! Crucible CLI - a cross-platform native build orchestrator for C and C++.

use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands, MessageFormat, TargetArgs};
use crucible::core::command_line::{CommandLineInputs, Route};
use crucible::ops;
use crucible::util::context::GlobalContext;
use crucible::util::shell::{ColorChoice, Shell};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("crucible=debug")
    } else {
        EnvFilter::new("crucible=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).without_time().init();

    let color: ColorChoice = cli.color.parse().unwrap_or_default();
    let shell = Shell::from_flags(cli.quiet, cli.verbose, color, cli.message_format == MessageFormat::Json);

    match run(cli, &shell) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            shell.error(format!("{:#}", err));
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli, shell: &Shell) -> Result<i32> {
    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    ctx.set_color(!matches!(cli.color.parse::<ColorChoice>().unwrap_or_default(), ColorChoice::Never));

    match cli.command {
        Commands::Build(args) => {
            let inputs = base_inputs(Route::Build, &cli, &args);
            ops::build(&ctx, &inputs, shell)?;
            Ok(0)
        }
        Commands::Run(args) => {
            let route = if args.no_build { Route::Run } else { Route::BuildRun };
            let mut inputs = base_inputs(route, &cli, &TargetArgs::default());
            if let Some(target) = &args.target {
                inputs.target_selection = vec![target.clone()];
            }
            inputs.run_arguments = args.args.clone();
            if args.no_build {
                ops::run::run_only(&ctx, &inputs, shell)
            } else {
                ops::run::run(&ctx, &inputs, shell)
            }
        }
        Commands::Clean(args) => {
            let inputs = base_inputs(Route::Clean, &cli, &args);
            ops::clean(&ctx, &inputs, shell)?;
            Ok(0)
        }
        Commands::Rebuild(args) => {
            let inputs = base_inputs(Route::Rebuild, &cli, &args);
            ops::rebuild(&ctx, &inputs, shell)?;
            Ok(0)
        }
        Commands::Bundle(args) => {
            let inputs = base_inputs(Route::Bundle, &cli, &args);
            ops::bundle(&ctx, &inputs, shell)?;
            Ok(0)
        }
        Commands::Configure(args) => {
            let inputs = base_inputs(Route::Configure, &cli, &args);
            ops::configure(&ctx, &inputs, shell)?;
            Ok(0)
        }
        Commands::Export(args) => {
            let inputs = base_inputs(Route::Export, &cli, &args);
            ops::export(&ctx, &inputs, shell)?;
            Ok(0)
        }
        Commands::Query(args) => {
            let inputs = base_inputs(Route::Query, &cli, &args);
            ops::query(&ctx, &inputs, shell)?;
            Ok(0)
        }
        Commands::Validate(args) => {
            let inputs = base_inputs(Route::Validate, &cli, &args);
            ops::validate(&ctx, &inputs, shell)?;
            Ok(0)
        }
        Commands::Check(args) => {
            let inputs = base_inputs(Route::Check, &cli, &args);
            ops::check(&ctx, &inputs, shell)?;
            Ok(0)
        }
        Commands::SettingsGet(args) => {
            let inputs = base_inputs(Route::SettingsGet, &cli, &TargetArgs::default());
            ops::settings::get(&ctx, &inputs, &args.key, shell)?;
            Ok(0)
        }
        Commands::SettingsSet(args) => {
            let inputs = base_inputs(Route::SettingsSet, &cli, &TargetArgs::default());
            ops::settings::set(&ctx, &inputs, &args.key, &args.value, shell)?;
            Ok(0)
        }
        Commands::SettingsUnset(args) => {
            let inputs = base_inputs(Route::SettingsUnset, &cli, &TargetArgs::default());
            ops::settings::unset(&ctx, &inputs, &args.key, shell)?;
            Ok(0)
        }
        Commands::Init(args) => {
            let mut inputs = base_inputs(Route::Init, &cli, &TargetArgs::default());
            if let Some(path) = &args.path {
                inputs.working_directory = path.clone();
            }
            ops::init(&ctx, &inputs, shell)?;
            Ok(0)
        }
        Commands::Completions(args) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(args.shell, &mut cmd, name, &mut std::io::stdout());
            Ok(0)
        }
    }
}

fn base_inputs(route: Route, cli: &Cli, args: &TargetArgs) -> CommandLineInputs {
    let mut inputs = CommandLineInputs::new(route, std::env::current_dir().unwrap_or_default());
    inputs.input_file = cli.input_file.clone();
    inputs.settings_file = cli.settings_file.clone();
    inputs.toolchain_preference = cli.toolchain.clone();
    inputs.architecture_preference = cli.arch.clone();
    inputs.build_configuration = cli.configuration.clone();
    inputs.target_selection = args.targets.clone();
    inputs.max_jobs = cli.jobs;
    inputs.quiet = cli.quiet;
    inputs.verbose = cli.verbose;
    inputs.keep_going = cli.keep_going;
    inputs.generate_compile_commands = !args.no_compile_commands;
    inputs
}
