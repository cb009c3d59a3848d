use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use mg_cfg::ConfigSet;
use mg_core::emit::{ModelEmitter, TomlEmitter};
use mg_core::listing::DiskListing;
use mg_core::{Engine, EngineConfig};
use mg_target::{DevEnv, EnvironmentProbe, StaticProbe, TargetPattern};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mg", version, about = "Resolves build configurations for a matrix of targets")]
struct Cli {
    /// Root directory of the workspace.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Override a generator setting, e.g. `--set resolve_threads=4`.
    #[arg(long = "set", global = true, value_name = "KEY=VALUE", value_parser = parse_setting)]
    settings: Vec<(String, String)>,
    /// Skip probing the host and treat these environments as installed.
    #[arg(long, global = true, value_delimiter = ',')]
    assume_installed: Vec<String>,
    /// Environments that also ship Clang, implies `--assume-installed`.
    #[arg(long, global = true, value_delimiter = ',')]
    assume_clang: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve and emit every solution of a mode.
    Generate {
        /// e.g. `all`, `server` or `samples`.
        #[arg(default_value = "all")]
        mode: String,
        /// Resolve everything but don't write any files.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the targets of the workspace.
    Targets,
    /// Print the folder layout of a solution.
    Show { solution: String },
    /// Print the generator settings.
    Settings,
}

fn parse_setting(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(!mg_ore::env::is_truthy("NO_COLOR"))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), anyhow::Error> {
    let mut builder = ConfigSet::builder();
    mg_core::cfgs::all_cfgs(&mut builder);

    let engine = Engine::new(EngineConfig {
        workspace_dir: cli.root,
        configs: builder.build(),
        overrides: cli.settings,
        listing: Arc::new(DiskListing),
        probe: static_probe(&cli.assume_installed, &cli.assume_clang)?,
    })?;

    match cli.command {
        Command::Generate { mode, dry_run } => {
            let spinner = spinner(format!("resolving '{mode}'"))?;
            let model = engine.generate(&mode);
            spinner.finish_and_clear();
            let model = model?;

            if dry_run {
                for solution in model.solutions() {
                    println!("{} ({} configurations)", solution.name, solution.configurations.len());
                }
                return Ok(());
            }
            for path in TomlEmitter::new(engine.emit_dir()).emit(&model)? {
                println!("{}", path.display());
            }
        }
        Command::Targets => {
            for target in engine.workspace().matrix().targets() {
                println!("{target}");
            }
        }
        Command::Show { solution } => {
            let model = engine.generate_solutions(&[engine.workspace().solution(&solution)?])?;
            let resolved = model
                .solution(&solution)
                .ok_or_else(|| anyhow::anyhow!("solution '{solution}' was not resolved"))?;
            for conf in &resolved.configurations {
                let label = format!("{} [{}]", conf.file_name, conf.name);
                println!("{}", conf.folder_tree(&label));
            }
        }
        Command::Settings => print!("{}", engine.configs()),
    }

    Ok(())
}

/// A [`StaticProbe`] when any environment was assumed on the command line.
fn static_probe(
    installed: &[String],
    clang: &[String],
) -> Result<Option<Arc<dyn EnvironmentProbe>>, anyhow::Error> {
    if installed.is_empty() && clang.is_empty() {
        return Ok(None);
    }
    let parse = |labels: &[String]| -> Result<DevEnv, anyhow::Error> {
        if labels.is_empty() {
            return Ok(DevEnv::empty());
        }
        Ok(TargetPattern::parse_dimension::<DevEnv, _>(labels)?)
    };
    let clang = parse(clang)?;
    let installed = parse(installed)? | clang;
    tracing::debug!(?installed, ?clang, "using static environment probe");
    Ok(Some(Arc::new(StaticProbe::new(installed, clang))))
}

fn spinner(message: String) -> Result<ProgressBar, anyhow::Error> {
    if !std::io::stderr().is_terminal() {
        return Ok(ProgressBar::hidden());
    }
    let spinner = ProgressBar::new_spinner().with_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")?
            .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"]),
    );
    Ok(spinner)
}
