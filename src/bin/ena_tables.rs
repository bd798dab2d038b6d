use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{CommandFactory, Parser};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use ena_tables::app::App;
use ena_tables::config::{ConfigLoader, DEFAULT_RESULTS_ROOT};
use ena_tables::domain::Mode;
use ena_tables::ena::EnaHttpClient;
use ena_tables::error::EnaError;
use ena_tables::output::{JsonOutput, OutputMode, TextOutput};
use ena_tables::store::Store;

#[derive(Parser)]
#[command(name = "ena-tables")]
#[command(about = "Build per-strain run tables from ENA read_run metadata")]
#[command(version, author)]
struct Cli {
    /// get_gvcf or merge_gvcf
    mode: Option<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long, default_value = DEFAULT_RESULTS_ROOT)]
    results_root: Utf8PathBuf,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<EnaError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &EnaError) -> u8 {
    match error {
        EnaError::InvalidMode(_)
        | EnaError::InvalidAccession(_)
        | EnaError::MissingConfig
        | EnaError::ConfigRead(_)
        | EnaError::ConfigParse(_)
        | EnaError::EmptyAccessionList(_) => 2,
        EnaError::EnaHttp(_) | EnaError::EnaStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(mode) = cli.mode.as_deref() else {
        Cli::command().print_help().into_diagnostic()?;
        println!();
        return Ok(());
    };
    let mode: Mode = mode.parse()?;
    let config = ConfigLoader::resolve(cli.config.as_deref(), mode, &cli.results_root)?;
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let ena = EnaHttpClient::new()?;
    let app = App::new(Store::new(config.results_dir.clone()), ena);

    match output_mode {
        OutputMode::Json => {
            let result = app.run(&config, &JsonOutput)?;
            JsonOutput::print_result(&result).into_diagnostic()?;
        }
        OutputMode::Text => {
            let result = app.run(&config, &TextOutput)?;
            TextOutput::print_result(&result).into_diagnostic()?;
        }
    }
    Ok(())
}
