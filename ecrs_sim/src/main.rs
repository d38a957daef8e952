//! ECRS campaign launcher CLI
//!
//! Bootstraps one job of a cosmic-ray transport campaign: picks its random
//! stream, wires the collaborators and runs either an interactive session or
//! a macro script.

use clap::Parser;
use ecrs_core::{
    Bootstrap, BootstrapConfig, BootstrapError, BootstrapOutcome, LaunchPlan, OutputChannel, Toolkit,
};
use ecrs_env::{ClockEntropy, EntropySource};
use ecrs_sim::{BootstrapReport, SeededEntropy, StandInToolkit};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// ECRS campaign bootstrap
#[derive(Parser, Debug)]
#[command(name = "ecrs-sim")]
#[command(about = "Bootstrap one job of an ECRS cosmic-ray campaign", long_about = None)]
struct Args {
    /// Legacy form: [JOB_INDEX [MACRO]]
    #[arg(value_name = "ARGS")]
    positional: Vec<String>,
    
    /// Job index into the seed table (0-9999)
    #[arg(short, long)]
    job: Option<i64>,
    
    /// Macro script to execute in batch mode
    #[arg(short = 'm', long = "macro", value_name = "PATH")]
    script: Option<PathBuf>,
    
    /// Campaign configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
    
    /// Seed table resource
    #[arg(long)]
    seed_table: Option<PathBuf>,
    
    /// Output file
    #[arg(short, long)]
    output: Option<PathBuf>,
    
    /// Append to the output file instead of truncating it
    #[arg(long)]
    append: bool,
    
    /// Start the interactive session after a batch macro
    #[arg(long)]
    keep_session: bool,
    
    /// Seed the entropy source instead of using the wall clock
    #[arg(long)]
    entropy_seed: Option<u64>,
    
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
    
    /// JSON report on stdout
    #[arg(long)]
    json: bool,
    
    /// Write the JSON report to a file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else if args.json {
        Level::WARN
    } else {
        Level::INFO
    };
    
    let builder = FmtSubscriber::builder().with_writer(std::io::stderr);
    let result = match std::env::var("RUST_LOG") {
        Ok(_) => tracing::subscriber::set_global_default(
            builder.with_env_filter(EnvFilter::from_default_env()).finish(),
        ),
        Err(_) => tracing::subscriber::set_global_default(builder.with_max_level(level).finish()),
    };
    result.expect("Failed to set tracing subscriber");
}

fn load_config(args: &Args) -> Result<BootstrapConfig, BootstrapError> {
    let mut config = match &args.config {
        Some(path) => BootstrapConfig::from_json_file(path)?,
        None => BootstrapConfig::default(),
    };
    
    if let Some(path) = &args.seed_table {
        config.seed_table_path = path.clone();
    }
    if let Some(path) = &args.output {
        config.output_path = path.clone();
    }
    config.output_append |= args.append;
    config.keep_session_in_batch |= args.keep_session;
    Ok(config)
}

/// Output path a report should record: `--output`, else the config file's,
/// else the default.
fn resolved_output_path(args: &Args) -> PathBuf {
    load_config(args)
        .map(|config| config.output_path)
        .unwrap_or_else(|_| {
            args.output
                .clone()
                .unwrap_or_else(|| PathBuf::from(ecrs_core::output::DEFAULT_OUTPUT))
        })
}

/// True for errors that must leave no trace on disk.
fn before_any_resource(err: &BootstrapError) -> bool {
    matches!(err, BootstrapError::Usage(_) | BootstrapError::Index { .. })
}

fn emit(args: &Args, report: &BootstrapReport, write_file: bool) {
    if !(args.json || args.report.is_some()) {
        return;
    }
    match report.to_json() {
        Ok(json) if args.json => println!("{}", json),
        Ok(_) => {}
        Err(e) => error!("Failed to encode report: {}", e),
    }
    if !write_file {
        return;
    }
    if let Some(path) = &args.report {
        if let Err(e) = report.write_to_file(path) {
            error!("Failed to write report {}: {}", path.display(), e);
        }
    }
}

/// Resolves the launch plan, then the configuration, then runs the bootstrap.
///
/// Usage and index errors return before the configuration is read or the
/// output channel is touched.
fn launch<T: Toolkit>(
    args: &Args,
    output: Arc<OutputChannel>,
    toolkit: &mut T,
    entropy: &mut dyn EntropySource,
) -> Result<BootstrapOutcome, BootstrapError> {
    let plan = LaunchPlan::resolve(&args.positional, args.job, args.script.clone())?;
    let config = load_config(args)?;
    Bootstrap::new(config, output).run(&plan, toolkit, entropy)
}

fn main() {
    let args = Args::parse();
    init_logging(&args);
    
    info!("ECRS campaign bootstrap v{}", env!("CARGO_PKG_VERSION"));
    
    let mut entropy: Box<dyn EntropySource> = match args.entropy_seed {
        Some(seed) => Box::new(SeededEntropy::new(seed)),
        None => Box::new(ClockEntropy::new()),
    };
    let mut toolkit = StandInToolkit::stdio();
    
    match launch(&args, OutputChannel::instance(), &mut toolkit, entropy.as_mut()) {
        Ok(outcome) => {
            info!(
                "✓ run {} finished (seed_index={}, seeds=[{}, {}])",
                outcome.run_id,
                outcome.seed_state.seed_index,
                outcome.seed_state.seeds[0],
                outcome.seed_state.seeds[1]
            );
            let report = BootstrapReport::from_outcome(&outcome, &resolved_output_path(&args));
            emit(&args, &report, true);
        }
        Err(e) => {
            error!("✗ bootstrap failed: {}", e);
            if !args.json {
                eprintln!("Error: {}", e);
            }
            let report = BootstrapReport::from_error(&e, &resolved_output_path(&args));
            emit(&args, &report, !before_any_resource(&e));
            std::process::exit(e.exit_code());
        }
    }
}
