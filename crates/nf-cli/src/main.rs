use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nf_core::{Field, FieldConfig, FieldSnapshot, MeasuredResonance, ResonanceCalculator};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "nf", about = "Neural field engine CLI")]
struct Cli {
    /// TOML file with field parameters (falls back to NF_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    /// Override decay_rate
    #[arg(long, global = true)]
    decay_rate: Option<f64>,

    /// Override boundary_permeability
    #[arg(long, global = true)]
    permeability: Option<f64>,

    /// Override resonance_bandwidth
    #[arg(long, global = true)]
    bandwidth: Option<f64>,

    /// Override attractor_threshold
    #[arg(long, global = true)]
    threshold: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inject each non-empty line of a file (or stdin) and print the field
    Run {
        /// Input file; reads stdin when omitted
        file: Option<PathBuf>,

        /// Strength for every injected line
        #[arg(long, default_value_t = 1.0)]
        strength: f64,

        /// Decay after every N injected lines (0 never decays)
        #[arg(long, default_value_t = 1)]
        decay_every: usize,

        /// Print the field snapshot and metrics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print field-internal and measured resonance between two texts
    Resonance { a: String, b: String },
}

#[derive(Serialize)]
struct RunReport {
    field: FieldSnapshot,
    metrics: BTreeMap<String, f64>,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    match &cli.command {
        Commands::Run {
            file,
            strength,
            decay_every,
            json,
        } => cmd_run(config, file.as_deref(), *strength, *decay_every, *json),
        Commands::Resonance { a, b } => cmd_resonance(&config, a, b),
    }
}

/// File parameters first, then command-line overrides.
fn load_config(cli: &Cli) -> Result<FieldConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os("NF_CONFIG").map(PathBuf::from));

    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            toml::from_str::<FieldConfig>(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => FieldConfig::default(),
    };

    if let Some(v) = cli.decay_rate {
        config.decay_rate = v;
    }
    if let Some(v) = cli.permeability {
        config.boundary_permeability = v;
    }
    if let Some(v) = cli.bandwidth {
        config.resonance_bandwidth = v;
    }
    if let Some(v) = cli.threshold {
        config.attractor_threshold = v;
    }
    config.validate().context("invalid field configuration")?;
    tracing::debug!(?config, "field configuration loaded");
    Ok(config)
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn cmd_run(
    config: FieldConfig,
    file: Option<&Path>,
    strength: f64,
    decay_every: usize,
    json: bool,
) -> Result<()> {
    let input = read_input(file)?;
    let mut field = Field::with_config(config)?;

    let mut injected = 0usize;
    for line in input.lines().map(str::trim).filter(|l| !l.is_empty()) {
        field.inject(line, strength);
        injected += 1;
        if decay_every > 0 && injected % decay_every == 0 {
            field.decay();
        }
    }
    tracing::info!(injected, cycles = field.cycle(), "run complete");

    if json {
        let report = RunReport {
            metrics: field.get_field_metrics(),
            field: field.snapshot(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", field.get_context_representation());
    }
    Ok(())
}

fn cmd_resonance(config: &FieldConfig, a: &str, b: &str) -> Result<()> {
    let calculator = ResonanceCalculator::from_config(config);
    let measured = MeasuredResonance::from_config(config, calculator.clone());
    println!("resonance: {:.4}", calculator.resonance(a, b));
    println!("measured:  {:.4}", measured.measure(a, b));
    Ok(())
}
