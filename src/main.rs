// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use licompat::engine::CompatConfig;
use licompat::report::{render_report, Report, ReportFormat};
use licompat::{CompatEngine, ErrorKind, LicompatError};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "licompat")]
#[command(author, version, about = "License expression compatibility checker", long_about = None)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Configuration file (default: .licompat.toml or licompat.toml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Compatibility matrix CSV
    #[arg(long, global = true)]
    matrix: Option<PathBuf>,

    /// License alias JSON file
    #[arg(long, global = true)]
    alias_file: Option<PathBuf>,

    /// Relicense ("or later") JSON file
    #[arg(long, global = true)]
    relicense_file: Option<PathBuf>,

    /// Policy TOML file with allowlist/avoidlist/denylist
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// License preference JSON file
    #[arg(long, global = true)]
    preferences: Option<PathBuf>,

    /// Preferred outbound license (repeatable, best first)
    #[arg(long = "prefer", global = true)]
    prefer: Vec<String>,

    /// Try every supported license as an outbound candidate
    #[arg(short, long, global = true)]
    extended: bool,

    /// Do not expand "or later" licenses
    #[arg(long, global = true)]
    no_relicense: bool,

    /// Maximum number of license combinations to enumerate
    #[arg(long, global = true)]
    threshold: Option<u64>,

    /// Verbose logging (every matrix lookup)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simplify a license expression
    Simplify {
        /// License expression (may span several arguments)
        #[arg(required = true)]
        expression: Vec<String>,
    },
    /// List supported licenses
    List {
        /// List license aliases instead
        #[arg(long)]
        aliases: bool,
    },
    /// Expand an expression into its license combinations
    Expand {
        #[arg(required = true)]
        expression: Vec<String>,
    },
    /// Check an outbound license expression against an inbound expression
    Verify {
        /// Outbound license expression
        #[arg(short, long, required = true, num_args = 1..)]
        outbound: Vec<String>,
        /// Inbound license expression
        #[arg(short, long, required = true, num_args = 1..)]
        inbound: Vec<String>,
    },
    /// Verify a project manifest (JSON dependency tree)
    VerifyProject {
        /// Path to the project file
        project: PathBuf,
    },
    /// Suggest outbound licenses for an inbound expression
    SuggestOutbound {
        #[arg(required = true)]
        expression: Vec<String>,
    },
    /// Look up one outbound/inbound pair in the matrix
    Check {
        outbound: String,
        inbound: String,
    },
    /// Show pairwise compatibility between licenses (all supported when none given)
    DisplayCompatibility { licenses: Vec<String> },
    /// Classify the outbound candidates of an expression by policy
    PolicyReport {
        #[arg(required = true)]
        expression: Vec<String>,
    },
}

impl Cli {
    fn engine_config(&self) -> licompat::LicompatResult<CompatConfig> {
        let mut config = match &self.config {
            Some(path) => CompatConfig::from_file(path)?,
            None => CompatConfig::from_project_root(&std::env::current_dir()?),
        };
        if self.matrix.is_some() {
            config.matrix_file = self.matrix.clone();
        }
        if self.alias_file.is_some() {
            config.alias_file = self.alias_file.clone();
        }
        if self.relicense_file.is_some() {
            config.relicense_file = self.relicense_file.clone();
        }
        if self.policy.is_some() {
            config.policy_file = self.policy.clone();
        }
        if self.preferences.is_some() {
            config.preferences_file = self.preferences.clone();
        }
        if !self.prefer.is_empty() {
            config.license_preferences = self.prefer.clone();
        }
        if let Some(threshold) = self.threshold {
            config.combination_threshold = threshold;
        }
        config.extended_licenses |= self.extended;
        config.relicense &= !self.no_relicense;
        config.trace_lookups |= self.verbose;
        Ok(config)
    }
}

fn run(cli: Cli) -> Result<()> {
    let engine = CompatEngine::new(cli.engine_config()?)?;
    let mut diag = engine.diagnostics();

    let report = match cli.command {
        Commands::Simplify { expression } => Report::Simplified(engine.simplify(&expression)?),
        Commands::List { aliases: true } => Report::Aliases(engine.aliases().entries()),
        Commands::List { aliases: false } => Report::Licenses(engine.supported_licenses()),
        Commands::Expand { expression } => Report::Expansion(engine.expand(&expression)?),
        Commands::Verify { outbound, inbound } => {
            Report::Compatibility(engine.verify(&outbound, &inbound, &mut diag)?)
        }
        Commands::VerifyProject { project } => {
            info!("Verifying project: {}", project.display());
            Report::Project(engine.verify_project_file(&project, &mut diag)?)
        }
        Commands::SuggestOutbound { expression } => {
            Report::Outbound(engine.suggest_outbound(&expression, &mut diag)?)
        }
        Commands::Check { outbound, inbound } => {
            Report::Pair(engine.check_pair(&outbound, &inbound)?)
        }
        Commands::DisplayCompatibility { licenses } => {
            Report::Table(engine.compatibility_table(&licenses)?)
        }
        Commands::PolicyReport { expression } => {
            Report::Policy(engine.policy_report(&expression, &mut diag)?)
        }
    };

    print!("{}", render_report(&report, cli.format)?);
    Ok(())
}

fn main() {
    let command = Cli::command().after_help(ErrorKind::help_table());
    let cli = match Cli::from_arg_matches(&command.get_matches()) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        let code = match e.downcast_ref::<LicompatError>() {
            Some(err) => err.exit_code(),
            None => ErrorKind::InternalError.exit_code(),
        };
        eprintln!("licompat: {}", e);
        std::process::exit(code);
    }
}
