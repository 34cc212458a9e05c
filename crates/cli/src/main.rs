// belcheck CLI - BEL reserve reconciliation from the command line

mod compare;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use belcheck_recon::ReconError;
use exit_codes::{recon_exit_code, EXIT_LOAD, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "belcheck")]
#[command(about = "Reconcile BEL reserves between two valuation engines")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); BELCHECK_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare subject BEL values against reference values attached by row position
    #[command(after_help = "\
Reads the reference and subject datasets, attaches the value list to the
reference rows in order, joins on the composite key and writes one row per
subject record with a BEL value.

Examples:
  belcheck compare innolinc.csv pathwise.csv --values bel.txt
  belcheck compare innolinc.csv pathwise.csv --values - --view differences < bel.txt
  belcheck compare innolinc.csv pathwise.csv --values bel.txt --start 0 --end 999 --out json")]
    Compare {
        /// Reference dataset (key columns, one row per attached value)
        reference: PathBuf,

        /// Subject dataset (key columns plus its own BEL column)
        subject: PathBuf,

        /// Value list, one number per line (file path, or - for stdin)
        #[arg(long)]
        values: String,

        /// First reference row to compare (0-indexed, inclusive)
        #[arg(long, default_value = "0")]
        start: usize,

        /// Last reference row to compare (inclusive; clamped to the dataset)
        #[arg(long)]
        end: Option<usize>,

        /// Rows to export
        #[arg(long)]
        view: Option<ViewArg>,

        /// Absolute DIFF tolerance, between 0.000001 and 1
        #[arg(long)]
        tolerance: Option<f64>,

        /// Drop rows without a DIFF from the export and the error count
        #[arg(long)]
        exclude_missing: bool,

        /// Value count vs. reference row count handling
        #[arg(long)]
        count_policy: Option<CountPolicyArg>,

        /// Output format
        #[arg(long, default_value = "csv")]
        out: OutputFormat,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Configuration file (default: <config dir>/belcheck/config.toml)
        #[arg(long, env = "BELCHECK_CONFIG")]
        config: Option<PathBuf>,

        /// Field delimiter for both datasets (sniffed when omitted)
        #[arg(long)]
        delimiter: Option<char>,

        /// Quiet mode - suppress the stderr summary
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Check required columns and the value count without comparing
    #[command(after_help = "\
Examples:
  belcheck validate innolinc.csv pathwise.csv
  belcheck validate innolinc.csv pathwise.csv --values bel.txt")]
    Validate {
        /// Reference dataset
        reference: PathBuf,

        /// Subject dataset
        subject: PathBuf,

        /// Value list to count against the reference rows (file path, or - for stdin)
        #[arg(long)]
        values: Option<String>,

        /// Configuration file (default: <config dir>/belcheck/config.toml)
        #[arg(long, env = "BELCHECK_CONFIG")]
        config: Option<PathBuf>,

        /// Field delimiter for both datasets (sniffed when omitted)
        #[arg(long)]
        delimiter: Option<char>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ViewArg {
    All,
    Differences,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CountPolicyArg {
    Strict,
    Lenient,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  belcheck-recon ", env!("CARGO_PKG_VERSION"),
    )
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env = env_logger::Env::new().filter_or("BELCHECK_LOG", default);
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compare {
            reference,
            subject,
            values,
            start,
            end,
            view,
            tolerance,
            exclude_missing,
            count_policy,
            out,
            output,
            config,
            delimiter,
            quiet,
        } => compare::cmd_compare(compare::CompareArgs {
            reference,
            subject,
            values,
            start,
            end,
            view,
            tolerance,
            exclude_missing,
            count_policy,
            out,
            output,
            config,
            delimiter,
            quiet,
        }),
        Commands::Validate { reference, subject, values, config, delimiter } => {
            compare::cmd_validate(reference, subject, values, config, delimiter)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self { code: EXIT_LOAD, message: msg.into(), hint: None }
    }

    /// Engine error with its category's exit code and a hint where one helps.
    pub fn recon(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingColumns { .. } => {
                Some("column names are matched case-insensitively; check the header row".to_string())
            }
            ReconError::ValueCountMismatch { .. } => Some(
                "paste one value per reference row, narrow --start/--end, or use --count-policy lenient"
                    .to_string(),
            ),
            ReconError::InvalidValues(_) => {
                Some("the value list needs one number per line; header lines are skipped".to_string())
            }
            ReconError::InvalidTolerance(_) => Some("use a tolerance between 0.000001 and 1".to_string()),
            ReconError::KeyTypeMismatch { .. } => {
                Some("a key column holds numbers in one file and text in the other".to_string())
            }
            _ => None,
        };
        Self { code: recon_exit_code(err.category()), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
