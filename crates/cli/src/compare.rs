//! `belcheck compare` and `belcheck validate`.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use belcheck_io::dataset::{decode_bytes, load_dataset, load_dataset_with_delimiter, read_file_as_utf8};
use belcheck_io::export::{export_to_path, write_view};
use belcheck_io::{ExportFormat, LoadError};
use belcheck_recon::config::CountPolicy;
use belcheck_recon::schema::{align_values, SchemaValidator};
use belcheck_recon::values::parse_value_list;
use belcheck_recon::{Dataset, LogProgress, ReconConfig, ReconciliationSession, RowRange, ViewMode};

use crate::exit_codes::{EXIT_CONFIG, EXIT_ERRORS_FOUND, EXIT_PROCESSING, EXIT_SUCCESS};
use crate::{CliError, CountPolicyArg, OutputFormat, ViewArg};

/// Progress is logged every this many output rows.
const PROGRESS_EVERY: usize = 10_000;

pub struct CompareArgs {
    pub reference: PathBuf,
    pub subject: PathBuf,
    pub values: String,
    pub start: usize,
    pub end: Option<usize>,
    pub view: Option<ViewArg>,
    pub tolerance: Option<f64>,
    pub exclude_missing: bool,
    pub count_policy: Option<CountPolicyArg>,
    pub out: OutputFormat,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub delimiter: Option<char>,
    pub quiet: bool,
}

// ============================================================================
// compare
// ============================================================================

pub fn cmd_compare(args: CompareArgs) -> Result<u8, CliError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(policy) = args.count_policy {
        config.values.count_policy = match policy {
            CountPolicyArg::Strict => CountPolicy::Strict,
            CountPolicyArg::Lenient => CountPolicy::Lenient,
        };
    }

    // flags override the configured view
    let mut options = config.view.options();
    if let Some(view) = args.view {
        options.mode = match view {
            ViewArg::All => ViewMode::All,
            ViewArg::Differences => ViewMode::Differences,
        };
    }
    if let Some(tolerance) = args.tolerance {
        options.tolerance = tolerance;
    }
    options.exclude_missing |= args.exclude_missing;
    options.validate().map_err(CliError::recon)?;

    let delimiter = delimiter_byte(args.delimiter)?;
    let reference = load(&args.reference, delimiter)?;
    let subject = load(&args.subject, delimiter)?;
    let value_text = read_values(&args.values)?;

    let columns = config.columns.clone();
    let mut session = ReconciliationSession::new(config);
    let range = RowRange::new(args.start, args.end);
    let table = session
        .run_comparison(&reference, &subject, &value_text, Some(range), &mut LogProgress::new(PROGRESS_EVERY))
        .map_err(CliError::recon)?;

    let Some(view) = session.apply_view(&options).map_err(CliError::recon)? else {
        return Err(CliError {
            code: EXIT_PROCESSING,
            message: "comparison produced no result".to_string(),
            hint: None,
        });
    };

    let format = match args.out {
        OutputFormat::Csv => ExportFormat::Csv,
        OutputFormat::Json => ExportFormat::Json,
    };
    match &args.output {
        Some(path) => export_to_path(view, &columns, format, path).map_err(CliError::load)?,
        None => write_view(view, &columns, format, io::stdout().lock()).map_err(CliError::load)?,
    }

    if !args.quiet {
        let s = &view.summary;
        eprintln!("reference: {} rows ({})", reference.len(), args.reference.display());
        if table.reference_rows != reference.len() {
            eprintln!(
                "compared:  {} reference rows from row {}",
                table.reference_rows, table.index_offset
            );
        }
        eprintln!("subject:   {} rows ({})", subject.len(), args.subject.display());
        eprintln!("rows:      {}", s.total_rows);
        eprintln!("view:      {} rows ({})", s.view_rows, options.mode);
        eprintln!("missing:   {}", s.missing_rows);
        if let Some(max) = s.max_abs_diff {
            eprintln!("max |diff|: {:.6}", max);
        }
        eprintln!("errors:    {} (tolerance {})", s.error_count, options.tolerance);
        if let Some(path) = &args.output {
            eprintln!("written:   {}", path.display());
        }
    }

    if view.error_count > 0 {
        Ok(EXIT_ERRORS_FOUND)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(
    reference_path: PathBuf,
    subject_path: PathBuf,
    values: Option<String>,
    config: Option<PathBuf>,
    delimiter: Option<char>,
) -> Result<u8, CliError> {
    let config = load_config(config.as_deref())?;
    let delimiter = delimiter_byte(delimiter)?;
    let mut reference = load(&reference_path, delimiter)?;
    let mut subject = load(&subject_path, delimiter)?;

    SchemaValidator::new(&config.columns)
        .validate(&mut reference, &mut subject)
        .map_err(CliError::recon)?;
    eprintln!(
        "columns:   ok ({} key columns, value column {})",
        config.columns.keys.len(),
        config.columns.subject_value.to_uppercase()
    );

    if let Some(values) = values {
        let text = read_values(&values)?;
        let parsed = parse_value_list(&text).map_err(CliError::recon)?;
        align_values(&parsed, reference.len(), config.values.count_policy).map_err(CliError::recon)?;
        eprintln!("values:    {} for {} reference rows", parsed.len(), reference.len());
    }

    eprintln!("reference: {} rows ({})", reference.len(), reference_path.display());
    eprintln!("subject:   {} rows ({})", subject.len(), subject_path.display());
    Ok(EXIT_SUCCESS)
}

// ============================================================================
// Helpers
// ============================================================================

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("belcheck").join("config.toml"))
}

/// `--config`, else the per-user config file if it exists, else defaults.
fn load_config(explicit: Option<&Path>) -> Result<ReconConfig, CliError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(p) => p,
            None => return Ok(ReconConfig::default()),
        },
    };
    log::info!("using config {}", path.display());
    ReconConfig::from_file(&path).map_err(|e| CliError {
        code: EXIT_CONFIG,
        message: e.to_string(),
        hint: Some(format!("fix or remove {}", path.display())),
    })
}

fn delimiter_byte(delimiter: Option<char>) -> Result<Option<u8>, CliError> {
    match delimiter {
        None => Ok(None),
        Some(c) if c.is_ascii() => Ok(Some(c as u8)),
        Some(c) => Err(CliError::args(format!("delimiter must be a single ASCII character, got {c:?}"))),
    }
}

fn load(path: &Path, delimiter: Option<u8>) -> Result<Dataset, CliError> {
    let result = match delimiter {
        Some(d) => load_dataset_with_delimiter(path, d),
        None => load_dataset(path),
    };
    result.map_err(|e| {
        let hint = match &e {
            LoadError::Csv { .. } => Some("pass --delimiter if the separator was guessed wrong"),
            LoadError::Empty(_) => Some("the first line must be the column header"),
            LoadError::Io { .. } => None,
        };
        let err = CliError::load(e.to_string());
        match hint {
            Some(h) => err.with_hint(h),
            None => err,
        }
    })
}

/// Value list from a file, or stdin for `-`.
fn read_values(source: &str) -> Result<String, CliError> {
    if source == "-" {
        let mut bytes = Vec::new();
        io::stdin()
            .read_to_end(&mut bytes)
            .map_err(|e| CliError::load(format!("stdin: {e}")))?;
        return Ok(decode_bytes(Path::new("<stdin>"), bytes));
    }
    read_file_as_utf8(Path::new(source)).map_err(|e| CliError::load(e.to_string()))
}
