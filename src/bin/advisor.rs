//! Advisor CLI - Command-line harness for the wellbeing advice engine
//!
//! Commands:
//! - analyze: Analyze one user's daily records
//! - batch: Analyze many users at the same instant
//! - validate-rules: Load and validate a rule base
//! - rules: List the rules of a rule base

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use wellbeing_advice::types::DailyRecord;
use wellbeing_advice::{
    AdviceEngine, AnalysisError, ConfigError, EngineConfig, RuleBase, RuleConfigError,
    UserAnalysis, UserRecords, ENGINE_VERSION,
};

/// Advisor - Rule-based advice from self-reported wellbeing records
#[derive(Parser)]
#[command(name = "advisor")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Analyze wellbeing records and generate advice", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one user's daily records
    Analyze {
        /// Input file with a JSON array of daily records (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// User identifier
        #[arg(short, long)]
        user: String,

        /// Rule base JSON (defaults to the built-in rules)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Engine config JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Analysis instant in RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Analyze many users from a JSON array of {user_id, records}
    Batch {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Rule base JSON (defaults to the built-in rules)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Engine config JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Analysis instant in RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Load and validate a rule base
    ValidateRules {
        /// Rule base JSON (defaults to the built-in rules)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Output report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the rules of a rule base
    Rules {
        /// Rule base JSON (defaults to the built-in rules)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AdvisorCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            user,
            rules,
            config,
            at,
            pretty,
        } => {
            let engine = load_engine(rules.as_deref(), config.as_deref())?;
            let records: Vec<DailyRecord> = serde_json::from_str(&read_input(&input)?)?;
            let analysis = engine.analyze(&user, &records, parse_instant(at.as_deref())?)?;
            write_output(&output, &to_json(&analysis, pretty)?)
        }

        Commands::Batch {
            input,
            output,
            rules,
            config,
            at,
            pretty,
        } => cmd_batch(&input, &output, rules.as_deref(), config.as_deref(), at.as_deref(), pretty),

        Commands::ValidateRules { rules, json } => cmd_validate_rules(rules.as_deref(), json),

        Commands::Rules { rules, json } => cmd_rules(rules.as_deref(), json),
    }
}

fn cmd_batch(
    input: &Path,
    output: &Path,
    rules: Option<&Path>,
    config: Option<&Path>,
    at: Option<&str>,
    pretty: bool,
) -> Result<(), AdvisorCliError> {
    let engine = load_engine(rules, config)?;
    let users: Vec<UserRecords> = serde_json::from_str(&read_input(input)?)?;
    let at = parse_instant(at)?;

    let entries: Vec<BatchReportEntry> = engine
        .analyze_batch(&users, at)
        .into_iter()
        .map(|entry| match entry.result {
            Ok(analysis) => BatchReportEntry {
                user_id: entry.user_id,
                analysis: Some(analysis),
                error: None,
            },
            Err(e) => BatchReportEntry {
                user_id: entry.user_id,
                analysis: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let failed = entries.iter().filter(|e| e.error.is_some()).count();
    write_output(output, &to_json(&entries, pretty)?)?;

    if failed > 0 {
        Err(AdvisorCliError::BatchFailed(failed))
    } else {
        Ok(())
    }
}

fn cmd_validate_rules(rules: Option<&Path>, json: bool) -> Result<(), AdvisorCliError> {
    let source = rules
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());

    let report = match load_rules(rules) {
        Ok(base) => RuleReport {
            source,
            valid: true,
            rule_count: base.len(),
            domains: base.domains().iter().map(|d| d.as_str().to_string()).collect(),
            window_days: Some(base.window_days(EngineConfig::default().default_window_days)),
            error: None,
        },
        Err(AdvisorCliError::Rules(e)) => RuleReport {
            source,
            valid: false,
            rule_count: 0,
            domains: vec![],
            window_days: None,
            error: Some(e.to_string()),
        },
        Err(e) => return Err(e),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Rule Base Report");
        println!("================");
        println!("Source:      {}", report.source);
        println!("Valid:       {}", report.valid);
        println!("Rules:       {}", report.rule_count);
        if let Some(days) = report.window_days {
            println!("Window:      {} days", days);
        }
        if !report.domains.is_empty() {
            println!("Domains:     {}", report.domains.join(", "));
        }
        if let Some(error) = &report.error {
            println!("\nError: {}", error);
        }
    }

    if report.valid {
        Ok(())
    } else {
        Err(AdvisorCliError::InvalidRules)
    }
}

fn cmd_rules(rules: Option<&Path>, json: bool) -> Result<(), AdvisorCliError> {
    let base = load_rules(rules)?;

    if json {
        println!("{}", serde_json::to_string_pretty(base.rules())?);
        return Ok(());
    }

    for rule in base.rules() {
        println!(
            "{:<40} {:<24} {:<10} {} week(s)",
            rule.id,
            rule.domain.as_str(),
            format!("{:?}", rule.severity).to_lowercase(),
            rule.analysis_period_weeks
        );
        for trigger in &rule.triggers {
            println!(
                "    {} {} {:?} ({:?}, threshold {})",
                trigger.metric,
                trigger.operator.symbol(),
                trigger.value.as_f64(),
                trigger.frequency,
                trigger.threshold
            );
        }
    }
    Ok(())
}

fn load_rules(path: Option<&Path>) -> Result<RuleBase, AdvisorCliError> {
    let base = match path {
        Some(path) => RuleBase::from_json(&fs::read_to_string(path)?)?,
        None => RuleBase::builtin()?,
    };
    Ok(base)
}

fn load_engine(rules: Option<&Path>, config: Option<&Path>) -> Result<AdviceEngine, AdvisorCliError> {
    let rules = Arc::new(load_rules(rules)?);
    let config = match config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    Ok(AdviceEngine::with_config(rules, config)?)
}

fn parse_instant(at: Option<&str>) -> Result<DateTime<Utc>, AdvisorCliError> {
    match at {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AdvisorCliError::InvalidInstant(format!("{raw}: {e}"))),
        None => Ok(Utc::now()),
    }
}

fn read_input(input: &Path) -> Result<String, AdvisorCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(AdvisorCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, content: &str) -> Result<(), AdvisorCliError> {
    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", content)?;
    } else {
        fs::write(output, format!("{content}\n"))?;
    }
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, AdvisorCliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

// Error types

#[derive(Debug)]
enum AdvisorCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Rules(RuleConfigError),
    Config(ConfigError),
    Analysis(AnalysisError),
    InvalidInstant(String),
    NoInput,
    InvalidRules,
    BatchFailed(usize),
}

impl From<io::Error> for AdvisorCliError {
    fn from(e: io::Error) -> Self {
        AdvisorCliError::Io(e)
    }
}

impl From<serde_json::Error> for AdvisorCliError {
    fn from(e: serde_json::Error) -> Self {
        AdvisorCliError::Json(e)
    }
}

impl From<RuleConfigError> for AdvisorCliError {
    fn from(e: RuleConfigError) -> Self {
        AdvisorCliError::Rules(e)
    }
}

impl From<ConfigError> for AdvisorCliError {
    fn from(e: ConfigError) -> Self {
        AdvisorCliError::Config(e)
    }
}

impl From<AnalysisError> for AdvisorCliError {
    fn from(e: AnalysisError) -> Self {
        AdvisorCliError::Analysis(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AdvisorCliError> for CliError {
    fn from(e: AdvisorCliError) -> Self {
        match e {
            AdvisorCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            AdvisorCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax and field names".to_string()),
            },
            AdvisorCliError::Rules(e) => CliError {
                code: "RULE_CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'advisor validate-rules --rules <file>' for details".to_string()),
            },
            AdvisorCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the engine config values".to_string()),
            },
            AdvisorCliError::Analysis(e) => CliError {
                code: "ANALYSIS_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            AdvisorCliError::InvalidInstant(msg) => CliError {
                code: "INVALID_INSTANT".to_string(),
                message: msg,
                hint: Some("Use RFC 3339, e.g. 2024-03-07T21:00:00Z".to_string()),
            },
            AdvisorCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal, expected piped JSON".to_string(),
                hint: Some("Pipe records into the command or pass --input <file>".to_string()),
            },
            AdvisorCliError::InvalidRules => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: "Rule base failed validation".to_string(),
                hint: Some("Fix the reported rule and retry".to_string()),
            },
            AdvisorCliError::BatchFailed(count) => CliError {
                code: "BATCH_FAILED".to_string(),
                message: format!("{} user analyses failed", count),
                hint: Some("See the error field of each failed entry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct RuleReport {
    source: String,
    valid: bool,
    rule_count: usize,
    domains: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    window_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(serde::Serialize)]
struct BatchReportEntry {
    user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<UserAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}
