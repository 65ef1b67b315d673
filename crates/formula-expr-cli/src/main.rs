use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use formula_expr::{Context, ContextBuilder, Engine, EngineConfig, FunctionDescriptor, Value};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "formula-expr-cli")]
#[command(about = "Compile, evaluate and inspect record expressions; prints one JSON document.")]
struct Cli {
    /// Engine configuration JSON file (`maxExpressionLen`, `maxNestingDepth`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate an expression against a record.
    Eval(EvalArgs),
    /// Evaluate a condition; failures yield `false`.
    Condition(EvalArgs),
    /// Check expression syntax without a record.
    Validate(ExprArgs),
    /// List the built-in functions.
    Functions,
    /// Translate a filter into a parameterized SQL WHERE fragment.
    Sql(ExprArgs),
}

#[derive(Debug, Args)]
struct ExprArgs {
    /// Expression source text.
    #[arg(long = "expr")]
    expr: String,
}

#[derive(Debug, Args)]
struct EvalArgs {
    /// Expression source text.
    #[arg(long = "expr")]
    expr: String,

    /// Record as an inline JSON object.
    #[arg(long, conflicts_with = "record_file")]
    record: Option<String>,

    /// Read the record JSON object from a file.
    #[arg(long = "record-file", conflicts_with = "record")]
    record_file: Option<PathBuf>,

    /// Treat the record JSON as a `{"record", "prior", "user", "env", ...}` envelope.
    #[arg(long)]
    envelope: bool,
}

#[derive(Debug, Serialize)]
struct Failure {
    success: bool,
    error: String,
}

impl Failure {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EvalReport<'a> {
    success: bool,
    result: Value,
    expression: &'a str,
}

#[derive(Debug, Serialize)]
struct ConditionReport {
    success: bool,
    result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ValidateReport {
    success: bool,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct FunctionsReport {
    success: bool,
    functions: &'static [FunctionDescriptor],
    count: usize,
}

#[derive(Debug, Serialize)]
struct SqlReport {
    success: bool,
    clause: String,
    args: Vec<Value>,
}

/// Writes one JSON line to stdout. A closed pipe is not an error: the reader has gone away.
fn emit<T: Serialize>(report: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let written = serde_json::to_writer(&mut handle, report)
        .map_err(std::io::Error::from)
        .and_then(|()| handle.write_all(b"\n"))
        .and_then(|()| handle.flush());
    match written {
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        other => Ok(other?),
    }
}

fn load_engine(config: Option<&Path>) -> Result<Engine> {
    let Some(path) = config else {
        return Ok(Engine::new());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = EngineConfig::from_json_str(&raw)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    Ok(Engine::with_config(config))
}

fn load_context(args: &EvalArgs) -> Result<Context> {
    let raw = match (&args.record, &args.record_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read record {}", path.display()))?,
        (None, None) => return Ok(Context::new()),
    };
    let json: serde_json::Value =
        serde_json::from_str(&raw).context("record is not valid JSON")?;
    let context = if args.envelope {
        ContextBuilder::from_envelope_json(&json)?.build()
    } else {
        Context::from_json(&json)?
    };
    Ok(context)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let engine = load_engine(cli.config.as_deref())?;

    match cli.command {
        Command::Eval(args) => {
            let context = load_context(&args)?;
            match engine.evaluate(&args.expr, &context) {
                Ok(result) => {
                    emit(&EvalReport {
                        success: true,
                        result,
                        expression: &args.expr,
                    })?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    emit(&Failure::new(err.to_string()))?;
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Condition(args) => {
            let context = load_context(&args)?;
            // Same outcome as `Engine::evaluate_as_bool`, but keeps the reason for the caller.
            let report = match engine.evaluate(&args.expr, &context) {
                Ok(value) => ConditionReport {
                    success: true,
                    result: value.is_truthy(),
                    error: None,
                },
                Err(err) => ConditionReport {
                    success: true,
                    result: false,
                    error: Some(err.to_string()),
                },
            };
            emit(&report)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate(args) => {
            let validation = engine.validate(&args.expr);
            emit(&ValidateReport {
                success: true,
                valid: validation.valid,
                error: validation.error,
            })?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Functions => {
            let functions = engine.list_functions();
            emit(&FunctionsReport {
                success: true,
                functions,
                count: functions.len(),
            })?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Sql(args) => match engine.to_sql(&args.expr) {
            Ok(predicate) => {
                emit(&SqlReport {
                    success: true,
                    clause: predicate.clause,
                    args: predicate.args,
                })?;
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                emit(&Failure::new(err.to_string()))?;
                Ok(ExitCode::FAILURE)
            }
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            // Input problems (unreadable files, malformed JSON) still produce an envelope.
            if let Err(emit_err) = emit(&Failure::new(format!("{err:#}"))) {
                eprintln!("{err:#} ({emit_err})");
            }
            ExitCode::FAILURE
        }
    }
}
