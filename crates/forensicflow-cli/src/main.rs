//! ForensicFlow CLI tool.
//!
//! Reads transaction records from CSV or JSON, runs the analysis pipeline and
//! writes the report.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use forensicflow::catalog::{domains, registry, total_kernel_count};
use forensicflow::pipeline::{Pipeline, ProgressEvent};
use forensicflow::report::Analysis;
use forensicflow_core::config::AnalysisConfig;
use forensicflow_core::observability::{LogConfig, LogLevel};
use forensicflow_graph::types::TransactionRecord;
use forensicflow_graph::validation::validate_records;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "forensicflow")]
#[command(version, about = "Graph-based money muling detection", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a transaction file and write the report
    Analyze {
        /// Input file (CSV with a header row, or a JSON array of records)
        input: PathBuf,

        /// Input format; inferred from the file extension when omitted
        #[arg(short, long, value_enum)]
        format: Option<InputFormat>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also build the graph projection and write it to this file
        #[arg(long, value_name = "FILE")]
        projection: Option<PathBuf>,

        /// Run the pattern detectors in parallel
        #[arg(long)]
        concurrent: bool,

        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List the analysis kernels
    Kernels,

    /// Print the default configuration as TOML
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    fn infer(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => InputFormat::Json,
            _ => InputFormat::Csv,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            ref input,
            format,
            ref config,
            ref output,
            ref projection,
            concurrent,
            pretty,
        } => {
            let mut config = match config {
                Some(path) => AnalysisConfig::from_file(path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => AnalysisConfig::from_env().context("reading configuration")?,
            };
            init_logging(&cli, &config)?;
            if projection.is_some() {
                config = config.with_projection(true);
            }

            let format = format.unwrap_or_else(|| InputFormat::infer(input));
            let analysis = cmd_analyze(input, format, config, concurrent)?;

            write_output(output.as_deref(), &render(&analysis.report, pretty)?)?;
            if let (Some(path), Some(graph)) = (projection, &analysis.projection) {
                let json = if pretty {
                    serde_json::to_string_pretty(graph)?
                } else {
                    serde_json::to_string(graph)?
                };
                write_output(Some(path.as_path()), &json)?;
            }
        }

        Commands::Kernels => {
            init_logging(&cli, &AnalysisConfig::default())?;
            cmd_kernels()?;
        }

        Commands::Config { ref output } => {
            let toml = AnalysisConfig::default()
                .to_toml_string()
                .context("serializing default configuration")?;
            write_output(output.as_deref(), &toml)?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli, config: &AnalysisConfig) -> anyhow::Result<()> {
    log_config(cli, &config.logging).init()?;
    Ok(())
}

/// Command-line flags only ever raise the configured logging settings.
fn log_config(cli: &Cli, configured: &LogConfig) -> LogConfig {
    let mut logging = configured.clone();
    if cli.json_logs {
        logging.structured = true;
    }
    if cli.verbose {
        logging.level = LogLevel::Debug;
    }
    logging
}

fn cmd_analyze(
    input: &Path,
    format: InputFormat,
    config: AnalysisConfig,
    concurrent: bool,
) -> anyhow::Result<Analysis> {
    let started = Instant::now();
    let records = load_records(input, format)?;
    info!(records = records.len(), path = %input.display(), "loaded input");

    let transactions = validate_records(&records)
        .with_context(|| format!("validating {}", input.display()))?;

    let pipeline = Pipeline::with_config(config);
    let observer = |e: ProgressEvent| {
        info!(stage = %e.stage, completed = e.completed, total = e.total, "progress");
    };

    let analysis = if concurrent {
        let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
        runtime.block_on(pipeline.run_concurrent(&transactions, &observer))?
    } else {
        pipeline.run(&transactions, &observer)?
    };

    if let Some(reason) = analysis.diagnostics.cycle_truncation {
        warn!(%reason, "cycle results are partial");
    }
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        flagged = analysis.report.summary.suspicious_accounts_flagged,
        rings = analysis.report.summary.fraud_rings_detected,
        "done"
    );
    Ok(analysis)
}

fn load_records(path: &Path, format: InputFormat) -> anyhow::Result<Vec<TransactionRecord>> {
    match format {
        InputFormat::Csv => {
            let mut reader = csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_path(path)
                .with_context(|| format!("opening {}", path.display()))?;
            let mut records = Vec::new();
            for (i, row) in reader.deserialize::<TransactionRecord>().enumerate() {
                let record =
                    row.with_context(|| format!("{}: malformed CSV row {}", path.display(), i + 1))?;
                records.push(record);
            }
            Ok(records)
        }
        InputFormat::Json => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            let records: Vec<TransactionRecord> = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("{}: expected a JSON array of records", path.display()))?;
            Ok(records)
        }
    }
}

fn render(report: &forensicflow::report::AnalysisReport, pretty: bool) -> anyhow::Result<String> {
    let json = if pretty {
        report.to_json_pretty()?
    } else {
        report.to_json()?
    };
    Ok(json)
}

fn write_output(path: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content.as_bytes())
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), bytes = content.len(), "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn cmd_kernels() -> anyhow::Result<()> {
    let registry = registry()?;
    if registry.total_count() != total_kernel_count() {
        bail!(
            "registry holds {} kernels, catalog lists {}",
            registry.total_count(),
            total_kernel_count()
        );
    }

    println!("ForensicFlow kernels\n");
    for info in domains() {
        println!("{} ({} kernels)", info.name, info.kernel_count);
        println!("  {}", info.description);
        let mut kernels = registry.by_domain(info.domain);
        kernels.sort_by(|a, b| a.id.cmp(&b.id));
        for k in &kernels {
            println!("  [Batch] {:<24} - {}", k.id, k.description);
        }
        println!();
    }
    println!("Total: {} kernels", total_kernel_count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_format_inference() {
        assert_eq!(InputFormat::infer(Path::new("tx.json")), InputFormat::Json);
        assert_eq!(InputFormat::infer(Path::new("tx.JSON")), InputFormat::Json);
        assert_eq!(InputFormat::infer(Path::new("tx.csv")), InputFormat::Csv);
        assert_eq!(InputFormat::infer(Path::new("transactions")), InputFormat::Csv);
    }

    #[test]
    fn test_load_csv_keeps_ids_as_text() {
        let file = write_temp(
            ".csv",
            "transaction_id,sender_id,receiver_id,amount,timestamp\n\
             T1, 007 ,0042,100.50,2024-01-01 10:00:00\n\
             T2,0042,9,,2024-01-01 11:00:00\n",
        );
        let records = load_records(file.path(), InputFormat::Csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sender_id.as_deref(), Some("007"));
        assert_eq!(records[0].receiver_id.as_deref(), Some("0042"));
        assert_eq!(records[1].amount, None);

        let err = validate_records(&records).unwrap_err();
        assert!(err.to_string().contains("Row 2"));
    }

    #[test]
    fn test_load_json_numeric_amounts() {
        let file = write_temp(
            ".json",
            r#"[
                {"transaction_id": "T1", "sender_id": "A", "receiver_id": "B",
                 "amount": 250, "timestamp": "2024-01-01T10:00:00Z"},
                {"transaction_id": "T2", "sender_id": "B", "receiver_id": "C",
                 "amount": "12.5", "timestamp": "2024-01-01 11:00:00"}
            ]"#,
        );
        let records = load_records(file.path(), InputFormat::Json).unwrap();
        let transactions = validate_records(&records).unwrap();
        assert_eq!(transactions[0].amount, 250.0);
        assert_eq!(transactions[1].amount, 12.5);
    }

    #[test]
    fn test_analyze_csv() {
        let file = write_temp(
            ".csv",
            "transaction_id,sender_id,receiver_id,amount,timestamp\n\
             T1,A,B,100,2024-01-01 10:00:00\n\
             T2,B,C,100,2024-01-01 12:00:00\n\
             T3,C,A,100,2024-01-01 14:00:00\n",
        );
        let analysis = cmd_analyze(
            file.path(),
            InputFormat::Csv,
            AnalysisConfig::testing(),
            false,
        )
        .unwrap();
        assert_eq!(analysis.report.fraud_rings.len(), 1);
        assert_eq!(analysis.report.summary.total_transactions, 3);
    }

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from([
            "forensicflow",
            "analyze",
            "tx.csv",
            "--concurrent",
            "--pretty",
            "--projection",
            "graph.json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze {
                concurrent,
                pretty,
                projection,
                format,
                ..
            } => {
                assert!(concurrent && pretty);
                assert_eq!(projection, Some(PathBuf::from("graph.json")));
                assert_eq!(format, None);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_log_flags_keep_configured_values() {
        let configured = LogConfig {
            structured: true,
            level: LogLevel::Warn,
            ..Default::default()
        };

        let cli = Cli::try_parse_from(["forensicflow", "kernels"]).unwrap();
        let logging = log_config(&cli, &configured);
        assert!(logging.structured);
        assert_eq!(logging.level, LogLevel::Warn);

        let cli = Cli::try_parse_from(["forensicflow", "kernels", "--json-logs", "-v"]).unwrap();
        let logging = log_config(&cli, &LogConfig::default());
        assert!(logging.structured);
        assert_eq!(logging.level, LogLevel::Debug);

        let cli = Cli::try_parse_from(["forensicflow", "kernels"]).unwrap();
        assert!(!log_config(&cli, &LogConfig::default()).structured);
    }

    #[test]
    fn test_write_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_output(Some(path.as_path()), "{}").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "{}");
    }
}
