use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use lumi_reporter::report::{self, ReportModel, ResultAggregator};
use lumi_reporter::utils::config::{load_options, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "lumi-reporter")]
#[command(author = "NL Team")]
#[command(version = "0.1.0")]
#[command(about = "Aggregate browser test results into reports", long_about = None)]
struct Cli {
    /// Collector config; its outputFile directory is the default input directory
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge run reports and render a dashboard
    Generate {
        /// Output file path
        output: PathBuf,

        /// Directory holding the run reports
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output format (html, json, junit)
        #[arg(short, long, default_value = "html")]
        format: String,

        /// History file with per-suite statistics of past runs
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Print merged statistics to the console
    Summary {
        /// Directory holding the run reports
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// History file with per-suite statistics of past runs
        #[arg(long)]
        history: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            output,
            input,
            format,
            history,
        } => {
            let input = resolve_input(input, &cli.config)?;
            println!(
                "{} {} → {}",
                "Generating".cyan().bold(),
                input.display(),
                output.display()
            );
            let model =
                report::generate_report(&input, history.as_deref(), &format, Some(&output))
                    .await?;
            print_warnings(&model);
            println!(
                "{} {} report with {} tests",
                "✓".green().bold(),
                format,
                model.overall_summary.total
            );
        }
        Commands::Summary { input, history } => {
            let input = resolve_input(input, &cli.config)?;
            let mut aggregator = ResultAggregator::new();
            if let Some(path) = &history {
                aggregator = aggregator.with_history_file(path).await?;
            }
            let model = aggregator.aggregate_folder(&input).await?;
            print_warnings(&model);
            print_summary(&model);
        }
    }

    Ok(())
}

fn resolve_input(input: Option<PathBuf>, config: &Path) -> anyhow::Result<PathBuf> {
    match input {
        Some(dir) => Ok(dir),
        None => Ok(load_options(config)?.output_dir()),
    }
}

fn print_warnings(model: &ReportModel) {
    if model.warnings.is_empty() {
        return;
    }
    println!(
        "{} {} of {} files unusable, {} records dropped",
        "⚠".yellow().bold(),
        model.skipped_files(),
        model.input_files,
        model.skipped_records()
    );
    for warning in &model.warnings {
        println!("    {}", warning.to_string().dimmed());
    }
}

fn print_summary(model: &ReportModel) {
    let summary = &model.overall_summary;
    let metadata = &model.aggregate_metadata;

    println!("\n{}", "Test Summary".bold());
    println!(
        "  Browser: {}  Start: {}  End: {}  Minutes: {}",
        metadata.browser_name,
        metadata.execution_start_time,
        metadata.execution_end_time,
        metadata.total_time_in_minutes
    );
    println!(
        "  Total: {}  {}  {}  Pass rate: {}%",
        summary.total,
        format!("Passed: {}", summary.passed).green(),
        format!("Failed: {}", summary.failed).red(),
        summary.pass_rate
    );

    if !model.suite_stats.is_empty() {
        println!("\n{}", "Suites".bold());
        for (suite, stats) in &model.suite_stats {
            let marker = if stats.failed == 0 {
                "✓".green()
            } else {
                "✗".red()
            };
            println!(
                "  {} {} ({}/{} passed)",
                marker, suite, stats.passed, stats.total
            );
        }
    }

    if !model.unique_errors.is_empty() {
        println!("\n{}", "Unique Errors".bold());
        for entry in model.unique_errors.iter() {
            println!("  {}× {}", entry.count, entry.error.red());
        }
    }

    if let Some(trend) = &model.history_trend {
        println!("\n{}", "Trend".bold());
        for (suite, points) in trend {
            let rates: Vec<String> = points.iter().map(|p| format!("{}%", p.pass_rate)).collect();
            println!("  {}: {}", suite, rates.join(" → "));
        }
    }
}
