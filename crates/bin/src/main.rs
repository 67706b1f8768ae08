//! ffport CLI binary.
//!
//! Builds Fama-French style portfolios from CSV panels and inspects the
//! exported tables.

use clap::{Parser, Subcommand};
use ffport::{Pipeline, PipelineConfig, PipelineOutput};
use ffport_data::{CsvPanelLoader, MissingDelistingPolicy, Panels};
use ffport_output::{ExportFormat, compare, describe, read_matrix_csv};
use ffport_portfolios::{ReturnKind, available_families};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ffport")]
#[command(about = "ffport: Fama-French portfolio construction", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build portfolios from a directory of CSV panels
    Run {
        /// Directory with security_months.csv, fundamentals.csv and links.csv
        #[arg(long)]
        data_dir: PathBuf,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// Configuration file (defaults to the user configuration directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format: csv, json or pretty-json
        #[arg(long, value_parser = parse_format)]
        format: Option<ExportFormat>,

        /// Build only these families (repeatable)
        #[arg(long = "family")]
        families: Vec<String>,

        /// Delisting without a return: exclude, total-loss or keep
        #[arg(long, value_parser = parse_policy)]
        missing_delisting: Option<MissingDelistingPolicy>,

        /// Aggregate returns excluding distributions
        #[arg(long)]
        ex_distribution: bool,
    },

    /// List the available portfolio families
    Families,

    /// Print summary statistics of an exported matrix
    Summary {
        /// Matrix CSV file
        file: PathBuf,

        /// Render as Markdown
        #[arg(long)]
        markdown: bool,

        /// Multiply values before display (100 shows percent)
        #[arg(long, default_value = "1.0")]
        scale: f64,
    },

    /// Compare a replicated matrix with a reference matrix
    Compare {
        /// Replicated matrix CSV
        replicated: PathBuf,

        /// Reference matrix CSV
        reference: PathBuf,

        /// Multiply reference values first (0.01 for percent files)
        #[arg(long, default_value = "1.0")]
        reference_scale: f64,
    },

    /// Print the effective configuration
    Config {
        /// Configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the defaults to the user configuration directory
        #[arg(long)]
        init: bool,
    },
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    match value.to_ascii_lowercase().as_str() {
        "csv" => Ok(ExportFormat::Csv),
        "json" => Ok(ExportFormat::Json),
        "pretty-json" | "pretty" => Ok(ExportFormat::PrettyJson),
        other => Err(format!("unknown format '{other}' (csv, json, pretty-json)")),
    }
}

fn parse_policy(value: &str) -> Result<MissingDelistingPolicy, String> {
    MissingDelistingPolicy::parse(value)
        .ok_or_else(|| format!("unknown policy '{value}' (exclude, total-loss, keep)"))
}

/// Log filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "ffport=info,ffport_data=info,ffport_portfolios=info,ffport_output=info";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data_dir,
            out,
            config,
            format,
            families,
            missing_delisting,
            ex_distribution,
        } => {
            let mut config = PipelineConfig::load(config.as_deref())?;
            if let Some(format) = format {
                config.format = format;
            }
            if !families.is_empty() {
                config.families = families;
            }
            if let Some(policy) = missing_delisting {
                config.delisting.missing_policy = policy;
            }
            if ex_distribution {
                config.return_kind = ReturnKind::ExDistribution;
            }
            run_pipeline(&data_dir, &out, config)?;
        }
        Commands::Families => list_families(),
        Commands::Summary {
            file,
            markdown,
            scale,
        } => {
            let matrix = read_matrix_csv(&file)?;
            let summary = describe(&matrix);
            if markdown {
                print!("{}", summary.to_markdown(scale));
            } else {
                print!("{}", summary.to_ascii_table(scale));
            }
        }
        Commands::Compare {
            replicated,
            reference,
            reference_scale,
        } => {
            let replicated = read_matrix_csv(&replicated)?;
            let reference = read_matrix_csv(&reference)?;
            print!("{}", compare(&replicated, &reference, reference_scale));
        }
        Commands::Config { config, init } => {
            if init {
                let path = PipelineConfig::default_path()
                    .ok_or("no configuration directory on this platform")?;
                PipelineConfig::default().save(&path)?;
                println!("Wrote {}", path.display());
            } else {
                let config = PipelineConfig::load(config.as_deref())?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

fn run_pipeline(
    data_dir: &Path,
    out: &Path,
    config: PipelineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", "FAMA-FRENCH PORTFOLIO CONSTRUCTION");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Data: {}", data_dir.display());
    println!("Families: {}", config.families.join(", "));
    println!();

    let started = Instant::now();
    let panels = Panels::load(&CsvPanelLoader::new(data_dir))?;
    let pipeline = Pipeline::new(config);
    let output = pipeline.run(panels)?;
    info!("Pipeline finished in {:.1?}", started.elapsed());

    let pb = ProgressBar::new(output.sort_count() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Writing tables...");

    let written = output.write_with_progress(out, pipeline.config(), |family, sort| {
        pb.set_message(format!("{family}/{sort}"));
        pb.inc(1);
    });
    match written {
        Ok(report) => {
            pb.finish_with_message(format!(
                "Wrote {} sorts to {}",
                report.sorts.len(),
                out.display()
            ));
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    }

    print_run_summary(&output);
    Ok(())
}

fn print_run_summary(output: &PipelineOutput) {
    println!("\nSorts");
    println!("=====\n");
    println!(
        "{:<12} {:<12} {:>8} {:>12} {:>8}",
        "Family", "Sort", "Buckets", "Firm-years", "Months"
    );
    println!("{}", "-".repeat(56));
    for family in &output.families {
        for sort in &family.sorts {
            println!(
                "{:<12} {:<12} {:>8} {:>12} {:>8}",
                family.name,
                sort.name,
                sort.assignments.labels().len(),
                sort.assignments.len(),
                sort.returns.vw_monthly.len()
            );
        }
    }

    let d = &output.diagnostics;
    let p = &d.portfolio;
    println!("\nExclusions");
    println!("==========\n");
    println!("  {:<36} {:>10}", "Outside universe", d.outside_universe);
    println!("  {:<36} {:>10}", "Delisting excluded", d.delisting.excluded);
    println!("  {:<36} {:>10}", "Missing market equity", p.missing_market_equity);
    println!("  {:<36} {:>10}", "Representative ties", p.representative_ties);
    println!("  {:<36} {:>10}", "Unlinked snapshots", p.unlinked);
    println!("  {:<36} {:>10}", "Link ambiguities", p.link_ambiguities);
    println!("  {:<36} {:>10}", "Missing fundamentals", p.missing_fundamentals);
    println!("  {:<36} {:>10}", "Missing weight", p.missing_weight);
    println!("  {:<36} {:>10}", "Zero-divisor cells", p.zero_divisor_cells);
    println!(
        "  {:<36} {:>10}",
        "Degenerate breakpoint years",
        p.total_degenerate_years()
    );
    println!(
        "  {:<36} {:>10}",
        "Unassigned without breakpoints",
        p.total_without_breakpoints()
    );
    println!();
}

fn list_families() {
    println!("\nPortfolio Families");
    println!("==================\n");
    for info in available_families() {
        let characteristics: Vec<&str> = info
            .required_characteristics
            .iter()
            .map(|c| c.code())
            .collect();
        println!("  {:<10} {}", info.name, info.description);
        println!("  {:<10} sorts: {}", "", info.sorts.join(", "));
        if !characteristics.is_empty() {
            println!("  {:<10} characteristics: {}", "", characteristics.join(", "));
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case("csv", ExportFormat::Csv)]
    #[case("JSON", ExportFormat::Json)]
    #[case("pretty-json", ExportFormat::PrettyJson)]
    fn test_parse_format(#[case] raw: &str, #[case] expected: ExportFormat) {
        assert_eq!(parse_format(raw).unwrap(), expected);
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::parse_from([
            "ffport",
            "run",
            "--data-dir",
            "data",
            "--out",
            "out",
            "--family",
            "bm",
            "--family",
            "ep",
            "--missing-delisting",
            "total-loss",
        ]);
        let Commands::Run {
            families,
            missing_delisting,
            format,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(families, vec!["bm", "ep"]);
        assert_eq!(missing_delisting, Some(MissingDelistingPolicy::TotalLoss));
        assert!(format.is_none());
        assert!(parse_policy("sometimes").is_err());
    }
}
