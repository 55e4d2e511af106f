use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Parser, Subcommand};
use log::info;

use uxreport::export::ReportExporter;
use uxreport::ingest::parse_analysis_payload;
use uxreport::sample::sample_bundle;
use uxreport::template::render_report;
use uxreport::text_report::render_text_report;
use uxreport::{ChartImage, ChartInput, ExportOptions, ExportSource, ReportBundle};

type CliResult = Result<(), Box<dyn Error>>;

/// Exports AI-generated UI/UX analysis reports as paginated PDF or HTML.
///
/// Options are read from an optional TOML file and then overridden by
/// `UXREPORT_*` environment variables.  Set `RUST_LOG=info` for progress.
#[derive(Parser)]
#[command(author, version, about = "UI/UX analysis report exporter")]
struct Cli {
    /// TOML file with export options.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rasterize a report JSON file into a paginated PDF.
    Export {
        report: PathBuf,
        /// Pre-rendered chart image; by default the chart is drawn from the criteria scores.
        #[arg(long)]
        chart: Option<PathBuf>,
        /// Render the "no chart" placeholder instead of a chart.
        #[arg(long, conflicts_with = "chart")]
        no_chart: bool,
        /// Output directory; defaults to the configured one.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write the self-contained HTML view of a report.
    Html {
        report: PathBuf,
        #[arg(long)]
        chart: Option<PathBuf>,
        /// Output file; prints to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Typeset a report with the text-based fallback renderer.
    #[command(aliases = ["text-report"])]
    Text {
        report: PathBuf,
        #[arg(long)]
        chart: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Export the built-in sample report.
    Sample {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    let options = load_options(cli.config.as_deref())?;

    match cli.command {
        Commands::Export {
            report,
            chart,
            no_chart,
            out,
        } => {
            let bundle = load_report(&report)?;
            let chart = if no_chart {
                ChartInput::None
            } else {
                match chart {
                    Some(path) => ChartInput::Rendered(load_chart(&path)?),
                    None => ChartInput::Series(Vec::new()),
                }
            };
            export_pdf(&bundle, chart, options, out)
        }
        Commands::Html { report, chart, out } => {
            let bundle = load_report(&report)?;
            let chart = chart.as_deref().map(load_chart).transpose()?;
            let document = render_report(&bundle, chart.as_ref(), &options)?;
            match out {
                Some(path) => {
                    fs::write(&path, document.html)?;
                    println!("{}", path.display());
                }
                None => print!("{}", document.html),
            }
            Ok(())
        }
        Commands::Text { report, chart, out } => {
            let bundle = load_report(&report)?;
            let chart = chart.as_deref().map(load_chart).transpose()?;
            let text = render_text_report(&bundle, chart.as_ref(), &options, Local::now().date_naive())
                .map_err(|err| {
                    eprintln!("{}", err.user_message());
                    err
                })?;
            let path = text.save_to(out.unwrap_or_else(|| options.output_dir.clone()))?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Sample { out } => {
            export_pdf(&sample_bundle(), ChartInput::Series(Vec::new()), options, out)
        }
    }
}

fn export_pdf(
    bundle: &ReportBundle,
    chart: ChartInput,
    options: ExportOptions,
    out: Option<PathBuf>,
) -> CliResult {
    let out = out.unwrap_or_else(|| options.output_dir.clone());
    let exporter = ReportExporter::new(options);
    let artifact = exporter
        .export(bundle, ExportSource::Template(chart))
        .map_err(|err| {
            eprintln!("{}", err.user_message());
            err
        })?;
    let path = artifact.save_to(&out)?;
    info!("Wrote {} pages", artifact.page_count());
    println!("{}", path.display());
    Ok(())
}

fn load_options(path: Option<&Path>) -> Result<ExportOptions, Box<dyn Error>> {
    let options = match path {
        Some(path) => ExportOptions::from_file(path)?,
        None => ExportOptions::default(),
    };
    let options = options.with_env_overrides();
    options.validate()?;
    Ok(options)
}

fn load_report(path: &Path) -> Result<ReportBundle, Box<dyn Error>> {
    let payload = fs::read_to_string(path)?;
    parse_analysis_payload(&payload).map_err(|err| {
        eprintln!("{}", err.user_message());
        err.into()
    })
}

fn load_chart(path: &Path) -> Result<ChartImage, Box<dyn Error>> {
    let bytes = fs::read(path)?;
    Ok(ChartImage::from_bytes(bytes)?)
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
