use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use owo_colors::OwoColorize;

use figmine::config::{find_config_file, load_config, Config};
use figmine::extract::MineruBackend;
use figmine::pipeline::{Pipeline, RunReport};

/// figmine - download arXiv papers and harvest publication-quality figures
#[derive(Parser, Debug)]
#[command(name = "figmine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Download arXiv papers and harvest publication-quality figures", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// arXiv URLs or identifiers to process
    ///
    /// Accepted shapes: 2412.15289, https://arxiv.org/abs/<id>,
    /// https://arxiv.org/pdf/<id>[.pdf]
    references: Vec<String>,

    /// Enable verbose logging (can be used multiple times: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Root directory for the per-paper bundles
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep the scratch directory of each run for inspection
    #[arg(long)]
    keep_temp: bool,

    /// Language hint forwarded to the extraction tool's OCR stage
    #[arg(long)]
    lang: Option<String>,

    /// Rendering/image DPI override for the extraction tool
    #[arg(long)]
    dpi: Option<u32>,

    /// Concurrent enhancement workers
    #[arg(long)]
    workers: Option<usize>,

    /// Emit a machine-readable JSON summary per paper instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(());
    }

    if cli.references.is_empty() {
        Cli::command().print_help()?;
        std::process::exit(2);
    }

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("figmine={}", env_filter)),
        ))
        .init();

    if cli.quiet {
        std::env::set_var("FIGMINE_QUIET", "1");
    }

    // Load configuration from file if specified or found in default locations
    let mut config = if let Some(config_path) = &cli.config {
        load_config(config_path)?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("using config file: {}", config_path.display());
        load_config(&config_path)?
    } else {
        Config::default()
    };

    apply_cli_overrides(&mut config, &cli);

    let pipeline = Pipeline::new(config, Arc::new(MineruBackend::new()));

    let mut failures = 0usize;
    for reference in &cli.references {
        match pipeline.process(reference).await {
            Ok(report) => {
                if cli.json {
                    println!("{}", report_json(&report)?);
                } else if !cli.quiet {
                    print_report(&report);
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("{} {}: {}", "✗".red(), reference, e);
            }
        }
    }

    if failures > 0 {
        eprintln!(
            "{} {} of {} paper(s) failed",
            "✗".red(),
            failures,
            cli.references.len()
        );
        std::process::exit(1);
    }

    Ok(())
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(output) = &cli.output {
        config.output_dir = output.clone();
    }
    if cli.keep_temp {
        config.keep_temp = true;
    }
    if let Some(lang) = &cli.lang {
        config.extraction.lang = Some(lang.clone());
    }
    if let Some(dpi) = cli.dpi {
        config.extraction.render_dpi = dpi;
        config.extraction.image_dpi = dpi;
    }
    if let Some(workers) = cli.workers {
        config.enhance.workers = workers.max(1);
    }
}

fn report_json(report: &RunReport) -> Result<String> {
    let value = serde_json::json!({
        "id": report.reference.id,
        "title": report.bundle.title,
        "pdf": report.bundle.pdf_path,
        "images": report.bundle.image_paths,
        "extracted": report.extracted,
        "kept": report.kept,
        "dropped_too_small": report.dropped_too_small,
        "dropped_decorative": report.dropped_decorative,
        "copied_through": report.copied_through,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn print_report(report: &RunReport) {
    println!(
        "{} {} {}",
        "✓".green(),
        report.reference.id.bold(),
        report.bundle.title
    );
    println!(
        "  {} -> {}",
        "bundle".dimmed(),
        report.bundle.pdf_path.parent().unwrap_or_else(|| std::path::Path::new(".")).display()
    );
    println!(
        "  {} kept {}/{} images ({} too small, {} decorative, {} copied through)",
        "images".dimmed(),
        report.kept,
        report.extracted,
        report.dropped_too_small,
        report.dropped_decorative,
        report.copied_through
    );
}
