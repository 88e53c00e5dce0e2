use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use views_hdx_scraper::config::ConfigLoader;
use views_hdx_scraper::datasets::Pipeline;
use views_hdx_scraper::error::ViewsError;
use views_hdx_scraper::locations::IsoTableMatcher;
use views_hdx_scraper::publish::{JsonPublisher, Publisher};
use views_hdx_scraper::retriever::HttpRetriever;

#[derive(Parser)]
#[command(name = "views-hdx")]
#[command(about = "Publish VIEWS conflict-forecast releases as HDX-ready datasets")]
#[command(version, author)]
struct Cli {
    /// Path to the project configuration (defaults to views-hdx.json).
    #[arg(long)]
    config: Option<String>,

    /// Directory for generated CSV resources (defaults to a temp dir).
    #[arg(long)]
    workdir: Option<Utf8PathBuf>,

    /// Directory for published dataset descriptors (defaults to workdir).
    #[arg(long)]
    outdir: Option<Utf8PathBuf>,

    /// Directory holding saved response snapshots.
    #[arg(long)]
    saved_dir: Option<Utf8PathBuf>,

    /// Record downloaded responses into the saved directory.
    #[arg(long)]
    save: bool,

    /// Serve responses from the saved directory instead of the network.
    #[arg(long)]
    use_saved: bool,

    /// Assemble datasets and resources but skip publishing descriptors.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(views) = report.downcast_ref::<ViewsError>() {
            return ExitCode::from(map_exit_code(views));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ViewsError) -> u8 {
    match error {
        ViewsError::MissingConfig
        | ViewsError::ConfigRead(_)
        | ViewsError::ConfigParse(_)
        | ViewsError::TemplatePlaceholder { .. } => 2,
        ViewsError::Http(_) | ViewsError::Status { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    // The temp dir guard must outlive the run so generated resources stay
    // readable by the publisher.
    let mut _workdir_guard = None;
    let workdir = match cli.workdir {
        Some(dir) => dir,
        None => {
            let temp = tempfile::Builder::new()
                .prefix("views-hdx")
                .tempdir()
                .into_diagnostic()?;
            let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
                .map_err(|_| miette::Report::msg("non-utf8 temp directory path"))?;
            _workdir_guard = Some(temp);
            dir
        }
    };
    let outdir = cli.outdir.unwrap_or_else(|| workdir.clone());

    let retriever = HttpRetriever::new(cli.saved_dir, cli.save, cli.use_saved)?;
    let pipeline = Pipeline::new(config, retriever, IsoTableMatcher, workdir);
    let datasets = pipeline.generate_datasets()?;

    if cli.dry_run {
        info!("dry run: assembled {} datasets, skipping publish", datasets.len());
        return Ok(());
    }

    let publisher = JsonPublisher::new(outdir);
    for dataset in &datasets {
        publisher.publish(dataset)?;
    }
    info!("published {} dataset descriptors", datasets.len());
    Ok(())
}
