//! Slidesum - lecture slide-deck summarizer CLI

use clap::Parser;
use slidesum::{
    config::AppConfig,
    document::Document,
    gateway::{GeminiGateway, ModelGateway},
    log_error, logging,
    pipeline::{PipelineOptions, PipelineOrchestrator, PipelineProgress},
    qa::answer_question,
    server::{AppState, Server},
    store::ContentStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the web backend
    Serve {
        /// Address to bind (host:port)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Summarize a slide deck and explain every slide
    Process {
        /// Slide deck (defaults to the configured document)
        pdf: Option<PathBuf>,
    },
    /// Ask a question about one slide
    Ask {
        /// 1-based slide number
        slide: u32,
        /// Question text
        question: String,
        /// Slide deck (defaults to the configured document)
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "slidesum")]
#[command(version)]
#[command(about = "Summarize lecture slide decks with Gemini", long_about = None)]
struct Args {
    /// Configuration file path (overrides defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Slide table location (overrides config)
    #[arg(long)]
    slide_table: Option<PathBuf>,

    /// Slides explained concurrently per batch (overrides config)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(path) = args.slide_table {
        config.slide_table_path = path;
    }
    if let Some(size) = args.batch_size {
        config.batch_size = size;
    }
    config.validate()?;

    init_logging(args.verbose || config.debug);

    // A missing API key is fatal at startup
    let gateway: Arc<dyn ModelGateway> = match GeminiGateway::from_config(&config) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            tracing::error!("{}", e);
            log_error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!("Using model {}", gateway.model_name());

    match args.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            let state = AppState::new(&config, gateway);
            Server::new(state, bind).run().await
        }
        Command::Process { pdf } => {
            let document = Document::new(pdf.unwrap_or_else(|| config.document.clone()));
            run_pipeline(&config, gateway, document).await
        }
        Command::Ask {
            slide,
            question,
            pdf,
        } => {
            let document = Document::new(pdf.unwrap_or_else(|| config.document.clone()));
            let store = ContentStore::new(config.slide_table_path.clone());
            let answer = answer_question(&gateway, &store, &document, &question, slide).await?;
            println!("{}", answer);
            Ok(())
        }
    }
}

/// Initialize console tracing and the run log file
fn init_logging(verbose: bool) {
    let filter = if verbose {
        "slidesum=debug,tower_http=debug,info"
    } else {
        "slidesum=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(e) = logging::init_logger() {
        tracing::warn!(
            "Run log unavailable at {}: {}",
            logging::get_log_path_display(),
            e
        );
    }
}

async fn run_pipeline(
    config: &AppConfig,
    gateway: Arc<dyn ModelGateway>,
    document: Document,
) -> anyhow::Result<()> {
    let orchestrator = PipelineOrchestrator::new(
        gateway,
        ContentStore::new(config.slide_table_path.clone()),
        PipelineOptions::from_config(config),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<PipelineProgress>(32);
    let printer = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            if progress.total_slides > 0 {
                println!(
                    "[{}] {} ({}/{})",
                    progress.stage, progress.detail, progress.completed_slides, progress.total_slides
                );
            } else {
                println!("[{}] {}", progress.stage, progress.detail);
            }
        }
    });

    let report = orchestrator.run(&document, Some(tx)).await;
    let _ = printer.await;
    let report = report?;

    println!(
        "\n{} chunks, {} slides in {} batches: {} explained, {} failed ({} ms)",
        report.chunk_count,
        report.slides_total,
        report.batches,
        report.succeeded.len(),
        report.failed.len(),
        report.elapsed_ms
    );
    for failure in &report.failed {
        println!("  slide {}: {}", failure.slide_number, failure.error);
    }
    println!("Slide table: {}", config.slide_table_path.display());
    Ok(())
}
