use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resume_text::api::{create_router, AppState};
use resume_text::config::Config;
use resume_text::models::UploadedFile;
use resume_text::processing::Orchestrator;

#[derive(Parser)]
#[command(name = "resume-text")]
#[command(about = "Plain-text extraction for resume uploads")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Extract one file and print the result as JSON
    Extract {
        path: PathBuf,
        /// MIME type to declare instead of guessing from the extension
        #[arg(long)]
        mime: Option<String>,
        /// Skip LLM cleanup even when an LLM is configured
        #[arg(long)]
        no_enhance: bool,
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resume_text=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::from_env();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Extract {
            path,
            mime,
            no_enhance,
            pretty,
        } => {
            if no_enhance {
                config.enhancement.enabled = false;
            }
            extract(config, path, mime, pretty).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    if let Some(llm_config) = &config.llm {
        tracing::info!("Initializing LLM provider: {}...", llm_config.model);
    }
    tracing::info!("Initializing OCR engine: {}...", config.ocr.model);

    let state = AppState::new(config.clone());
    if !state.orchestrator.ocr_available() {
        tracing::warn!("OCR unavailable - scanned PDFs will fall back to a placeholder");
    }
    if !state.orchestrator.enhancer().is_active() {
        tracing::warn!("LLM enhancement disabled - OCR and Word text is stored as extracted");
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Resume text service starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn extract(
    config: Config,
    path: PathBuf,
    mime: Option<String>,
    pretty: bool,
) -> anyhow::Result<()> {
    let file = UploadedFile::from_path(&path, mime.as_deref()).await?;
    let orchestrator = Orchestrator::new(&config);

    let result = orchestrator.extract(&file).await?;
    if let Some(warning) = orchestrator.warning_for(&result) {
        tracing::warn!(file = %path.display(), "{}", warning);
    }

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{json}");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
