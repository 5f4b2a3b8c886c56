mod config;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::info;

use deepread_bridge::{is_pdf_context, ExtensionBridge, PageContext, ReaderOpener, SystemOpener};
use deepread_core::wire::{ChatQuery, ChatWithPdfResponse};
use deepread_core::{DocumentSource, Rotation};
use deepread_gateway::{start_server, GatewayState};
use deepread_rag::HttpRagBackend;
use deepread_viewer::{
    DocumentLoader, FrameSurface, PopplerRenderer, ReaderLocation, ReaderQuery, RenderEngine,
    RenderStatus,
};

use config::Config;

#[derive(Parser)]
#[command(name = "deepread")]
#[command(about = "DeepRead: read PDFs and ask questions about them")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $DEEPREAD_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overriding config and RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        pdf_dir: Option<PathBuf>,
        #[arg(long)]
        backend_url: Option<String>,
    },
    /// Check whether the gateway is up
    Status,
    /// Print page count and page geometry of a document
    Info {
        /// URL or path; defaults to the last document opened in the reader
        locator: Option<String>,
    },
    /// Render one page to a PNG file
    Render {
        locator: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = deepread_core::DEFAULT_SCALE)]
        scale: f32,
        /// Clockwise rotation in degrees (0, 90, 180, 270)
        #[arg(long, default_value_t = 0)]
        rotate: i32,
        #[arg(short, long, default_value = "page.png")]
        out: PathBuf,
    },
    /// Check whether a page URL looks like a PDF
    Detect {
        url: String,
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Upload a PDF URL to the gateway and open it in the reader
    Open {
        pdf_url: String,
        /// Print the reader URL instead of launching a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Ask a question about the current document
    Ask { query: String },
}

/// Prints the reader URL instead of opening it.
struct PrintOpener;

#[async_trait]
impl ReaderOpener for PrintOpener {
    async fn open(&self, url: &str) -> deepread_core::Result<()> {
        println!("{url}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut config = Config::load(&config_path)?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    deepread_logging::init_logger(config.log_dir.as_deref(), &config.log_level);

    match cli.command {
        Commands::Serve {
            port,
            bind,
            pdf_dir,
            backend_url,
        } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                bind_address: bind.unwrap_or(config.bind_address),
                pdf_dir: pdf_dir.unwrap_or(config.pdf_dir),
                backend_url: backend_url.unwrap_or(config.backend_url),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            match client
                .get(format!("{}/api/health", config.gateway_url))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("DeepRead gateway is not running at {}", config.gateway_url);
                }
            }
        }
        Commands::Info { locator } => {
            let source = resolve_source(&config, locator.as_deref())?;
            let document = DocumentLoader::new().load(&source).await?;
            println!("{}", document.name());
            println!("  source: {source}");
            println!("  pages:  {}", document.page_count());
            if let Some(size) = document.page_size(1) {
                println!("  page 1: {:.0} x {:.0} pt", size.width, size.height);
            }
        }
        Commands::Render {
            locator,
            page,
            scale,
            rotate,
            out,
        } => {
            let source = resolve_source(&config, locator.as_deref())?;
            let rotation = Rotation::from_degrees(rotate)
                .with_context(|| format!("Rotation must be a multiple of 90, got {rotate}"))?;
            render_to_file(source, page, scale, rotation, &out).await?;
        }
        Commands::Detect { url, content_type } => {
            let mut page = PageContext::new(url);
            if let Some(ct) = content_type {
                page = page.with_content_type(ct);
            }
            let verdict = if is_pdf_context(&page) { "PDF" } else { "not a PDF" };
            println!("{}: {verdict}", page.url);
        }
        Commands::Open { pdf_url, no_browser } => {
            let opener: Arc<dyn ReaderOpener> = if no_browser {
                Arc::new(PrintOpener)
            } else {
                Arc::new(SystemOpener)
            };
            let bridge = ExtensionBridge::new(&config.gateway_url, &config.reader_url, opener);
            let location = bridge.activate(&pdf_url).await?;
            state::save(&state::default_state_path(), &location.remember())?;
            if !no_browser {
                println!("Opened {}", bridge.reader_link(&location));
            }
        }
        Commands::Ask { query } => ask(&config, query).await?,
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        pdf_dir = %config.pdf_dir.display(),
        backend = %config.backend_url,
        "Starting DeepRead gateway"
    );
    let backend = Arc::new(HttpRagBackend::new().with_base_url(&config.backend_url));
    let state = GatewayState::new(&config.pdf_dir, backend);
    start_server(config.socket_addr()?, state).await
}

/// An explicit locator wins; otherwise fall back to the last document opened.
fn resolve_source(config: &Config, locator: Option<&str>) -> Result<DocumentSource> {
    if let Some(locator) = locator {
        return Ok(DocumentSource::parse(locator));
    }
    let stored = state::load(&state::default_state_path());
    let location = ReaderLocation::resolve(&ReaderQuery::default(), &stored)
        .context("No document given and none opened before")?;
    Ok(location.source(&config.gateway_url)?)
}

async fn render_to_file(
    source: DocumentSource,
    page: u32,
    scale: f32,
    rotation: Rotation,
    out: &std::path::Path,
) -> Result<()> {
    let surface = FrameSurface::new();
    let renderer = Arc::new(PopplerRenderer::new(surface.clone()));
    let mut engine = RenderEngine::new(renderer);

    engine.load_document_at(source, page, scale, rotation).await?;

    match engine.finish_render().await {
        RenderStatus::Rendered { viewport, .. } => {
            let frame = surface.current().context("Renderer produced no frame")?;
            frame
                .image
                .save(out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            let session = engine.session().context("Document was unloaded")?;
            println!(
                "{} ({}, {}) {}x{} -> {}",
                session.page_label(),
                session.zoom_label(),
                session.rotation().degrees(),
                viewport.width,
                viewport.height,
                out.display()
            );
            Ok(())
        }
        RenderStatus::Notice { message, .. } => bail!("{message}"),
        other => bail!("Render did not complete: {other:?}"),
    }
}

async fn ask(config: &Config, query: String) -> Result<()> {
    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", config.gateway_url))
        .json(&ChatQuery { query })
        .send()
        .await
        .with_context(|| format!("DeepRead gateway is not reachable at {}", config.gateway_url))?;
    let body: ChatWithPdfResponse = response.json().await?;
    match (body.answer, body.error) {
        (Some(answer), _) => println!("{answer}"),
        (None, Some(error)) => bail!("{error}"),
        (None, None) => bail!("Empty reply from the gateway"),
    }
    Ok(())
}
