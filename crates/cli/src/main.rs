use analyst_core::client::http::HttpAnalysisClient;
use analyst_core::client::AnalysisService;
use analyst_core::config::Settings;
use analyst_core::export::{DocumentExportEngine, ImageFileSurface};
use analyst_core::orchestrator::session::SubmitOutcome;
use analyst_core::orchestrator::QueryOrchestrator;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod chat;

const DEFAULT_MAP_OUT: &str = "region-map.svg";

#[derive(Debug, Parser)]
#[command(name = "analyst_cli")]
struct Args {
    /// Ask a single question, print the result and exit.
    #[arg(long)]
    query: Option<String>,

    /// Export the resolved report to PDF (one-shot mode).
    #[arg(long)]
    export: bool,

    /// Pre-rendered report snapshot (PNG or JPEG) to paginate into the PDF.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Region map SVG. Overrides MAP_SVG_PATH.
    #[arg(long)]
    map: Option<PathBuf>,

    /// Where to write the highlighted region map.
    #[arg(long)]
    map_out: Option<PathBuf>,

    /// Output directory for exported files. Overrides EXPORT_DIR.
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    if let Some(dir) = args.export_dir.clone() {
        settings.export_dir = Some(dir);
    }
    if let Some(map) = args.map.clone() {
        settings.map_svg_path = Some(map);
    }

    if let Err(err) = run(args, settings).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "analyst cli failed");
        return Err(err);
    }
    Ok(())
}

async fn run(args: Args, settings: Settings) -> anyhow::Result<()> {
    let service: Arc<dyn AnalysisService> = Arc::new(HttpAnalysisClient::from_settings(&settings)?);
    tracing::info!(service = service.service_name(), "analysis service ready");

    let map = chat::MapOptions {
        svg_path: settings.map_svg_path.clone(),
        out_path: args
            .map_out
            .clone()
            .unwrap_or_else(|| settings.export_dir_or_default().join(DEFAULT_MAP_OUT)),
    };
    let mut app = chat::ChatApp::new(
        QueryOrchestrator::new(service),
        DocumentExportEngine::from_settings(&settings),
        args.snapshot.clone().map(ImageFileSurface::new),
        map,
    );

    let Some(query) = args.query.as_deref() else {
        return app.run_interactive().await;
    };

    let outcome = app.ask(query).await;
    if outcome != SubmitOutcome::Resolved {
        tracing::info!(%query, ?outcome, "query did not produce a report");
        return Ok(());
    }

    if args.export {
        app.export().await;
    }
    if args.map_out.is_some() || settings.map_svg_path.is_some() {
        app.write_map().await?;
    }
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
