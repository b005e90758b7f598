mod batch;
mod classifier;
mod config;
mod engine;
mod error;
mod media;
mod repository;
mod routes;
mod text_model;
mod types;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use batch::BatchedAnalyzer;
use classifier::Classifier;
use config::{BatchConfig, Config};
use engine::Engine;
use repository::VerificationRepository;
use text_model::{TextModel, TextModelConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,verifica=debug".into()),
        )
        .init();

    let config = Config::parse();
    tracing::info!("Starting verification service with config: {:?}", config);

    // Validate that either model_id or model_path is provided
    if config.model_id.is_none() && config.model_path.is_none() {
        anyhow::bail!("Either --model-id or --model-path must be provided");
    }

    let batch_config = BatchConfig::from(&config);

    let model_config = TextModelConfig {
        model_id: config.model_id.clone(),
        model_path: config.model_path.clone(),
        revision: config.model_revision.clone(),
        use_pth: config.use_pth,
        cpu: config.cpu_only,
        max_sequence_length: config.max_sequence_length,
        id2label: config.parse_id2label(),
    };

    tracing::info!("Loading text classification model...");
    let text_model = TextModel::new(model_config).await?;
    tracing::info!("Model loaded successfully");

    let (analyzer, worker) = BatchedAnalyzer::new(batch_config.clone(), text_model);

    // Spawn background task to process analysis batches
    tokio::spawn(async move {
        tracing::info!("Starting batch worker");
        if let Err(e) = worker.run_forever().await {
            tracing::error!("Batch worker error: {}", e);
        }
    });

    let pool = VerificationRepository::connect(&config.database_url).await?;
    tracing::info!(database_url = %config.database_url, "Database ready");

    let state = AppState::new(
        Arc::new(analyzer),
        Arc::new(Classifier::new(config.confidence_threshold)),
        VerificationRepository::new(pool),
    );

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = build_router(state, &config.static_dir, config.max_upload_bytes())
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());
    tracing::info!(
        "Batch size: {}, Tick duration: {:?}",
        batch_config.batch_size,
        batch_config.tick_duration
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn Engine + Send + Sync>,
    pub classifier: Arc<Classifier>,
    pub repository: VerificationRepository,
}

impl AppState {
    fn new(
        engine: Arc<dyn Engine + Send + Sync>,
        classifier: Arc<Classifier>,
        repository: VerificationRepository,
    ) -> Self {
        Self {
            engine,
            classifier,
            repository,
        }
    }
}

fn build_router(state: AppState, static_dir: &Path, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/v1/verify", post(routes::verify))
        .route("/api/v1/verify/file", post(routes::verify_file))
        .route("/api/v1/status/:id", get(routes::status))
        .route("/api/v1/verifications", get(routes::list_verifications))
        .route("/api/v1/health", get(routes::health))
        .nest_service("/static", ServeDir::new(static_dir))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
