mod agents;
mod config;
mod db;
mod error;
mod notify;
mod routes;
mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docrelay=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;

    let db = db::connect(&config).await?;
    tracing::info!("MongoDB connection established");
    let records = db.collection::<db::SubmissionRecord>(&config.collection_name);

    let docai = agents::DocAiClient::new(&config)?;
    tracing::info!("Document AI client initialized");

    let llm = agents::OpenAiAgent::new(
        config.azure_openai_key.clone(),
        config.azure_openai_endpoint.clone(),
        config.azure_openai_deployment.clone(),
        config.azure_openai_api_version.clone(),
    );
    tracing::info!("Azure OpenAI client initialized");

    let mailer = notify::Mailer::from_config(&config)?;
    tracing::info!("SMTP transport configured");

    let state = Arc::new(state::AppState {
        db,
        records,
        docai,
        llm,
        mailer,
    });

    let app = Router::new()
        .route("/upload", post(routes::upload_pdf))
        .route("/chat", post(routes::chat))
        .route("/all", get(routes::list_records))
        .route("/health", get(routes::health_check))
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("docrelay listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
