use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use server::alerts::{Mailer, MoistureAlerts, ResendMailer};
use server::api;
use server::app_state::AppState;
use server::classifier::GaussianNbClassifier;
use server::config::Config;
use server::oracle::OpenRouterClient;
use server::reading::LatestReading;
use server::serial_link::{run_serial_ingest, SerialSettings};
use server::store::CropStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(port = config.port, "server starting");

    let classifier = Arc::new(GaussianNbClassifier::load(&config.model_file)?);
    info!(model = %config.model_file, "classifier loaded");

    let http = reqwest::Client::builder()
        .timeout(config.ai_timeout)
        .build()?;

    let ai = Arc::new(OpenRouterClient::new(
        http.clone(),
        config.ai_base_url.clone(),
        config.ai_model.clone(),
        config.ai_api_key.clone(),
    ));
    if config.ai_api_key.is_none() {
        info!("AI_API_KEY not set; AI suggestions and profile generation disabled");
    }

    let mailer: Arc<dyn Mailer> = Arc::new(ResendMailer::new(
        http,
        config.resend_api_key.clone(),
        config.alert_emails.clone(),
    ));
    let alerts = Arc::new(MoistureAlerts::new(
        Arc::clone(&mailer),
        config.email_cooldown,
    ));

    let link = Arc::new(LatestReading::new());
    if config.serial_enabled {
        tokio::spawn(run_serial_ingest(
            SerialSettings {
                port: config.serial_port.clone(),
                baud: config.serial_baud,
            },
            Arc::clone(&link),
            Arc::clone(&alerts),
        ));
    } else {
        info!("serial ingestion disabled; expecting sensor data over HTTP");
    }

    let app_state = Arc::new(AppState {
        link,
        crops: CropStore::new(&config.crops_file),
        classifier,
        ai,
        alerts,
        mailer,
    });

    let allowed_origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| anyhow::anyhow!("invalid CORS origin '{origin}': {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    let app = api::router()
        .with_state(api::ApiState { app_state })
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
