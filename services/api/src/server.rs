use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryQuestionnaireRepository, InMemoryScreeningResultRepository};
use crate::routes::with_screening_routes;
use aom_screening::config::AppConfig;
use aom_screening::error::AppError;
use aom_screening::screening::{CatalogStore, DrugCatalog, ScreeningService};
use aom_screening::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(catalog) = args.catalog.take() {
        config.catalog.path = Some(catalog);
    }

    telemetry::init(&config.telemetry)?;

    // Startup loads are strict: a malformed catalog keeps the service down.
    let catalog = match &config.catalog.path {
        Some(path) => DrugCatalog::from_path(path).map_err(|err| {
            error!(path = %path.display(), error = %err, "refusing to start with invalid drug catalog");
            err
        })?,
        None => DrugCatalog::standard(),
    };
    info!(
        version = catalog.version(),
        drugs = catalog.drugs().len(),
        "drug catalog loaded"
    );
    let catalog = Arc::new(CatalogStore::new(catalog));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        catalog: catalog.clone(),
        catalog_path: config.catalog.path.clone(),
    };

    let service = Arc::new(ScreeningService::new(
        Arc::new(InMemoryQuestionnaireRepository::default()),
        Arc::new(InMemoryScreeningResultRepository::default()),
        catalog,
    ));

    let app = with_screening_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "aom screening service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
