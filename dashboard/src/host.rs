use std::{
    collections::BTreeMap,
    io::ErrorKind,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rumqttc::AsyncClient;
use serde::Serialize;
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use dashboard_common::{AdjustDirection, DashboardConfig, DashboardContext, FieldId, FieldValue};

use crate::mqtt;

#[derive(Clone)]
struct AppState {
    context: Arc<Mutex<DashboardContext>>,
    mqtt: AsyncClient,
}

#[derive(Debug, Serialize)]
struct FieldsView {
    view: &'static str,
    fields: BTreeMap<FieldId, FieldValue>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::var("DASHBOARD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.dashboard/config.json"));
    let mut config = load_config(&config_path)
        .await
        .with_context(|| format!("failed to load dashboard config {}", config_path.display()))?;
    config
        .apply_overrides(|key| std::env::var(key).ok())
        .context("invalid dashboard environment override")?;

    if let Ok(icon_dir) = std::env::var("DASHBOARD_ICON_DIR") {
        match load_icon_catalog(Path::new(&icon_dir), &config.icons.extension).await {
            Ok(catalog) => {
                info!("loaded {} weather icons from {icon_dir}", catalog.len());
                config.icons.catalog = catalog;
            }
            Err(err) => warn!("failed to read icon directory {icon_dir}: {err:#}"),
        }
    }

    let context = Arc::new(Mutex::new(DashboardContext::new(&config)));
    let client_id = config.view.client_id();
    info!(
        "connecting {} view to {} as {client_id}",
        config.view.as_str(),
        config.broker.ws_url()
    );
    let (mqtt, eventloop) = mqtt::connect(&config.broker, client_id);
    mqtt::spawn_mqtt_loop(
        context.clone(),
        mqtt.clone(),
        eventloop,
        config.broker.clone(),
    );

    let app_state = AppState {
        context,
        mqtt: mqtt.clone(),
    };

    let web_root = std::env::var("DASHBOARD_WEB_ROOT")
        .unwrap_or_else(|_| format!("{}/web", env!("CARGO_MANIFEST_DIR")));
    let app = router(app_state, web_root);

    let port = config.http_port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind dashboard server at {addr}"))?;

    info!("dashboard listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(err) = mqtt.disconnect().await {
        warn!("mqtt disconnect failed: {err}");
    }
    info!("dashboard stopped");
    Ok(())
}

fn router(app_state: AppState, web_root: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/api/fields", get(handle_get_fields))
        .route("/api/connection", get(handle_get_connection))
        .route("/api/setpoint/increase", post(handle_setpoint_increase))
        .route("/api/setpoint/decrease", post(handle_setpoint_decrease))
        .fallback_service(ServeDir::new(web_root.as_ref()))
        .with_state(app_state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}

async fn load_config(path: &Path) -> anyhow::Result<DashboardConfig> {
    match tokio::fs::read(path).await {
        Ok(raw) => Ok(DashboardConfig::from_json(&raw)?),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let mut config = DashboardConfig::default();
            config.sanitize();
            Ok(config)
        }
        Err(err) => Err(err.into()),
    }
}

/// Icon names available on disk, e.g. `clear-day` for `clear-day.gif`.
async fn load_icon_catalog(dir: &Path, extension: &str) -> anyhow::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut catalog = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if let Some(stem) = name.strip_suffix(extension) {
            if !stem.is_empty() {
                catalog.push(stem.to_string());
            }
        }
    }
    catalog.sort();
    Ok(catalog)
}

async fn handle_get_fields(State(state): State<AppState>) -> impl IntoResponse {
    let context = state.context.lock().await;
    Json(FieldsView {
        view: context.session().view().as_str(),
        fields: context.fields().fields().clone(),
    })
}

async fn handle_get_connection(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.context.lock().await.connection())
}

async fn handle_setpoint_increase(State(state): State<AppState>) -> impl IntoResponse {
    adjust_setpoint(state, AdjustDirection::Increase).await
}

async fn handle_setpoint_decrease(State(state): State<AppState>) -> impl IntoResponse {
    adjust_setpoint(state, AdjustDirection::Decrease).await
}

async fn adjust_setpoint(state: AppState, direction: AdjustDirection) -> axum::response::Response {
    let change = {
        let mut context = state.context.lock().await;
        context.adjust_setpoint(direction)
    };

    if change.reset_to_default {
        info!(
            "displayed setpoint '{}' is not an integer, reset to {}",
            change.previous, change.value
        );
    }

    // Never wait on the request channel here: a stalled broker would hang the request.
    if let Err(err) = mqtt::send_command(&state.mqtt, &change.command) {
        warn!("setpoint publish failed: {err}");
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Setpoint updated locally but could not be queued for the broker",
        );
    }

    handle_get_fields(State(state)).await.into_response()
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
