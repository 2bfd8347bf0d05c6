//! Router, handlers, and the serve loop.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Json, Response,
        sse::{Event, Sse},
    },
    routing::get,
};
use futures::Stream;
use mediacat_error::{MediacatError, MediacatErrorKind, MediacatResult, RegistryErrorKind,
    ServerError, ServerErrorKind};
use mediacat_notify::ChangeHub;
use mediacat_registry::{
    DedupeSweep, MediaLibrary, NewMediaAsset, ReconcileMode, Reconciler, RegistryStore,
};
use mediacat_storage::ObjectStore;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

use crate::ServerConfig;

/// Shared handler state: the registry components over one backend.
#[derive(Clone)]
pub struct AppState {
    library: MediaLibrary,
    reconciler: Reconciler,
    sweep: DedupeSweep,
    hub: ChangeHub,
}

impl AppState {
    /// Wire the registry components over the given backend and hub.
    pub fn new(store: Arc<dyn ObjectStore>, hub: ChangeHub) -> Self {
        let registry = RegistryStore::new(store.clone());
        Self {
            library: MediaLibrary::new(store.clone(), registry.clone(), hub.clone()),
            reconciler: Reconciler::new(store.clone(), registry.clone(), hub.clone()),
            sweep: DedupeSweep::new(store, registry, hub.clone()),
            hub,
        }
    }

    /// The hub handlers publish through, for wiring the keepalive task.
    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }
}

/// Creates the media API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/media",
            get(list_media).post(add_media).delete(delete_media),
        )
        .route("/api/media/sync", get(sync_status).post(sync_media))
        .route("/api/media/force-cleanup", axum::routing::post(force_cleanup))
        .route("/api/media/events", get(media_events))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Bind the listen address and serve until shutdown.
///
/// Also spawns the event-stream keepalive at the configured interval.
pub async fn serve(config: ServerConfig, state: AppState) -> MediacatResult<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| {
            ServerError::new(ServerErrorKind::Bind(format!("{}: {}", config.bind_addr, e)))
        })?;
    state.hub.spawn_keepalive(config.keepalive);
    tracing::info!(addr = %config.bind_addr, "Serving media registry API");

    axum::serve(listener, create_router(state))
        .await
        .map_err(|e| ServerError::new(ServerErrorKind::Io(e.to_string())))?;
    Ok(())
}

/// Handler-boundary error: maps registry errors onto HTTP statuses.
struct ApiError(MediacatError);

impl From<MediacatError> for ApiError {
    fn from(err: MediacatError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            MediacatErrorKind::Registry(e)
                if matches!(e.kind, RegistryErrorKind::InvalidAsset(_)) =>
            {
                StatusCode::BAD_REQUEST
            }
            _ if self.0.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({"error": format!("{}", self.0)}))).into_response()
    }
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// List registry assets, newest first.
async fn list_media(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let files = state.library.list().await?;
    Ok(Json(json!({"files": files})))
}

/// Register a new asset.
async fn add_media(
    State(state): State<AppState>,
    Json(new): Json<NewMediaAsset>,
) -> Result<impl IntoResponse, ApiError> {
    let asset = state.library.add(new).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    ids: Vec<String>,
}

/// Delete assets by id. Partial failure is a 200 with per-id errors, not
/// a failed request.
async fn delete_media(
    State(state): State<AppState>,
    Json(request): Json<DeleteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.library.delete(&request.ids).await?;
    Ok(Json(outcome))
}

/// Run a repair reconcile pass and report what changed.
async fn sync_media(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let report = state.reconciler.reconcile(ReconcileMode::Repair).await?;
    Ok(Json(json!({
        "synchronized": true,
        "removed": report.removed,
        "errors": report.errors,
    })))
}

/// Quiet variant for pollers: runs the same repair pass but reports only
/// liveness.
async fn sync_status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.reconciler.reconcile(ReconcileMode::Repair).await?;
    Ok(Json(json!({"status": "ok"})))
}

/// Full cleanup: collapse duplicate registry documents, then reconcile in
/// seed mode so orphaned objects are adopted.
async fn force_cleanup(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let sweep = state.sweep.run().await?;
    let report = state.reconciler.reconcile(ReconcileMode::Seed).await?;

    let mut errors = sweep.errors;
    errors.extend(report.errors);
    Ok(Json(json!({
        "totalBefore": report.total_before,
        "totalAfter": report.total_after,
        "removed": report.removed,
        "adopted": report.adopted,
        "sweptDocuments": sweep.removed_keys,
        "errors": errors,
    })))
}

/// Server-sent event stream of registry mutations.
///
/// Each event is one JSON object on a `data:` line. The subscription's
/// first event confirms the connection; pings arrive at the keepalive
/// interval. Dropping the connection unsubscribes the channel.
async fn media_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut sub = state.hub.subscribe();
    tracing::debug!(id = sub.id(), "Event stream opened");

    let stream = async_stream::stream! {
        while let Some(event) = sub.recv().await {
            match serde_json::to_string(&event) {
                Ok(data) => yield Ok(Event::default().data(data)),
                Err(e) => tracing::warn!(error = %e, "Skipping unserializable event"),
            }
        }
    };
    Sse::new(stream)
}
