pub mod handlers;

use crate::client::{create_http_client, CatalogClient, UploadClient};
use crate::service::{DocumentExporter, Workflow};
use crate::AppConfig;
use axum::{
    routing::{delete, get, post},
    Router,
};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use uuid::Uuid;

pub use handlers::*;

/// Shared state: independent workflow sessions plus the outbound clients
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<DashMap<Uuid, Workflow>>,
    pub catalog: Arc<CatalogClient>,
    pub uploader: Arc<UploadClient>,
    pub export_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(catalog: CatalogClient, uploader: UploadClient, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            catalog: Arc::new(catalog),
            uploader: Arc::new(uploader),
            export_dir: Arc::new(export_dir.into()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let http = create_http_client(config.catalog_timeout())?;
        Ok(Self::new(
            CatalogClient::new(http.clone(), &config.catalog.base_url, config.catalog.min_price),
            UploadClient::new(http, &config.upload.url),
            config.export.output_dir.clone(),
        ))
    }

    /// Each session exports into its own subdirectory, so two sessions
    /// invoicing the same company never overwrite each other's document.
    pub fn exporter_for(&self, session_id: Uuid) -> DocumentExporter {
        DocumentExporter::to_dir(self.export_dir.join(session_id.to_string()))
    }
}

/// Build the full router
pub fn router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/api/sessions", post(handlers::create_session))
        .route(
            "/api/sessions/:id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/api/sessions/:id/search", post(handlers::search))
        .route("/api/sessions/:id/basket", post(handlers::select))
        .route("/api/sessions/:id/invoice", post(handlers::add_to_invoice))
        .route(
            "/api/sessions/:id/invoice/:item_id",
            delete(handlers::remove_from_invoice),
        )
        .route("/api/sessions/:id/ready", post(handlers::ready))
        .route("/api/sessions/:id/upload", post(handlers::upload))
        .with_state(state);

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(session_routes)
        .layer(ServiceBuilder::new())
}
