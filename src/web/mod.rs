//! Web layer module
//!
//! Thin JSON handlers over the registry, the merge service and the scheduler.
//! Errors are mapped to status codes in [`responses`].

use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config, database::Database, ingestor::SchedulerService, services::MergeService,
};

pub mod api;
pub mod responses;

pub use responses::{handle_error, handle_result, ApiResponse};

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr =
            format!("{}:{}", state.config.web.host, state.config.web.port).parse()?;
        Ok(Self {
            app: router(state),
            addr,
        })
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Build the application router with all routes and middleware
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health_check))
        .route("/download", get(api::download_first_epg_file))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/version", get(api::get_version))
        // Sources
        .route("/sources", get(api::list_sources).post(api::create_source))
        .route("/sources/:id", delete(api::delete_source))
        .route("/sources/:id/toggle", post(api::toggle_source))
        .route("/sources/:id/test", get(api::test_source))
        // EPG files
        .route(
            "/epg-files",
            get(api::list_epg_files).post(api::create_epg_file),
        )
        .route("/epg-files/:id", delete(api::delete_epg_file))
        .route("/epg-files/:id/sources", post(api::set_epg_file_sources))
        .route("/epg-files/:id/merge", post(api::merge_epg_file))
        .route("/epg-files/:id/download", get(api::download_epg_file))
        // Jobs
        .route("/merge", post(api::merge_all))
        .route("/schedule", post(api::update_schedule))
        .route("/stats", get(api::get_stats))
        .route("/job-status", get(api::get_job_status))
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub database: Database,
    pub merge_service: Arc<MergeService>,
    pub scheduler: Arc<SchedulerService>,
}
