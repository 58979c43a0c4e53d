use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::responses::{created, handle_error, handle_result, ok, ApiResponse};
use super::AppState;
use crate::errors::{AppError, AppResult};
use crate::ingestor::ScheduleState;
use crate::models::*;

pub async fn health_check() -> Response {
    ok(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
    }))
}

pub async fn get_version() -> Response {
    ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "EPG Merger",
        "description": "Multiple EPG XML file merger with scheduling",
    }))
}

// Sources API
pub async fn list_sources(State(state): State<AppState>) -> Response {
    handle_result(state.database.list_sources().await)
}

pub async fn create_source(
    State(state): State<AppState>,
    Json(payload): Json<SourceCreateRequest>,
) -> Response {
    match state.database.create_source(&payload).await {
        Ok(source) => created(source),
        Err(e) => handle_error(e),
    }
}

pub async fn delete_source(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    handle_result(state.database.delete_source(id).await)
}

pub async fn toggle_source(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    handle_result(state.database.toggle_source(id).await)
}

pub async fn test_source(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    handle_result(state.merge_service.test_fetch(id).await)
}

// EPG files API
pub async fn list_epg_files(State(state): State<AppState>) -> Response {
    handle_result(state.database.list_epg_outputs().await)
}

pub async fn create_epg_file(
    State(state): State<AppState>,
    Json(payload): Json<EpgOutputCreateRequest>,
) -> Response {
    match state.database.create_epg_output(&payload).await {
        Ok(output) => {
            // The first output makes a schedule meaningful
            if state.scheduler.state().await == ScheduleState::Idle {
                if let Err(e) = state.scheduler.start_if_configured().await {
                    warn!("Failed to arm scheduler: {}", e);
                }
            }
            created(output)
        }
        Err(e) => handle_error(e),
    }
}

pub async fn delete_epg_file(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    handle_result(state.merge_service.delete_output(id).await)
}

pub async fn set_epg_file_sources(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<EpgOutputSourcesRequest>,
) -> Response {
    handle_result(state.database.set_epg_output_sources(id, payload.sources).await)
}

pub async fn merge_epg_file(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    info!("Manual merge requested for EPG file {}", id);
    merge_response(
        state.merge_service.merge_one(id).await,
        "EPG file merged successfully",
        "EPG file merge failed",
    )
}

pub async fn download_epg_file(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    match state.merge_service.stored_document(id).await {
        Ok((file_name, contents)) => xml_attachment(&file_name, contents),
        Err(e) => handle_error(e),
    }
}

/// Stored document of the first configured output
pub async fn download_first_epg_file(State(state): State<AppState>) -> Response {
    let first = match state.database.list_epg_outputs().await {
        Ok(outputs) => outputs.into_iter().next(),
        Err(e) => return handle_error(e),
    };
    let Some(output) = first else {
        return handle_error(AppError::NoOutputs);
    };
    match state.merge_service.stored_document(output.id).await {
        Ok((file_name, contents)) => xml_attachment(&file_name, contents),
        Err(e) => handle_error(e),
    }
}

// Jobs API
pub async fn merge_all(State(state): State<AppState>) -> Response {
    info!("Manual merge requested for all EPG files");
    merge_response(
        state.merge_service.merge_all().await,
        "EPG merge completed",
        "EPG merge failed",
    )
}

pub async fn update_schedule(
    State(state): State<AppState>,
    Json(payload): Json<ScheduleUpdateRequest>,
) -> Response {
    let result = match payload.interval {
        Some(secs) => state.scheduler.configure_schedule(secs).await,
        None => Err(AppError::validation(format!(
            "Interval must be at least {} seconds",
            MIN_SCHEDULE_INTERVAL_SECS
        ))),
    };
    handle_result(result.map(|_| json!({ "interval": payload.interval })))
}

pub async fn get_stats(State(state): State<AppState>) -> Response {
    handle_result(state.merge_service.output_stats().await)
}

pub async fn get_job_status(State(state): State<AppState>) -> Response {
    ok(state.merge_service.current_status().await)
}

fn merge_response(result: AppResult<bool>, done: &str, failed: &str) -> Response {
    match result {
        Ok(true) => ok(json!({ "message": done })),
        Ok(false) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error(failed.to_string())),
        )
            .into_response(),
        Err(e) => handle_error(e),
    }
}

fn xml_attachment(file_name: &str, contents: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file_name.replace('"', "_"));
    (
        [
            (header::CONTENT_TYPE, "application/xml; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        contents,
    )
        .into_response()
}
