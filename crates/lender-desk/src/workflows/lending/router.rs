use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{FileId, FileRecord, LenderId, OpportunityId};
use super::drafts::{DraftFlushError, FileGrid, RecordFieldEdit};
use super::eligibility::FilterMode;
use super::gateway::RemoteCallError;
use super::submission::SubmissionError;
use super::workspace::{LendingService, WorkspaceError};

/// Router builder exposing the lender panel, submission, and document grid.
pub fn lending_router(service: Arc<LendingService>) -> Router {
    Router::new()
        .route(
            "/api/v1/opportunities/:opportunity_id/lenders",
            get(lenders_handler),
        )
        .route(
            "/api/v1/opportunities/:opportunity_id/submissions",
            post(submit_handler),
        )
        .route(
            "/api/v1/opportunities/:opportunity_id/files",
            get(files_handler).patch(save_files_handler),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LenderQuery {
    #[serde(default)]
    filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionRequest {
    #[serde(default)]
    lender_ids: Vec<LenderId>,
    #[serde(default)]
    file_ids: Option<Vec<FileId>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileEditsRequest {
    #[serde(default)]
    edits: Vec<RecordFieldEdit>,
}

#[derive(Debug, Serialize)]
struct FileRowView {
    #[serde(flatten)]
    record: FileRecord,
    file_url: String,
}

#[derive(Debug, Serialize)]
struct FileGridView {
    opportunity_id: OpportunityId,
    type_options: Vec<String>,
    accepted_formats: String,
    files: Vec<FileRowView>,
}

impl From<&FileGrid> for FileGridView {
    fn from(grid: &FileGrid) -> Self {
        Self {
            opportunity_id: grid.opportunity_id().clone(),
            type_options: grid.type_options().to_vec(),
            accepted_formats: grid.upload_policy().accepted_list(),
            files: grid
                .rows()
                .iter()
                .map(|record| FileRowView {
                    file_url: record.view_url(),
                    record: record.clone(),
                })
                .collect(),
        }
    }
}

pub(crate) async fn lenders_handler(
    State(service): State<Arc<LendingService>>,
    Path(opportunity_id): Path<String>,
    Query(query): Query<LenderQuery>,
) -> Response {
    let mode = match query.filter.as_deref() {
        Some(raw) => match FilterMode::from_str(raw) {
            Ok(mode) => mode,
            Err(error) => return error_response(StatusCode::BAD_REQUEST, error.to_string()),
        },
        None => FilterMode::default(),
    };

    match service
        .lender_board(OpportunityId(opportunity_id), mode)
        .await
    {
        Ok(board) => (StatusCode::OK, axum::Json(board)).into_response(),
        Err(WorkspaceError::DataShape(error)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        Err(WorkspaceError::Remote(error)) => remote_error_response(&error),
    }
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<LendingService>>,
    Path(opportunity_id): Path<String>,
    axum::Json(request): axum::Json<SubmissionRequest>,
) -> Response {
    let opportunity_id = OpportunityId(opportunity_id);
    match service
        .submit_selection(&opportunity_id, request.lender_ids, request.file_ids)
        .await
    {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(SubmissionError::Validation(error)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        Err(SubmissionError::Remote {
            step,
            completed_steps,
            source,
            ..
        }) => {
            let payload = json!({
                "error": source.message(),
                "failed_step": step,
                "completed_steps": completed_steps,
            });
            (remote_status(&source), axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn files_handler(
    State(service): State<Arc<LendingService>>,
    Path(opportunity_id): Path<String>,
) -> Response {
    match service.file_grid(OpportunityId(opportunity_id)).await {
        Ok(grid) => (StatusCode::OK, axum::Json(FileGridView::from(&grid))).into_response(),
        Err(error) => remote_error_response(&error),
    }
}

pub(crate) async fn save_files_handler(
    State(service): State<Arc<LendingService>>,
    Path(opportunity_id): Path<String>,
    axum::Json(request): axum::Json<FileEditsRequest>,
) -> Response {
    match service
        .save_file_edits(OpportunityId(opportunity_id), request.edits)
        .await
    {
        Ok((grid, Ok(report))) => {
            let payload = json!({
                "updated": report.updated,
                "grid": FileGridView::from(&grid),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok((grid, Err(error))) => {
            let failed = match &error {
                DraftFlushError::Partial { failed, .. } => failed.clone(),
                DraftFlushError::Remote(_) => Vec::new(),
            };
            let payload = json!({
                "error": error.to_string(),
                "failed": failed,
                "grid": FileGridView::from(&grid),
            });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
        Err(error) => remote_error_response(&error),
    }
}

fn remote_status(error: &RemoteCallError) -> StatusCode {
    match error {
        RemoteCallError::NotFound(_) => StatusCode::NOT_FOUND,
        RemoteCallError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        RemoteCallError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
}

fn remote_error_response(error: &RemoteCallError) -> Response {
    error_response(remote_status(error), error.message().to_string())
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, axum::Json(json!({ "error": message }))).into_response()
}
