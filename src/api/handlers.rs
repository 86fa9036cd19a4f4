use crate::api::AppState;
use crate::client::UploadError;
use crate::models::{ExportReport, ItemId};
use crate::service::{ExportError, Workflow, WorkflowError, WorkflowSnapshot};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub item_id: ItemId,
}

#[derive(Debug, Serialize)]
pub struct Selected {
    pub basket_item_id: ItemId,
}

/// Companies whose exported documents should be uploaded
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Uploaded {
    pub files: usize,
}

fn respond<T: Serialize>(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Response {
    let response = ApiResponse {
        success: status.is_success(),
        message: message.into(),
        data,
    };
    (status, Json(response)).into_response()
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    respond::<()>(status, message, None)
}

fn session_not_found(id: Uuid) -> Response {
    error(StatusCode::NOT_FOUND, format!("Session {} not found", id))
}

fn workflow_error(e: WorkflowError) -> Response {
    let status = match e {
        WorkflowError::UnknownItem(_) => StatusCode::NOT_FOUND,
        WorkflowError::InvalidTransition { .. } => StatusCode::CONFLICT,
    };
    error(status, format!("Error: {}", e))
}

fn export_error(e: ExportError) -> Response {
    let status = match e {
        ExportError::UnsafeGroupKey { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ExportError::Io { .. } | ExportError::Csv { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error(status, format!("Error: {}", e))
}

/// Run a synchronous workflow step while holding the session's entry
fn with_session<T>(state: &AppState, id: Uuid, f: impl FnOnce(&mut Workflow) -> T) -> Option<T> {
    state.sessions.get_mut(&id).map(|mut wf| f(wf.value_mut()))
}

/// Health check
pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn create_session(State(state): State<AppState>) -> Response {
    let session_id = Uuid::new_v4();
    state.sessions.insert(session_id, Workflow::new());
    tracing::info!("Session {} started ({} active)", session_id, state.sessions.len());

    respond(
        StatusCode::CREATED,
        "Session created",
        Some(SessionCreated { session_id }),
    )
}

pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match with_session(&state, id, |wf| wf.snapshot()) {
        Some(snapshot) => respond::<WorkflowSnapshot>(StatusCode::OK, "OK", Some(snapshot)),
        None => session_not_found(id),
    }
}

pub async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.sessions.remove(&id) {
        Some(_) => {
            tracing::info!("Session {} ended", id);
            respond::<()>(StatusCode::OK, "Session ended", None)
        }
        None => session_not_found(id),
    }
}

/// Search the catalog and replace the session's search results.
///
/// On catalog failure the current results stay as they are and the failure
/// is reported.
pub async fn search(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SearchRequest>,
) -> Response {
    if !state.sessions.contains_key(&id) {
        return session_not_found(id);
    }

    let items = match state.catalog.search(&req.query).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("Session {}: catalog search {:?} failed: {}", id, req.query, e);
            return error(StatusCode::BAD_GATEWAY, format!("Error: {}", e));
        }
    };

    match with_session(&state, id, |wf| {
        wf.replace_search_results(items);
        wf.snapshot()
    }) {
        Some(snapshot) => respond(
            StatusCode::OK,
            format!("{} search results", snapshot.search_results.len()),
            Some(snapshot),
        ),
        None => session_not_found(id),
    }
}

pub async fn select(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ItemRequest>,
) -> Response {
    match with_session(&state, id, |wf| wf.select(req.item_id)) {
        Some(Ok(basket_item_id)) => respond(
            StatusCode::OK,
            format!("Item {} added to basket", req.item_id),
            Some(Selected { basket_item_id }),
        ),
        Some(Err(e)) => workflow_error(e),
        None => session_not_found(id),
    }
}

pub async fn add_to_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ItemRequest>,
) -> Response {
    match with_session(&state, id, |wf| wf.add_to_invoice(req.item_id)) {
        Some(Ok(())) => respond::<()>(
            StatusCode::OK,
            format!("Item {} added to invoice", req.item_id),
            None,
        ),
        Some(Err(e)) => workflow_error(e),
        None => session_not_found(id),
    }
}

pub async fn remove_from_invoice(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, ItemId)>,
) -> Response {
    match with_session(&state, id, |wf| wf.remove_from_invoice(item_id)) {
        Some(Ok(())) => respond::<()>(
            StatusCode::OK,
            format!("Item {} returned to basket", item_id),
            None,
        ),
        Some(Err(e)) => workflow_error(e),
        None => session_not_found(id),
    }
}

/// Export the invoice, one document per company.
///
/// The invoice is snapshotted under the session guard, the documents are
/// written on the blocking pool with no guard held, and the written entries
/// are cleared afterwards.
pub async fn ready(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let Some(groups) = with_session(&state, id, |wf| wf.begin_export()) else {
        return session_not_found(id);
    };

    let exporter = state.exporter_for(id);
    let report = match tokio::task::spawn_blocking(move || exporter.export(&groups)).await {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => return export_error(e),
        Err(e) => {
            tracing::error!("Session {}: export task failed: {}", id, e);
            return error(StatusCode::INTERNAL_SERVER_ERROR, "Error: export task failed");
        }
    };

    if with_session(&state, id, |wf| wf.finish_export(&report)).is_none() {
        tracing::warn!("Session {} ended during export", id);
    }

    let status = if report.is_complete() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let message = format!(
        "{} documents written, {} failed",
        report.written_count(),
        report.failed_count()
    );
    respond::<ExportReport>(status, message, Some(report))
}

/// Upload previously exported documents, named by company
pub async fn upload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UploadRequest>,
) -> Response {
    if !state.sessions.contains_key(&id) {
        return session_not_found(id);
    }

    let exporter = state.exporter_for(id);
    let paths = match req
        .files
        .iter()
        .map(|company| exporter.writer().document_path(company))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(paths) => paths,
        Err(e) => return export_error(e),
    };

    match state.uploader.upload(&paths).await {
        Ok(files) => respond(
            StatusCode::OK,
            format!("Uploaded {} files", files),
            Some(Uploaded { files }),
        ),
        Err(e) => {
            tracing::warn!("Session {}: upload failed: {}", id, e);
            let status = match e {
                UploadError::NoFiles => StatusCode::BAD_REQUEST,
                UploadError::Io { .. } => StatusCode::NOT_FOUND,
                UploadError::Network(_) | UploadError::Api(..) => StatusCode::BAD_GATEWAY,
            };
            error(status, format!("Error: {}", e))
        }
    }
}
