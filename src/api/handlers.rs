//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::sse::sse_stream;
use super::types::{
    AttachmentResponse, ChatRequest, ChatResponse, ErrorResponse, MessagesResponse,
    QuestionRequest, SectionRequest, SuccessResponse,
};
use super::AppState;
use crate::dashboard::{section_prompt, DashboardLayout, RECENT_QUESTIONS, VIDEO_ANALYSIS_PROMPT};
use crate::media::MediaError;
use crate::runtime::{PendingRequest, SubmitError};
use crate::state_machine::TransitionError;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};

/// Largest accepted image or video upload
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Header carrying the original file name of an upload
const FILE_NAME_HEADER: &str = "x-file-name";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Root serves the dashboard page
        .route("/", get(serve_spa))
        .route("/assets/*path", get(serve_static))
        .route("/api/dashboard", get(get_dashboard))
        // Conversation
        .route("/api/messages", get(get_messages))
        .route("/api/chat", post(send_chat))
        .route("/api/chat/stream", get(stream_chat))
        // Sidebar shortcuts
        .route("/api/suggestions/section", post(ask_section))
        .route("/api/suggestions/question", post(ask_question))
        // Media
        .route("/api/attachments", post(upload_attachment))
        .route("/api/attachments/:locator", delete(remove_attachment))
        .route("/api/video", put(upload_video).delete(clear_video))
        .route("/api/video/analyze", post(analyze_video))
        .route("/media/:locator", get(serve_media))
        // Version
        .route("/version", get(get_version))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

// ============================================================
// Page
// ============================================================

async fn serve_spa() -> impl IntoResponse {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - UI not found</h1>".to_string()),
        )
            .into_response(),
    }
}

async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardLayout> {
    Json(state.layout.as_ref().clone())
}

// ============================================================
// Conversation
// ============================================================

async fn get_messages(State(state): State<AppState>) -> Json<MessagesResponse> {
    let snapshot = state.runtime.snapshot().await;
    Json(MessagesResponse {
        awaiting_response: snapshot.state.is_awaiting(),
        messages: snapshot.messages,
        state: snapshot.state,
        attachments: snapshot.attachments,
        video: snapshot.video,
    })
}

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let outcome = state.runtime.begin(&req.text, &req.attachments).await;
    dispatch(&state, outcome)
}

async fn stream_chat(State(state): State<AppState>) -> impl IntoResponse {
    let (init_event, broadcast_rx) = state.runtime.subscribe_with_init().await;
    sse_stream(init_event, broadcast_rx)
}

async fn ask_section(
    State(state): State<AppState>,
    Json(req): Json<SectionRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    require(state.features().sidebar, "Sidebar is disabled")?;
    let outcome = state.runtime.begin(&section_prompt(&req.section), &[]).await;
    dispatch(&state, outcome)
}

async fn ask_question(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    require(state.features().sidebar, "Sidebar is disabled")?;
    let question = RECENT_QUESTIONS
        .get(req.index)
        .ok_or_else(|| AppError::NotFound(format!("No recent question at index {}", req.index)))?;
    let outcome = state.runtime.begin(question, &[]).await;
    dispatch(&state, outcome)
}

/// Run an accepted submission in the background and answer immediately;
/// clients follow the placeholder over the stream
fn dispatch(
    state: &AppState,
    outcome: Result<PendingRequest, SubmitError>,
) -> Result<Json<ChatResponse>, AppError> {
    match outcome {
        Ok(request) => {
            let message_id = request.message_id.clone();
            let runtime = state.runtime.clone();
            tokio::spawn(async move {
                runtime.complete(request).await;
            });
            Ok(Json(ChatResponse::accepted(message_id)))
        }
        Err(e) if e.is_ignored() => Ok(Json(ChatResponse::ignored())),
        Err(e) => Err(e.into()),
    }
}

// ============================================================
// Media
// ============================================================

async fn upload_attachment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AttachmentResponse>, AppError> {
    let (content_type, file_name) = upload_headers(&headers)?;
    let attachment = state
        .runtime
        .add_attachment(file_name.as_deref(), &content_type, body.to_vec())
        .await?;
    Ok(Json(attachment.into()))
}

async fn remove_attachment(
    State(state): State<AppState>,
    Path(locator): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.runtime.remove_attachment(&locator).await {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(MediaError::NotFound(locator).into())
    }
}

async fn upload_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AttachmentResponse>, AppError> {
    require(state.features().video_analysis, "Video analysis is disabled")?;
    let (content_type, file_name) = upload_headers(&headers)?;
    let attachment = state
        .runtime
        .set_video(file_name.as_deref(), &content_type, body.to_vec())
        .await?;
    Ok(Json(attachment.into()))
}

async fn clear_video(State(state): State<AppState>) -> Json<SuccessResponse> {
    Json(SuccessResponse {
        success: state.runtime.clear_video().await,
    })
}

async fn analyze_video(State(state): State<AppState>) -> Result<Json<ChatResponse>, AppError> {
    require(state.features().video_analysis, "Video analysis is disabled")?;
    let outcome = state.runtime.begin_video_analysis(VIDEO_ANALYSIS_PROMPT).await;
    dispatch(&state, outcome)
}

async fn serve_media(
    State(state): State<AppState>,
    Path(locator): Path<String>,
) -> Result<Response, AppError> {
    let blob = state
        .runtime
        .media(&locator)
        .ok_or(MediaError::NotFound(locator))?;
    let disposition = match &blob.file_name {
        Some(name) => format!("inline; filename=\"{}\"", name.replace('"', "")),
        None => "inline".to_string(),
    };
    Ok((
        [
            (header::CONTENT_TYPE, blob.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        blob.bytes.to_vec(),
    )
        .into_response())
}

fn upload_headers(headers: &HeaderMap) -> Result<(String, Option<String>), AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Content-Type".to_string()))?
        .to_string();
    let file_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Ok((content_type, file_name))
}

fn require(enabled: bool, message: &str) -> Result<(), AppError> {
    if enabled {
        Ok(())
    } else {
        Err(AppError::NotFound(message.to_string()))
    }
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("nyaya-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<MediaError> for AppError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::NotFound(_) => AppError::NotFound(e.to_string()),
            MediaError::Unsupported(_) | MediaError::NotVideo(_) => {
                AppError::BadRequest(e.to_string())
            }
        }
    }
}

impl From<SubmitError> for AppError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Rejected(TransitionError::InvalidTransition(_)) => {
                AppError::Internal(e.to_string())
            }
            SubmitError::Rejected(_) | SubmitError::Media(_) | SubmitError::NoVideo => {
                AppError::BadRequest(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
