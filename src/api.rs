//! HTTP API endpoints of one tab.
//!
//! Read-only endpoints are open; uploads and imports sit behind the admin
//! password and are further limited by what the tab's role may originate.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::error::AppError;
use crate::protocol::SyncAction;
use crate::session::{Dispatch, Session};
use crate::state::GameState;
use crate::types::{ImageLayer, LogoConfig};
use crate::ws;

/// Uploaded images and sounds travel inline as data URLs
const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

/// All routes of one tab, to be nested under `/{role}`
pub fn router(session: Session) -> Router {
    let admin_routes = Router::new()
        .route("/api/questions/import", post(import_questions))
        .route("/api/assets/{target}", post(upload_asset))
        .route("/api/sounds", post(upload_sound))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn_with_state(
            session.clone(),
            auth::admin_auth_middleware,
        ));

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/state", get(get_state))
        .route("/api/admin/login", post(admin_login))
        .route("/api/questions/export", get(export_questions))
        .merge(admin_routes)
        .with_state(session)
}

#[derive(Debug, Serialize)]
pub struct ChangeResponse {
    pub changed: bool,
}

fn change_response(session: &Session, outcome: Dispatch) -> Result<Json<ChangeResponse>, AppError> {
    match outcome {
        Dispatch::Applied => Ok(Json(ChangeResponse { changed: true })),
        Dispatch::Unchanged => Ok(Json(ChangeResponse { changed: false })),
        Dispatch::Forbidden => Err(AppError::Forbidden(format!(
            "the {} tab cannot make this change",
            session.role
        ))),
    }
}

/// Current state of the tab.
///
/// GET /api/state
pub async fn get_state(State(session): State<Session>) -> Json<GameState> {
    Json(session.snapshot().await)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub ok: bool,
}

/// Check the admin password. A wrong password is an answer, not an error.
///
/// POST /api/admin/login
pub async fn admin_login(
    State(session): State<Session>,
    Json(request): Json<LoginRequest>,
) -> Json<LoginResponse> {
    Json(LoginResponse {
        ok: session.verify_admin_password(&request.password),
    })
}

/// Download the question catalogue as a JSON array.
///
/// GET /api/questions/export
pub async fn export_questions(State(session): State<Session>) -> Result<impl IntoResponse, AppError> {
    let body = session
        .export_questions()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"quiz-questions.json\"",
            ),
        ],
        body,
    ))
}

/// Replace the catalogue with an uploaded question file.
///
/// POST /api/questions/import
pub async fn import_questions(
    State(session): State<Session>,
    body: String,
) -> Result<Json<ChangeResponse>, AppError> {
    let outcome = session.import_questions(&body).await.map_err(|e| {
        tracing::warn!("Question import rejected: {}", e);
        AppError::from(e)
    })?;
    change_response(&session, outcome)
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    // Drop parameters such as "; charset=..."
    let mime = value.split(';').next()?.trim().to_ascii_lowercase();
    (!mime.is_empty()).then_some(mime)
}

/// Encode an upload as an opaque `data:` URL after checking its media type
fn data_url(headers: &HeaderMap, body: &[u8], kind: &str) -> Result<String, AppError> {
    let mime = content_type(headers)
        .ok_or_else(|| AppError::BadRequest("missing Content-Type".to_string()))?;
    if !mime.starts_with(&format!("{}/", kind)) {
        return Err(AppError::BadRequest(format!(
            "expected {} upload, got {}",
            kind, mime
        )));
    }
    if body.is_empty() {
        return Err(AppError::BadRequest("empty upload".to_string()));
    }
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(body)))
}

/// Upload an image for one of the appearance slots.
///
/// POST /api/assets/{target} with target one of
/// `logo`, `background`, `question-window`, `custom-message`
pub async fn upload_asset(
    State(session): State<Session>,
    Path(target): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChangeResponse>, AppError> {
    let url = data_url(&headers, &body, "image")?;
    let appearance = session.snapshot().await.appearance;

    let action = match target.as_str() {
        "logo" => SyncAction::SetLogo {
            logo: LogoConfig {
                url: Some(url),
                ..appearance.logo
            },
        },
        "background" => {
            let mut background = appearance.background;
            background.image_url = Some(url);
            SyncAction::SetBackground { background }
        }
        "question-window" => SyncAction::SetQuestionWindow {
            layer: ImageLayer {
                image_url: Some(url),
                ..appearance.question_window
            },
        },
        "custom-message" => SyncAction::SetCustomMessageImage { url: Some(url) },
        other => return Err(AppError::NotFound(format!("no image slot '{}'", other))),
    };

    tracing::info!("Uploaded {} image ({} bytes)", target, body.len());
    let outcome = session.dispatch(action).await;
    change_response(&session, outcome)
}

#[derive(Debug, Deserialize)]
pub struct SoundUpload {
    pub name: String,
}

/// Upload a custom sound effect.
///
/// POST /api/sounds?name=...
pub async fn upload_sound(
    State(session): State<Session>,
    Query(params): Query<SoundUpload>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChangeResponse>, AppError> {
    if params.name.trim().is_empty() {
        return Err(AppError::BadRequest("sound name is required".to_string()));
    }
    let url = data_url(&headers, &body, "audio")?;
    let outcome = session.add_custom_sound(&params.name, url).await;
    change_response(&session, outcome)
}
