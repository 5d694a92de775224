use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::dispatch::{DispatchError, DispatchMode, NotificationDispatcher};
use super::domain::{PersonalInfoForm, SessionId, SurveyError};
use super::repository::{RepositoryError, SessionRepository};
use super::service::{SurveyService, SurveyServiceError};

type SharedService<R, D> = Arc<SurveyService<R, D>>;

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub text: String,
}

/// Router builder exposing the questionnaire session endpoints.
pub fn survey_router<R, D>(service: SharedService<R, D>) -> Router
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    let session = "/api/v1/survey/sessions/:session_id";
    Router::new()
        .route("/api/v1/survey/blueprint", get(blueprint_handler::<R, D>))
        .route("/api/v1/survey/sessions", post(start_handler::<R, D>))
        .route(
            session,
            get(snapshot_handler::<R, D>).delete(discard_handler::<R, D>),
        )
        .route(
            &format!("{session}/personal-info"),
            post(register_handler::<R, D>),
        )
        .route(
            &format!("{session}/selections/:category"),
            put(select_handler::<R, D>),
        )
        .route(
            &format!("{session}/notes/:field"),
            put(note_handler::<R, D>),
        )
        .route(&format!("{session}/advance"), post(advance_handler::<R, D>))
        .route(&format!("{session}/retreat"), post(retreat_handler::<R, D>))
        .route(&format!("{session}/reset"), post(reset_handler::<R, D>))
        .route(&format!("{session}/summary"), get(summary_handler::<R, D>))
        .route(&format!("{session}/email"), post(email_handler::<R, D>))
        .route(
            &format!("{session}/email/resend"),
            post(resend_handler::<R, D>),
        )
        .with_state(service)
}

pub(crate) async fn blueprint_handler<R, D>(State(service): State<SharedService<R, D>>) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    (StatusCode::OK, Json(service.blueprint())).into_response()
}

pub(crate) async fn start_handler<R, D>(State(service): State<SharedService<R, D>>) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    match service.start() {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn snapshot_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    respond(service.snapshot(&SessionId(session_id)))
}

pub(crate) async fn discard_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    match service.discard(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn register_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    Path(session_id): Path<String>,
    Json(form): Json<PersonalInfoForm>,
) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    let today = chrono::Local::now().date_naive();
    respond(service.register(&SessionId(session_id), form, today))
}

pub(crate) async fn select_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    Path((session_id, category)): Path<(String, String)>,
    Json(request): Json<SelectionRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    respond(service.select(&SessionId(session_id), &category, request.options))
}

pub(crate) async fn note_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    Path((session_id, field)): Path<(String, String)>,
    Json(request): Json<NoteRequest>,
) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    respond(service.write_note(&SessionId(session_id), &field, &request.text))
}

pub(crate) async fn advance_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    respond(service.advance(&SessionId(session_id)))
}

pub(crate) async fn retreat_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    respond(service.retreat(&SessionId(session_id)))
}

pub(crate) async fn reset_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    respond(service.reset(&SessionId(session_id)))
}

pub(crate) async fn summary_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    match service.summary(&SessionId(session_id)) {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text,
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn email_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    respond(
        service
            .send_summary(&SessionId(session_id), DispatchMode::FirstSend)
            .await,
    )
}

pub(crate) async fn resend_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    D: NotificationDispatcher + 'static,
{
    respond(
        service
            .send_summary(&SessionId(session_id), DispatchMode::Resend)
            .await,
    )
}

fn respond<T: serde::Serialize>(result: Result<T, SurveyServiceError>) -> Response {
    match result {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error.into_response(),
    }
}

impl SurveyServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Survey(error) => match error {
                SurveyError::Intake(_)
                | SurveyError::Step(_)
                | SurveyError::SingleSelection(_)
                | SurveyError::NoneWithOthers(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SurveyError::UnknownCategory(_)
                | SurveyError::UnknownOption { .. }
                | SurveyError::UnknownField(_) => StatusCode::BAD_REQUEST,
                SurveyError::NotRegistered
                | SurveyError::AlreadyRegistered
                | SurveyError::StepLocked { .. } => StatusCode::CONFLICT,
            },
            Self::Dispatch(error) => match error {
                DispatchError::NotReady { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                DispatchError::Transport(_) => StatusCode::BAD_GATEWAY,
                DispatchError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
                DispatchError::InFlight => StatusCode::CONFLICT,
            },
            Self::Repository(error) => match error {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict => StatusCode::CONFLICT,
                RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for SurveyServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = match &self {
            Self::Survey(SurveyError::Intake(rejection)) => {
                let fields: Vec<_> = rejection
                    .errors
                    .iter()
                    .map(|error| {
                        json!({
                            "field": error.field,
                            "message": error.violation.to_string(),
                        })
                    })
                    .collect();
                json!({
                    "error": self.to_string(),
                    "fields": fields,
                })
            }
            Self::Dispatch(DispatchError::NotReady { missing }) => json!({
                "error": self.to_string(),
                "missing": missing,
            }),
            _ => json!({
                "error": self.to_string(),
            }),
        };
        (status, Json(payload)).into_response()
    }
}
