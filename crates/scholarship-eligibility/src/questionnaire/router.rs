use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::json;

use super::registry::{RegistryError, SessionId, SessionRegistry};
use super::service::{AnswerSubmission, EligibilitySessionService, SessionServiceError};

type SharedService<R> = Arc<EligibilitySessionService<R>>;

/// Router builder exposing questionnaire sessions to the wizard.
pub fn session_router<R>(service: SharedService<R>) -> Router
where
    R: SessionRegistry + 'static,
{
    Router::new()
        .route("/api/v1/eligibility/sessions", post(start_handler::<R>))
        .route(
            "/api/v1/eligibility/sessions/:session_id",
            get(snapshot_handler::<R>),
        )
        .route(
            "/api/v1/eligibility/sessions/:session_id/answers/:question_id",
            put(answer_handler::<R>).delete(clear_handler::<R>),
        )
        .route(
            "/api/v1/eligibility/sessions/:session_id/reset",
            post(reset_handler::<R>),
        )
        .route(
            "/api/v1/eligibility/sessions/:session_id/tiers/:tier_id/questions",
            get(questions_handler::<R>),
        )
        .route(
            "/api/v1/eligibility/sessions/:session_id/complete",
            post(complete_handler::<R>),
        )
        .with_state(service)
}

fn error_response(error: SessionServiceError) -> Response {
    let status = match &error {
        SessionServiceError::UnknownQuestion(_)
        | SessionServiceError::Registry(RegistryError::NotFound) => StatusCode::NOT_FOUND,
        SessionServiceError::Completion(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionServiceError::Registry(RegistryError::Conflict) => StatusCode::CONFLICT,
        SessionServiceError::Registry(RegistryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(
    status: StatusCode,
    result: Result<T, SessionServiceError>,
) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn start_handler<R>(State(service): State<SharedService<R>>) -> Response
where
    R: SessionRegistry + 'static,
{
    respond(StatusCode::CREATED, service.start())
}

pub(crate) async fn snapshot_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRegistry + 'static,
{
    respond(StatusCode::OK, service.snapshot(&SessionId(session_id)))
}

pub(crate) async fn answer_handler<R>(
    State(service): State<SharedService<R>>,
    Path((session_id, question_id)): Path<(String, String)>,
    axum::Json(submission): axum::Json<AnswerSubmission>,
) -> Response
where
    R: SessionRegistry + 'static,
{
    respond(
        StatusCode::OK,
        service.answer(&SessionId(session_id), &question_id, submission),
    )
}

pub(crate) async fn clear_handler<R>(
    State(service): State<SharedService<R>>,
    Path((session_id, question_id)): Path<(String, String)>,
) -> Response
where
    R: SessionRegistry + 'static,
{
    respond(
        StatusCode::OK,
        service.clear(&SessionId(session_id), &question_id),
    )
}

pub(crate) async fn reset_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRegistry + 'static,
{
    respond(StatusCode::OK, service.reset(&SessionId(session_id)))
}

pub(crate) async fn questions_handler<R>(
    State(service): State<SharedService<R>>,
    Path((session_id, tier_id)): Path<(String, String)>,
) -> Response
where
    R: SessionRegistry + 'static,
{
    respond(
        StatusCode::OK,
        service.visible_questions(&SessionId(session_id), &tier_id),
    )
}

pub(crate) async fn complete_handler<R>(
    State(service): State<SharedService<R>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRegistry + 'static,
{
    respond(StatusCode::OK, service.complete(&SessionId(session_id)))
}
