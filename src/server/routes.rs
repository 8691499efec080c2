//! Handlers for the course CRUD routes.
//!
//! Each handler forwards to the in-memory [`CourseApi`] and maps its
//! [`ApiError`] statuses onto the response.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coursesync_core::api::{
    AnswerBody, AnswerRecord, LessonBody, LessonRecord, QuestionBody, QuestionRecord, SectionBody,
    SectionRecord,
};
use coursesync_core::{ApiError, CourseApi};
use serde::Serialize;

use super::{AppState, ErrorBody};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// An [`ApiError`] rendered as an HTTP response.
pub struct ApiFailure(ApiError);

impl From<ApiError> for ApiFailure {
    fn from(e: ApiError) -> Self {
        ApiFailure(e)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let (status, error, message) = match self.0 {
            ApiError::Status { status, body } => {
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let error = if status == StatusCode::NOT_FOUND {
                    "not_found"
                } else {
                    "internal"
                };
                (status, error, body)
            }
            other => (StatusCode::INTERNAL_SERVER_ERROR, "internal", other.to_string()),
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

type Created<T> = (StatusCode, Json<T>);

pub async fn list_sections(
    State(state): State<AppState>,
    Path(course_id): Path<u64>,
) -> Result<Json<Vec<SectionRecord>>, ApiFailure> {
    Ok(Json(state.api.list_sections(course_id).await?))
}

pub async fn create_section(
    State(state): State<AppState>,
    Json(body): Json<SectionBody>,
) -> Result<Created<SectionRecord>, ApiFailure> {
    let record = state.api.create_section(body).await?;
    tracing::debug!(id = record.id, course_id = record.body.course_id, "Created section");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_section(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(body): Json<SectionBody>,
) -> Result<Json<SectionRecord>, ApiFailure> {
    Ok(Json(state.api.update_section(id, body).await?))
}

pub async fn delete_section(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiFailure> {
    state.api.delete_section(id).await?;
    Ok(StatusCode::OK)
}

pub async fn list_lessons(
    State(state): State<AppState>,
    Path(section_id): Path<u64>,
) -> Result<Json<Vec<LessonRecord>>, ApiFailure> {
    Ok(Json(state.api.list_lessons(section_id).await?))
}

pub async fn create_lesson(
    State(state): State<AppState>,
    Json(body): Json<LessonBody>,
) -> Result<Created<LessonRecord>, ApiFailure> {
    let record = state.api.create_lesson(body).await?;
    tracing::debug!(id = record.id, section_id = record.body.section_id, "Created lesson");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_lesson(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(body): Json<LessonBody>,
) -> Result<Json<LessonRecord>, ApiFailure> {
    Ok(Json(state.api.update_lesson(id, body).await?))
}

pub async fn delete_lesson(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiFailure> {
    state.api.delete_lesson(id).await?;
    Ok(StatusCode::OK)
}

pub async fn list_questions(
    State(state): State<AppState>,
    Path(lesson_id): Path<u64>,
) -> Result<Json<Vec<QuestionRecord>>, ApiFailure> {
    Ok(Json(state.api.list_questions(lesson_id).await?))
}

pub async fn create_question(
    State(state): State<AppState>,
    Json(body): Json<QuestionBody>,
) -> Result<Created<QuestionRecord>, ApiFailure> {
    let record = state.api.create_question(body).await?;
    tracing::debug!(id = record.id, lesson_id = record.body.lesson_id, "Created question");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(body): Json<QuestionBody>,
) -> Result<Json<QuestionRecord>, ApiFailure> {
    Ok(Json(state.api.update_question(id, body).await?))
}

pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiFailure> {
    state.api.delete_question(id).await?;
    Ok(StatusCode::OK)
}

pub async fn list_answers(
    State(state): State<AppState>,
    Path(question_id): Path<u64>,
) -> Result<Json<Vec<AnswerRecord>>, ApiFailure> {
    Ok(Json(state.api.list_answers(question_id).await?))
}

pub async fn create_answer(
    State(state): State<AppState>,
    Json(body): Json<AnswerBody>,
) -> Result<Created<AnswerRecord>, ApiFailure> {
    let record = state.api.create_answer(body).await?;
    tracing::debug!(id = record.id, question_id = record.body.question_id, "Created answer");
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_answer(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(body): Json<AnswerBody>,
) -> Result<Json<AnswerRecord>, ApiFailure> {
    Ok(Json(state.api.update_answer(id, body).await?))
}

pub async fn delete_answer(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiFailure> {
    state.api.delete_answer(id).await?;
    Ok(StatusCode::OK)
}
