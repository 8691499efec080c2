//! Remote CRUD interface for course content.
//!
//! [`CourseApi`] is the seam between the reconciliation engine and the
//! backend: one list/create/update/delete quartet per entity kind.
//! [`HttpCourseApi`] implements it over REST; tests substitute an in-memory
//! implementation.

mod http;
mod protocol;

use futures::future::BoxFuture;

pub use crate::error::ApiError;
pub use http::{HttpCourseApi, DEFAULT_TIMEOUT};
pub use protocol::{
    AnswerBody, AnswerRecord, LessonBody, LessonRecord, QuestionBody, QuestionRecord,
    SectionBody, SectionRecord,
};

pub type ApiResult<T> = Result<T, ApiError>;

/// Request/response CRUD operations for sections, lessons, questions and answers.
///
/// Any non-success response or transport failure is reported as an
/// [`ApiError`].
pub trait CourseApi: Send + Sync {
    fn list_sections(&self, course_id: u64) -> BoxFuture<'_, ApiResult<Vec<SectionRecord>>>;
    fn create_section(&self, body: SectionBody) -> BoxFuture<'_, ApiResult<SectionRecord>>;
    fn update_section(&self, id: u64, body: SectionBody)
        -> BoxFuture<'_, ApiResult<SectionRecord>>;
    fn delete_section(&self, id: u64) -> BoxFuture<'_, ApiResult<()>>;

    fn list_lessons(&self, section_id: u64) -> BoxFuture<'_, ApiResult<Vec<LessonRecord>>>;
    fn create_lesson(&self, body: LessonBody) -> BoxFuture<'_, ApiResult<LessonRecord>>;
    fn update_lesson(&self, id: u64, body: LessonBody) -> BoxFuture<'_, ApiResult<LessonRecord>>;
    fn delete_lesson(&self, id: u64) -> BoxFuture<'_, ApiResult<()>>;

    fn list_questions(&self, lesson_id: u64) -> BoxFuture<'_, ApiResult<Vec<QuestionRecord>>>;
    fn create_question(&self, body: QuestionBody) -> BoxFuture<'_, ApiResult<QuestionRecord>>;
    fn update_question(
        &self,
        id: u64,
        body: QuestionBody,
    ) -> BoxFuture<'_, ApiResult<QuestionRecord>>;
    fn delete_question(&self, id: u64) -> BoxFuture<'_, ApiResult<()>>;

    fn list_answers(&self, question_id: u64) -> BoxFuture<'_, ApiResult<Vec<AnswerRecord>>>;
    fn create_answer(&self, body: AnswerBody) -> BoxFuture<'_, ApiResult<AnswerRecord>>;
    fn update_answer(&self, id: u64, body: AnswerBody) -> BoxFuture<'_, ApiResult<AnswerRecord>>;
    fn delete_answer(&self, id: u64) -> BoxFuture<'_, ApiResult<()>>;
}
