//! REST client for the course backend.
//!
//! JSON bodies over HTTP, with an optional bearer token. Any non-2xx status
//! is turned into [`ApiError::Status`] carrying the response text.

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::protocol::{
    AnswerBody, AnswerRecord, LessonBody, LessonRecord, QuestionBody, QuestionRecord,
    SectionBody, SectionRecord,
};
use super::{ApiResult, CourseApi};
use crate::error::ApiError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`CourseApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCourseApi {
    server_url: String,
    api_token: Option<String>,
    client: Client,
}

impl HttpCourseApi {
    /// Creates a client with the default timeout.
    pub fn new(server_url: impl Into<String>, api_token: Option<String>) -> ApiResult<Self> {
        Self::with_timeout(server_url, api_token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        server_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            server_url: server_url.into(),
            api_token,
            client,
        })
    }

    /// Returns the server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Checks that the server answers its health endpoint.
    pub async fn check_health(&self) -> ApiResult<()> {
        let builder = self.client.get(self.build_url("/health"));
        send(builder).await.map(|_| ())
    }

    /// Builds a full URL for a given path.
    fn build_url(&self, path: &str) -> String {
        let base_url = if !self.server_url.starts_with("http://")
            && !self.server_url.starts_with("https://")
        {
            format!("http://{}", self.server_url)
        } else {
            self.server_url.clone()
        };

        format!("{}{}", base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.build_url(path));
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn get<T>(&self, path: String) -> BoxFuture<'static, ApiResult<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        fetch(self.request(Method::GET, &path)).boxed()
    }

    fn post<B, T>(&self, path: &str, body: &B) -> BoxFuture<'static, ApiResult<T>>
    where
        B: Serialize,
        T: DeserializeOwned + Send + 'static,
    {
        fetch(self.request(Method::POST, path).json(body)).boxed()
    }

    fn put<B, T>(&self, path: String, body: &B) -> BoxFuture<'static, ApiResult<T>>
    where
        B: Serialize,
        T: DeserializeOwned + Send + 'static,
    {
        fetch(self.request(Method::PUT, &path).json(body)).boxed()
    }

    fn delete(&self, path: String) -> BoxFuture<'static, ApiResult<()>> {
        send(self.request(Method::DELETE, &path))
            .map(|result| result.map(|_| ()))
            .boxed()
    }
}

async fn send(builder: RequestBuilder) -> ApiResult<reqwest::Response> {
    let response = builder
        .send()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

async fn fetch<T: DeserializeOwned>(builder: RequestBuilder) -> ApiResult<T> {
    send(builder)
        .await?
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

impl CourseApi for HttpCourseApi {
    fn list_sections(&self, course_id: u64) -> BoxFuture<'_, ApiResult<Vec<SectionRecord>>> {
        self.get(format!("/courses/{}/sections", course_id))
    }

    fn create_section(&self, body: SectionBody) -> BoxFuture<'_, ApiResult<SectionRecord>> {
        self.post("/sections", &body)
    }

    fn update_section(
        &self,
        id: u64,
        body: SectionBody,
    ) -> BoxFuture<'_, ApiResult<SectionRecord>> {
        self.put(format!("/sections/{}", id), &body)
    }

    fn delete_section(&self, id: u64) -> BoxFuture<'_, ApiResult<()>> {
        self.delete(format!("/sections/{}", id))
    }

    fn list_lessons(&self, section_id: u64) -> BoxFuture<'_, ApiResult<Vec<LessonRecord>>> {
        self.get(format!("/sections/{}/lessons", section_id))
    }

    fn create_lesson(&self, body: LessonBody) -> BoxFuture<'_, ApiResult<LessonRecord>> {
        self.post("/lessons", &body)
    }

    fn update_lesson(&self, id: u64, body: LessonBody) -> BoxFuture<'_, ApiResult<LessonRecord>> {
        self.put(format!("/lessons/{}", id), &body)
    }

    fn delete_lesson(&self, id: u64) -> BoxFuture<'_, ApiResult<()>> {
        self.delete(format!("/lessons/{}", id))
    }

    fn list_questions(&self, lesson_id: u64) -> BoxFuture<'_, ApiResult<Vec<QuestionRecord>>> {
        self.get(format!("/lessons/{}/questions", lesson_id))
    }

    fn create_question(&self, body: QuestionBody) -> BoxFuture<'_, ApiResult<QuestionRecord>> {
        self.post("/questions", &body)
    }

    fn update_question(
        &self,
        id: u64,
        body: QuestionBody,
    ) -> BoxFuture<'_, ApiResult<QuestionRecord>> {
        self.put(format!("/questions/{}", id), &body)
    }

    fn delete_question(&self, id: u64) -> BoxFuture<'_, ApiResult<()>> {
        self.delete(format!("/questions/{}", id))
    }

    fn list_answers(&self, question_id: u64) -> BoxFuture<'_, ApiResult<Vec<AnswerRecord>>> {
        self.get(format!("/questions/{}/answers", question_id))
    }

    fn create_answer(&self, body: AnswerBody) -> BoxFuture<'_, ApiResult<AnswerRecord>> {
        self.post("/answers", &body)
    }

    fn update_answer(&self, id: u64, body: AnswerBody) -> BoxFuture<'_, ApiResult<AnswerRecord>> {
        self.put(format!("/answers/{}", id), &body)
    }

    fn delete_answer(&self, id: u64) -> BoxFuture<'_, ApiResult<()>> {
        self.delete(format!("/answers/{}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> HttpCourseApi {
        HttpCourseApi::new(url, None).unwrap()
    }

    #[test]
    fn test_build_url() {
        assert_eq!(
            client("http://localhost:8080").build_url("/sections"),
            "http://localhost:8080/sections"
        );
        assert_eq!(
            client("https://courses.example.com/").build_url("/lessons/3"),
            "https://courses.example.com/lessons/3"
        );
        assert_eq!(
            client("localhost:8080").build_url("/health"),
            "http://localhost:8080/health"
        );
    }

    #[test]
    fn test_client_accessors() {
        let api = HttpCourseApi::new("http://localhost:8080", Some("token".to_string())).unwrap();
        assert_eq!(api.server_url(), "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let api = HttpCourseApi::with_timeout(
            "http://127.0.0.1:1",
            None,
            Duration::from_millis(500),
        )
        .unwrap();

        let err = api.list_sections(1).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
