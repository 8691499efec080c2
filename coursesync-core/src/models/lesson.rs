use serde::{Deserialize, Serialize};

use super::question::Question;
use crate::entity_id::EntityId;

/// A lesson inside a section. Quiz lessons carry questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lesson {
    pub id: EntityId,
    pub section_id: EntityId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Reference to an uploaded video or document, if any.
    #[serde(default)]
    pub media: Option<String>,
    #[serde(default)]
    pub is_quiz: bool,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub persisted: bool,
}

impl Lesson {
    pub fn new(id: EntityId, section_id: EntityId, title: impl Into<String>) -> Self {
        Self {
            id,
            section_id,
            title: title.into(),
            content: String::new(),
            media: None,
            is_quiz: false,
            questions: Vec::new(),
            persisted: false,
        }
    }

    pub fn with_media(mut self, media: impl Into<String>) -> Self {
        self.media = Some(media.into());
        self
    }

    /// Marks the lesson as a quiz.
    pub fn quiz(mut self) -> Self {
        self.is_quiz = true;
        self
    }

    /// Leaves `is_quiz` untouched; combine with [`Lesson::quiz`] when needed.
    pub fn with_questions(mut self, questions: Vec<Question>) -> Self {
        self.questions = questions;
        self
    }

    pub fn persisted(mut self) -> Self {
        self.persisted = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questions_do_not_imply_quiz() {
        let question = Question::new(EntityId::Server(3), EntityId::Server(2), "Why?");

        let lesson = Lesson::new(EntityId::Server(2), EntityId::Server(1), "Reading")
            .with_questions(vec![question.clone()]);
        assert!(!lesson.is_quiz);
        assert_eq!(lesson.questions.len(), 1);

        let quiz = Lesson::new(EntityId::Server(2), EntityId::Server(1), "Check")
            .quiz()
            .with_questions(vec![question]);
        assert!(quiz.is_quiz);
    }
}
