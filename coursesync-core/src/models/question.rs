use serde::{Deserialize, Serialize};

use super::answer::Answer;
use crate::entity_id::EntityId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: EntityId,
    pub lesson_id: EntityId,
    pub content: String,
    /// Explanation shown after the question is answered.
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub persisted: bool,
}

impl Question {
    pub fn new(id: EntityId, lesson_id: EntityId, content: impl Into<String>) -> Self {
        Self {
            id,
            lesson_id,
            content: content.into(),
            note: String::new(),
            answers: Vec::new(),
            persisted: false,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn with_answers(mut self, answers: Vec<Answer>) -> Self {
        self.answers = answers;
        self
    }

    pub fn persisted(mut self) -> Self {
        self.persisted = true;
        self
    }
}
