use serde::{Deserialize, Serialize};

use crate::entity_id::EntityId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub id: EntityId,
    pub question_id: EntityId,
    pub content: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub persisted: bool,
}

impl Answer {
    pub fn new(id: EntityId, question_id: EntityId, content: impl Into<String>) -> Self {
        Self {
            id,
            question_id,
            content: content.into(),
            is_correct: false,
            persisted: false,
        }
    }

    pub fn correct(mut self) -> Self {
        self.is_correct = true;
        self
    }

    pub fn persisted(mut self) -> Self {
        self.persisted = true;
        self
    }
}
