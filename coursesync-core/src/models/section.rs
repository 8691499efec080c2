use serde::{Deserialize, Serialize};

use super::lesson::Lesson;
use crate::entity_id::EntityId;

/// A top-level block of a course's curriculum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub id: EntityId,
    pub course_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    /// Whether the current field values are confirmed on the server.
    #[serde(default)]
    pub persisted: bool,
}

impl Section {
    pub fn new(id: EntityId, course_id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            course_id,
            name: name.into(),
            description: String::new(),
            lessons: Vec::new(),
            persisted: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_lessons(mut self, lessons: Vec<Lesson>) -> Self {
        self.lessons = lessons;
        self
    }

    pub fn persisted(mut self) -> Self {
        self.persisted = true;
        self
    }
}
