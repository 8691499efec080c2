//! Request and response bodies of the course CRUD endpoints.
//!
//! Bodies are the writable fields of an entity plus its parent reference.
//! Records are what the server returns: the body plus the server identity.

use serde::{Deserialize, Serialize};

use crate::entity_id::EntityId;
use crate::models::{Answer, Lesson, Question, Section};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionBody {
    pub course_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub id: u64,
    #[serde(flatten)]
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonBody {
    pub section_id: u64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_quiz: bool,
    #[serde(default)]
    pub media: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonRecord {
    pub id: u64,
    #[serde(flatten)]
    pub body: LessonBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBody {
    pub lesson_id: u64,
    pub content: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: u64,
    #[serde(flatten)]
    pub body: QuestionBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerBody {
    pub question_id: u64,
    pub content: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: u64,
    #[serde(flatten)]
    pub body: AnswerBody,
}

impl SectionBody {
    pub fn from_section(section: &Section, course_id: u64) -> Self {
        Self {
            course_id,
            name: section.name.clone(),
            description: section.description.clone(),
        }
    }
}

impl LessonBody {
    pub fn from_lesson(lesson: &Lesson, section_id: u64) -> Self {
        Self {
            section_id,
            title: lesson.title.clone(),
            content: lesson.content.clone(),
            is_quiz: lesson.is_quiz,
            media: lesson.media.clone(),
        }
    }
}

impl QuestionBody {
    pub fn from_question(question: &Question, lesson_id: u64) -> Self {
        Self {
            lesson_id,
            content: question.content.clone(),
            note: question.note.clone(),
        }
    }
}

impl AnswerBody {
    pub fn from_answer(answer: &Answer, question_id: u64) -> Self {
        Self {
            question_id,
            content: answer.content.clone(),
            is_correct: answer.is_correct,
        }
    }
}

// Records come from the server, so the entities they produce are persisted.

impl From<SectionRecord> for Section {
    fn from(record: SectionRecord) -> Self {
        Section::new(
            EntityId::Server(record.id),
            record.body.course_id,
            record.body.name,
        )
        .with_description(record.body.description)
        .persisted()
    }
}

impl From<LessonRecord> for Lesson {
    fn from(record: LessonRecord) -> Self {
        let body = record.body;
        Lesson {
            id: EntityId::Server(record.id),
            section_id: EntityId::Server(body.section_id),
            title: body.title,
            content: body.content,
            media: body.media,
            is_quiz: body.is_quiz,
            questions: Vec::new(),
            persisted: true,
        }
    }
}

impl From<QuestionRecord> for Question {
    fn from(record: QuestionRecord) -> Self {
        Question::new(
            EntityId::Server(record.id),
            EntityId::Server(record.body.lesson_id),
            record.body.content,
        )
        .with_note(record.body.note)
        .persisted()
    }
}

impl From<AnswerRecord> for Answer {
    fn from(record: AnswerRecord) -> Self {
        let mut answer = Answer::new(
            EntityId::Server(record.id),
            EntityId::Server(record.body.question_id),
            record.body.content,
        )
        .persisted();
        answer.is_correct = record.body.is_correct;
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_flattens_body() {
        let record = LessonRecord {
            id: 42,
            body: LessonBody {
                section_id: 1,
                title: "New".to_string(),
                content: String::new(),
                is_quiz: false,
                media: None,
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 42);
        assert_eq!(json["section_id"], 1);
        assert_eq!(json["title"], "New");
    }

    #[test]
    fn test_record_into_persisted_entity() {
        let record: AnswerRecord = serde_json::from_str(
            r#"{"id": 9, "question_id": 4, "content": "Yes", "is_correct": true}"#,
        )
        .unwrap();
        let answer = Answer::from(record);
        assert_eq!(answer.id, EntityId::Server(9));
        assert_eq!(answer.question_id, EntityId::Server(4));
        assert!(answer.is_correct);
        assert!(answer.persisted);
    }

    #[test]
    fn test_body_uses_given_parent() {
        let lesson = Lesson::new(EntityId::Temporary(1), EntityId::Temporary(3), "Draft")
            .with_media("videos/intro.mp4");
        let body = LessonBody::from_lesson(&lesson, 55);
        assert_eq!(body.section_id, 55);
        assert_eq!(body.media.as_deref(), Some("videos/intro.mp4"));
    }
}
