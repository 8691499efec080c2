use serde::{Deserialize, Serialize};
use std::fmt;

use super::section::Section;

/// The full curriculum of one course: sections, lessons, questions, answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseTree {
    pub course_id: u64,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl CourseTree {
    pub fn new(course_id: u64) -> Self {
        Self {
            course_id,
            sections: Vec::new(),
        }
    }

    pub fn with_sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = sections;
        self
    }

    /// Total number of entities at all four levels.
    pub fn entity_count(&self) -> usize {
        self.sections
            .iter()
            .map(|s| {
                1 + s
                    .lessons
                    .iter()
                    .map(|l| {
                        1 + l
                            .questions
                            .iter()
                            .map(|q| 1 + q.answers.len())
                            .sum::<usize>()
                    })
                    .sum::<usize>()
            })
            .sum()
    }
}

impl fmt::Display for CourseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = format!("Course {}", self.course_id);
        writeln!(f, "{}", title)?;
        writeln!(f, "{}", "=".repeat(title.len()))?;

        if self.sections.is_empty() {
            writeln!(f, "(no sections)")?;
        }

        for section in &self.sections {
            writeln!(f, "[{}] {}{}", section.id, section.name, dirty(section.persisted))?;
            for lesson in &section.lessons {
                let quiz = if lesson.is_quiz { " (quiz)" } else { "" };
                writeln!(
                    f,
                    "  [{}] {}{}{}",
                    lesson.id,
                    lesson.title,
                    quiz,
                    dirty(lesson.persisted)
                )?;
                for question in &lesson.questions {
                    writeln!(
                        f,
                        "    [{}] {}{}",
                        question.id,
                        question.content,
                        dirty(question.persisted)
                    )?;
                    for answer in &question.answers {
                        let mark = if answer.is_correct { "x" } else { " " };
                        writeln!(
                            f,
                            "      [{}] ({}) {}{}",
                            answer.id,
                            mark,
                            answer.content,
                            dirty(answer.persisted)
                        )?;
                    }
                }
            }
        }

        Ok(())
    }
}

fn dirty(persisted: bool) -> &'static str {
    if persisted {
        ""
    } else {
        " *"
    }
}
