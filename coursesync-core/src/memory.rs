//! In-memory course backend.
//!
//! Implements [`CourseApi`] against process-local maps with the same
//! contract as the REST service: one id sequence shared by all kinds,
//! foreign-key checks on create and update, cascade delete. It backs the
//! development server and the engine's tests, which also use its call log
//! and fault injection.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::{self, BoxFuture, FutureExt};

use crate::api::{
    AnswerBody, AnswerRecord, ApiResult, CourseApi, LessonBody, LessonRecord, QuestionBody,
    QuestionRecord, SectionBody, SectionRecord,
};
use crate::error::ApiError;
use crate::models::{Answer, CourseTree, Lesson, Question, Section};
use crate::schema::EntityKind;

/// A call received by the backend, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List { kind: EntityKind, parent: u64 },
    Create { kind: EntityKind, parent: u64, id: u64 },
    Update { kind: EntityKind, id: u64, parent: u64 },
    Delete { kind: EntityKind, id: u64 },
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::List { .. })
    }
}

/// A call that should fail with status 500.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Create whose name/title/content equals the label.
    Create(EntityKind, String),
    Update(EntityKind, u64),
    Delete(EntityKind, u64),
    List(EntityKind, u64),
}

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    sections: BTreeMap<u64, SectionRecord>,
    lessons: BTreeMap<u64, LessonRecord>,
    questions: BTreeMap<u64, QuestionRecord>,
    answers: BTreeMap<u64, AnswerRecord>,
    calls: Option<Vec<Call>>,
    faults: HashSet<Fault>,
}

/// [`CourseApi`] backed by process memory.
#[derive(Debug)]
pub struct MemoryCourseApi {
    store: Mutex<Store>,
}

impl Default for MemoryCourseApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCourseApi {
    /// Creates an empty backend whose first id is 1.
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store {
                next_id: 1,
                ..Store::default()
            }),
        }
    }

    /// Creates an empty backend that keeps a log of every call.
    pub fn recording() -> Self {
        let api = Self::new();
        api.lock().calls = Some(Vec::new());
        api
    }

    /// Inserts every entity of `tree` that has a server identity.
    ///
    /// The id sequence continues after the largest inserted id.
    pub fn seed(&self, tree: &CourseTree) {
        let mut store = self.lock();
        for section in &tree.sections {
            let Some(section_id) = section.id.server() else {
                continue;
            };
            store.sections.insert(
                section_id,
                SectionRecord {
                    id: section_id,
                    body: SectionBody::from_section(section, tree.course_id),
                },
            );
            for lesson in &section.lessons {
                let Some(lesson_id) = lesson.id.server() else {
                    continue;
                };
                store.lessons.insert(
                    lesson_id,
                    LessonRecord {
                        id: lesson_id,
                        body: LessonBody::from_lesson(lesson, section_id),
                    },
                );
                for question in &lesson.questions {
                    let Some(question_id) = question.id.server() else {
                        continue;
                    };
                    store.questions.insert(
                        question_id,
                        QuestionRecord {
                            id: question_id,
                            body: QuestionBody::from_question(question, lesson_id),
                        },
                    );
                    for answer in &question.answers {
                        let Some(answer_id) = answer.id.server() else {
                            continue;
                        };
                        store.answers.insert(
                            answer_id,
                            AnswerRecord {
                                id: answer_id,
                                body: AnswerBody::from_answer(answer, question_id),
                            },
                        );
                    }
                }
            }
        }
        let max_id = store
            .sections
            .keys()
            .chain(store.lessons.keys())
            .chain(store.questions.keys())
            .chain(store.answers.keys())
            .copied()
            .max()
            .unwrap_or(0);
        store.next_id = store.next_id.max(max_id + 1);
    }

    /// Sets the next id the backend hands out.
    pub fn set_next_id(&self, next_id: u64) {
        self.lock().next_id = next_id;
    }

    pub fn inject(&self, fault: Fault) {
        self.lock().faults.insert(fault);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Calls received so far (empty unless created with [`Self::recording`]).
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone().unwrap_or_default()
    }

    /// Create, update and delete calls received so far.
    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear_calls(&self) {
        if let Some(calls) = self.lock().calls.as_mut() {
            calls.clear();
        }
    }

    /// Number of stored entities of a kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        let store = self.lock();
        match kind {
            EntityKind::Section => store.sections.len(),
            EntityKind::Lesson => store.lessons.len(),
            EntityKind::Question => store.questions.len(),
            EntityKind::Answer => store.answers.len(),
        }
    }

    /// Current contents for a course, as a persisted tree sorted by id.
    pub fn tree(&self, course_id: u64) -> CourseTree {
        let store = self.lock();
        let sections = store
            .sections
            .values()
            .filter(|s| s.body.course_id == course_id)
            .map(|s| {
                let lessons = store
                    .lessons
                    .values()
                    .filter(|l| l.body.section_id == s.id)
                    .map(|l| {
                        let questions = store
                            .questions
                            .values()
                            .filter(|q| q.body.lesson_id == l.id)
                            .map(|q| {
                                let answers = store
                                    .answers
                                    .values()
                                    .filter(|a| a.body.question_id == q.id)
                                    .map(|a| Answer::from(a.clone()))
                                    .collect();
                                Question::from(q.clone()).with_answers(answers)
                            })
                            .collect();
                        let mut lesson = Lesson::from(l.clone());
                        lesson.questions = questions;
                        lesson
                    })
                    .collect();
                Section::from(s.clone()).with_lessons(lessons)
            })
            .collect();
        CourseTree::new(course_id).with_sections(sections)
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store {
    fn record(&mut self, call: Call) {
        if let Some(calls) = self.calls.as_mut() {
            calls.push(call);
        }
    }

    fn check(&self, fault: Fault) -> ApiResult<()> {
        if self.faults.contains(&fault) {
            return Err(ApiError::Status {
                status: 500,
                body: format!("injected fault: {:?}", fault),
            });
        }
        Ok(())
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn require(&self, kind: EntityKind, id: u64) -> ApiResult<()> {
        let exists = match kind {
            EntityKind::Section => self.sections.contains_key(&id),
            EntityKind::Lesson => self.lessons.contains_key(&id),
            EntityKind::Question => self.questions.contains_key(&id),
            EntityKind::Answer => self.answers.contains_key(&id),
        };
        if exists {
            Ok(())
        } else {
            Err(not_found(kind, id))
        }
    }

    fn remove_answers(&mut self, question_id: u64) {
        self.answers.retain(|_, a| a.body.question_id != question_id);
    }

    fn remove_questions(&mut self, lesson_id: u64) {
        let doomed: Vec<u64> = self
            .questions
            .values()
            .filter(|q| q.body.lesson_id == lesson_id)
            .map(|q| q.id)
            .collect();
        for id in doomed {
            self.questions.remove(&id);
            self.remove_answers(id);
        }
    }

    fn remove_lessons(&mut self, section_id: u64) {
        let doomed: Vec<u64> = self
            .lessons
            .values()
            .filter(|l| l.body.section_id == section_id)
            .map(|l| l.id)
            .collect();
        for id in doomed {
            self.lessons.remove(&id);
            self.remove_questions(id);
        }
    }

    fn delete(&mut self, kind: EntityKind, id: u64) -> ApiResult<()> {
        self.record(Call::Delete { kind, id });
        self.check(Fault::Delete(kind, id))?;
        self.require(kind, id)?;
        match kind {
            EntityKind::Section => {
                self.sections.remove(&id);
                self.remove_lessons(id);
            }
            EntityKind::Lesson => {
                self.lessons.remove(&id);
                self.remove_questions(id);
            }
            EntityKind::Question => {
                self.questions.remove(&id);
                self.remove_answers(id);
            }
            EntityKind::Answer => {
                self.answers.remove(&id);
            }
        }
        Ok(())
    }
}

fn not_found(kind: EntityKind, id: u64) -> ApiError {
    ApiError::Status {
        status: 404,
        body: format!("{} {} not found", kind, id),
    }
}

fn ready<'a, T: Send + 'a>(result: ApiResult<T>) -> BoxFuture<'a, ApiResult<T>> {
    future::ready(result).boxed()
}

fn list<R: Clone>(
    records: &BTreeMap<u64, R>,
    parent: u64,
    parent_of: impl Fn(&R) -> u64,
) -> Vec<R> {
    records
        .values()
        .filter(|r| parent_of(r) == parent)
        .cloned()
        .collect()
}

impl CourseApi for MemoryCourseApi {
    fn list_sections(&self, course_id: u64) -> BoxFuture<'_, ApiResult<Vec<SectionRecord>>> {
        let mut store = self.lock();
        let kind = EntityKind::Section;
        store.record(Call::List {
            kind,
            parent: course_id,
        });
        let result = store
            .check(Fault::List(kind, course_id))
            .map(|()| list(&store.sections, course_id, |s| s.body.course_id));
        ready(result)
    }

    fn create_section(&self, body: SectionBody) -> BoxFuture<'_, ApiResult<SectionRecord>> {
        let mut store = self.lock();
        let kind = EntityKind::Section;
        let result = store
            .check(Fault::Create(kind, body.name.clone()))
            .map(|()| {
                let id = store.allocate();
                store.record(Call::Create {
                    kind,
                    parent: body.course_id,
                    id,
                });
                let record = SectionRecord { id, body };
                store.sections.insert(id, record.clone());
                record
            });
        ready(result)
    }

    fn update_section(
        &self,
        id: u64,
        body: SectionBody,
    ) -> BoxFuture<'_, ApiResult<SectionRecord>> {
        let mut store = self.lock();
        let kind = EntityKind::Section;
        store.record(Call::Update {
            kind,
            id,
            parent: body.course_id,
        });
        let result = store
            .check(Fault::Update(kind, id))
            .and_then(|()| store.require(kind, id))
            .map(|()| {
                let record = SectionRecord { id, body };
                store.sections.insert(id, record.clone());
                record
            });
        ready(result)
    }

    fn delete_section(&self, id: u64) -> BoxFuture<'_, ApiResult<()>> {
        ready(self.lock().delete(EntityKind::Section, id))
    }

    fn list_lessons(&self, section_id: u64) -> BoxFuture<'_, ApiResult<Vec<LessonRecord>>> {
        let mut store = self.lock();
        let kind = EntityKind::Lesson;
        store.record(Call::List {
            kind,
            parent: section_id,
        });
        let result = store
            .check(Fault::List(kind, section_id))
            .map(|()| list(&store.lessons, section_id, |l| l.body.section_id));
        ready(result)
    }

    fn create_lesson(&self, body: LessonBody) -> BoxFuture<'_, ApiResult<LessonRecord>> {
        let mut store = self.lock();
        let kind = EntityKind::Lesson;
        let result = store
            .check(Fault::Create(kind, body.title.clone()))
            .and_then(|()| store.require(EntityKind::Section, body.section_id))
            .map(|()| {
                let id = store.allocate();
                store.record(Call::Create {
                    kind,
                    parent: body.section_id,
                    id,
                });
                let record = LessonRecord { id, body };
                store.lessons.insert(id, record.clone());
                record
            });
        ready(result)
    }

    fn update_lesson(&self, id: u64, body: LessonBody) -> BoxFuture<'_, ApiResult<LessonRecord>> {
        let mut store = self.lock();
        let kind = EntityKind::Lesson;
        store.record(Call::Update {
            kind,
            id,
            parent: body.section_id,
        });
        let result = store
            .check(Fault::Update(kind, id))
            .and_then(|()| store.require(kind, id))
            .and_then(|()| store.require(EntityKind::Section, body.section_id))
            .map(|()| {
                let record = LessonRecord { id, body };
                store.lessons.insert(id, record.clone());
                record
            });
        ready(result)
    }

    fn delete_lesson(&self, id: u64) -> BoxFuture<'_, ApiResult<()>> {
        ready(self.lock().delete(EntityKind::Lesson, id))
    }

    fn list_questions(&self, lesson_id: u64) -> BoxFuture<'_, ApiResult<Vec<QuestionRecord>>> {
        let mut store = self.lock();
        let kind = EntityKind::Question;
        store.record(Call::List {
            kind,
            parent: lesson_id,
        });
        let result = store
            .check(Fault::List(kind, lesson_id))
            .map(|()| list(&store.questions, lesson_id, |q| q.body.lesson_id));
        ready(result)
    }

    fn create_question(&self, body: QuestionBody) -> BoxFuture<'_, ApiResult<QuestionRecord>> {
        let mut store = self.lock();
        let kind = EntityKind::Question;
        let result = store
            .check(Fault::Create(kind, body.content.clone()))
            .and_then(|()| store.require(EntityKind::Lesson, body.lesson_id))
            .map(|()| {
                let id = store.allocate();
                store.record(Call::Create {
                    kind,
                    parent: body.lesson_id,
                    id,
                });
                let record = QuestionRecord { id, body };
                store.questions.insert(id, record.clone());
                record
            });
        ready(result)
    }

    fn update_question(
        &self,
        id: u64,
        body: QuestionBody,
    ) -> BoxFuture<'_, ApiResult<QuestionRecord>> {
        let mut store = self.lock();
        let kind = EntityKind::Question;
        store.record(Call::Update {
            kind,
            id,
            parent: body.lesson_id,
        });
        let result = store
            .check(Fault::Update(kind, id))
            .and_then(|()| store.require(kind, id))
            .and_then(|()| store.require(EntityKind::Lesson, body.lesson_id))
            .map(|()| {
                let record = QuestionRecord { id, body };
                store.questions.insert(id, record.clone());
                record
            });
        ready(result)
    }

    fn delete_question(&self, id: u64) -> BoxFuture<'_, ApiResult<()>> {
        ready(self.lock().delete(EntityKind::Question, id))
    }

    fn list_answers(&self, question_id: u64) -> BoxFuture<'_, ApiResult<Vec<AnswerRecord>>> {
        let mut store = self.lock();
        let kind = EntityKind::Answer;
        store.record(Call::List {
            kind,
            parent: question_id,
        });
        let result = store
            .check(Fault::List(kind, question_id))
            .map(|()| list(&store.answers, question_id, |a| a.body.question_id));
        ready(result)
    }

    fn create_answer(&self, body: AnswerBody) -> BoxFuture<'_, ApiResult<AnswerRecord>> {
        let mut store = self.lock();
        let kind = EntityKind::Answer;
        let result = store
            .check(Fault::Create(kind, body.content.clone()))
            .and_then(|()| store.require(EntityKind::Question, body.question_id))
            .map(|()| {
                let id = store.allocate();
                store.record(Call::Create {
                    kind,
                    parent: body.question_id,
                    id,
                });
                let record = AnswerRecord { id, body };
                store.answers.insert(id, record.clone());
                record
            });
        ready(result)
    }

    fn update_answer(&self, id: u64, body: AnswerBody) -> BoxFuture<'_, ApiResult<AnswerRecord>> {
        let mut store = self.lock();
        let kind = EntityKind::Answer;
        store.record(Call::Update {
            kind,
            id,
            parent: body.question_id,
        });
        let result = store
            .check(Fault::Update(kind, id))
            .and_then(|()| store.require(kind, id))
            .and_then(|()| store.require(EntityKind::Question, body.question_id))
            .map(|()| {
                let record = AnswerRecord { id, body };
                store.answers.insert(id, record.clone());
                record
            });
        ready(result)
    }

    fn delete_answer(&self, id: u64) -> BoxFuture<'_, ApiResult<()>> {
        ready(self.lock().delete(EntityKind::Answer, id))
    }
}
