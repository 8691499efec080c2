//! The four levels of a curriculum tree and what the engine can do with them.
//!
//! [`Entity`] is implemented once per level. It exposes identity, the parent
//! reference, the child collection and the remote operations, so that
//! loading, diffing, executing and remapping are each written once and
//! recurse through `Entity::Child` down to [`Leaf`].

use serde::{Deserialize, Serialize};
use std::fmt;

use futures::future::{self, BoxFuture, FutureExt, TryFutureExt};

use crate::api::{AnswerBody, ApiResult, CourseApi, LessonBody, QuestionBody, SectionBody};
use crate::entity_id::EntityId;
use crate::models::{Answer, Lesson, Question, Section};

/// Entity levels, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Section,
    Lesson,
    Question,
    Answer,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Section,
        EntityKind::Lesson,
        EntityKind::Question,
        EntityKind::Answer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Section => "section",
            EntityKind::Lesson => "lesson",
            EntityKind::Question => "question",
            EntityKind::Answer => "answer",
        }
    }

    /// Depth below the course (sections are 1).
    pub fn depth(&self) -> usize {
        match self {
            EntityKind::Section => 1,
            EntityKind::Lesson => 2,
            EntityKind::Question => 3,
            EntityKind::Answer => 4,
        }
    }

    /// Issues the delete call for an entity of this kind.
    pub fn delete<'a, A>(self, api: &'a A, id: u64) -> BoxFuture<'a, ApiResult<()>>
    where
        A: CourseApi + ?Sized,
    {
        match self {
            EntityKind::Section => api.delete_section(id),
            EntityKind::Lesson => api.delete_lesson(id),
            EntityKind::Question => api.delete_question(id),
            EntityKind::Answer => api.delete_answer(id),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Position of a node in a tree snapshot: sibling indices from the course down.
///
/// Paths order lexicographically, which is the same as a top-down pre-order
/// walk of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// The course itself.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = Vec::with_capacity(self.0.len() + 1);
        indices.extend_from_slice(&self.0);
        indices.push(index);
        Self(indices)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn parent(&self) -> Option<Self> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Self(rest.to_vec())),
            None => None,
        }
    }

    /// True if `self` is `other` or lies below it.
    pub fn starts_with(&self, other: &NodePath) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

/// One level of the curriculum tree.
pub trait Entity: Clone + Send + Sync + 'static {
    type Child: Entity;

    fn kind(&self) -> EntityKind;
    fn id(&self) -> EntityId;
    fn set_id(&mut self, id: EntityId);
    fn parent_id(&self) -> EntityId;
    fn set_parent_id(&mut self, parent: EntityId);
    fn is_persisted(&self) -> bool;
    fn set_persisted(&mut self, persisted: bool);
    fn children(&self) -> &[Self::Child];
    fn children_mut(&mut self) -> &mut [Self::Child];
    fn set_children(&mut self, children: Vec<Self::Child>);

    /// Lists the persisted entities of this kind under `parent`.
    fn list<A>(api: &A, parent: u64) -> BoxFuture<'_, ApiResult<Vec<Self>>>
    where
        A: CourseApi + ?Sized;

    /// Creates the entity under `parent` and returns its server identity.
    fn create<'a, A>(&self, api: &'a A, parent: u64) -> BoxFuture<'a, ApiResult<u64>>
    where
        A: CourseApi + ?Sized;

    /// Sends the entity's current field values for server identity `id`.
    fn update<'a, A>(&self, api: &'a A, id: u64, parent: u64) -> BoxFuture<'a, ApiResult<()>>
    where
        A: CourseApi + ?Sized;
}

impl Entity for Section {
    type Child = Lesson;

    fn kind(&self) -> EntityKind {
        EntityKind::Section
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn parent_id(&self) -> EntityId {
        EntityId::Server(self.course_id)
    }

    fn set_parent_id(&mut self, parent: EntityId) {
        // Courses only ever carry server identities.
        if let EntityId::Server(course_id) = parent {
            self.course_id = course_id;
        }
    }

    fn is_persisted(&self) -> bool {
        self.persisted
    }

    fn set_persisted(&mut self, persisted: bool) {
        self.persisted = persisted;
    }

    fn children(&self) -> &[Lesson] {
        &self.lessons
    }

    fn children_mut(&mut self) -> &mut [Lesson] {
        &mut self.lessons
    }

    fn set_children(&mut self, children: Vec<Lesson>) {
        self.lessons = children;
    }

    fn list<A>(api: &A, parent: u64) -> BoxFuture<'_, ApiResult<Vec<Self>>>
    where
        A: CourseApi + ?Sized,
    {
        api.list_sections(parent)
            .map_ok(|records| records.into_iter().map(Section::from).collect())
            .boxed()
    }

    fn create<'a, A>(&self, api: &'a A, parent: u64) -> BoxFuture<'a, ApiResult<u64>>
    where
        A: CourseApi + ?Sized,
    {
        api.create_section(SectionBody::from_section(self, parent))
            .map_ok(|record| record.id)
            .boxed()
    }

    fn update<'a, A>(&self, api: &'a A, id: u64, parent: u64) -> BoxFuture<'a, ApiResult<()>>
    where
        A: CourseApi + ?Sized,
    {
        api.update_section(id, SectionBody::from_section(self, parent))
            .map_ok(|_| ())
            .boxed()
    }
}

impl Entity for Lesson {
    type Child = Question;

    fn kind(&self) -> EntityKind {
        EntityKind::Lesson
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn parent_id(&self) -> EntityId {
        self.section_id
    }

    fn set_parent_id(&mut self, parent: EntityId) {
        self.section_id = parent;
    }

    fn is_persisted(&self) -> bool {
        self.persisted
    }

    fn set_persisted(&mut self, persisted: bool) {
        self.persisted = persisted;
    }

    fn children(&self) -> &[Question] {
        &self.questions
    }

    fn children_mut(&mut self) -> &mut [Question] {
        &mut self.questions
    }

    fn set_children(&mut self, children: Vec<Question>) {
        self.questions = children;
    }

    fn list<A>(api: &A, parent: u64) -> BoxFuture<'_, ApiResult<Vec<Self>>>
    where
        A: CourseApi + ?Sized,
    {
        api.list_lessons(parent)
            .map_ok(|records| records.into_iter().map(Lesson::from).collect())
            .boxed()
    }

    fn create<'a, A>(&self, api: &'a A, parent: u64) -> BoxFuture<'a, ApiResult<u64>>
    where
        A: CourseApi + ?Sized,
    {
        api.create_lesson(LessonBody::from_lesson(self, parent))
            .map_ok(|record| record.id)
            .boxed()
    }

    fn update<'a, A>(&self, api: &'a A, id: u64, parent: u64) -> BoxFuture<'a, ApiResult<()>>
    where
        A: CourseApi + ?Sized,
    {
        api.update_lesson(id, LessonBody::from_lesson(self, parent))
            .map_ok(|_| ())
            .boxed()
    }
}

impl Entity for Question {
    type Child = Answer;

    fn kind(&self) -> EntityKind {
        EntityKind::Question
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn parent_id(&self) -> EntityId {
        self.lesson_id
    }

    fn set_parent_id(&mut self, parent: EntityId) {
        self.lesson_id = parent;
    }

    fn is_persisted(&self) -> bool {
        self.persisted
    }

    fn set_persisted(&mut self, persisted: bool) {
        self.persisted = persisted;
    }

    fn children(&self) -> &[Answer] {
        &self.answers
    }

    fn children_mut(&mut self) -> &mut [Answer] {
        &mut self.answers
    }

    fn set_children(&mut self, children: Vec<Answer>) {
        self.answers = children;
    }

    fn list<A>(api: &A, parent: u64) -> BoxFuture<'_, ApiResult<Vec<Self>>>
    where
        A: CourseApi + ?Sized,
    {
        api.list_questions(parent)
            .map_ok(|records| records.into_iter().map(Question::from).collect())
            .boxed()
    }

    fn create<'a, A>(&self, api: &'a A, parent: u64) -> BoxFuture<'a, ApiResult<u64>>
    where
        A: CourseApi + ?Sized,
    {
        api.create_question(QuestionBody::from_question(self, parent))
            .map_ok(|record| record.id)
            .boxed()
    }

    fn update<'a, A>(&self, api: &'a A, id: u64, parent: u64) -> BoxFuture<'a, ApiResult<()>>
    where
        A: CourseApi + ?Sized,
    {
        api.update_question(id, QuestionBody::from_question(self, parent))
            .map_ok(|_| ())
            .boxed()
    }
}

impl Entity for Answer {
    type Child = Leaf;

    fn kind(&self) -> EntityKind {
        EntityKind::Answer
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn parent_id(&self) -> EntityId {
        self.question_id
    }

    fn set_parent_id(&mut self, parent: EntityId) {
        self.question_id = parent;
    }

    fn is_persisted(&self) -> bool {
        self.persisted
    }

    fn set_persisted(&mut self, persisted: bool) {
        self.persisted = persisted;
    }

    fn children(&self) -> &[Leaf] {
        &[]
    }

    fn children_mut(&mut self) -> &mut [Leaf] {
        &mut []
    }

    fn set_children(&mut self, _children: Vec<Leaf>) {}

    fn list<A>(api: &A, parent: u64) -> BoxFuture<'_, ApiResult<Vec<Self>>>
    where
        A: CourseApi + ?Sized,
    {
        api.list_answers(parent)
            .map_ok(|records| records.into_iter().map(Answer::from).collect())
            .boxed()
    }

    fn create<'a, A>(&self, api: &'a A, parent: u64) -> BoxFuture<'a, ApiResult<u64>>
    where
        A: CourseApi + ?Sized,
    {
        api.create_answer(AnswerBody::from_answer(self, parent))
            .map_ok(|record| record.id)
            .boxed()
    }

    fn update<'a, A>(&self, api: &'a A, id: u64, parent: u64) -> BoxFuture<'a, ApiResult<()>>
    where
        A: CourseApi + ?Sized,
    {
        api.update_answer(id, AnswerBody::from_answer(self, parent))
            .map_ok(|_| ())
            .boxed()
    }
}

/// Below the answers. Uninhabited: no value of this type ever exists.
#[derive(Debug, Clone)]
pub enum Leaf {}

impl Entity for Leaf {
    type Child = Leaf;

    fn kind(&self) -> EntityKind {
        match *self {}
    }

    fn id(&self) -> EntityId {
        match *self {}
    }

    fn set_id(&mut self, _id: EntityId) {
        match *self {}
    }

    fn parent_id(&self) -> EntityId {
        match *self {}
    }

    fn set_parent_id(&mut self, _parent: EntityId) {
        match *self {}
    }

    fn is_persisted(&self) -> bool {
        match *self {}
    }

    fn set_persisted(&mut self, _persisted: bool) {
        match *self {}
    }

    fn children(&self) -> &[Leaf] {
        match *self {}
    }

    fn children_mut(&mut self) -> &mut [Leaf] {
        match *self {}
    }

    fn set_children(&mut self, _children: Vec<Leaf>) {
        match *self {}
    }

    fn list<A>(_api: &A, _parent: u64) -> BoxFuture<'_, ApiResult<Vec<Self>>>
    where
        A: CourseApi + ?Sized,
    {
        future::ready(Ok(Vec::new())).boxed()
    }

    fn create<'a, A>(&self, _api: &'a A, _parent: u64) -> BoxFuture<'a, ApiResult<u64>>
    where
        A: CourseApi + ?Sized,
    {
        match *self {}
    }

    fn update<'a, A>(&self, _api: &'a A, _id: u64, _parent: u64) -> BoxFuture<'a, ApiResult<()>>
    where
        A: CourseApi + ?Sized,
    {
        match *self {}
    }
}
