//! Editing a course locally and saving it back.
//!
//! An [`EditSession`] holds the last-synced snapshot and the working tree.
//! Edits only touch the working tree; [`EditSession::save`] sends the
//! difference and folds whatever the server confirmed back into both trees,
//! so a retried save only re-sends what did not go through.

use crate::api::CourseApi;
use crate::entity_id::EntityId;
use crate::error::{SessionError, SyncError};
use crate::executor::{Executor, FailurePolicy, SyncReport};
use crate::loader;
use crate::models::{Answer, CourseTree, Lesson, Question, Section};
use crate::planner::{self, SyncPlan};
use crate::schema::Entity;
use crate::temp_ids::{ParentKey, TempIdAllocator};

#[derive(Debug, Clone)]
pub struct EditSession {
    course_id: u64,
    snapshot: CourseTree,
    working: CourseTree,
    temp_ids: TempIdAllocator,
    policy: FailurePolicy,
}

impl EditSession {
    /// Loads a course from the backend and starts editing it.
    pub async fn load<A>(api: &A, course_id: u64, policy: FailurePolicy) -> Result<Self, SessionError>
    where
        A: CourseApi + ?Sized,
    {
        let loaded = loader::load_tree(api, course_id).await?;
        Ok(Self {
            course_id,
            snapshot: loaded.tree.clone(),
            working: loaded.tree,
            temp_ids: loaded.temp_ids,
            policy,
        })
    }

    /// Resumes a session from a stored snapshot and working tree.
    pub fn from_parts(snapshot: CourseTree, working: CourseTree, policy: FailurePolicy) -> Self {
        let mut temp_ids = TempIdAllocator::from_tree(&snapshot);
        temp_ids.reseed(&working);
        Self {
            course_id: working.course_id,
            snapshot,
            working,
            temp_ids,
            policy,
        }
    }

    pub fn course_id(&self) -> u64 {
        self.course_id
    }

    /// The tree as last confirmed by the server.
    pub fn snapshot(&self) -> &CourseTree {
        &self.snapshot
    }

    pub fn working(&self) -> &CourseTree {
        &self.working
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Returns `(snapshot, working)`.
    pub fn into_parts(self) -> (CourseTree, CourseTree) {
        (self.snapshot, self.working)
    }

    pub fn plan(&self) -> Result<SyncPlan, SessionError> {
        Ok(planner::plan(&self.snapshot, &self.working)?)
    }

    pub fn has_unsaved_changes(&self) -> Result<bool, SessionError> {
        Ok(!self.plan()?.is_empty())
    }

    // Sections

    pub fn add_section(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.temp_ids.allocate(&ParentKey::course());
        self.working
            .sections
            .push(Section::new(id, self.course_id, name));
        id
    }

    pub fn edit_section(
        &mut self,
        section: EntityId,
        edit: impl FnOnce(&mut Section),
    ) -> Result<(), SessionError> {
        edit_entity(find_mut(&mut self.working.sections, section)?, edit);
        Ok(())
    }

    pub fn remove_section(&mut self, section: EntityId) -> Result<Section, SessionError> {
        remove(&mut self.working.sections, section)
    }

    // Lessons

    pub fn add_lesson(
        &mut self,
        section: EntityId,
        title: impl Into<String>,
    ) -> Result<EntityId, SessionError> {
        let parent = find_mut(&mut self.working.sections, section)?;
        let id = self.temp_ids.allocate(&ParentKey::course().child(section));
        parent.lessons.push(Lesson::new(id, section, title));
        Ok(id)
    }

    pub fn edit_lesson(
        &mut self,
        section: EntityId,
        lesson: EntityId,
        edit: impl FnOnce(&mut Lesson),
    ) -> Result<(), SessionError> {
        let parent = find_mut(&mut self.working.sections, section)?;
        edit_entity(find_mut(&mut parent.lessons, lesson)?, edit);
        Ok(())
    }

    pub fn remove_lesson(
        &mut self,
        section: EntityId,
        lesson: EntityId,
    ) -> Result<Lesson, SessionError> {
        let parent = find_mut(&mut self.working.sections, section)?;
        remove(&mut parent.lessons, lesson)
    }

    // Questions

    pub fn add_question(
        &mut self,
        section: EntityId,
        lesson: EntityId,
        content: impl Into<String>,
    ) -> Result<EntityId, SessionError> {
        let parent = find_mut(&mut self.working.sections, section)?;
        let parent = find_mut(&mut parent.lessons, lesson)?;
        let key = ParentKey::course().child(section).child(lesson);
        let id = self.temp_ids.allocate(&key);
        parent.questions.push(Question::new(id, lesson, content));
        Ok(id)
    }

    pub fn edit_question(
        &mut self,
        section: EntityId,
        lesson: EntityId,
        question: EntityId,
        edit: impl FnOnce(&mut Question),
    ) -> Result<(), SessionError> {
        let parent = find_mut(&mut self.working.sections, section)?;
        let parent = find_mut(&mut parent.lessons, lesson)?;
        edit_entity(find_mut(&mut parent.questions, question)?, edit);
        Ok(())
    }

    pub fn remove_question(
        &mut self,
        section: EntityId,
        lesson: EntityId,
        question: EntityId,
    ) -> Result<Question, SessionError> {
        let parent = find_mut(&mut self.working.sections, section)?;
        let parent = find_mut(&mut parent.lessons, lesson)?;
        remove(&mut parent.questions, question)
    }

    // Answers

    pub fn add_answer(
        &mut self,
        section: EntityId,
        lesson: EntityId,
        question: EntityId,
        content: impl Into<String>,
    ) -> Result<EntityId, SessionError> {
        let parent = find_mut(&mut self.working.sections, section)?;
        let parent = find_mut(&mut parent.lessons, lesson)?;
        let parent = find_mut(&mut parent.questions, question)?;
        let key = ParentKey::course()
            .child(section)
            .child(lesson)
            .child(question);
        let id = self.temp_ids.allocate(&key);
        parent.answers.push(Answer::new(id, question, content));
        Ok(id)
    }

    pub fn edit_answer(
        &mut self,
        section: EntityId,
        lesson: EntityId,
        question: EntityId,
        answer: EntityId,
        edit: impl FnOnce(&mut Answer),
    ) -> Result<(), SessionError> {
        let parent = find_mut(&mut self.working.sections, section)?;
        let parent = find_mut(&mut parent.lessons, lesson)?;
        let parent = find_mut(&mut parent.questions, question)?;
        edit_entity(find_mut(&mut parent.answers, answer)?, edit);
        Ok(())
    }

    pub fn remove_answer(
        &mut self,
        section: EntityId,
        lesson: EntityId,
        question: EntityId,
        answer: EntityId,
    ) -> Result<Answer, SessionError> {
        let parent = find_mut(&mut self.working.sections, section)?;
        let parent = find_mut(&mut parent.lessons, lesson)?;
        let parent = find_mut(&mut parent.questions, question)?;
        remove(&mut parent.answers, answer)
    }

    /// Sends local changes to the backend.
    ///
    /// Whatever the outcome, both trees afterwards reflect exactly what the
    /// server confirmed: created entities carry their server ids, confirmed
    /// edits are persisted, and the snapshot includes every completed call.
    pub async fn save<A>(&mut self, api: &A) -> Result<SyncReport, SessionError>
    where
        A: CourseApi + ?Sized,
    {
        let plan = self.plan()?;
        if plan.is_empty() {
            tracing::debug!(course_id = self.course_id, "No unsaved changes");
            return Ok(SyncReport::default());
        }

        tracing::info!(
            course_id = self.course_id,
            calls = plan.len(),
            policy = %self.policy,
            "Saving course"
        );

        let result = Executor::new(api, self.policy)
            .execute(&plan, &self.working)
            .await;

        match result {
            Ok(report) => {
                let applied = report.remap.apply(&self.working);
                self.snapshot = applied.clone();
                self.working = applied;
                self.temp_ids.reseed(&self.working);
                Ok(report)
            }
            Err(SyncError::Incomplete(report)) => {
                let applied = report.remap.apply(&self.working);
                self.snapshot = report.remap.advance_snapshot(&self.snapshot, &applied);
                self.working = applied;
                self.temp_ids.reseed(&self.working);
                Err(SyncError::Incomplete(report).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn not_found<E: Entity>(siblings: &[E], id: EntityId) -> SessionError {
    let kind = siblings
        .first()
        .map(|e| e.kind().name())
        .unwrap_or("entity");
    SessionError::NotFound(format!("{} {}", kind, id))
}

fn find_mut<E: Entity>(siblings: &mut [E], id: EntityId) -> Result<&mut E, SessionError> {
    match siblings.iter().position(|e| e.id() == id) {
        Some(index) => Ok(&mut siblings[index]),
        None => Err(not_found(siblings, id)),
    }
}

fn remove<E: Entity>(siblings: &mut Vec<E>, id: EntityId) -> Result<E, SessionError> {
    match siblings.iter().position(|e| e.id() == id) {
        Some(index) => Ok(siblings.remove(index)),
        None => Err(not_found(siblings, id)),
    }
}

/// Applies `edit` and marks the entity as needing an update.
///
/// Identity and parent reference are restored afterwards.
fn edit_entity<E: Entity>(entity: &mut E, edit: impl FnOnce(&mut E)) {
    let id = entity.id();
    let parent = entity.parent_id();
    edit(entity);
    entity.set_id(id);
    entity.set_parent_id(parent);
    entity.set_persisted(false);
}
