//! Issuing a sync plan against the backend.
//!
//! Deletions go first, then creates and updates in a top-down walk of the
//! new tree. A node's children are only visited once the node's own call
//! has succeeded, so every child is sent with its parent's real server id.

use std::fmt;
use std::str::FromStr;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::CourseApi;
use crate::entity_id::EntityId;
use crate::error::{OperationFailure, SyncError};
use crate::models::CourseTree;
use crate::planner::{self, Action, SyncPlan, WriteOp};
use crate::remap::IdentityRemap;
use crate::schema::{Entity, EntityKind, NodePath};

/// What to do after a call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failed call.
    #[default]
    Abort,
    /// Skip the failed entity's subtree and carry on with everything else.
    BestEffort,
}

impl FailurePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            FailurePolicy::Abort => "abort",
            FailurePolicy::BestEffort => "best-effort",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown failure policy '{0}' (expected 'abort' or 'best-effort')")]
pub struct ParsePolicyError(String);

impl FromStr for FailurePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "best-effort" | "best_effort" => Ok(FailurePolicy::BestEffort),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// A call that succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub kind: EntityKind,
    pub action: Action,
    /// Identity in the tree that was sent.
    pub id: EntityId,
    /// Server id the call targeted or, for creates, was assigned.
    pub server_id: u64,
}

/// Outcome of executing a plan.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub remap: IdentityRemap,
    /// Successful calls in the order they were issued.
    pub calls: Vec<CallRecord>,
    pub failures: Vec<OperationFailure>,
    /// Planned calls never attempted.
    pub skipped: usize,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }

    pub fn count(&self, action: Action) -> usize {
        self.calls.iter().filter(|c| c.action == action).count()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted",
            self.count(Action::Create),
            self.count(Action::Update),
            self.count(Action::Delete)
        )?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        Ok(())
    }
}

/// Progress of a single execution.
#[derive(Debug, Default)]
struct Run {
    report: SyncReport,
    halted: bool,
}

impl Run {
    fn fail(&mut self, failure: OperationFailure, policy: FailurePolicy) {
        tracing::error!(
            kind = %failure.kind,
            id = %failure.id,
            action = %failure.action,
            error = %failure.error,
            "Sync call failed"
        );
        self.report.failures.push(failure);
        if policy == FailurePolicy::Abort {
            self.halted = true;
        }
    }

    fn succeed(&mut self, record: CallRecord) {
        tracing::debug!(
            kind = %record.kind,
            id = %record.id,
            server_id = record.server_id,
            action = %record.action,
            "Sync call succeeded"
        );
        self.report.calls.push(record);
    }
}

/// Runs plans against a backend.
pub struct Executor<'a, A: ?Sized> {
    api: &'a A,
    policy: FailurePolicy,
}

impl<'a, A> Executor<'a, A>
where
    A: CourseApi + ?Sized,
{
    pub fn new(api: &'a A, policy: FailurePolicy) -> Self {
        Self { api, policy }
    }

    /// Executes `plan`, which must have been computed for `tree`.
    ///
    /// The report is returned either way; on failure it is wrapped in
    /// [`SyncError::Incomplete`].
    pub async fn execute(&self, plan: &SyncPlan, tree: &CourseTree) -> Result<SyncReport, SyncError> {
        let mut run = Run::default();

        self.delete_pass(plan, &mut run).await;
        if !run.halted {
            self.write_level(&tree.sections, tree.course_id, NodePath::root(), plan, &mut run)
                .await;
        }

        let mut report = run.report;
        report.skipped = plan
            .len()
            .saturating_sub(report.calls.len() + report.failures.len());

        if report.failures.is_empty() {
            tracing::info!(course_id = tree.course_id, summary = %report, "Sync complete");
            Ok(report)
        } else {
            tracing::warn!(
                course_id = tree.course_id,
                policy = %self.policy,
                summary = %report,
                "Sync incomplete"
            );
            Err(SyncError::Incomplete(Box::new(report)))
        }
    }

    async fn delete_pass(&self, plan: &SyncPlan, run: &mut Run) {
        for deletion in plan.deletions() {
            if run.halted {
                break;
            }
            match deletion.kind.delete(self.api, deletion.id).await {
                Ok(()) => {
                    run.report.remap.record_deleted(deletion.kind, deletion.id);
                    run.succeed(CallRecord {
                        kind: deletion.kind,
                        action: Action::Delete,
                        id: EntityId::Server(deletion.id),
                        server_id: deletion.id,
                    });
                }
                Err(error) => run.fail(
                    OperationFailure {
                        kind: deletion.kind,
                        action: Action::Delete,
                        id: EntityId::Server(deletion.id),
                        path: None,
                        error,
                    },
                    self.policy,
                ),
            }
        }
    }

    fn write_level<'b, E: Entity>(
        &'b self,
        siblings: &'b [E],
        parent: u64,
        parent_path: NodePath,
        plan: &'b SyncPlan,
        run: &'b mut Run,
    ) -> BoxFuture<'b, ()> {
        async move {
            for (index, entity) in siblings.iter().enumerate() {
                if run.halted {
                    return;
                }
                let path = parent_path.child(index);
                if !plan.has_writes_under(&path) {
                    continue;
                }

                let resolved = match plan.write_at(&path) {
                    Some(write) => self.write(entity, write.op, parent, &path, run).await,
                    None => entity.id().server(),
                };

                match resolved {
                    Some(server_id) => {
                        self.write_level(entity.children(), server_id, path, plan, run)
                            .await
                    }
                    None => tracing::debug!(
                        kind = %entity.kind(),
                        id = %entity.id(),
                        "Skipping children of unsent entity"
                    ),
                }
            }
        }
        .boxed()
    }

    /// Issues one create or update. Returns the entity's server id on success.
    async fn write<E: Entity>(
        &self,
        entity: &E,
        op: WriteOp,
        parent: u64,
        path: &NodePath,
        run: &mut Run,
    ) -> Option<u64> {
        let result = match op {
            WriteOp::Create => entity.create(self.api, parent).await,
            WriteOp::Update { server_id } => entity
                .update(self.api, server_id, parent)
                .await
                .map(|()| server_id),
        };

        match result {
            Ok(server_id) => {
                match op {
                    WriteOp::Create => run.report.remap.record_created(path.clone(), server_id),
                    WriteOp::Update { .. } => run.report.remap.record_updated(path.clone()),
                }
                run.succeed(CallRecord {
                    kind: entity.kind(),
                    action: op.action(),
                    id: entity.id(),
                    server_id,
                });
                Some(server_id)
            }
            Err(error) => {
                run.fail(
                    OperationFailure {
                        kind: entity.kind(),
                        action: op.action(),
                        id: entity.id(),
                        path: Some(path.clone()),
                        error,
                    },
                    self.policy,
                );
                None
            }
        }
    }
}

/// Plans and executes in one go.
pub async fn synchronize<A>(
    api: &A,
    old: &CourseTree,
    new: &CourseTree,
    policy: FailurePolicy,
) -> Result<SyncReport, SyncError>
where
    A: CourseApi + ?Sized,
{
    let plan = planner::plan(old, new)?;
    if plan.is_empty() {
        tracing::debug!(course_id = new.course_id, "Nothing to sync");
        return Ok(SyncReport::default());
    }

    tracing::info!(
        course_id = new.course_id,
        calls = plan.len(),
        %policy,
        "Synchronizing course"
    );
    Executor::new(api, policy).execute(&plan, new).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Call, Fault, MemoryCourseApi};
    use crate::models::{Answer, Lesson, Question, Section};

    fn server(id: u64) -> EntityId {
        EntityId::Server(id)
    }

    fn temp(id: u64) -> EntityId {
        EntityId::Temporary(id)
    }

    /// Section 1 holding lesson 5, and lesson 7 with question 9 and answer 10.
    fn synced() -> CourseTree {
        let quiz = Lesson::new(server(7), server(1), "Quiz")
            .quiz()
            .with_questions(vec![Question::new(server(9), server(7), "Why?")
                .with_answers(vec![Answer::new(server(10), server(9), "Yes").persisted()])
                .persisted()])
            .persisted();
        let section = Section::new(server(1), 3, "Basics")
            .with_lessons(vec![Lesson::new(server(5), server(1), "Intro").persisted(), quiz])
            .persisted();
        CourseTree::new(3).with_sections(vec![section])
    }

    fn backend(tree: &CourseTree) -> MemoryCourseApi {
        let api = MemoryCourseApi::recording();
        api.seed(tree);
        api
    }

    /// A new section with two new lessons, each holding one question.
    fn with_new_section(old: &CourseTree) -> CourseTree {
        let lesson = |n: u64, title: &str| {
            Lesson::new(temp(n), temp(1), title)
                .with_questions(vec![Question::new(temp(1), temp(n), "Q")])
        };
        let mut new = old.clone();
        new.sections.push(
            Section::new(temp(1), 3, "Advanced")
                .with_lessons(vec![lesson(1, "Broken"), lesson(2, "Fine")]),
        );
        new
    }

    #[tokio::test]
    async fn test_create_lesson_in_existing_section() {
        let old = synced();
        let api = backend(&old);
        api.set_next_id(42);

        let mut new = old.clone();
        new.sections[0]
            .lessons
            .push(Lesson::new(temp(1), server(1), "New"));

        let report = synchronize(&api, &old, &new, FailurePolicy::Abort)
            .await
            .unwrap();

        assert_eq!(
            api.writes(),
            vec![Call::Create {
                kind: EntityKind::Lesson,
                parent: 1,
                id: 42
            }]
        );
        let applied = report.remap.apply(&new);
        let lesson = &applied.sections[0].lessons[2];
        assert_eq!(lesson.id, server(42));
        assert_eq!(lesson.title, "New");
        assert!(lesson.persisted);
    }

    /// Section 1 renamed, with a new lesson under it.
    fn with_updated_section(old: &CourseTree) -> CourseTree {
        let mut new = old.clone();
        let section = &mut new.sections[0];
        section.name = "Fundamentals".to_string();
        section.persisted = false;
        section.lessons.push(Lesson::new(temp(1), server(1), "New"));
        new
    }

    #[tokio::test]
    async fn test_updated_parent_is_sent_before_new_child() {
        let old = synced();
        let api = backend(&old);
        api.set_next_id(42);
        let new = with_updated_section(&old);

        synchronize(&api, &old, &new, FailurePolicy::Abort)
            .await
            .unwrap();

        assert_eq!(
            api.writes(),
            vec![
                Call::Update {
                    kind: EntityKind::Section,
                    id: 1,
                    parent: 3
                },
                Call::Create {
                    kind: EntityKind::Lesson,
                    parent: 1,
                    id: 42
                },
            ]
        );
        assert_eq!(api.tree(3).sections[0].name, "Fundamentals");
    }

    #[tokio::test]
    async fn test_failed_parent_update_skips_children() {
        let old = synced();
        let api = backend(&old);
        api.inject(Fault::Update(EntityKind::Section, 1));
        let new = with_updated_section(&old);

        let err = synchronize(&api, &old, &new, FailurePolicy::BestEffort)
            .await
            .unwrap_err();
        let SyncError::Incomplete(report) = err else {
            panic!("expected incomplete sync");
        };

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].action, Action::Update);
        assert!(report.calls.is_empty());
        assert_eq!(report.skipped, 1);
        assert!(api
            .writes()
            .iter()
            .all(|call| !matches!(call, Call::Create { .. })));
        assert_eq!(api.count(EntityKind::Lesson), 2);
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let old = synced();
        let api = backend(&old);
        let new = with_new_section(&old);

        let report = synchronize(&api, &old, &new, FailurePolicy::Abort)
            .await
            .unwrap();
        let applied = report.remap.apply(&new);

        api.clear_calls();
        let again = synchronize(&api, &applied, &applied, FailurePolicy::Abort)
            .await
            .unwrap();
        assert!(again.calls.is_empty());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_sends_one_call_per_removed_entity() {
        let old = synced();
        let api = backend(&old);
        let mut new = old.clone();
        new.sections[0].lessons.remove(1);

        synchronize(&api, &old, &new, FailurePolicy::Abort)
            .await
            .unwrap();

        assert_eq!(
            api.writes(),
            vec![Call::Delete {
                kind: EntityKind::Lesson,
                id: 7
            }]
        );
        assert_eq!(api.count(EntityKind::Question), 0);
        assert_eq!(api.count(EntityKind::Answer), 0);
    }

    #[tokio::test]
    async fn test_children_are_sent_after_parent_with_its_server_id() {
        let old = synced();
        let api = backend(&old);
        let new = with_new_section(&old);

        let report = synchronize(&api, &old, &new, FailurePolicy::Abort)
            .await
            .unwrap();
        assert_eq!(report.count(Action::Create), 5);

        // Ids the backend knows about, starting with the course.
        let mut created = std::collections::HashSet::from([3u64]);
        for call in api.writes() {
            let Call::Create { kind, parent, id } = call else {
                panic!("unexpected call {:?}", call);
            };
            assert!(created.contains(&parent), "{} {} sent before its parent", kind, id);
            created.insert(id);
        }
    }

    #[tokio::test]
    async fn test_update_only_changed_entity() {
        let old = synced();
        let api = backend(&old);
        let mut new = old.clone();
        let answer = &mut new.sections[0].lessons[1].questions[0].answers[0];
        answer.content = "Definitely".to_string();
        answer.persisted = false;

        let report = synchronize(&api, &old, &new, FailurePolicy::Abort)
            .await
            .unwrap();

        assert_eq!(
            api.writes(),
            vec![Call::Update {
                kind: EntityKind::Answer,
                id: 10,
                parent: 9
            }]
        );
        assert!(report.remap.is_confirmed(&NodePath::from(vec![0, 1, 0, 0])));
        assert_eq!(
            api.tree(3).sections[0].lessons[1].questions[0].answers[0].content,
            "Definitely"
        );
    }

    #[tokio::test]
    async fn test_abort_stops_at_first_failure() {
        let old = synced();
        let api = backend(&old);
        api.inject(Fault::Create(EntityKind::Lesson, "Broken".to_string()));
        let new = with_new_section(&old);

        let err = synchronize(&api, &old, &new, FailurePolicy::Abort)
            .await
            .unwrap_err();
        let SyncError::Incomplete(report) = err else {
            panic!("expected incomplete sync");
        };

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, EntityKind::Lesson);
        assert_eq!(report.failures[0].path, Some(NodePath::from(vec![1, 0])));
        // Section created, then nothing after the failed lesson.
        assert_eq!(report.calls.len(), 1);
        assert_eq!(report.skipped, 3);
        assert_eq!(api.count(EntityKind::Lesson), 2);
    }

    #[tokio::test]
    async fn test_best_effort_continues_with_siblings() {
        let old = synced();
        let api = backend(&old);
        api.inject(Fault::Create(EntityKind::Lesson, "Broken".to_string()));
        let new = with_new_section(&old);

        let err = synchronize(&api, &old, &new, FailurePolicy::BestEffort)
            .await
            .unwrap_err();
        let SyncError::Incomplete(report) = err else {
            panic!("expected incomplete sync");
        };

        // Section, sibling lesson and its question; the failed lesson's
        // question is never attempted.
        assert_eq!(report.calls.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.skipped, 1);
        assert!(report.remap.assigned(&NodePath::from(vec![1, 1, 0])).is_some());
        assert!(report.remap.assigned(&NodePath::from(vec![1, 0, 0])).is_none());
    }

    #[tokio::test]
    async fn test_failed_delete_under_abort_skips_writes() {
        let old = synced();
        let api = backend(&old);
        api.inject(Fault::Delete(EntityKind::Lesson, 5));
        let mut new = old.clone();
        new.sections[0].lessons.remove(0);
        new.sections[0].persisted = false;

        let err = synchronize(&api, &old, &new, FailurePolicy::Abort)
            .await
            .unwrap_err();
        let SyncError::Incomplete(report) = err else {
            panic!("expected incomplete sync");
        };
        assert_eq!(report.failures[0].action, Action::Delete);
        assert_eq!(report.skipped, 1);
        assert_eq!(api.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_plan_error_sends_nothing() {
        let old = synced();
        let api = backend(&old);
        let mut new = old.clone();
        new.sections
            .push(Section::new(server(77), 3, "Unknown"));

        let err = synchronize(&api, &old, &new, FailurePolicy::Abort)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Plan(_)));
        assert!(api.writes().is_empty());
    }

    #[test]
    fn test_failure_policy_parse() {
        assert_eq!("abort".parse(), Ok(FailurePolicy::Abort));
        assert_eq!("Best-Effort".parse(), Ok(FailurePolicy::BestEffort));
        assert!("retry".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
        assert_eq!(
            serde_json::to_string(&FailurePolicy::BestEffort).unwrap(),
            "\"best-effort\""
        );
    }

    #[test]
    fn test_report_summary() {
        let mut report = SyncReport::default();
        report.calls.push(CallRecord {
            kind: EntityKind::Lesson,
            action: Action::Create,
            id: temp(1),
            server_id: 42,
        });
        report.skipped = 2;
        assert_eq!(report.to_string(), "1 created, 0 updated, 0 deleted, 2 skipped");
        assert!(!report.is_complete());
    }
}
