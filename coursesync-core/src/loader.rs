//! Fetches a course's full persisted tree.

use futures::future::{BoxFuture, FutureExt};

use crate::api::CourseApi;
use crate::entity_id::EntityId;
use crate::error::{LoadError, ParentRef};
use crate::models::{CourseTree, Section};
use crate::schema::Entity;
use crate::temp_ids::TempIdAllocator;

/// A freshly loaded course and the temporary id counters seeded from it.
#[derive(Debug, Clone)]
pub struct LoadedTree {
    pub tree: CourseTree,
    pub temp_ids: TempIdAllocator,
}

/// Loads every section, lesson, question and answer of a course.
///
/// Siblings are sorted by id and marked persisted. Any failed list call
/// aborts the load.
pub async fn load_tree<A>(api: &A, course_id: u64) -> Result<LoadedTree, LoadError>
where
    A: CourseApi + ?Sized,
{
    tracing::debug!(course_id, "Loading course tree");

    let sections = load_children::<Section, A>(
        api,
        ParentRef::Course(course_id),
        EntityId::Server(course_id),
    )
    .await?;

    let tree = CourseTree::new(course_id).with_sections(sections);
    let temp_ids = TempIdAllocator::from_tree(&tree);

    tracing::info!(
        course_id,
        entities = tree.entity_count(),
        "Loaded course tree"
    );

    Ok(LoadedTree { tree, temp_ids })
}

fn load_children<'a, E, A>(
    api: &'a A,
    parent: ParentRef,
    parent_id: EntityId,
) -> BoxFuture<'a, Result<Vec<E>, LoadError>>
where
    E: Entity,
    A: CourseApi + ?Sized,
{
    async move {
        let parent_server_id = match parent {
            ParentRef::Course(id) => id,
            ParentRef::Entity { id, .. } => id,
        };

        let mut entities = E::list(api, parent_server_id).await.map_err(|source| {
            tracing::error!(%parent, error = %source, "Failed to list children");
            LoadError { parent, source }
        })?;
        entities.sort_by_key(|e| e.id());

        for entity in entities.iter_mut() {
            if entity.parent_id() != parent_id {
                tracing::warn!(
                    kind = %entity.kind(),
                    id = %entity.id(),
                    claimed = %entity.parent_id(),
                    listed_under = %parent,
                    "Correcting parent reference"
                );
                entity.set_parent_id(parent_id);
            }
            entity.set_persisted(true);

            let child_parent = ParentRef::Entity {
                kind: entity.kind(),
                id: entity.id().number(),
            };
            let children = load_children::<E::Child, A>(api, child_parent, entity.id()).await?;
            entity.set_children(children);
        }

        Ok(entities)
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Call, Fault, MemoryCourseApi};
    use crate::models::{Answer, Lesson, Question};
    use crate::schema::EntityKind;
    use crate::temp_ids::ParentKey;

    fn seeded_api() -> MemoryCourseApi {
        let quiz = Lesson::new(EntityId::Server(8), EntityId::Server(3), "Quiz")
            .quiz()
            .with_questions(vec![Question::new(EntityId::Server(11), EntityId::Server(8), "Why?")
                .with_answers(vec![
                    Answer::new(EntityId::Server(14), EntityId::Server(11), "Because"),
                    Answer::new(EntityId::Server(12), EntityId::Server(11), "No idea").correct(),
                ])]);
        let first = Section::new(EntityId::Server(3), 1, "First").with_lessons(vec![
            quiz,
            Lesson::new(EntityId::Server(5), EntityId::Server(3), "Intro"),
        ]);
        let second = Section::new(EntityId::Server(2), 1, "Second");

        let api = MemoryCourseApi::recording();
        api.seed(&CourseTree::new(1).with_sections(vec![first, second]));
        api
    }

    #[tokio::test]
    async fn test_load_sorts_and_marks_persisted() {
        let api = seeded_api();
        let loaded = load_tree(&api, 1).await.unwrap();
        let tree = loaded.tree;

        let section_ids: Vec<EntityId> = tree.sections.iter().map(|s| s.id).collect();
        assert_eq!(section_ids, vec![EntityId::Server(2), EntityId::Server(3)]);

        let lessons = &tree.sections[1].lessons;
        assert_eq!(lessons[0].id, EntityId::Server(5));
        assert_eq!(lessons[1].id, EntityId::Server(8));

        let answers = &lessons[1].questions[0].answers;
        assert_eq!(answers[0].id, EntityId::Server(12));
        assert!(answers[0].is_correct);
        assert!(answers.iter().all(|a| a.persisted));
        assert_eq!(tree.entity_count(), 7);
    }

    #[tokio::test]
    async fn test_load_issues_one_list_per_parent() {
        let api = seeded_api();
        load_tree(&api, 1).await.unwrap();

        let calls = api.calls();
        assert!(calls.iter().all(|c| !c.is_write()));
        // course + 2 sections + 2 lessons + 1 question
        assert_eq!(calls.len(), 6);
        assert_eq!(
            calls[0],
            Call::List {
                kind: EntityKind::Section,
                parent: 1
            }
        );
    }

    #[tokio::test]
    async fn test_load_seeds_counters() {
        let api = seeded_api();
        let loaded = load_tree(&api, 1).await.unwrap();

        let course = ParentKey::course();
        let first = course.child(EntityId::Server(3));
        let question = first
            .child(EntityId::Server(8))
            .child(EntityId::Server(11));

        assert_eq!(loaded.temp_ids.peek(&course), 4);
        assert_eq!(loaded.temp_ids.peek(&first), 9);
        assert_eq!(loaded.temp_ids.peek(&question), 15);
        assert_eq!(loaded.temp_ids.peek(&course.child(EntityId::Server(2))), 1);
    }

    #[tokio::test]
    async fn test_load_failure_names_parent() {
        let api = seeded_api();
        api.inject(Fault::List(EntityKind::Answer, 11));

        let err = load_tree(&api, 1).await.unwrap_err();
        assert_eq!(
            err.parent,
            ParentRef::Entity {
                kind: EntityKind::Question,
                id: 11
            }
        );
        assert_eq!(err.source.status(), Some(500));
    }

    #[tokio::test]
    async fn test_empty_course() {
        let api = MemoryCourseApi::new();
        let loaded = load_tree(&api, 99).await.unwrap();
        assert!(loaded.tree.sections.is_empty());
        assert_eq!(loaded.temp_ids.peek(&ParentKey::course()), 1);
    }
}
