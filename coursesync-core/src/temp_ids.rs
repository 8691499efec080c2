//! Temporary identity allocation.
//!
//! New entities get a temporary id that is unique among their siblings.
//! Counters are kept per parent and start one above the largest child id
//! already present, so a fresh temporary id never collides with a sibling
//! in either regime.

use std::collections::HashMap;

use crate::entity_id::EntityId;
use crate::models::CourseTree;
use crate::schema::Entity;

/// Address of a parent: the ids from the section down to the parent itself.
///
/// The empty key is the course, whose children are sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParentKey(Vec<EntityId>);

impl ParentKey {
    pub fn course() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, id: EntityId) -> Self {
        let mut ids = Vec::with_capacity(self.0.len() + 1);
        ids.extend_from_slice(&self.0);
        ids.push(id);
        Self(ids)
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.0
    }
}

impl From<&[EntityId]> for ParentKey {
    fn from(ids: &[EntityId]) -> Self {
        Self(ids.to_vec())
    }
}

/// Per-parent counters for temporary ids.
#[derive(Debug, Clone, Default)]
pub struct TempIdAllocator {
    next: HashMap<ParentKey, u64>,
}

impl TempIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds counters from every parent in `tree`.
    pub fn from_tree(tree: &CourseTree) -> Self {
        let mut allocator = Self::new();
        allocator.reseed(tree);
        allocator
    }

    /// Raises counters to cover the children currently in `tree`.
    ///
    /// Counters never move backwards, so ids handed out earlier in a session
    /// are not reissued after their entities were removed.
    pub fn reseed(&mut self, tree: &CourseTree) {
        self.seed_level(&ParentKey::course(), &tree.sections);
    }

    /// The counter the next allocation under `parent` will use.
    pub fn peek(&self, parent: &ParentKey) -> u64 {
        self.next.get(parent).copied().unwrap_or(1)
    }

    /// Hands out the next temporary id under `parent`.
    pub fn allocate(&mut self, parent: &ParentKey) -> EntityId {
        let slot = self.next.entry(parent.clone()).or_insert(1);
        let id = *slot;
        *slot += 1;
        EntityId::Temporary(id)
    }

    fn raise(&mut self, parent: &ParentKey, next: u64) {
        match self.next.get_mut(parent) {
            Some(slot) => *slot = (*slot).max(next),
            None => {
                self.next.insert(parent.clone(), next);
            }
        }
    }

    fn seed_level<E: Entity>(&mut self, parent: &ParentKey, siblings: &[E]) {
        // A parent without children starts at 1, which is the default.
        let Some(max) = siblings.iter().map(|e| e.id().number()).max() else {
            return;
        };
        self.raise(parent, max + 1);

        for entity in siblings {
            self.seed_level(&parent.child(entity.id()), entity.children());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lesson, Section};

    fn tree() -> CourseTree {
        let section = Section::new(EntityId::Server(4), 1, "Basics").with_lessons(vec![
            Lesson::new(EntityId::Server(9), EntityId::Server(4), "One"),
            Lesson::new(EntityId::Temporary(12), EntityId::Server(4), "Draft"),
        ]);
        let empty = Section::new(EntityId::Server(2), 1, "Empty");
        CourseTree::new(1).with_sections(vec![empty, section])
    }

    #[test]
    fn test_seeds_above_max_child() {
        let allocator = TempIdAllocator::from_tree(&tree());
        assert_eq!(allocator.peek(&ParentKey::course()), 5);

        let basics = ParentKey::course().child(EntityId::Server(4));
        // Both regimes count towards the maximum.
        assert_eq!(allocator.peek(&basics), 13);

        let empty = ParentKey::course().child(EntityId::Server(2));
        assert_eq!(allocator.peek(&empty), 1);
    }

    #[test]
    fn test_allocate_increments_per_parent() {
        let mut allocator = TempIdAllocator::new();
        let course = ParentKey::course();
        let section = course.child(EntityId::Server(3));

        assert_eq!(allocator.allocate(&course), EntityId::Temporary(1));
        assert_eq!(allocator.allocate(&course), EntityId::Temporary(2));
        assert_eq!(allocator.allocate(&section), EntityId::Temporary(1));
    }

    #[test]
    fn test_reseed_never_lowers_counter() {
        let mut allocator = TempIdAllocator::from_tree(&tree());
        let course = ParentKey::course();
        for _ in 0..5 {
            allocator.allocate(&course);
        }
        assert_eq!(allocator.peek(&course), 10);

        allocator.reseed(&CourseTree::new(1));
        assert_eq!(allocator.peek(&course), 10);

        let big = CourseTree::new(1).with_sections(vec![Section::new(
            EntityId::Server(40),
            1,
            "Later",
        )]);
        allocator.reseed(&big);
        assert_eq!(allocator.peek(&course), 41);
    }

    #[test]
    fn test_parent_key_from_slice() {
        let ids = [EntityId::Server(1), EntityId::Temporary(2)];
        let key = ParentKey::from(&ids[..]);
        assert_eq!(
            key,
            ParentKey::course()
                .child(EntityId::Server(1))
                .child(EntityId::Temporary(2))
        );
        assert_eq!(key.ids().len(), 2);
    }
}
