//! Identity reconciliation after a sync.
//!
//! The executor never touches the tree it is sending. It records what the
//! server confirmed in an [`IdentityRemap`], which is then applied to the
//! tree to produce the next working copy and, after a partial failure, the
//! next snapshot.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::entity_id::EntityId;
use crate::models::CourseTree;
use crate::schema::{Entity, EntityKind, NodePath};

/// What the server confirmed during one sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityRemap {
    assigned: BTreeMap<NodePath, u64>,
    confirmed: BTreeSet<NodePath>,
    deleted: BTreeSet<(EntityKind, u64)>,
}

impl IdentityRemap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A create at `path` succeeded and the server assigned `server_id`.
    pub fn record_created(&mut self, path: NodePath, server_id: u64) {
        self.assigned.insert(path.clone(), server_id);
        self.confirmed.insert(path);
    }

    /// An update at `path` succeeded.
    pub fn record_updated(&mut self, path: NodePath) {
        self.confirmed.insert(path);
    }

    pub fn record_deleted(&mut self, kind: EntityKind, server_id: u64) {
        self.deleted.insert((kind, server_id));
    }

    /// Server id assigned to the node created at `path`.
    pub fn assigned(&self, path: &NodePath) -> Option<u64> {
        self.assigned.get(path).copied()
    }

    pub fn is_confirmed(&self, path: &NodePath) -> bool {
        self.confirmed.contains(path)
    }

    pub fn is_deleted(&self, kind: EntityKind, server_id: u64) -> bool {
        self.deleted.contains(&(kind, server_id))
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty() && self.confirmed.is_empty() && self.deleted.is_empty()
    }

    /// Returns a copy of `tree` with assigned ids, fixed parent references
    /// and confirmed nodes marked persisted.
    ///
    /// `tree` must be the tree the sync was executed against; paths are
    /// resolved positionally.
    pub fn apply(&self, tree: &CourseTree) -> CourseTree {
        let mut applied = tree.clone();
        self.apply_level(&mut applied.sections, &NodePath::root());
        applied
    }

    fn apply_level<E: Entity>(&self, siblings: &mut [E], parent_path: &NodePath) {
        for (index, entity) in siblings.iter_mut().enumerate() {
            let path = parent_path.child(index);
            if let Some(server_id) = self.assigned(&path) {
                let id = EntityId::Server(server_id);
                entity.set_id(id);
                for child in entity.children_mut() {
                    child.set_parent_id(id);
                }
            }
            if self.is_confirmed(&path) {
                entity.set_persisted(true);
            }
            self.apply_level(entity.children_mut(), &path);
        }
    }

    /// Computes the snapshot to diff against next, after a sync that may
    /// have stopped part way.
    ///
    /// The result is `old` without the confirmed deletions, plus every
    /// entity of `applied` that now has a server id `old` does not know.
    /// Entities whose update was confirmed take their content from
    /// `applied`. Everything in it reflects server state, so it is all
    /// persisted.
    pub fn advance_snapshot(&self, old: &CourseTree, applied: &CourseTree) -> CourseTree {
        let sections = self.advance_level(&old.sections, &applied.sections);
        CourseTree::new(old.course_id).with_sections(sections)
    }

    fn advance_level<E: Entity>(&self, old: &[E], applied: &[E]) -> Vec<E> {
        let mut next = Vec::with_capacity(old.len());
        let mut known = HashSet::with_capacity(old.len());

        for entity in old {
            let EntityId::Server(id) = entity.id() else {
                continue;
            };
            if self.is_deleted(entity.kind(), id) {
                continue;
            }
            known.insert(entity.id());

            // Confirmed entities carry what the server now holds; the rest
            // keep their old content.
            let matched = applied.iter().find(|a| a.id() == entity.id());
            let mut kept = match matched {
                Some(confirmed) if confirmed.is_persisted() => confirmed.clone(),
                _ => entity.clone(),
            };
            let applied_children = matched.map(|a| a.children()).unwrap_or(&[]);
            kept.set_children(self.advance_level(entity.children(), applied_children));
            kept.set_persisted(true);
            next.push(kept);
        }

        for entity in applied {
            if !entity.id().is_temporary() && !known.contains(&entity.id()) {
                next.push(server_only(entity));
            }
        }

        next
    }
}

/// Copy of a freshly created entity with its never-created descendants removed.
fn server_only<E: Entity>(entity: &E) -> E {
    let mut copy = entity.clone();
    let children = entity
        .children()
        .iter()
        .filter(|c| !c.id().is_temporary())
        .map(server_only)
        .collect();
    copy.set_children(children);
    copy.set_persisted(true);
    copy
}
