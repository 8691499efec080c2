//! Diffing an edited course tree against its last-synced snapshot.
//!
//! The same comparison runs at every parent/child relationship. Old
//! siblings missing from the new tree are deleted (their descendants go
//! with them server-side), new siblings missing from the old tree are
//! created together with their whole subtree, and matched siblings are
//! updated when they are no longer persisted. Matched siblings are always
//! descended into.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::entity_id::EntityId;
use crate::error::PlanError;
use crate::models::CourseTree;
use crate::schema::{Entity, EntityKind, NodePath};

/// A remote call kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What to do with a node of the new tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update { server_id: u64 },
}

impl WriteOp {
    pub fn action(&self) -> Action {
        match self {
            WriteOp::Create => Action::Create,
            WriteOp::Update { .. } => Action::Update,
        }
    }
}

/// A create or update, addressed by the node's path in the new tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWrite {
    pub kind: EntityKind,
    pub id: EntityId,
    pub op: WriteOp,
}

/// A delete of a server entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDelete {
    pub kind: EntityKind,
    pub id: u64,
    pub parent: EntityId,
}

/// The calls that bring the server from the old tree to the new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    deletions: Vec<PlannedDelete>,
    writes: BTreeMap<NodePath, PlannedWrite>,
}

impl SyncPlan {
    /// Deletions in issue order.
    pub fn deletions(&self) -> &[PlannedDelete] {
        &self.deletions
    }

    /// Writes in top-down pre-order of the new tree.
    pub fn writes(&self) -> impl Iterator<Item = (&NodePath, &PlannedWrite)> {
        self.writes.iter()
    }

    pub fn write_at(&self, path: &NodePath) -> Option<&PlannedWrite> {
        self.writes.get(path)
    }

    /// True if a write is planned at `path` or anywhere below it.
    pub fn has_writes_under(&self, path: &NodePath) -> bool {
        self.writes
            .range(path.clone()..)
            .next()
            .is_some_and(|(p, _)| p.starts_with(path))
    }

    /// Total number of calls.
    pub fn len(&self) -> usize {
        self.deletions.len() + self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.writes.is_empty()
    }

    pub fn count(&self, action: Action) -> usize {
        match action {
            Action::Delete => self.deletions.len(),
            _ => self
                .writes
                .values()
                .filter(|w| w.op.action() == action)
                .count(),
        }
    }

    pub fn count_kind(&self, kind: EntityKind, action: Action) -> usize {
        match action {
            Action::Delete => self.deletions.iter().filter(|d| d.kind == kind).count(),
            _ => self
                .writes
                .values()
                .filter(|w| w.kind == kind && w.op.action() == action)
                .count(),
        }
    }
}

impl fmt::Display for SyncPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No changes.");
        }

        for deletion in &self.deletions {
            writeln!(
                f,
                "- delete {} {} (under {})",
                deletion.kind, deletion.id, deletion.parent
            )?;
        }
        for (path, write) in &self.writes {
            let indent = "  ".repeat(path.depth().saturating_sub(1));
            let (marker, target) = match write.op {
                WriteOp::Create => ('+', write.id.to_string()),
                WriteOp::Update { server_id } => ('~', server_id.to_string()),
            };
            writeln!(
                f,
                "{}{} {} {} {}",
                indent,
                marker,
                write.op.action(),
                write.kind,
                target
            )?;
        }

        writeln!(
            f,
            "{} to create, {} to update, {} to delete",
            self.count(Action::Create),
            self.count(Action::Update),
            self.count(Action::Delete)
        )
    }
}

/// Computes the calls that turn `old` into `new`.
///
/// Temporary ids left in `old` never reached the server and are ignored.
pub fn plan(old: &CourseTree, new: &CourseTree) -> Result<SyncPlan, PlanError> {
    if old.course_id != new.course_id {
        return Err(PlanError::CourseMismatch {
            old: old.course_id,
            new: new.course_id,
        });
    }

    let mut plan = SyncPlan::default();
    diff_level(
        &old.sections,
        &new.sections,
        EntityId::Server(new.course_id),
        &NodePath::root(),
        &mut plan,
    )?;

    tracing::debug!(
        course_id = new.course_id,
        creates = plan.count(Action::Create),
        updates = plan.count(Action::Update),
        deletes = plan.count(Action::Delete),
        "Planned sync"
    );
    Ok(plan)
}

fn check_unique<E: Entity>(siblings: &[E], parent: EntityId) -> Result<HashSet<EntityId>, PlanError> {
    let mut seen = HashSet::with_capacity(siblings.len());
    for entity in siblings {
        if !seen.insert(entity.id()) {
            return Err(PlanError::DuplicateId {
                kind: entity.kind(),
                id: entity.id(),
                parent,
            });
        }
    }
    Ok(seen)
}

fn diff_level<E: Entity>(
    old: &[E],
    new: &[E],
    parent: EntityId,
    parent_path: &NodePath,
    plan: &mut SyncPlan,
) -> Result<(), PlanError> {
    let mut previous: HashMap<EntityId, &E> = HashMap::with_capacity(old.len());
    for entity in old.iter().filter(|e| !e.id().is_temporary()) {
        if previous.insert(entity.id(), entity).is_some() {
            return Err(PlanError::DuplicateId {
                kind: entity.kind(),
                id: entity.id(),
                parent,
            });
        }
    }
    let current = check_unique(new, parent)?;

    for entity in old {
        if let EntityId::Server(id) = entity.id() {
            if !current.contains(&entity.id()) {
                plan.deletions.push(PlannedDelete {
                    kind: entity.kind(),
                    id,
                    parent,
                });
            }
        }
    }

    for (index, entity) in new.iter().enumerate() {
        let path = parent_path.child(index);
        match previous.get(&entity.id()) {
            Some(before) => {
                if let (false, EntityId::Server(server_id)) = (entity.is_persisted(), entity.id()) {
                    plan.writes.insert(
                        path.clone(),
                        PlannedWrite {
                            kind: entity.kind(),
                            id: entity.id(),
                            op: WriteOp::Update { server_id },
                        },
                    );
                }
                diff_level(before.children(), entity.children(), entity.id(), &path, plan)?;
            }
            None => plan_creation(entity, parent, path, plan)?,
        }
    }

    Ok(())
}

fn plan_creation<E: Entity>(
    entity: &E,
    parent: EntityId,
    path: NodePath,
    plan: &mut SyncPlan,
) -> Result<(), PlanError> {
    if !entity.id().is_temporary() {
        return Err(PlanError::UnknownServerId {
            kind: entity.kind(),
            id: entity.id(),
            parent,
        });
    }

    check_unique(entity.children(), entity.id())?;
    plan.writes.insert(
        path.clone(),
        PlannedWrite {
            kind: entity.kind(),
            id: entity.id(),
            op: WriteOp::Create,
        },
    );

    for (index, child) in entity.children().iter().enumerate() {
        plan_creation(child, entity.id(), path.child(index), plan)?;
    }
    Ok(())
}
