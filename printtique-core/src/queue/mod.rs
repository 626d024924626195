//! Command Queue
//!
//! The queue owns a design and the full history of commands performed on it. It is the ground truth for
//! the current state of the design: every tracked edit goes through [`DesignQueue::write_with`], and
//! undo/redo walk the history.
//!
//! History is a tree rather than a list. Undoing and then making a new edit starts a new branch, leaving
//! the undone commands in place.

use crate::{
    commands::{self, CommandConsumer, CommandError},
    state::document::DesignDocument,
};

pub mod writer;

struct DesignQueueInner {
    /// Tree structure of commands, where undos create branches.
    /// "First child" represents earlier series of commands that were undone, "last" is the most recent.
    command_tree: slab_tree::Tree<commands::Command>,
    document: DesignDocument,
    // "Pointer" into the tree where the most recent command took place.
    present: slab_tree::NodeId,
    root: slab_tree::NodeId,
}
pub struct DesignQueue {
    inner: parking_lot::RwLock<DesignQueueInner>,
}
impl DesignQueue {
    /// Create a queue from a design, without a history.
    #[must_use]
    pub fn new(document: DesignDocument) -> Self {
        let mut command_tree = slab_tree::TreeBuilder::new()
            .with_root(commands::Command::Dummy)
            .build();
        // A freshly built tree with a root always has a root. Insert one anyway rather than unwrapping.
        let root = match command_tree.root_id() {
            Some(root) => root,
            None => command_tree.set_root(commands::Command::Dummy),
        };
        Self {
            inner: DesignQueueInner {
                command_tree,
                document,
                present: root,
                root,
            }
            .into(),
        }
    }
    /// Locks the queue for writing commands during the span of the closure, where each modification of the state is tracked
    /// by the command queue. If multiple commands are written, they will be written in order as a single Atoms scope.
    pub fn write_with<F, T>(&self, write: F) -> T
    where
        F: FnOnce(&mut writer::DesignQueueWriter<'_>) -> T,
    {
        let lock = self.inner.write();
        let mut writer = writer::DesignQueueWriter {
            lock,
            commands: smallvec::SmallVec::new(),
        };
        // Panic safe - the writer's Drop impl does the cleanup, ensuring the history and the document
        // stay synchronized.
        write(&mut writer)
    }
    /// Read the present state of the design.
    pub fn read<F, T>(&self, read: F) -> T
    where
        F: FnOnce(&DesignDocument) -> T,
    {
        read(&self.inner.read().document)
    }
    /// A copy of the design as it is at this moment. Layer stacks are shared, not deep-copied.
    #[must_use]
    pub fn peek_clone_state(&self) -> DesignDocument {
        self.read(DesignDocument::clone)
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        let lock = self.inner.read();
        lock.present != lock.root
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        let lock = self.inner.read();
        lock.command_tree
            .get(lock.present)
            .is_some_and(|node| node.last_child().is_some())
    }
    /// Step back up to `num` commands. Returns whether anything changed.
    ///
    /// Refused while a freehand stroke is open. If the history can't be replayed onto the design, the
    /// design is left as-is and the error returned.
    pub fn undo_n(&self, num: usize) -> Result<bool, CommandError> {
        let mut lock = self.inner.write();
        let DesignQueueInner {
            command_tree,
            document,
            present,
            root,
        } = &mut *lock;
        if document.is_drawing() {
            return Err(CommandError::Busy);
        }
        if num == 0 {
            return Ok(false);
        }
        // Linearly walk up the tree num steps.
        let start = *present;
        let ancestors = command_tree
            .get(start)
            .map(|this| this.ancestors())
            .ok_or(CommandError::UnknownResource)?;
        let end = ancestors.take(num).last().map_or(*root, |node| node.node_id());
        replay(command_tree, document, start, end)?;
        *present = end;
        Ok(start != end)
    }
    /// Step forward along the most recent branch up to `num` commands. Returns whether anything changed.
    pub fn redo_n(&self, num: usize) -> Result<bool, CommandError> {
        let mut lock = self.inner.write();
        let DesignQueueInner {
            command_tree,
            document,
            present,
            ..
        } = &mut *lock;
        if document.is_drawing() {
            return Err(CommandError::Busy);
        }
        // Step down the tree, taking the last (most recent) child every time.
        let start = *present;
        let mut end = start;
        for _ in 0..num {
            let this = command_tree
                .get(end)
                .ok_or(CommandError::UnknownResource)?;
            let Some(last_child) = this.last_child() else {
                // We've gone as deep as we can go!
                break;
            };
            end = last_child.node_id();
        }
        replay(command_tree, document, start, end)?;
        *present = end;
        Ok(start != end)
    }
}

/// Apply the commands between `start` and `end` onto the document, all or nothing.
fn replay(
    tree: &slab_tree::Tree<commands::Command>,
    document: &mut DesignDocument,
    start: slab_tree::NodeId,
    end: slab_tree::NodeId,
) -> Result<(), CommandError> {
    if start == end {
        return Ok(());
    }
    let path = traverse(tree, start, end).map_err(|err| {
        log::error!("command tree malformed: {err}");
        CommandError::UnknownResource
    })?;
    let mut fork = document.clone();
    for command in path {
        fork.apply(command).inspect_err(|err| {
            log::error!("history does not apply to the design: {err}");
        })?;
    }
    *document = fork;
    Ok(())
}

// Traverses the shortest path from one tree node to another.
// A traversal is an optional walk up to the closest ancestor, followed by walking down.
struct TreeTraverser<'t, T> {
    // current point of the traversal
    cur: slab_tree::NodeRef<'t, T>,
    tree: &'t slab_tree::Tree<T>,

    // Common ancestor. May be equal to end, but never equal to start (we'd be walking down then).
    // Or None if we're walking down (i.e. start *is* the common ancestor)
    ancestor: Option<slab_tree::NodeId>,
    // Path from the end up to the ancestor. Includes the ID of the branch point and the child idx.
    path_down: Vec<(slab_tree::NodeId, usize)>,
    // destination of the traversal.
    end: slab_tree::NodeId,
}

impl<'t, T> Iterator for TreeTraverser<'t, T> {
    type Item = commands::DoUndo<'t, T>;
    fn next(&mut self) -> Option<Self::Item> {
        if let Some(ancestor) = self.ancestor {
            // Going up: undo, then move cur.
            let result = commands::DoUndo::Undo(self.cur.data());
            // Parent will be some, as we know there's a common ancestor.
            self.cur = self.tree.get(self.cur.parent()?.node_id())?;

            // Top of the traversal, go down from here.
            if self.cur.node_id() == ancestor {
                self.ancestor = None;
            }

            Some(result)
        } else {
            if self.cur.node_id() == self.end {
                return None;
            }

            // Going down: move cur, then "Do" (opposite order)
            // The last entry of the path is the next branch to take, if it belongs to this node.
            // Otherwise default to the first child.
            let child_idx = match self.path_down.last().copied() {
                Some((node_id, child_idx)) if node_id == self.cur.node_id() => {
                    self.path_down.pop();
                    child_idx
                }
                _ => 0,
            };
            self.cur = self
                .tree
                .get(self.cur.children().nth(child_idx)?.node_id())?;

            Some(commands::DoUndo::Do(self.cur.data()))
        }
    }
}

/// Find the ID of the nearest ancestor of A and B, or an error if the IDs do not come from the same tree.
/// The endpoints themselves could be the ancestor, if one is a parent of another!
fn nearest_ancestor<T>(
    tree: &slab_tree::Tree<T>,
    a: slab_tree::NodeId,
    b: slab_tree::NodeId,
) -> Result<slab_tree::NodeId, TraverseError> {
    let a_node = tree.get(a).ok_or(TraverseError::NotFound)?;
    let b_node = tree.get(b).ok_or(TraverseError::NotFound)?;

    let parents_of_a: Vec<_> = std::iter::once(a)
        .chain(a_node.ancestors().map(|node| node.node_id()))
        .collect();
    // Because of traversal order the first shared one is the nearest.
    std::iter::once(b)
        .chain(b_node.ancestors().map(|node| node.node_id()))
        .find(|b_ancestor| parents_of_a.contains(b_ancestor))
        .ok_or(TraverseError::Disconnected)
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TraverseError {
    #[error("can't traverse disconnected subtrees")]
    Disconnected,
    #[error("ID not present in tree")]
    NotFound,
}
/// Create an iterator that traverses the shortest path between start and end nodes.
fn traverse<T>(
    tree: &slab_tree::Tree<T>,
    start: slab_tree::NodeId,
    end: slab_tree::NodeId,
) -> Result<TreeTraverser<'_, T>, TraverseError> {
    let ancestor = nearest_ancestor(tree, start, end)?;

    // Find the path from the ancestor to the end.
    let mut path_down = Vec::<(slab_tree::NodeId, usize)>::new();
    if ancestor != end {
        let mut cur_ref = tree.get(end).ok_or(TraverseError::NotFound)?;
        loop {
            // Always Some before reaching the ancestor.
            let parent = cur_ref.parent().ok_or(TraverseError::Disconnected)?;
            let child_idx = parent
                .children()
                .position(|node| node.node_id() == cur_ref.node_id())
                .ok_or(TraverseError::NotFound)?;
            // Zeroth child is the default, only record the others.
            if child_idx != 0 {
                path_down.push((parent.node_id(), child_idx));
            }

            if parent.node_id() == ancestor {
                break;
            }
            cur_ref = tree.get(parent.node_id()).ok_or(TraverseError::NotFound)?;
        }
    }

    Ok(TreeTraverser {
        cur: tree.get(start).ok_or(TraverseError::NotFound)?,
        tree,
        ancestor: (ancestor != start).then_some(ancestor),
        path_down,
        end,
    })
}

#[cfg(test)]
mod traversal_test {
    use super::{nearest_ancestor, traverse, TraverseError};
    ///```ignore
    ///         0     <deleted>
    ///        / \        |
    ///       /   \       |
    ///      1     2      8
    ///     /|\    |\     |
    ///    / | \   | \    |
    ///   3  4  5  6  7   9
    fn make_test_tree() -> (
        hashbrown::HashMap<i32, slab_tree::NodeId>,
        slab_tree::Tree<i32>,
    ) {
        let mut node_map = hashbrown::HashMap::with_capacity(11);
        let mut tree = slab_tree::TreeBuilder::new()
            .with_capacity(7)
            .with_root(0)
            .build();
        let mut root = tree.root_mut().unwrap();
        node_map.insert(0, root.node_id());

        let mut left = root.append(1);
        node_map.insert(1, left.node_id());
        node_map.insert(3, left.append(3).node_id());
        node_map.insert(4, left.append(4).node_id());
        node_map.insert(5, left.append(5).node_id());
        let mut right = root.append(2);
        node_map.insert(2, right.node_id());
        node_map.insert(6, right.append(6).node_id());
        node_map.insert(7, right.append(7).node_id());
        // Floating tree fragment
        let mut float = right.append(-1);
        let mut float = float.append(8);
        node_map.insert(8, float.node_id());
        node_map.insert(9, float.append(9).node_id());
        right.remove_last(slab_tree::RemoveBehavior::OrphanChildren);

        (node_map, tree)
    }
    #[test]
    fn ancestor() {
        let (ids, tree) = make_test_tree();
        let id_of = |id: i32| ids.get(&id).copied().unwrap();

        assert_eq!(nearest_ancestor(&tree, id_of(2), id_of(1)), Ok(id_of(0)));
        assert_eq!(nearest_ancestor(&tree, id_of(1), id_of(2)), Ok(id_of(0)));
        assert_eq!(nearest_ancestor(&tree, id_of(8), id_of(9)), Ok(id_of(8)));
        assert_eq!(nearest_ancestor(&tree, id_of(3), id_of(5)), Ok(id_of(1)));
        assert_eq!(nearest_ancestor(&tree, id_of(1), id_of(1)), Ok(id_of(1)));
        assert_eq!(
            nearest_ancestor(&tree, id_of(1), id_of(9)),
            Err(TraverseError::Disconnected)
        );
    }
    #[test]
    fn walk() {
        use crate::commands::DoUndo;
        let (ids, tree) = make_test_tree();
        let id_of = |id: i32| ids.get(&id).copied().unwrap();

        // Across the root
        assert!(Iterator::eq(
            traverse(&tree, id_of(7), id_of(5)).unwrap(),
            [
                DoUndo::Undo(&7),
                DoUndo::Undo(&2),
                DoUndo::Do(&1),
                DoUndo::Do(&5)
            ]
        ));
        // End at root
        assert!(Iterator::eq(
            traverse(&tree, id_of(6), id_of(0)).unwrap(),
            [DoUndo::Undo(&6), DoUndo::Undo(&2)]
        ));
        // Start at root
        assert!(Iterator::eq(
            traverse(&tree, id_of(0), id_of(3)).unwrap(),
            [DoUndo::Do(&1), DoUndo::Do(&3)]
        ));
        // Identity
        assert_eq!(traverse(&tree, id_of(2), id_of(2)).unwrap().count(), 0);
        assert!(traverse(&tree, id_of(6), id_of(9)).is_err());
    }
}
