//! # Commands
//!
//! Commands are the way the design document is modified. Every tracked change (adding a layer, nudging it,
//! switching the garment color) is recorded automatically as a command by a [`crate::queue::writer`], and
//! can be replayed forward or backward to implement undo and redo.

pub use crate::state::document::commands::{DocumentCommand, LayerCommand};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    #[error("command constructed for a state that does not match the current state")]
    MismatchedState,
    #[error("resource referenced by the command is not found")]
    UnknownResource,
    #[error("command makes no changes")]
    NoOp,
    #[error("a freehand stroke is in progress")]
    Busy,
}
pub trait CommandConsumer<C> {
    /// Apply a single command. If this generates an error,
    /// the state of `self` should *not* be observably changed.
    fn apply(&mut self, command: DoUndo<'_, C>) -> Result<(), CommandError>;
}
#[derive(Clone, Debug, PartialEq)]
pub enum ScopeType {
    /// Commands are grouped because they were individual parts of a single, larger operation.
    Atoms,
    /// A command writer panicked mid write. The commands contained may be part of an incomplete operation,
    /// but are still tracked to ensure integrity of the tree as a whole.
    WritePanic,
}
/// Commands about commands!
#[derive(Clone, Debug, PartialEq)]
pub enum MetaCommand {
    /// Bundle many commands into one group. Can be nested.
    /// Grouped commands are undone and redone as a single step.
    Scope(ScopeType, Box<[Command]>),
    /// The design was written to disk.
    ///
    /// Undoing a save is meaningless, but the event is still part of the history.
    Save(std::path::PathBuf),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Meta(MetaCommand),
    Layer(LayerCommand),
    Document(DocumentCommand),
    // Root of the command tree. Invalid anywhere else.
    Dummy,
}
impl From<MetaCommand> for Command {
    fn from(value: MetaCommand) -> Self {
        Self::Meta(value)
    }
}
impl From<LayerCommand> for Command {
    fn from(value: LayerCommand) -> Self {
        Self::Layer(value)
    }
}
impl From<DocumentCommand> for Command {
    fn from(value: DocumentCommand) -> Self {
        Self::Document(value)
    }
}
impl Command {
    #[must_use]
    pub fn meta(&self) -> Option<&MetaCommand> {
        match self {
            Self::Meta(m) => Some(m),
            _ => None,
        }
    }
    #[must_use]
    pub fn layer(&self) -> Option<&LayerCommand> {
        match self {
            Self::Layer(l) => Some(l),
            _ => None,
        }
    }
    #[must_use]
    pub fn document(&self) -> Option<&DocumentCommand> {
        match self {
            Self::Document(d) => Some(d),
            _ => None,
        }
    }
    #[must_use]
    pub fn dummy(&self) -> Option<()> {
        match self {
            Self::Dummy => Some(()),
            _ => None,
        }
    }
}

#[derive(PartialEq, Eq, Debug)]
pub enum DoUndo<'c, T> {
    Do(&'c T),
    Undo(&'c T),
}
// Manual impls, a derive would needlessly require `T: Clone`.
impl<T> Clone for DoUndo<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for DoUndo<'_, T> {}
impl<'c, T> DoUndo<'c, T> {
    /// Apply a closure to the inner type T, maintaining the
    /// Do or Undo status. Returns None if the closure returns None.
    pub fn filter_map<Func, Return>(&self, f: Func) -> Option<DoUndo<'c, Return>>
    where
        Func: FnOnce(&'c T) -> Option<&'c Return>,
        Return: 'c,
    {
        match self {
            Self::Do(c) => Some(DoUndo::Do(f(c)?)),
            Self::Undo(c) => Some(DoUndo::Undo(f(c)?)),
        }
    }
    /// The same command, applied in the opposite direction.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Do(c) => Self::Undo(c),
            Self::Undo(c) => Self::Do(c),
        }
    }
}
