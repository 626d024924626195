//! # Design document
//!
//! One design per customization session: the chosen product and color variant, the active side, and
//! the two ordered layer stacks. Array order is authoritative for drawing order, the last layer is on
//! top, and every layer's `z_index` mirrors its position.
//!
//! The document is only ever mutated through [`super::writer::DesignWriter`] (recording a command per
//! change) or by replaying those commands through [`CommandConsumer`].

use std::sync::Arc;

use crate::commands::{Command, CommandConsumer, CommandError, DoUndo, MetaCommand};
use crate::state::freehand::StrokeSession;
use crate::state::layer::{Layer, LayerID};

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::AsRefStr,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    #[default]
    Front,
    Back,
}
impl Side {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

/// Which neighbor a layer swaps with when reordered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards the end of the stack, drawn later.
    Up,
    /// Towards the start of the stack, drawn earlier.
    Down,
}

/// An ordered, copy-on-write collection of layers for one side.
///
/// Cloning is cheap and yields a snapshot: later mutations of the document never show through a
/// previously taken clone.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct LayerStack(Arc<Vec<Layer>>);
impl LayerStack {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.0.iter()
    }
    #[must_use]
    pub fn as_slice(&self) -> &[Layer] {
        &self.0
    }
    #[must_use]
    pub fn get(&self, id: LayerID) -> Option<&Layer> {
        self.0.iter().find(|layer| layer.id() == id)
    }
    #[must_use]
    pub fn position(&self, id: LayerID) -> Option<usize> {
        self.0.iter().position(|layer| layer.id() == id)
    }
    #[must_use]
    pub fn contains(&self, id: LayerID) -> bool {
        self.position(id).is_some()
    }
    /// Whether the two stacks are views of the very same storage.
    #[cfg(test)]
    pub(crate) fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    /// Build a stack from layers, rejecting duplicate IDs. Z indices are renumbered.
    pub fn from_layers(layers: Vec<Layer>) -> Result<Self, LayerID> {
        let mut seen = hashbrown::HashSet::with_capacity(layers.len());
        if let Some(dup) = layers.iter().map(Layer::id).find(|id| !seen.insert(*id)) {
            return Err(dup);
        }
        let mut stack = Self(Arc::new(layers));
        stack.renumber();
        Ok(stack)
    }
    /// Mutable access, cloning the storage first if any snapshot still shares it.
    pub(crate) fn make_mut(&mut self) -> &mut Vec<Layer> {
        Arc::make_mut(&mut self.0)
    }
    /// Restore the `z_index == position` invariant after a structural change.
    pub(crate) fn renumber(&mut self) {
        let needs = self
            .0
            .iter()
            .enumerate()
            .any(|(idx, layer)| layer.z_index() as usize != idx);
        if needs {
            for (idx, layer) in self.make_mut().iter_mut().enumerate() {
                layer.set_z_index(u32::try_from(idx).unwrap_or(u32::MAX));
            }
        }
    }
    pub(crate) fn insert(&mut self, index: usize, layer: Layer) -> Result<(), CommandError> {
        if index > self.len() {
            return Err(CommandError::MismatchedState);
        }
        if self.contains(layer.id()) {
            return Err(CommandError::MismatchedState);
        }
        self.make_mut().insert(index, layer);
        self.renumber();
        Ok(())
    }
    /// Remove the layer at `index`, which must be `id`.
    pub(crate) fn remove(&mut self, index: usize, id: LayerID) -> Result<Layer, CommandError> {
        match self.0.get(index) {
            Some(layer) if layer.id() == id => (),
            Some(_) => return Err(CommandError::MismatchedState),
            None => return Err(CommandError::UnknownResource),
        }
        let removed = self.make_mut().remove(index);
        self.renumber();
        Ok(removed)
    }
    /// Replace `from` with `to`, in place.
    pub(crate) fn replace(&mut self, from: &Layer, to: &Layer) -> Result<(), CommandError> {
        if from.id() != to.id() {
            return Err(CommandError::MismatchedState);
        }
        let index = self
            .position(from.id())
            .ok_or(CommandError::UnknownResource)?;
        if &self.0[index] != from {
            return Err(CommandError::MismatchedState);
        }
        self.make_mut()[index] = to.clone();
        self.renumber();
        Ok(())
    }
    /// Move the layer at `from`, which must be `id`, to `to`.
    pub(crate) fn relocate(
        &mut self,
        id: LayerID,
        from: usize,
        to: usize,
    ) -> Result<(), CommandError> {
        if to >= self.len() {
            return Err(CommandError::UnknownResource);
        }
        let layer = self.remove(from, id)?;
        self.make_mut().insert(to, layer);
        self.renumber();
        Ok(())
    }
}
impl<'a> IntoIterator for &'a LayerStack {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Persistence identity of a design.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DesignID(pub uuid::Uuid);
impl Default for DesignID {
    fn default() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}
impl std::fmt::Display for DesignID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The base product and color variant a design is printed on.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Garment {
    pub product_id: String,
    pub variant_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DesignDocument {
    id: DesignID,
    pub(crate) garment: Garment,
    pub(crate) side: Side,
    pub(crate) front: LayerStack,
    pub(crate) back: LayerStack,
    // Open freehand stroke, if any. Never part of the history.
    pub(crate) drawing: Option<StrokeSession>,
}
impl DesignDocument {
    /// An empty design on the front side of the given garment.
    #[must_use]
    pub fn new(garment: Garment) -> Self {
        Self::from_parts(
            DesignID::default(),
            garment,
            Side::Front,
            LayerStack::default(),
            LayerStack::default(),
        )
    }
    #[must_use]
    pub fn from_parts(
        id: DesignID,
        garment: Garment,
        side: Side,
        front: LayerStack,
        back: LayerStack,
    ) -> Self {
        Self {
            id,
            garment,
            side,
            front,
            back,
            drawing: None,
        }
    }
    #[must_use]
    pub fn id(&self) -> DesignID {
        self.id
    }
    #[must_use]
    pub fn garment(&self) -> &Garment {
        &self.garment
    }
    #[must_use]
    pub fn active_side(&self) -> Side {
        self.side
    }
    #[must_use]
    pub fn layers(&self, side: Side) -> &LayerStack {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }
    pub(crate) fn layers_mut(&mut self, side: Side) -> &mut LayerStack {
        match side {
            Side::Front => &mut self.front,
            Side::Back => &mut self.back,
        }
    }
    #[must_use]
    pub fn active_layers(&self) -> &LayerStack {
        self.layers(self.side)
    }
    /// Find a layer on either side.
    #[must_use]
    pub fn find(&self, id: LayerID) -> Option<(Side, &Layer)> {
        [Side::Front, Side::Back]
            .into_iter()
            .find_map(|side| Some((side, self.layers(side).get(id)?)))
    }
    /// The open freehand stroke, if any.
    #[must_use]
    pub fn drawing(&self) -> Option<StrokeSession> {
        self.drawing
    }
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.drawing.is_some()
    }
}

pub mod commands {
    use super::{Garment, Side};
    use crate::state::layer::{Layer, LayerID};

    #[derive(Clone, Debug, PartialEq)]
    pub enum LayerCommand {
        Added {
            side: Side,
            index: usize,
            layer: Layer,
        },
        Deleted {
            side: Side,
            index: usize,
            layer: Layer,
        },
        Changed {
            side: Side,
            from: Layer,
            to: Layer,
        },
        Moved {
            side: Side,
            target: LayerID,
            from_index: usize,
            to_index: usize,
        },
    }
    #[derive(Clone, Debug, PartialEq)]
    pub enum DocumentCommand {
        SideChanged { from: Side, to: Side },
        VariantChanged { from: String, to: String },
        ProductChanged { from: Garment, to: Garment },
    }
}

impl CommandConsumer<commands::LayerCommand> for DesignDocument {
    fn apply(&mut self, command: DoUndo<'_, commands::LayerCommand>) -> Result<(), CommandError> {
        use commands::LayerCommand;
        match command {
            DoUndo::Do(LayerCommand::Added { side, index, layer })
            | DoUndo::Undo(LayerCommand::Deleted { side, index, layer }) => {
                self.layers_mut(*side).insert(*index, layer.clone())
            }
            DoUndo::Undo(LayerCommand::Added { side, index, layer })
            | DoUndo::Do(LayerCommand::Deleted { side, index, layer }) => self
                .layers_mut(*side)
                .remove(*index, layer.id())
                .map(|_| ()),
            DoUndo::Do(LayerCommand::Changed { side, from, to })
            | DoUndo::Undo(LayerCommand::Changed {
                side,
                from: to,
                to: from,
            }) => self.layers_mut(*side).replace(from, to),
            DoUndo::Do(LayerCommand::Moved {
                side,
                target,
                from_index,
                to_index,
            })
            | DoUndo::Undo(LayerCommand::Moved {
                side,
                target,
                from_index: to_index,
                to_index: from_index,
            }) => self
                .layers_mut(*side)
                .relocate(*target, *from_index, *to_index),
        }
    }
}

impl CommandConsumer<commands::DocumentCommand> for DesignDocument {
    fn apply(
        &mut self,
        command: DoUndo<'_, commands::DocumentCommand>,
    ) -> Result<(), CommandError> {
        use commands::DocumentCommand;
        match command {
            DoUndo::Do(DocumentCommand::SideChanged { from, to })
            | DoUndo::Undo(DocumentCommand::SideChanged { from: to, to: from }) => {
                if self.side != *from {
                    return Err(CommandError::MismatchedState);
                }
                self.side = *to;
                Ok(())
            }
            DoUndo::Do(DocumentCommand::VariantChanged { from, to })
            | DoUndo::Undo(DocumentCommand::VariantChanged { from: to, to: from }) => {
                if &self.garment.variant_id != from {
                    return Err(CommandError::MismatchedState);
                }
                self.garment.variant_id.clone_from(to);
                Ok(())
            }
            DoUndo::Do(DocumentCommand::ProductChanged { from, to })
            | DoUndo::Undo(DocumentCommand::ProductChanged { from: to, to: from }) => {
                if &self.garment != from {
                    return Err(CommandError::MismatchedState);
                }
                self.garment.clone_from(to);
                Ok(())
            }
        }
    }
}

impl CommandConsumer<Command> for DesignDocument {
    fn apply(&mut self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        if self.drawing.is_some() {
            return Err(CommandError::Busy);
        }
        match command {
            DoUndo::Do(Command::Meta(MetaCommand::Scope(_, scope)))
            | DoUndo::Undo(Command::Meta(MetaCommand::Scope(_, scope))) => {
                // Apply to a fork, so a failure halfway through leaves `self` untouched.
                let mut fork = self.clone();
                let undo = matches!(command, DoUndo::Undo(_));
                let apply_one = |fork: &mut Self, command: &Command| {
                    if undo {
                        fork.apply(DoUndo::Undo(command))
                    } else {
                        fork.apply(DoUndo::Do(command))
                    }
                };
                if undo {
                    for command in scope.iter().rev() {
                        apply_one(&mut fork, command)?;
                    }
                } else {
                    for command in scope.iter() {
                        apply_one(&mut fork, command)?;
                    }
                }
                *self = fork;
                Ok(())
            }
            DoUndo::Do(Command::Meta(MetaCommand::Save(_)))
            | DoUndo::Undo(Command::Meta(MetaCommand::Save(_))) => Ok(()),
            DoUndo::Do(Command::Layer(_)) | DoUndo::Undo(Command::Layer(_)) => command
                .filter_map(Command::layer)
                .map_or(Err(CommandError::MismatchedState), |c| self.apply(c)),
            DoUndo::Do(Command::Document(_)) | DoUndo::Undo(Command::Document(_)) => command
                .filter_map(Command::document)
                .map_or(Err(CommandError::MismatchedState), |c| self.apply(c)),
            DoUndo::Do(Command::Dummy) | DoUndo::Undo(Command::Dummy) => {
                Err(CommandError::MismatchedState)
            }
        }
    }
}
