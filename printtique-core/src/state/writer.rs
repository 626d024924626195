//! Tracked mutation of a [`DesignDocument`]. Every successful edit writes exactly the command needed
//! to replay or revert it; failed edits write nothing and leave the document untouched.

use super::document::{
    commands::{DocumentCommand, LayerCommand},
    DesignDocument, Direction, Garment, Side,
};
use super::freehand::{StrokeSession, StrokeStyle};
use super::layer::{Layer, LayerID, LayerPatch};
use crate::commands::CommandError;
use crate::queue::writer::CommandWrite;

pub struct DesignWriter<'a, Write> {
    writer: Write,
    state: &'a mut DesignDocument,
}
impl<Write> std::ops::Deref for DesignWriter<'_, Write> {
    type Target = DesignDocument;
    fn deref(&self) -> &Self::Target {
        self.state
    }
}
impl<'a, Write> DesignWriter<'a, Write>
where
    Write: CommandWrite<LayerCommand> + CommandWrite<DocumentCommand>,
{
    pub fn new(writer: Write, state: &'a mut DesignDocument) -> Self {
        Self { writer, state }
    }
    fn idle(&self) -> Result<(), CommandError> {
        if self.state.drawing.is_some() {
            log::debug!("edit refused, a stroke is in progress");
            Err(CommandError::Busy)
        } else {
            Ok(())
        }
    }
    /// Append a layer on top of the active side. A layer whose ID already exists on that side is
    /// refused.
    pub fn add(&mut self, layer: Layer) -> Result<LayerID, CommandError> {
        self.idle()?;
        let side = self.state.side;
        let stack = self.state.layers_mut(side);
        let index = stack.len();
        let id = layer.id();
        stack.insert(index, layer).inspect_err(|_| {
            log::warn!("refusing to add {id}, already on the {} side", side.as_ref());
        })?;
        let layer = stack.as_slice()[index].clone();
        self.writer.write(LayerCommand::Added { side, index, layer });
        Ok(id)
    }
    /// Merge `patch` into the layer `id` on the active side.
    pub fn update(&mut self, id: LayerID, patch: &LayerPatch) -> Result<(), CommandError> {
        self.idle()?;
        if patch.is_empty() {
            return Err(CommandError::NoOp);
        }
        let side = self.state.side;
        let stack = self.state.layers_mut(side);
        let Some(from) = stack.get(id).cloned() else {
            log::debug!("update of {id} ignored, not on the {} side", side.as_ref());
            return Err(CommandError::UnknownResource);
        };
        let to = patch.apply_to(&from).map_err(|err| {
            log::warn!("update of {id} refused: {err}");
            CommandError::MismatchedState
        })?;
        if to == from {
            return Err(CommandError::NoOp);
        }
        stack.replace(&from, &to)?;
        self.writer.write(LayerCommand::Changed { side, from, to });
        Ok(())
    }
    /// Remove the layer `id` from the active side, returning it.
    pub fn delete(&mut self, id: LayerID) -> Result<Layer, CommandError> {
        self.idle()?;
        let side = self.state.side;
        let stack = self.state.layers_mut(side);
        let Some(index) = stack.position(id) else {
            log::debug!("delete of {id} ignored, not on the {} side", side.as_ref());
            return Err(CommandError::UnknownResource);
        };
        let layer = stack.remove(index, id)?;
        self.writer.write(LayerCommand::Deleted {
            side,
            index,
            layer: layer.clone(),
        });
        Ok(layer)
    }
    /// Swap the layer `id` with its neighbor in `direction`. At the boundary there's nothing to swap
    /// with, and [`CommandError::NoOp`] is returned.
    pub fn reorder(&mut self, id: LayerID, direction: Direction) -> Result<(), CommandError> {
        self.idle()?;
        let side = self.state.side;
        let stack = self.state.layers_mut(side);
        let Some(from_index) = stack.position(id) else {
            log::debug!("reorder of {id} ignored, not on the {} side", side.as_ref());
            return Err(CommandError::UnknownResource);
        };
        let to_index = match direction {
            Direction::Up => Some(from_index + 1).filter(|&to| to < stack.len()),
            Direction::Down => from_index.checked_sub(1),
        }
        .ok_or(CommandError::NoOp)?;
        stack.relocate(id, from_index, to_index)?;
        self.writer.write(LayerCommand::Moved {
            side,
            target: id,
            from_index,
            to_index,
        });
        Ok(())
    }
    /// Make `to` the side subsequent edits act on. Neither layer stack is touched.
    pub fn switch_side(&mut self, to: Side) -> Result<(), CommandError> {
        self.idle()?;
        let from = self.state.side;
        if from == to {
            return Err(CommandError::NoOp);
        }
        self.state.side = to;
        self.writer.write(DocumentCommand::SideChanged { from, to });
        Ok(())
    }
    pub fn set_variant(&mut self, variant_id: &str) -> Result<(), CommandError> {
        self.idle()?;
        if self.state.garment.variant_id == variant_id {
            return Err(CommandError::NoOp);
        }
        let from = std::mem::replace(&mut self.state.garment.variant_id, variant_id.to_owned());
        self.writer.write(DocumentCommand::VariantChanged {
            from,
            to: variant_id.to_owned(),
        });
        Ok(())
    }
    /// Change the product, and with it the variant.
    pub fn set_garment(&mut self, garment: Garment) -> Result<(), CommandError> {
        self.idle()?;
        if self.state.garment == garment {
            return Err(CommandError::NoOp);
        }
        let from = std::mem::replace(&mut self.state.garment, garment.clone());
        self.writer.write(DocumentCommand::ProductChanged { from, to: garment });
        Ok(())
    }
    /// Start a freehand stroke on the active side: a new path layer on top holding just `start`.
    /// Refused while another stroke is open.
    pub fn begin_stroke(
        &mut self,
        start: [f32; 2],
        style: &StrokeStyle,
    ) -> Result<StrokeSession, CommandError> {
        self.idle()?;
        let side = self.state.side;
        let stack = self.state.layers_mut(side);
        let layer = Layer::path(style.start_path(start), 0);
        let id = layer.id();
        stack.insert(stack.len(), layer)?;
        let session = StrokeSession::new(side, id);
        self.state.drawing = Some(session);
        log::trace!("began stroke {} on {id}", session.id());
        Ok(session)
    }
    fn open_stroke(&self, session: &StrokeSession) -> Result<(), CommandError> {
        if self.state.drawing.as_ref() == Some(session) {
            Ok(())
        } else {
            log::debug!("stale stroke handle {} ignored", session.id());
            Err(CommandError::UnknownResource)
        }
    }
    /// Append a point to the session's path.
    pub fn extend_stroke(
        &mut self,
        session: &StrokeSession,
        point: [f32; 2],
    ) -> Result<(), CommandError> {
        self.open_stroke(session)?;
        let stack = self.state.layers_mut(session.side());
        let index = stack
            .position(session.layer())
            .ok_or(CommandError::UnknownResource)?;
        stack.make_mut()[index]
            .path_mut()
            .ok_or(CommandError::MismatchedState)?
            .push_point(point);
        Ok(())
    }
    /// Close the stroke. The finished path is recorded as a single added layer.
    pub fn end_stroke(&mut self, session: &StrokeSession) -> Result<LayerID, CommandError> {
        self.open_stroke(session)?;
        let side = session.side();
        let stack = self.state.layers(side);
        let index = stack
            .position(session.layer())
            .ok_or(CommandError::UnknownResource)?;
        let layer = stack.as_slice()[index].clone();
        self.state.drawing = None;
        self.writer.write(LayerCommand::Added { side, index, layer });
        log::trace!("ended stroke {}", session.id());
        Ok(session.layer())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::commands::{Command, CommandConsumer, DoUndo};
    use crate::state::layer::{Geometry, LayerKind, TextLayer, TextPatch};

    type Log = smallvec::SmallVec<[Command; 1]>;

    fn document() -> DesignDocument {
        DesignDocument::new(Garment {
            product_id: "p1".into(),
            variant_id: "v1".into(),
        })
    }
    fn text(label: &str) -> Layer {
        Layer::text(
            TextLayer::plain(label, "Inter", 24.0),
            Geometry::at(300.0, 200.0),
            0,
        )
    }
    fn order(doc: &DesignDocument) -> Vec<LayerID> {
        doc.active_layers().iter().map(Layer::id).collect()
    }

    #[test]
    fn add_grows_by_one() {
        let mut doc = document();
        let mut log = Log::new();
        let mut writer = DesignWriter::new(&mut log, &mut doc);
        for n in 0..5 {
            writer.add(text("layer")).unwrap();
            assert_eq!(writer.active_layers().len(), n + 1);
        }
        let mut ids = order(&doc);
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 5);
        assert_eq!(log.len(), 5);

        let z: Vec<_> = doc.active_layers().iter().map(Layer::z_index).collect();
        assert_eq!(z, [0, 1, 2, 3, 4]);
    }
    #[test]
    fn add_refuses_colliding_id() {
        let mut doc = document();
        let mut log = Log::new();
        let layer = text("a");
        let mut writer = DesignWriter::new(&mut log, &mut doc);
        writer.add(layer.clone()).unwrap();
        assert_eq!(writer.add(layer), Err(CommandError::MismatchedState));
        assert_eq!(doc.active_layers().len(), 1);
        assert_eq!(log.len(), 1);
    }
    #[test]
    fn update_merges() {
        let mut doc = document();
        let mut log = Log::new();
        let mut writer = DesignWriter::new(&mut log, &mut doc);
        let id = writer.add(text("Hello")).unwrap();
        let before = writer.active_layers().get(id).unwrap().clone();

        let patch = LayerPatch::position(42.0, 200.0);
        writer.update(id, &patch).unwrap();
        let after = writer.active_layers().get(id).unwrap();
        assert_eq!(after.geometry.x, 42.0);
        assert_eq!(after.geometry.y, before.geometry.y);
        assert_eq!(after.kind, before.kind);

        // Same values again change nothing.
        assert_eq!(writer.update(id, &patch), Err(CommandError::NoOp));
        assert_eq!(
            writer.update(id, &LayerPatch::default()),
            Err(CommandError::NoOp)
        );
    }
    #[test]
    fn hello_then_resize() {
        let mut doc = document();
        let mut log = Log::new();
        let mut writer = DesignWriter::new(&mut log, &mut doc);
        let id = writer.add(text("Hello")).unwrap();
        writer
            .update(
                id,
                &LayerPatch::text(TextPatch {
                    font_size: Some(40.0),
                    ..TextPatch::default()
                }),
            )
            .unwrap();
        assert_eq!(doc.active_layers().len(), 1);
        let layer = &doc.active_layers().as_slice()[0];
        let LayerKind::Text(text) = &layer.kind else {
            panic!("expected a text layer");
        };
        assert_eq!(text.text, "Hello");
        assert_eq!(text.font_size, 40.0);
        assert_eq!([layer.geometry.x, layer.geometry.y], [300.0, 200.0]);
    }
    #[test]
    fn delete_then_update_is_ignored() {
        let mut doc = document();
        let mut log = Log::new();
        let mut writer = DesignWriter::new(&mut log, &mut doc);
        let id = writer.add(text("a")).unwrap();
        writer.add(text("b")).unwrap();
        writer.delete(id).unwrap();
        let snapshot = writer.active_layers().clone();

        assert_eq!(
            writer.update(id, &LayerPatch::position(1.0, 1.0)),
            Err(CommandError::UnknownResource)
        );
        assert_eq!(writer.delete(id).unwrap_err(), CommandError::UnknownResource);
        assert_eq!(writer.active_layers(), &snapshot);
        assert_eq!(writer.active_layers().as_slice()[0].z_index(), 0);
    }
    #[test]
    fn update_keeps_variant() {
        let mut doc = document();
        let mut log = Log::new();
        let mut writer = DesignWriter::new(&mut log, &mut doc);
        let id = writer.add(text("a")).unwrap();
        let patch = LayerPatch::path(crate::state::layer::PathPatch {
            stroke_width: Some(9.0),
            ..Default::default()
        });
        assert_eq!(writer.update(id, &patch), Err(CommandError::MismatchedState));
        assert_eq!(writer.active_layers().get(id).unwrap().ty(), crate::state::layer::LayerType::Text);
        assert_eq!(log.len(), 1);
    }
    #[test]
    fn reorder_swaps_neighbors() {
        let mut doc = document();
        let mut log = Log::new();
        let mut writer = DesignWriter::new(&mut log, &mut doc);
        let a = writer.add(text("a")).unwrap();
        let b = writer.add(text("b")).unwrap();
        let c = writer.add(text("c")).unwrap();

        writer.reorder(a, Direction::Up).unwrap();
        assert_eq!(order(&writer), [b, a, c]);
        writer.reorder(a, Direction::Down).unwrap();
        assert_eq!(order(&writer), [a, b, c]);

        assert_eq!(writer.reorder(c, Direction::Up), Err(CommandError::NoOp));
        assert_eq!(writer.reorder(a, Direction::Down), Err(CommandError::NoOp));
        assert_eq!(order(&writer), [a, b, c]);
    }
    #[test]
    fn switching_sides_leaves_stacks() {
        let mut doc = document();
        let mut log = Log::new();
        let mut writer = DesignWriter::new(&mut log, &mut doc);
        let id = writer.add(text("front")).unwrap();
        let front = writer.layers(Side::Front).clone();
        let back = writer.layers(Side::Back).clone();

        writer.switch_side(Side::Back).unwrap();
        assert_eq!(writer.active_side(), Side::Back);
        assert!(writer.active_layers().get(id).is_none());
        assert!(writer.layers(Side::Front).shares_storage(&front));
        assert!(writer.layers(Side::Back).shares_storage(&back));
        assert_eq!(writer.switch_side(Side::Back), Err(CommandError::NoOp));
    }
    #[test]
    fn freehand_accumulates() {
        let mut doc = document();
        let mut log = Log::new();
        let mut writer = DesignWriter::new(&mut log, &mut doc);
        let style = StrokeStyle::default();
        let session = writer.begin_stroke([1.0, 2.0], &style).unwrap();
        writer.extend_stroke(&session, [3.0, 4.0]).unwrap();
        writer.extend_stroke(&session, [5.0, 6.0]).unwrap();

        // Open strokes block everything else.
        assert_eq!(writer.switch_side(Side::Back), Err(CommandError::Busy));
        assert_eq!(
            writer.begin_stroke([0.0, 0.0], &style).unwrap_err(),
            CommandError::Busy
        );
        writer.end_stroke(&session).unwrap();

        // Handle is dead now.
        assert_eq!(
            writer.extend_stroke(&session, [7.0, 8.0]),
            Err(CommandError::UnknownResource)
        );
        assert_eq!(doc.active_layers().len(), 1);
        let path = doc.active_layers().as_slice()[0].kind.path().unwrap();
        assert_eq!(path.points, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(path.tension, 0.5);
        // Recorded once, complete.
        assert_eq!(log.len(), 1);
    }
    #[test]
    fn recorded_commands_revert() {
        let mut doc = document();
        let original = doc.clone();
        let mut log = Log::new();
        let mut writer = DesignWriter::new(&mut log, &mut doc);
        let a = writer.add(text("a")).unwrap();
        writer.add(text("b")).unwrap();
        writer.reorder(a, Direction::Up).unwrap();
        writer.update(a, &LayerPatch::position(0.0, 0.0)).unwrap();
        writer.switch_side(Side::Back).unwrap();
        let session = writer.begin_stroke([0.0, 0.0], &StrokeStyle::default()).unwrap();
        writer.end_stroke(&session).unwrap();
        writer.switch_side(Side::Front).unwrap();
        writer.delete(a).unwrap();

        for command in log.iter().rev() {
            doc.apply(DoUndo::Undo(command)).unwrap();
        }
        assert_eq!(doc, original);
    }
}
