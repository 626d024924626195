//! # Design session
//!
//! One customer's editing session: the design with its history, the active-layer selection, and
//! the catalog it draws from. This is the surface gestures and the shell talk to. Every edit acts on
//! the active side, and not-found targets are reported but leave everything as it was.

use std::sync::Arc;

use crate::assets::{self, UploadPolicy};
use crate::catalog::{Catalog, CatalogError};
use crate::commands::CommandError;
use crate::projection::{self, AssetResolver, ProjectionError, RenderPlan};
use crate::queue::DesignQueue;
use crate::state::document::{DesignDocument, Direction, Side};
use crate::state::freehand::{StrokeSession, StrokeStyle};
use crate::state::layer::{ImageSource, Layer, LayerID, LayerPatch};
use crate::state::selection::Selection;

pub struct DesignSession {
    catalog: Arc<Catalog>,
    queue: DesignQueue,
    selection: Selection,
    uploads: UploadPolicy,
}
impl DesignSession {
    /// Start an empty design on the catalog's first product, in its first variant.
    pub fn new(catalog: Arc<Catalog>) -> Result<Self, CatalogError> {
        let garment = catalog.default_garment().ok_or(CatalogError::Empty)?;
        Ok(Self::from_document(catalog, DesignDocument::new(garment)))
    }
    /// Continue editing an existing design, with a fresh history.
    #[must_use]
    pub fn from_document(catalog: Arc<Catalog>, document: DesignDocument) -> Self {
        Self {
            catalog,
            queue: DesignQueue::new(document),
            selection: Selection::default(),
            uploads: UploadPolicy::default(),
        }
    }
    #[must_use]
    pub fn with_upload_policy(self, uploads: UploadPolicy) -> Self {
        Self { uploads, ..self }
    }
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
    #[must_use]
    pub fn queue(&self) -> &DesignQueue {
        &self.queue
    }
    /// A snapshot of the design. Later edits never show through it.
    #[must_use]
    pub fn document(&self) -> DesignDocument {
        self.queue.peek_clone_state()
    }
    #[must_use]
    pub fn active_side(&self) -> Side {
        self.queue.read(DesignDocument::active_side)
    }
    #[must_use]
    pub fn selection(&self) -> Option<LayerID> {
        self.selection.get()
    }
    /// Make `id` the active layer. Only layers of the active side can be selected.
    pub fn select(&mut self, id: LayerID) -> Result<(), CommandError> {
        if self.queue.read(|doc| doc.active_layers().contains(id)) {
            self.selection.select(id);
            Ok(())
        } else {
            log::debug!("can't select {id}, not on the active side");
            Err(CommandError::UnknownResource)
        }
    }
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }
    /// Add a layer on top of the active side and select it.
    pub fn add_layer(&mut self, layer: Layer) -> Result<LayerID, CommandError> {
        let id = self.queue.write_with(|w| w.design().add(layer))?;
        self.selection.select(id);
        Ok(id)
    }
    fn next_z(&self) -> u32 {
        self.queue
            .read(|doc| u32::try_from(doc.active_layers().len()).unwrap_or(u32::MAX))
    }
    pub fn add_text(&mut self, content: &str) -> Result<LayerID, CommandError> {
        let layer = assets::text_layer(content, self.next_z());
        self.add_layer(layer)
    }
    pub fn add_upload(
        &mut self,
        source: ImageSource,
        natural_size: Option<[u32; 2]>,
    ) -> Result<LayerID, CommandError> {
        let layer = self
            .uploads
            .upload_layer(source, natural_size, self.next_z());
        self.add_layer(layer)
    }
    /// Embed uploaded file contents into the design as a new image layer.
    pub fn embed_upload(
        &mut self,
        mime: &str,
        bytes: &[u8],
        natural_size: Option<[u32; 2]>,
    ) -> Result<LayerID, CommandError> {
        let layer = self
            .uploads
            .embed_upload(mime, bytes, natural_size, self.next_z());
        self.add_layer(layer)
    }
    pub fn add_clipart(&mut self, clipart_id: &str) -> Result<LayerID, CommandError> {
        let Some(clipart) = self.catalog.clipart(clipart_id) else {
            log::debug!("no clipart `{clipart_id}`");
            return Err(CommandError::UnknownResource);
        };
        let layer = assets::clipart_layer(clipart, self.next_z());
        self.add_layer(layer)
    }
    pub fn update_layer(&mut self, id: LayerID, patch: &LayerPatch) -> Result<(), CommandError> {
        self.queue.write_with(|w| w.design().update(id, patch))
    }
    pub fn delete_layer(&mut self, id: LayerID) -> Result<Layer, CommandError> {
        let removed = self.queue.write_with(|w| w.design().delete(id))?;
        if self.selection.is_selected(id) {
            self.selection.clear();
        }
        Ok(removed)
    }
    pub fn reorder_layer(&mut self, id: LayerID, direction: Direction) -> Result<(), CommandError> {
        self.queue.write_with(|w| w.design().reorder(id, direction))
    }
    /// Switch the side edits act on. The selection is cleared.
    pub fn switch_side(&mut self, side: Side) -> Result<(), CommandError> {
        self.queue.write_with(|w| w.design().switch_side(side))?;
        self.selection.clear();
        Ok(())
    }
    pub fn toggle_side(&mut self) -> Result<Side, CommandError> {
        let to = self.active_side().opposite();
        self.switch_side(to)?;
        Ok(to)
    }
    /// Change product. The variant resets to the product's first.
    pub fn select_product(&mut self, product_id: &str) -> Result<(), CommandError> {
        let Some(garment) = self
            .catalog
            .product(product_id)
            .and_then(|product| product.default_garment())
        else {
            log::debug!("no product `{product_id}`");
            return Err(CommandError::UnknownResource);
        };
        self.queue.write_with(|w| w.design().set_garment(garment))
    }
    /// Change color variant within the current product.
    pub fn select_variant(&mut self, variant_id: &str) -> Result<(), CommandError> {
        let product_id = self.queue.read(|doc| doc.garment().product_id.clone());
        let exists = self
            .catalog
            .product(&product_id)
            .is_some_and(|product| product.variant(variant_id).is_some());
        if !exists {
            log::debug!("no variant `{variant_id}` for product `{product_id}`");
            return Err(CommandError::UnknownResource);
        }
        self.queue.write_with(|w| w.design().set_variant(variant_id))
    }
    pub fn begin_stroke(
        &mut self,
        start: [f32; 2],
        style: &StrokeStyle,
    ) -> Result<StrokeSession, CommandError> {
        self.queue.write_with(|w| w.design().begin_stroke(start, style))
    }
    pub fn extend_stroke(
        &mut self,
        session: &StrokeSession,
        point: [f32; 2],
    ) -> Result<(), CommandError> {
        self.queue
            .write_with(|w| w.design().extend_stroke(session, point))
    }
    pub fn end_stroke(&mut self, session: &StrokeSession) -> Result<LayerID, CommandError> {
        self.queue.write_with(|w| w.design().end_stroke(session))
    }
    pub fn undo(&mut self) -> Result<bool, CommandError> {
        let side = self.active_side();
        let changed = self.queue.undo_n(1)?;
        self.reconcile_selection(side);
        Ok(changed)
    }
    pub fn redo(&mut self) -> Result<bool, CommandError> {
        let side = self.active_side();
        let changed = self.queue.redo_n(1)?;
        self.reconcile_selection(side);
        Ok(changed)
    }
    // History may have switched sides or removed the selected layer.
    fn reconcile_selection(&mut self, side_before: Side) {
        if self.active_side() == side_before {
            self.queue
                .read(|doc| self.selection.retain_in(doc.active_layers()));
        } else {
            self.selection.clear();
        }
    }
    /// Record a save of the design to `path` in the history.
    pub fn mark_saved(&mut self, path: std::path::PathBuf) {
        self.queue.write_with(|w| w.saved(path));
    }
    /// Render plan of one side, with handles on the active layer if that side is active.
    pub fn project(
        &self,
        side: Side,
        resolver: &dyn AssetResolver,
    ) -> Result<RenderPlan, ProjectionError> {
        self.queue.read(|doc| {
            projection::project(doc, side, &self.catalog, self.selection.get(), resolver)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::projection::AllResolved;
    use crate::state::layer::{LayerKind, TextPatch};

    fn session() -> DesignSession {
        DesignSession::new(Arc::new(Catalog::builtin())).unwrap()
    }
    fn order(session: &DesignSession) -> Vec<LayerID> {
        session
            .document()
            .active_layers()
            .iter()
            .map(Layer::id)
            .collect()
    }

    #[test]
    fn add_selects() {
        let mut session = session();
        let id = session.add_text("Hello").unwrap();
        assert_eq!(session.selection(), Some(id));
        session
            .update_layer(
                id,
                &LayerPatch::text(TextPatch {
                    font_size: Some(40.0),
                    ..TextPatch::default()
                }),
            )
            .unwrap();
        let doc = session.document();
        let layer = doc.active_layers().get(id).unwrap();
        let LayerKind::Text(text) = &layer.kind else {
            panic!("expected text");
        };
        assert_eq!((text.text.as_str(), text.font_size), ("Hello", 40.0));
        assert_eq!([layer.geometry.x, layer.geometry.y], [300.0, 200.0]);
    }
    #[test]
    fn deleting_selected_clears() {
        let mut session = session();
        let a = session.add_text("a").unwrap();
        let b = session.add_text("b").unwrap();
        // Deleting something else keeps the selection.
        session.delete_layer(a).unwrap();
        assert_eq!(session.selection(), Some(b));
        session.delete_layer(b).unwrap();
        assert_eq!(session.selection(), None);
        assert!(session.delete_layer(b).is_err());
    }
    #[test]
    fn side_switch_clears_selection() {
        let mut session = session();
        let id = session.add_text("front").unwrap();
        assert_eq!(session.toggle_side(), Ok(Side::Back));
        assert_eq!(session.selection(), None);
        assert!(order(&session).is_empty());
        // Front layers can't be selected from the back.
        assert_eq!(session.select(id), Err(CommandError::UnknownResource));
        assert_eq!(session.document().layers(Side::Front).len(), 1);
    }
    #[test]
    fn reorder_scenario() {
        let mut session = session();
        let a = session.add_text("a").unwrap();
        let b = session.add_text("b").unwrap();
        let c = session.add_text("c").unwrap();
        session.reorder_layer(a, Direction::Up).unwrap();
        assert_eq!(order(&session), [b, a, c]);
        assert_eq!(
            session.reorder_layer(c, Direction::Up),
            Err(CommandError::NoOp)
        );
    }
    #[test]
    fn product_and_variant() {
        let mut session = session();
        session.select_variant("v1_black").unwrap();
        assert_eq!(session.document().garment().variant_id, "v1_black");
        assert_eq!(
            session.select_variant("v9"),
            Err(CommandError::UnknownResource)
        );
        // Same product again resets the variant.
        session.select_product("p1").unwrap();
        assert_eq!(session.document().garment().variant_id, "v1_white");
        assert_eq!(
            session.select_product("nope"),
            Err(CommandError::UnknownResource)
        );
    }
    #[test]
    fn undo_reconciles_selection() {
        let mut session = session();
        let id = session.add_text("a").unwrap();
        session.undo().unwrap();
        assert_eq!(session.selection(), None);
        session.redo().unwrap();
        assert_eq!(order(&session), [id]);

        session.select(id).unwrap();
        session.switch_side(Side::Back).unwrap();
        session.undo().unwrap();
        assert_eq!(session.active_side(), Side::Front);
        assert_eq!(session.selection(), None);
    }
    #[test]
    fn clipart_and_uploads() {
        let mut session = session();
        let clip = session.add_clipart("c1").unwrap();
        assert!(session.add_clipart("missing").is_err());
        let upload = session
            .add_upload("https://example.com/tiny.png".into(), Some([200, 200]))
            .unwrap();
        let doc = session.document();
        assert_eq!(doc.active_layers().get(clip).unwrap().z_index(), 0);
        let image = doc.active_layers().get(upload).unwrap().kind.image().unwrap();
        assert!(image.low_resolution);
    }
    #[test]
    fn embedded_uploads_follow_policy() {
        let mut session = session().with_upload_policy(UploadPolicy {
            low_resolution_width: 2000,
        });
        let id = session
            .embed_upload("image/png", b"not really a png", Some([1500, 1500]))
            .unwrap();
        let doc = session.document();
        let layer = doc.active_layers().get(id).unwrap();
        assert_eq!([layer.geometry.x, layer.geometry.y], [200.0, 100.0]);
        assert_eq!(layer.geometry.scale_x, 0.5);
        let image = layer.kind.image().unwrap();
        assert!(image.low_resolution);
        assert_eq!(
            image.source.embedded_bytes().as_deref(),
            Some(&b"not really a png"[..])
        );
    }
    #[test]
    fn projects_handles_on_selection() {
        let mut session = session();
        let id = session.add_text("a").unwrap();
        let plan = session.project(Side::Front, &AllResolved).unwrap();
        assert_eq!(plan.handles.map(|h| h.target), Some(id));
        let back = session.project(Side::Back, &AllResolved).unwrap();
        assert!(back.handles.is_none());
        assert!(back.layers.is_empty());
    }
}
