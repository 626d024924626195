//! # Canvas projection
//!
//! Turns one side of a design into a [`RenderPlan`]: a flat, renderer-agnostic description of what to
//! draw, in order. Garment art first, then the optional color tint, the print-area guide, the layers
//! clipped to the print area, and finally transform handles around the active layer.
//!
//! The plan never holds renderer objects, and the renderer never writes back into it. Gestures travel
//! the other way through [`tools`].

pub mod tools;

use crate::blend::Blend;
use crate::catalog::{Catalog, CANVAS_SIZE};
use crate::color::Color;
use crate::state::document::{DesignDocument, Garment, Side};
use crate::state::layer::{Geometry, ImageSource, Layer, LayerID, LayerKind, PathLayer, TextLayer};
use crate::state::transform::{Matrix, Rect};

/// Smallest width or height a transform gesture may leave a layer with.
pub const MIN_LAYER_SIZE: f32 = 5.0;

/// Knows which images have finished loading. Unresolved images are planned, but draw nothing.
pub trait AssetResolver {
    /// Pixel size of the image behind `source`, or `None` while it's unavailable.
    fn resolve(&self, source: &str) -> Option<[u32; 2]>;
}
/// Pretends every asset is loaded, reporting no size of its own.
pub struct AllResolved;
impl AssetResolver for AllResolved {
    fn resolve(&self, _: &str) -> Option<[u32; 2]> {
        Some([0; 2])
    }
}
/// No asset is loaded yet.
pub struct NoneResolved;
impl AssetResolver for NoneResolved {
    fn resolve(&self, _: &str) -> Option<[u32; 2]> {
        None
    }
}
/// A set of loaded assets and their sizes.
#[derive(Clone, Debug, Default)]
pub struct LoadedAssets {
    loaded: hashbrown::HashMap<String, [u32; 2]>,
}
impl LoadedAssets {
    pub fn insert(&mut self, source: impl Into<String>, size: [u32; 2]) {
        self.loaded.insert(source.into(), size);
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.loaded.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}
impl AssetResolver for LoadedAssets {
    fn resolve(&self, source: &str) -> Option<[u32; 2]> {
        self.loaded.get(source).copied()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("product `{}` variant `{}` is not in the catalog", .0.product_id, .0.variant_id)]
    UnknownGarment(Garment),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Background {
    pub image: String,
    pub resolved: bool,
}
/// Flat color laid over the garment art, only where the art has coverage.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Tint {
    pub color: Color,
    /// Coverage source, if the variant ships a dedicated mask. Otherwise the art's own alpha.
    pub mask: Option<String>,
    pub blend: Blend,
}
/// Dashed outline of the print area.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Guide {
    pub rect: Rect,
    pub dash: [f32; 2],
    pub stroke: Color,
}
impl Guide {
    #[must_use]
    pub fn around(rect: Rect) -> Self {
        Self {
            rect,
            dash: [5.0, 5.0],
            stroke: Color::rgba(0, 0, 0, 51),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeContent {
    Text(TextLayer),
    Image {
        src: ImageSource,
        /// When false the renderer draws nothing, the node still takes part in layout.
        resolved: bool,
    },
    Path(PathLayer),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub layer: LayerID,
    /// Local to canvas.
    pub transform: Matrix,
    /// Unscaled size in local units.
    pub size: [f32; 2],
    /// Axis-aligned canvas-space bounds.
    pub bounds: Rect,
    pub content: NodeContent,
}
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformHandles {
    pub target: LayerID,
    pub bounds: Rect,
    pub rotation: f32,
    pub min_size: f32,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    pub side: Side,
    pub canvas_size: u32,
    pub background: Background,
    pub tint: Option<Tint>,
    pub guide: Guide,
    /// Layers are clipped to this.
    pub clip: Rect,
    /// In drawing order.
    pub layers: Vec<RenderNode>,
    pub handles: Option<TransformHandles>,
}
impl RenderPlan {
    /// The same plan with no selection chrome, as captured for previews.
    #[must_use]
    pub fn without_handles(self) -> Self {
        Self {
            handles: None,
            ..self
        }
    }
    /// Topmost visible layer under `point`, by bounds.
    #[must_use]
    pub fn hit_test(&self, point: [f32; 2]) -> Option<LayerID> {
        if !self.clip.contains(point) {
            return None;
        }
        self.layers
            .iter()
            .rev()
            .find(|node| node.bounds.contains(point))
            .map(|node| node.layer)
    }
}

/// Rough text extent. Exact metrics are up to the renderer.
fn text_extent(text: &TextLayer) -> [f32; 2] {
    let lines = text.text.lines().count().max(1);
    let longest = text
        .text
        .lines()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);
    [
        longest as f32 * text.font_size * 0.6,
        lines as f32 * text.font_size * 1.2,
    ]
}

fn path_bounds(path: &PathLayer, transform: &Matrix) -> Rect {
    let mut points = path
        .iter_points()
        .map(|point| transform.transform_point(point));
    let Some(first) = points.next() else {
        return Rect::default();
    };
    let (min, max) = points.fold((first, first), |(min, max), [x, y]| {
        ([min[0].min(x), min[1].min(y)], [max[0].max(x), max[1].max(y)])
    });
    // Stroke width spills over both sides of the line.
    let pad = path.stroke_width / 2.0;
    Rect {
        left: min[0] - pad,
        top: min[1] - pad,
        width: max[0] - min[0] + path.stroke_width,
        height: max[1] - min[1] + path.stroke_width,
    }
}

fn node_of(layer: &Layer, resolver: &dyn AssetResolver) -> RenderNode {
    let Geometry { size, .. } = layer.geometry;
    let transform = layer.geometry.matrix();
    let (natural, content) = match &layer.kind {
        LayerKind::Text(text) => (text_extent(text), NodeContent::Text(text.clone())),
        LayerKind::Image(image) => {
            let resolved = resolver.resolve(image.source.as_str());
            let natural = match (image.natural_size, resolved) {
                // Unknown at creation, learned on load.
                ([0, 0], Some(loaded)) => loaded,
                (known, _) => known,
            };
            (
                natural.map(|n| n as f32),
                NodeContent::Image {
                    src: image.source.clone(),
                    resolved: resolved.is_some(),
                },
            )
        }
        LayerKind::Path(path) => {
            let bounds = path_bounds(path, &transform);
            return RenderNode {
                layer: layer.id(),
                transform,
                size: [bounds.width, bounds.height],
                bounds,
                content: NodeContent::Path(path.clone()),
            };
        }
    };
    let size = size.unwrap_or(natural);
    RenderNode {
        layer: layer.id(),
        transform,
        size,
        bounds: transform.bounds_of(size),
        content,
    }
}

/// Plan the drawing of `side`. Handles are drawn around `selection` only when `side` is the active
/// side and the layer is on it.
pub fn project(
    doc: &DesignDocument,
    side: Side,
    catalog: &Catalog,
    selection: Option<LayerID>,
    resolver: &dyn AssetResolver,
) -> Result<RenderPlan, ProjectionError> {
    let (product, variant) = catalog
        .resolve(doc.garment())
        .ok_or_else(|| ProjectionError::UnknownGarment(doc.garment().clone()))?;

    let image = variant.image(side).to_owned();
    let background = Background {
        resolved: resolver.resolve(&image).is_some(),
        image,
    };
    let tint = (!variant.color.is_white()).then(|| Tint {
        color: variant.color,
        mask: variant.mask(side).map(str::to_owned),
        blend: Blend::garment_tint(),
    });

    let layers: Vec<RenderNode> = doc
        .layers(side)
        .iter()
        .filter(|layer| layer.geometry.visible)
        .map(|layer| node_of(layer, resolver))
        .collect();

    let handles = selection
        .filter(|_| side == doc.active_side())
        .and_then(|selected| layers.iter().find(|node| node.layer == selected))
        .and_then(|node| {
            let layer = doc.layers(side).get(node.layer)?;
            Some(TransformHandles {
                target: node.layer,
                bounds: node.bounds,
                rotation: layer.geometry.rotation,
                min_size: MIN_LAYER_SIZE,
            })
        });

    Ok(RenderPlan {
        side,
        canvas_size: CANVAS_SIZE,
        background,
        tint,
        guide: Guide::around(product.print_area),
        clip: product.print_area,
        layers,
        handles,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::document::LayerStack;
    use crate::state::layer::{ImageLayer, TextLayer};

    fn doc_with(front: Vec<Layer>, variant: &str) -> DesignDocument {
        DesignDocument::from_parts(
            crate::state::document::DesignID::default(),
            Garment {
                product_id: "p1".into(),
                variant_id: variant.into(),
            },
            Side::Front,
            LayerStack::from_layers(front).unwrap(),
            LayerStack::default(),
        )
    }
    fn image(src: &str) -> Layer {
        Layer::image(
            ImageLayer {
                source: src.into(),
                natural_size: [200, 100],
                low_resolution: false,
            },
            Geometry::at(100.0, 100.0).with_scale(0.5),
            0,
        )
    }

    #[test]
    fn white_has_no_tint() {
        let catalog = Catalog::builtin();
        let plan = project(&doc_with(vec![], "v1_white"), Side::Front, &catalog, None, &AllResolved)
            .unwrap();
        assert!(plan.tint.is_none());
        assert_eq!(plan.guide.dash, [5.0, 5.0]);
        assert_eq!(plan.guide.stroke, Color::rgba(0, 0, 0, 51));
        assert_eq!(plan.clip, catalog.products[0].print_area);
        assert_eq!(plan.canvas_size, 600);

        let plan = project(&doc_with(vec![], "v1_black"), Side::Back, &catalog, None, &AllResolved)
            .unwrap();
        let tint = plan.tint.unwrap();
        assert_eq!(tint.color, Color::rgb(0x17, 0x17, 0x17));
        assert_eq!(tint.blend, Blend::garment_tint());
        assert!(tint.mask.unwrap().contains("backhoodie"));
        assert!(plan.background.image.contains("backview"));
    }
    #[test]
    fn unresolved_keeps_geometry() {
        let catalog = Catalog::builtin();
        let layer = image("https://example.com/slow.png");
        let id = layer.id();
        let doc = doc_with(vec![layer], "v1_white");
        let plan = project(&doc, Side::Front, &catalog, Some(id), &NoneResolved).unwrap();
        let node = &plan.layers[0];
        assert!(matches!(node.content, NodeContent::Image { resolved: false, .. }));
        assert_eq!(node.bounds.width, 100.0);
        assert_eq!(node.bounds.height, 50.0);
        assert!(!plan.background.resolved);
        assert_eq!(plan.handles.as_ref().map(|h| h.target), Some(id));

        let mut loaded = LoadedAssets::default();
        loaded.insert("https://example.com/slow.png", [200, 100]);
        let plan = project(&doc, Side::Front, &catalog, Some(id), &loaded).unwrap();
        assert!(matches!(plan.layers[0].content, NodeContent::Image { resolved: true, .. }));
        assert_eq!(plan.layers[0].bounds, node.bounds);
    }
    #[test]
    fn order_and_visibility() {
        let catalog = Catalog::builtin();
        let a = image("a.png");
        let mut b = Layer::text(TextLayer::plain("b", "Inter", 24.0), Geometry::at(300.0, 300.0), 1);
        let c = image("c.png");
        b.geometry.visible = false;
        let ids = [a.id(), b.id(), c.id()];
        let doc = doc_with(vec![a, b, c], "v1_white");
        let plan = project(&doc, Side::Front, &catalog, Some(ids[1]), &AllResolved).unwrap();
        let drawn: Vec<_> = plan.layers.iter().map(|node| node.layer).collect();
        assert_eq!(drawn, [ids[0], ids[2]]);
        // Hidden layers get no handles.
        assert!(plan.handles.is_none());
        // Outside the print area nothing is hit.
        assert_eq!(plan.hit_test([120.0, 120.0]), None);
    }
    #[test]
    fn hit_test_topmost() {
        let catalog = Catalog::builtin();
        let mut a = image("a.png");
        let mut b = image("b.png");
        for layer in [&mut a, &mut b] {
            layer.geometry.x = 300.0;
            layer.geometry.y = 300.0;
        }
        let top = b.id();
        let doc = doc_with(vec![a, b], "v1_white");
        let plan = project(&doc, Side::Front, &catalog, None, &AllResolved).unwrap();
        assert_eq!(plan.hit_test([310.0, 310.0]), Some(top));
        assert_eq!(plan.hit_test([599.0, 599.0]), None);
        assert!(plan.without_handles().handles.is_none());
    }
    #[test]
    fn unknown_garment() {
        let doc = doc_with(vec![], "v404");
        assert!(matches!(
            project(&doc, Side::Front, &Catalog::builtin(), None, &AllResolved),
            Err(ProjectionError::UnknownGarment(_))
        ));
    }
}
