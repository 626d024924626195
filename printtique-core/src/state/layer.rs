//! # Layers
//!
//! A layer is one visual element placed on one side of a garment. Every layer carries the same
//! [`Geometry`], plus exactly one of three payloads: [`TextLayer`], [`ImageLayer`] or [`PathLayer`].
//!
//! Layers are plain data. They hold no reference to any renderer object, and once created their
//! variant never changes - partial updates go through a [`LayerPatch`], which refuses to apply a
//! payload patch of the wrong variant.

use crate::color::Color;

pub type LayerID = crate::StudioID<Layer>;

/// Placement shared by every layer variant.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub x: f32,
    pub y: f32,
    /// Degrees, clockwise.
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Unscaled display size, once a transform gesture has resized the layer.
    /// `None` lets the payload decide (natural image size, text metrics, path extent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[f32; 2]>,
    pub visible: bool,
}
impl Geometry {
    /// Default placement at the given position: unrotated, unscaled, visible.
    #[must_use]
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }
    #[must_use]
    pub fn with_scale(self, scale: f32) -> Self {
        Self {
            scale_x: scale,
            scale_y: scale,
            ..self
        }
    }
    #[must_use]
    pub fn matrix(&self) -> crate::state::transform::Matrix {
        crate::state::transform::Matrix::from_parts(
            [self.x, self.y],
            self.rotation,
            [self.scale_x, self.scale_y],
        )
    }
}
impl Default for Geometry {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            size: None,
            visible: true,
        }
    }
}

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
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::AsRefStr,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FontStyle {
    Bold,
    Italic,
    BoldItalic,
}

/// An outline traced around text glyphs.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Outline {
    pub color: Color,
    pub width: f32,
}
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Shadow {
    pub color: Color,
    pub blur: f32,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayer {
    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub fill: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,
    #[serde(default)]
    pub align: Align,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<FontStyle>,
}
impl TextLayer {
    /// Plain text with no decorations.
    #[must_use]
    pub fn plain(text: impl Into<String>, font_family: impl Into<String>, font_size: f32) -> Self {
        Self {
            text: text.into(),
            font_family: font_family.into(),
            font_size,
            fill: Color::BLACK,
            outline: None,
            shadow: None,
            align: Align::default(),
            font_style: None,
        }
    }
}

/// Where an image's pixels come from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageSource {
    Url(String),
    /// A `data:` URL carrying the encoded image inline.
    Embedded(String),
}
impl ImageSource {
    /// Wrap encoded image bytes into a base64 `data:` URL.
    #[must_use]
    pub fn embed(mime: &str, bytes: &[u8]) -> Self {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self::Embedded(format!("data:{mime};base64,{encoded}"))
    }
    /// Decode the payload of an embedded source. `None` for URLs or malformed data.
    #[must_use]
    pub fn embedded_bytes(&self) -> Option<Vec<u8>> {
        use base64::Engine;
        let Self::Embedded(data) = self else {
            return None;
        };
        let (_, payload) = data.split_once(";base64,")?;
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()
    }
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(s) | Self::Embedded(s) => s,
        }
    }
}
impl From<String> for ImageSource {
    fn from(value: String) -> Self {
        if value.starts_with("data:") {
            Self::Embedded(value)
        } else {
            Self::Url(value)
        }
    }
}
impl From<&str> for ImageSource {
    fn from(value: &str) -> Self {
        value.to_owned().into()
    }
}
impl From<ImageSource> for String {
    fn from(value: ImageSource) -> Self {
        match value {
            ImageSource::Url(s) | ImageSource::Embedded(s) => s,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayer {
    #[serde(rename = "src")]
    pub source: ImageSource,
    /// Unscaled pixel dimensions of the source.
    pub natural_size: [u32; 2],
    /// Advisory only: the source is likely to print blurry.
    #[serde(default)]
    pub low_resolution: bool,
}

/// A freehand polyline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathLayer {
    /// Alternating x, y coordinates.
    pub points: Vec<f32>,
    pub stroke: Color,
    pub stroke_width: f32,
    /// Curve smoothing, 0.0 is a straight polyline.
    pub tension: f32,
}
impl PathLayer {
    /// Smoothing given to freehand strokes.
    pub const FREEHAND_TENSION: f32 = 0.5;
    pub fn iter_points(&self) -> impl Iterator<Item = [f32; 2]> + '_ {
        self.points.chunks_exact(2).map(|pair| [pair[0], pair[1]])
    }
    pub fn push_point(&mut self, [x, y]: [f32; 2]) {
        self.points.extend_from_slice(&[x, y]);
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, strum::EnumDiscriminants)]
#[serde(tag = "type", rename_all = "lowercase")]
#[strum_discriminants(name(LayerType), derive(strum::EnumIter, Hash))]
pub enum LayerKind {
    Text(TextLayer),
    Image(ImageLayer),
    Path(PathLayer),
}
impl LayerKind {
    #[must_use]
    pub fn ty(&self) -> LayerType {
        self.into()
    }
    #[must_use]
    pub fn text(&self) -> Option<&TextLayer> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }
    #[must_use]
    pub fn image(&self) -> Option<&ImageLayer> {
        match self {
            Self::Image(i) => Some(i),
            _ => None,
        }
    }
    #[must_use]
    pub fn path(&self) -> Option<&PathLayer> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    // NOT public, an ID is assigned once at creation.
    id: LayerID,
    // NOT public, kept equal to the layer's position by the owning stack.
    z_index: u32,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(flatten)]
    pub kind: LayerKind,
}
impl Layer {
    /// Create a layer with a fresh ID.
    #[must_use]
    pub fn new(kind: LayerKind, geometry: Geometry, z_index: u32) -> Self {
        Self {
            id: LayerID::default(),
            z_index,
            geometry,
            kind,
        }
    }
    #[must_use]
    pub fn text(text: TextLayer, geometry: Geometry, z_index: u32) -> Self {
        Self::new(LayerKind::Text(text), geometry, z_index)
    }
    #[must_use]
    pub fn image(image: ImageLayer, geometry: Geometry, z_index: u32) -> Self {
        Self::new(LayerKind::Image(image), geometry, z_index)
    }
    /// A path layer. Path points are absolute canvas coordinates, so the geometry is left at the origin.
    #[must_use]
    pub fn path(path: PathLayer, z_index: u32) -> Self {
        Self::new(LayerKind::Path(path), Geometry::default(), z_index)
    }
    #[must_use]
    pub fn id(&self) -> LayerID {
        self.id
    }
    #[must_use]
    pub fn z_index(&self) -> u32 {
        self.z_index
    }
    pub(crate) fn set_z_index(&mut self, z_index: u32) {
        self.z_index = z_index;
    }
    #[must_use]
    pub fn ty(&self) -> LayerType {
        self.kind.ty()
    }
    pub(crate) fn path_mut(&mut self) -> Option<&mut PathLayer> {
        match &mut self.kind {
            LayerKind::Path(p) => Some(p),
            LayerKind::Text(_) | LayerKind::Image(_) => None,
        }
    }
}

/// Partial update of a layer's geometry. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub rotation: Option<f32>,
    pub scale_x: Option<f32>,
    pub scale_y: Option<f32>,
    pub size: Option<[f32; 2]>,
    pub visible: Option<bool>,
}
impl GeometryPatch {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
    fn apply(&self, geometry: &mut Geometry) {
        let Self {
            x,
            y,
            rotation,
            scale_x,
            scale_y,
            size,
            visible,
        } = self;
        if let Some(x) = x {
            geometry.x = *x;
        }
        if let Some(y) = y {
            geometry.y = *y;
        }
        if let Some(rotation) = rotation {
            geometry.rotation = *rotation;
        }
        if let Some(scale_x) = scale_x {
            geometry.scale_x = *scale_x;
        }
        if let Some(scale_y) = scale_y {
            geometry.scale_y = *scale_y;
        }
        if let Some(size) = size {
            geometry.size = Some(*size);
        }
        if let Some(visible) = visible {
            geometry.visible = *visible;
        }
    }
}

/// Partial update of a text payload. Doubly-optional fields can be cleared with `Some(None)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextPatch {
    pub text: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub fill: Option<Color>,
    pub outline: Option<Option<Outline>>,
    pub shadow: Option<Option<Shadow>>,
    pub align: Option<Align>,
    pub font_style: Option<Option<FontStyle>>,
}
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImagePatch {
    pub source: Option<ImageSource>,
    pub natural_size: Option<[u32; 2]>,
    pub low_resolution: Option<bool>,
}
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathPatch {
    pub points: Option<Vec<f32>>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f32>,
    pub tension: Option<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum KindPatch {
    Text(TextPatch),
    Image(ImagePatch),
    Path(PathPatch),
}
impl KindPatch {
    #[must_use]
    pub fn ty(&self) -> LayerType {
        match self {
            Self::Text(_) => LayerType::Text,
            Self::Image(_) => LayerType::Image,
            Self::Path(_) => LayerType::Path,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchError {
    #[error("patch for a {patch:?} layer applied to a {layer:?} layer")]
    KindMismatch { patch: LayerType, layer: LayerType },
}

/// A partial update to a layer: any geometry, plus optionally a payload patch which must match the
/// layer's variant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerPatch {
    pub geometry: GeometryPatch,
    pub kind: Option<KindPatch>,
}
impl LayerPatch {
    #[must_use]
    pub fn text(patch: TextPatch) -> Self {
        Self {
            geometry: GeometryPatch::default(),
            kind: Some(KindPatch::Text(patch)),
        }
    }
    #[must_use]
    pub fn image(patch: ImagePatch) -> Self {
        Self {
            geometry: GeometryPatch::default(),
            kind: Some(KindPatch::Image(patch)),
        }
    }
    #[must_use]
    pub fn path(patch: PathPatch) -> Self {
        Self {
            geometry: GeometryPatch::default(),
            kind: Some(KindPatch::Path(patch)),
        }
    }
    #[must_use]
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            geometry: GeometryPatch {
                x: Some(x),
                y: Some(y),
                ..GeometryPatch::default()
            },
            kind: None,
        }
    }
    #[must_use]
    pub fn with_geometry(self, geometry: GeometryPatch) -> Self {
        Self { geometry, ..self }
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty() && self.kind.is_none()
    }
    /// Produce the patched copy of `layer`. The ID, z-index and variant are always preserved.
    pub fn apply_to(&self, layer: &Layer) -> Result<Layer, PatchError> {
        let mut patched = layer.clone();
        self.geometry.apply(&mut patched.geometry);
        match (&self.kind, &mut patched.kind) {
            (None, _) => (),
            (Some(KindPatch::Text(patch)), LayerKind::Text(text)) => {
                let TextPatch {
                    text: content,
                    font_family,
                    font_size,
                    fill,
                    outline,
                    shadow,
                    align,
                    font_style,
                } = patch;
                if let Some(content) = content {
                    text.text.clone_from(content);
                }
                if let Some(font_family) = font_family {
                    text.font_family.clone_from(font_family);
                }
                if let Some(font_size) = font_size {
                    text.font_size = *font_size;
                }
                if let Some(fill) = fill {
                    text.fill = *fill;
                }
                if let Some(outline) = outline {
                    text.outline = *outline;
                }
                if let Some(shadow) = shadow {
                    text.shadow = *shadow;
                }
                if let Some(align) = align {
                    text.align = *align;
                }
                if let Some(font_style) = font_style {
                    text.font_style = *font_style;
                }
            }
            (Some(KindPatch::Image(patch)), LayerKind::Image(image)) => {
                if let Some(source) = &patch.source {
                    image.source.clone_from(source);
                }
                if let Some(natural_size) = patch.natural_size {
                    image.natural_size = natural_size;
                }
                if let Some(low_resolution) = patch.low_resolution {
                    image.low_resolution = low_resolution;
                }
            }
            (Some(KindPatch::Path(patch)), LayerKind::Path(path)) => {
                if let Some(points) = &patch.points {
                    path.points.clone_from(points);
                }
                if let Some(stroke) = patch.stroke {
                    path.stroke = stroke;
                }
                if let Some(stroke_width) = patch.stroke_width {
                    path.stroke_width = stroke_width;
                }
                if let Some(tension) = patch.tension {
                    path.tension = tension;
                }
            }
            (Some(patch), kind) => {
                return Err(PatchError::KindMismatch {
                    patch: patch.ty(),
                    layer: kind.ty(),
                })
            }
        }
        Ok(patched)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    fn hello() -> Layer {
        Layer::text(
            TextLayer::plain("Hello", "Inter", 24.0),
            Geometry::at(300.0, 200.0),
            0,
        )
    }
    #[test]
    fn factory_defaults() {
        let layer = hello();
        assert_eq!(layer.ty(), LayerType::Text);
        assert_eq!(layer.geometry.rotation, 0.0);
        assert_eq!([layer.geometry.scale_x, layer.geometry.scale_y], [1.0, 1.0]);
        assert!(layer.geometry.visible);
        assert_ne!(hello().id(), layer.id());
    }
    #[test]
    fn patch_position_only() {
        let layer = hello();
        let patched = LayerPatch::position(10.0, 20.0).apply_to(&layer).unwrap();
        assert_eq!([patched.geometry.x, patched.geometry.y], [10.0, 20.0]);
        assert_eq!(patched.id(), layer.id());
        assert_eq!(patched.kind, layer.kind);
        assert_eq!(patched.geometry.rotation, layer.geometry.rotation);
    }
    #[test]
    fn patch_text_payload() {
        let layer = hello();
        let patch = LayerPatch::text(TextPatch {
            font_size: Some(40.0),
            outline: Some(Some(Outline {
                color: Color::WHITE,
                width: 2.0,
            })),
            ..TextPatch::default()
        });
        let patched = patch.apply_to(&layer).unwrap();
        let text = patched.kind.text().unwrap();
        assert_eq!(text.font_size, 40.0);
        assert_eq!(text.text, "Hello");
        assert!(text.outline.is_some());

        // Clearing with Some(None)
        let cleared = LayerPatch::text(TextPatch {
            outline: Some(None),
            ..TextPatch::default()
        })
        .apply_to(&patched)
        .unwrap();
        assert!(cleared.kind.text().unwrap().outline.is_none());
    }
    #[test]
    fn patch_never_changes_variant() {
        let layer = hello();
        let patch = LayerPatch::image(ImagePatch {
            low_resolution: Some(true),
            ..ImagePatch::default()
        });
        assert_eq!(
            patch.apply_to(&layer),
            Err(PatchError::KindMismatch {
                patch: LayerType::Image,
                layer: LayerType::Text
            })
        );
    }
    #[test]
    fn embedded_sources() {
        let source = ImageSource::embed("image/png", &[1, 2, 3, 250]);
        assert!(source.as_str().starts_with("data:image/png;base64,"));
        assert_eq!(source.embedded_bytes(), Some(vec![1, 2, 3, 250]));
        assert_eq!(ImageSource::from(source.as_str()), source);
        assert_eq!(
            ImageSource::from("https://example.com/a.png"),
            ImageSource::Url("https://example.com/a.png".into())
        );
        assert_eq!(ImageSource::from("https://x").embedded_bytes(), None);
    }
    #[test]
    fn serialized_shape() {
        let layer = Layer::path(
            PathLayer {
                points: vec![1.0, 2.0, 3.0, 4.0],
                stroke: Color::BLACK,
                stroke_width: 3.0,
                tension: PathLayer::FREEHAND_TENSION,
            },
            2,
        );
        let json = serde_json::to_value(&layer).unwrap();
        assert_eq!(json["type"], "path");
        assert_eq!(json["zIndex"], 2);
        assert_eq!(json["stroke"], "#000000");
        assert_eq!(json["scaleX"], 1.0);
        assert!(json.get("size").is_none());

        let back: Layer = serde_json::from_value(json).unwrap();
        assert_eq!(back, layer);
    }
}
