//! Layer factories for the things a customer can put on a garment: text, uploaded images, and
//! clipart from the catalog. Every factory hands out a fresh ID and default placement.

use crate::catalog::Clipart;
use crate::state::layer::{Geometry, ImageLayer, ImageSource, Layer, TextLayer};

/// Uploads narrower than this are flagged as likely to print blurry.
pub const LOW_RESOLUTION_WIDTH: u32 = 1000;

pub const DEFAULT_FONT: &str = "Inter";
pub const DEFAULT_FONT_SIZE: f32 = 24.0;
/// Clipart is rendered from square icons of this size.
pub const CLIPART_SIZE: u32 = 512;

/// A new text layer with the default font, near the top of the print area.
#[must_use]
pub fn text_layer(content: &str, z_index: u32) -> Layer {
    Layer::text(
        TextLayer::plain(content, DEFAULT_FONT, DEFAULT_FONT_SIZE),
        Geometry::at(300.0, 200.0),
        z_index,
    )
}

/// A new layer showing a clipart from the library.
#[must_use]
pub fn clipart_layer(clipart: &Clipart, z_index: u32) -> Layer {
    Layer::image(
        ImageLayer {
            source: ImageSource::from(clipart.url.as_str()),
            natural_size: [CLIPART_SIZE; 2],
            low_resolution: false,
        },
        Geometry::at(250.0, 250.0).with_scale(0.3),
        z_index,
    )
}

/// Rules applied to customer uploads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UploadPolicy {
    pub low_resolution_width: u32,
}
impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            low_resolution_width: LOW_RESOLUTION_WIDTH,
        }
    }
}
impl UploadPolicy {
    #[must_use]
    pub fn is_low_resolution(&self, natural_size: [u32; 2]) -> bool {
        natural_size[0] < self.low_resolution_width
    }
    /// A new layer for an uploaded image. The dimensions may not be known yet, in which case the
    /// layer is placed anyway and never flagged.
    #[must_use]
    pub fn upload_layer(
        &self,
        source: ImageSource,
        natural_size: Option<[u32; 2]>,
        z_index: u32,
    ) -> Layer {
        let low_resolution = natural_size.is_some_and(|size| self.is_low_resolution(size));
        if low_resolution {
            log::warn!(
                "uploaded image is {}px wide, below the {}px print threshold",
                natural_size.map_or(0, |size| size[0]),
                self.low_resolution_width
            );
        }
        Layer::image(
            ImageLayer {
                source,
                natural_size: natural_size.unwrap_or_default(),
                low_resolution,
            },
            Geometry::at(200.0, 100.0).with_scale(0.5),
            z_index,
        )
    }
    /// Embed raw uploaded bytes as a data URL and make a layer of them.
    #[must_use]
    pub fn embed_upload(
        &self,
        mime: &str,
        bytes: &[u8],
        natural_size: Option<[u32; 2]>,
        z_index: u32,
    ) -> Layer {
        self.upload_layer(ImageSource::embed(mime, bytes), natural_size, z_index)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::layer::LayerKind;
    #[test]
    fn text_defaults() {
        let layer = text_layer("Hello", 3);
        assert_eq!(layer.z_index(), 3);
        assert_eq!([layer.geometry.x, layer.geometry.y], [300.0, 200.0]);
        let text = layer.kind.text().unwrap();
        assert_eq!(text.font_family, "Inter");
        assert_eq!(text.font_size, 24.0);
        assert_eq!(text.fill, crate::color::Color::BLACK);
    }
    #[test]
    fn low_resolution_flag() {
        let policy = UploadPolicy::default();
        let small = policy.upload_layer("a.png".into(), Some([999, 2000]), 0);
        let large = policy.upload_layer("b.png".into(), Some([1000, 10]), 0);
        let unknown = policy.upload_layer("c.png".into(), None, 0);
        let flag = |layer: &Layer| match &layer.kind {
            LayerKind::Image(image) => image.low_resolution,
            LayerKind::Text(_) | LayerKind::Path(_) => panic!("expected an image"),
        };
        assert!(flag(&small));
        assert!(!flag(&large));
        assert!(!flag(&unknown));
        assert_eq!(small.geometry.scale_x, 0.5);
        assert_eq!([small.geometry.x, small.geometry.y], [200.0, 100.0]);
    }
    #[test]
    fn embedded_upload() {
        let layer = UploadPolicy::default().embed_upload("image/png", b"png", Some([1200, 800]), 0);
        let image = layer.kind.image().unwrap();
        assert_eq!(image.source.embedded_bytes().as_deref(), Some(&b"png"[..]));
    }
    #[test]
    fn clipart_defaults() {
        let catalog = crate::catalog::Catalog::builtin();
        let layer = clipart_layer(catalog.clipart("c3").unwrap(), 0);
        let image = layer.kind.image().unwrap();
        assert_eq!(image.natural_size, [512, 512]);
        assert_eq!(layer.geometry.scale_y, 0.3);
    }
}
