//! # Preview export
//!
//! Composes the rendered front and back of a design side by side on a white sheet, each under a
//! view label, and names the file after the product.

use std::path::Path;
use std::sync::OnceLock;

use ab_glyph::{Font, FontArc, ScaleFont};
use anyhow::Context;
use image::RgbaImage;
use printtique_core::{
    color::Color,
    projection::{AssetResolver, RenderPlan},
    session::DesignSession,
    state::Side,
};

use crate::config::ExportLayout;

static LABEL_FONT: OnceLock<Option<FontArc>> = OnceLock::new();

/// Bold condensed face the view labels are set in.
fn label_font() -> Option<&'static FontArc> {
    LABEL_FONT
        .get_or_init(|| {
            FontArc::try_from_slice(include_bytes!("fonts/DejaVuSansCondensed-Bold.ttf"))
                .map_err(|e| log::error!("Label font unreadable, previews will be unlabeled: {e}"))
                .ok()
        })
        .as_ref()
}

/// A view label, centered on `center`.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: &'static str,
    pub center: [u32; 2],
    /// Pixel height.
    pub size: f32,
    pub color: Color,
}
impl Label {
    /// Set the label into `sheet`, blending its color by glyph coverage.
    pub fn draw(&self, sheet: &mut RgbaImage) {
        let Some(font) = label_font() else {
            return;
        };
        let scaled = font.as_scaled(self.size);

        let mut glyphs = Vec::with_capacity(self.text.len());
        let mut caret = 0.0f32;
        let mut previous = None;
        for c in self.text.chars() {
            let id = font.glyph_id(c);
            if let Some(previous) = previous {
                caret += scaled.kern(previous, id);
            }
            glyphs.push((id, caret));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }
        let left = self.center[0] as f32 - caret / 2.0;
        // Line box runs from ascent to descent, centered vertically.
        let baseline = self.center[1] as f32 + (scaled.ascent() + scaled.descent()) / 2.0;

        let [r, g, b, a] = self.color.as_array();
        let opacity = f32::from(a) / 255.0;
        let (width, height) = sheet.dimensions();
        for (id, x) in glyphs {
            let glyph = id.with_scale_and_position(self.size, ab_glyph::point(left + x, baseline));
            let Some(outlined) = font.outline_glyph(glyph) else {
                // Spaces.
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = bounds.min.x as i64 + i64::from(px);
                let y = bounds.min.y as i64 + i64::from(py);
                let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
                    return;
                };
                if x >= width || y >= height {
                    return;
                }
                let alpha = coverage.clamp(0.0, 1.0) * opacity;
                let pixel = sheet.get_pixel_mut(x, y);
                for (channel, ink) in pixel.0.iter_mut().zip([r, g, b]) {
                    *channel =
                        (f32::from(*channel) * (1.0 - alpha) + f32::from(ink) * alpha).round() as u8;
                }
            });
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PreviewLayout {
    pub canvas_size: u32,
    pub gap: u32,
    pub label_height: u32,
}
impl PreviewLayout {
    pub const BACKGROUND: Color = Color::WHITE;
    #[must_use]
    pub fn new(canvas_size: u32, layout: ExportLayout) -> Self {
        Self {
            canvas_size,
            gap: layout.gap,
            label_height: layout.label_height,
        }
    }
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        [
            self.canvas_size * 2 + self.gap,
            self.canvas_size + self.label_height,
        ]
    }
    /// Top left of a side's image.
    #[must_use]
    pub fn origin(&self, side: Side) -> [u32; 2] {
        match side {
            Side::Front => [0, self.label_height],
            Side::Back => [self.canvas_size + self.gap, self.label_height],
        }
    }
    #[must_use]
    pub fn label(&self, side: Side) -> Label {
        let [x, _] = self.origin(side);
        Label {
            text: match side {
                Side::Front => "FRONT VIEW",
                Side::Back => "BACK VIEW",
            },
            center: [x + self.canvas_size / 2, self.label_height / 2],
            size: 24.0,
            color: Color::rgb(0x1e, 0x3a, 0x8a),
        }
    }
    /// Place the rendered sides under their labels. A missing side is left blank.
    #[must_use]
    pub fn compose(&self, front: Option<&RgbaImage>, back: Option<&RgbaImage>) -> RgbaImage {
        let [width, height] = self.size();
        let mut sheet = RgbaImage::from_pixel(
            width,
            height,
            image::Rgba(Self::BACKGROUND.as_array()),
        );
        for (side, render) in [(Side::Front, front), (Side::Back, back)] {
            let Some(render) = render else {
                log::debug!("no {} render, leaving it blank", side.as_ref());
                continue;
            };
            let [x, y] = self.origin(side);
            if render.dimensions() == (self.canvas_size, self.canvas_size) {
                image::imageops::overlay(&mut sheet, render, x.into(), y.into());
            } else {
                let scaled = image::imageops::resize(
                    render,
                    self.canvas_size,
                    self.canvas_size,
                    image::imageops::FilterType::Triangle,
                );
                image::imageops::overlay(&mut sheet, &scaled, x.into(), y.into());
            }
        }
        for side in [Side::Front, Side::Back] {
            self.label(side).draw(&mut sheet);
        }
        sheet
    }
}

/// `Printtique-Design-<product name, whitespace runs as dashes>-<unix millis>.png`
#[must_use]
pub fn file_name(product_name: &str, unix_millis: i64) -> String {
    let mut name = String::with_capacity(product_name.len());
    let mut in_space = false;
    for c in product_name.chars() {
        if c.is_whitespace() {
            if !in_space {
                name.push('-');
            }
            in_space = true;
        } else {
            name.push(c);
            in_space = false;
        }
    }
    format!("Printtique-Design-{name}-{unix_millis}.png")
}

/// The plans a preview is rendered from. The selection is dropped first so no handles show up.
pub fn preview_plans(
    session: &mut DesignSession,
    resolver: &dyn AssetResolver,
) -> anyhow::Result<[RenderPlan; 2]> {
    session.clear_selection();
    Ok([
        session.project(Side::Front, resolver)?,
        session.project(Side::Back, resolver)?,
    ])
}

fn load_render(path: Option<&Path>) -> anyhow::Result<Option<RgbaImage>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let image = image::open(path).with_context(|| format!("failed to load render {path:?}"))?;
    Ok(Some(image.into_rgba8()))
}

/// Load both side renders at once.
pub fn load_renders(
    front: Option<&Path>,
    back: Option<&Path>,
) -> anyhow::Result<(Option<RgbaImage>, Option<RgbaImage>)> {
    let (front, back) = rayon::join(|| load_render(front), || load_render(back));
    Ok((front?, back?))
}
