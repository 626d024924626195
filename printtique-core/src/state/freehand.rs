//! Freehand strokes are path layers built up point by point while the pointer is held.
//!
//! Beginning a stroke hands out a [`StrokeSession`]. Extending and ending require that handle, so a
//! stroke can never be extended after it ended, and a stale handle is simply refused.

use crate::color::Color;
use crate::state::document::Side;
use crate::state::layer::{LayerID, PathLayer};

pub type StrokeID = crate::StudioID<StrokeSession>;

/// Handle to an open freehand stroke.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StrokeSession {
    id: StrokeID,
    side: Side,
    layer: LayerID,
}
impl StrokeSession {
    pub(crate) fn new(side: Side, layer: LayerID) -> Self {
        Self {
            id: StrokeID::default(),
            side,
            layer,
        }
    }
    #[must_use]
    pub fn id(&self) -> StrokeID {
        self.id
    }
    /// Side the stroke is being drawn on.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }
    /// The path layer receiving the points.
    #[must_use]
    pub fn layer(&self) -> LayerID {
        self.layer
    }
}

#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f32,
}
impl StrokeStyle {
    /// The path a stroke starts out as, a single point.
    #[must_use]
    pub fn start_path(&self, [x, y]: [f32; 2]) -> PathLayer {
        PathLayer {
            points: vec![x, y],
            stroke: self.color,
            stroke_width: self.width,
            tension: PathLayer::FREEHAND_TENSION,
        }
    }
}
impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 3.0,
        }
    }
}
