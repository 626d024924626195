//! # Canvas tools
//!
//! Tools turn pointer gestures on the canvas into edits of the design. The selection tool picks,
//! drags and transforms layers; the brush draws freehand strokes.
//!
//! Implemented as a small state machine: exactly one tool is active, and switching away from a tool
//! lets it finish what it was doing first (the brush closes its open stroke).

use crate::commands::CommandError;
use crate::session::DesignSession;
use crate::state::freehand::{StrokeSession, StrokeStyle};
use crate::state::layer::{GeometryPatch, LayerID, LayerPatch};

use super::MIN_LAYER_SIZE;

/// Where a transform gesture left a node, as reported by the renderer once it ends.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Unscaled node size.
    pub width: f32,
    pub height: f32,
}
impl NodeState {
    /// The single update a finished transform gesture makes.
    #[must_use]
    pub fn into_patch(self) -> LayerPatch {
        LayerPatch::default().with_geometry(GeometryPatch {
            x: Some(self.x),
            y: Some(self.y),
            rotation: Some(self.rotation),
            scale_x: Some(self.scale_x),
            scale_y: Some(self.scale_y),
            size: Some([
                self.width.max(MIN_LAYER_SIZE),
                self.height.max(MIN_LAYER_SIZE),
            ]),
            visible: None,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum CanvasEvent {
    /// `target` is the layer the renderer hit, if any.
    PointerDown {
        pos: [f32; 2],
        target: Option<LayerID>,
    },
    PointerMove {
        pos: [f32; 2],
    },
    PointerUp {
        pos: [f32; 2],
    },
    /// A layer was dragged and released at `pos`.
    DragEnd { target: LayerID, pos: [f32; 2] },
    /// A resize or rotate on a layer finished.
    TransformEnd { target: LayerID, node: NodeState },
}

pub trait CanvasTool {
    fn process(
        &mut self,
        session: &mut DesignSession,
        event: &CanvasEvent,
    ) -> Result<(), CommandError>;
    /// Called when the state is transitioning away from this tool.
    fn exit(&mut self, _session: &mut DesignSession) {}
}

/// Picks, moves and transforms layers.
#[derive(Default)]
pub struct SelectTool;
impl CanvasTool for SelectTool {
    fn process(
        &mut self,
        session: &mut DesignSession,
        event: &CanvasEvent,
    ) -> Result<(), CommandError> {
        match *event {
            CanvasEvent::PointerDown {
                target: Some(id), ..
            } => session.select(id),
            CanvasEvent::PointerDown { target: None, .. } => {
                session.clear_selection();
                Ok(())
            }
            CanvasEvent::DragEnd {
                target,
                pos: [x, y],
            } => session.update_layer(target, &LayerPatch::position(x, y)),
            CanvasEvent::TransformEnd { target, node } => {
                session.update_layer(target, &node.into_patch())
            }
            CanvasEvent::PointerMove { .. } | CanvasEvent::PointerUp { .. } => Ok(()),
        }
    }
}

/// Draws freehand strokes while the pointer is held.
#[derive(Default)]
pub struct BrushTool {
    pub style: StrokeStyle,
    in_progress: Option<StrokeSession>,
}
impl BrushTool {
    #[must_use]
    pub fn new(style: StrokeStyle) -> Self {
        Self {
            style,
            in_progress: None,
        }
    }
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.in_progress.is_some()
    }
    fn finish(&mut self, session: &mut DesignSession) -> Result<(), CommandError> {
        if let Some(stroke) = self.in_progress.take() {
            session.end_stroke(&stroke)?;
        }
        Ok(())
    }
}
impl CanvasTool for BrushTool {
    fn process(
        &mut self,
        session: &mut DesignSession,
        event: &CanvasEvent,
    ) -> Result<(), CommandError> {
        match *event {
            CanvasEvent::PointerDown { pos, .. } => {
                // A missed pointer-up. Close that stroke first.
                self.finish(session)?;
                self.in_progress = Some(session.begin_stroke(pos, &self.style)?);
                Ok(())
            }
            CanvasEvent::PointerMove { pos } => match &self.in_progress {
                Some(stroke) => session.extend_stroke(stroke, pos),
                // Hovering.
                None => Ok(()),
            },
            CanvasEvent::PointerUp { .. } => self.finish(session),
            // Layers don't drag while drawing.
            CanvasEvent::DragEnd { .. } | CanvasEvent::TransformEnd { .. } => Ok(()),
        }
    }
    fn exit(&mut self, session: &mut DesignSession) {
        if let Err(err) = self.finish(session) {
            log::warn!("failed to close stroke on tool exit: {err}");
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, strum::AsRefStr, strum::EnumIter)]
pub enum ToolMode {
    #[default]
    Select,
    Freehand,
}

pub struct ToolState {
    mode: ToolMode,
    select: SelectTool,
    brush: BrushTool,
}
impl Default for ToolState {
    fn default() -> Self {
        Self::new(StrokeStyle::default())
    }
}
impl ToolState {
    #[must_use]
    pub fn new(style: StrokeStyle) -> Self {
        Self {
            mode: ToolMode::default(),
            select: SelectTool,
            brush: BrushTool::new(style),
        }
    }
    #[must_use]
    pub fn mode(&self) -> ToolMode {
        self.mode
    }
    pub fn brush_style_mut(&mut self) -> &mut StrokeStyle {
        &mut self.brush.style
    }
    fn tool(&mut self, mode: ToolMode) -> &mut dyn CanvasTool {
        match mode {
            ToolMode::Select => &mut self.select,
            ToolMode::Freehand => &mut self.brush,
        }
    }
    /// Switch tools, letting the current one wrap up. Entering freehand mode drops the selection.
    pub fn set_mode(&mut self, mode: ToolMode, session: &mut DesignSession) {
        if mode == self.mode {
            return;
        }
        self.tool(self.mode).exit(session);
        if mode == ToolMode::Freehand {
            session.clear_selection();
        }
        log::debug!("tool {} -> {}", self.mode.as_ref(), mode.as_ref());
        self.mode = mode;
    }
    pub fn process(
        &mut self,
        session: &mut DesignSession,
        event: &CanvasEvent,
    ) -> Result<(), CommandError> {
        self.tool(self.mode).process(session, event)
    }
}
