//! # Customer design scripts
//!
//! A script is a TOML list of `[[step]]`s replayed against a design session, standing in for a
//! customer at the canvas: adding text, uploads and clipart, dragging and transforming them,
//! drawing freehand and switching garment or side. Layers are referred to by the `name` given when
//! they were added.
//!
//! Failed edits are advisory, just as on the canvas: they are logged, skipped, and the rest of the
//! script runs on. Only I/O failures abort.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use printtique_core::{
    color::Color,
    commands::CommandError,
    io::DesignSnapshot,
    projection::{
        tools::{CanvasEvent, NodeState, ToolMode, ToolState},
        LoadedAssets,
    },
    session::DesignSession,
    state::{
        layer::{Align, FontStyle, GeometryPatch, ImageSource, TextPatch},
        Direction, LayerID, LayerPatch, Side,
    },
};

/// Steps that can't be carried out at all, as opposed to edits the design refused.
#[derive(thiserror::Error, Debug)]
pub enum ScriptError {
    #[error("an upload needs exactly one of `file` or `url`")]
    UploadSource,
    #[error("{path:?}: {format:?} uploads are not supported")]
    UnsupportedUpload {
        path: PathBuf,
        format: image::ImageFormat,
    },
}

fn once() -> usize {
    1
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    AddText {
        text: String,
        name: Option<String>,
    },
    /// Either a local `file`, embedded into the design, or a remote `url`.
    AddUpload {
        file: Option<PathBuf>,
        url: Option<String>,
        /// Natural size of a remote image, if known.
        size: Option<[u32; 2]>,
        name: Option<String>,
    },
    AddClipart {
        clipart: String,
        name: Option<String>,
    },
    /// Drag a layer to a new position.
    Move {
        layer: String,
        x: f32,
        y: f32,
    },
    /// Finish a resize/rotate gesture on a layer.
    Transform {
        layer: String,
        node: NodeState,
    },
    /// Restyle a text layer.
    Style {
        layer: String,
        text: Option<String>,
        font: Option<String>,
        size: Option<f32>,
        fill: Option<Color>,
        align: Option<Align>,
        font_style: Option<FontStyle>,
    },
    Visibility {
        layer: String,
        visible: bool,
    },
    Delete {
        layer: String,
    },
    Reorder {
        layer: String,
        direction: Direction,
    },
    Select {
        layer: String,
    },
    /// Press the pointer at a point, selecting whatever layer is on top there.
    Click {
        at: [f32; 2],
    },
    Deselect,
    Side {
        side: Side,
    },
    Flip,
    Product {
        id: String,
    },
    Variant {
        id: String,
    },
    /// One freehand stroke through `points`.
    Draw {
        points: Vec<[f32; 2]>,
        color: Option<Color>,
        width: Option<f32>,
        name: Option<String>,
    },
    Undo {
        #[serde(default = "once")]
        times: usize,
    },
    Redo {
        #[serde(default = "once")]
        times: usize,
    },
    /// Write the design snapshot.
    Save {
        path: PathBuf,
    },
    /// Write the render plan of a side, the active one by default.
    Plan {
        path: PathBuf,
        side: Option<Side>,
    },
}

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
pub struct Script {
    /// Garment to start on, instead of the catalog's first.
    pub product: Option<String>,
    pub variant: Option<String>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}
impl Script {
    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(toml)?)
    }
}

/// How a script run went.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub applied: usize,
    pub skipped: usize,
}

pub struct Runner {
    session: DesignSession,
    tools: ToolState,
    names: HashMap<String, LayerID>,
    assets: LoadedAssets,
    /// Relative paths in steps are resolved against this.
    base: PathBuf,
}
impl Runner {
    #[must_use]
    pub fn new(session: DesignSession, tools: ToolState, base: PathBuf) -> Self {
        Self {
            session,
            tools,
            names: HashMap::new(),
            assets: LoadedAssets::default(),
            base,
        }
    }
    #[must_use]
    pub fn session(&self) -> &DesignSession {
        &self.session
    }
    #[must_use]
    pub fn into_session(self) -> DesignSession {
        self.session
    }
    pub fn run(&mut self, script: &Script) -> anyhow::Result<Summary> {
        let mut summary = Summary::default();
        let garment = [
            script.product.as_deref().map(|id| Step::Product { id: id.to_owned() }),
            script.variant.as_deref().map(|id| Step::Variant { id: id.to_owned() }),
        ];
        for (index, step) in garment.iter().flatten().chain(&script.steps).enumerate() {
            match self.step(step) {
                Ok(()) => summary.applied += 1,
                Err(e) => match e.downcast_ref::<CommandError>() {
                    Some(command) => {
                        log::warn!("step {index} ({step:?}) skipped: {command}");
                        summary.skipped += 1;
                    }
                    None => return Err(e.context(format!("step {index} failed"))),
                },
            }
        }
        log::info!(
            "script done, {} steps applied, {} skipped",
            summary.applied,
            summary.skipped
        );
        Ok(summary)
    }
    fn layer(&self, name: &str) -> Result<LayerID, CommandError> {
        self.names.get(name).copied().ok_or_else(|| {
            log::debug!("no layer named `{name}`");
            CommandError::UnknownResource
        })
    }
    fn name(&mut self, name: Option<&String>, id: LayerID) {
        if let Some(name) = name {
            if let Some(old) = self.names.insert(name.clone(), id) {
                log::debug!("name `{name}` moved from {old} to {id}");
            }
        }
    }
    fn path(&self, path: &Path) -> PathBuf {
        self.base.join(path)
    }
    fn select_mode(&mut self) {
        self.tools.set_mode(ToolMode::Select, &mut self.session);
    }
    fn step(&mut self, step: &Step) -> anyhow::Result<()> {
        match step {
            Step::AddText { text, name } => {
                let id = self.session.add_text(text)?;
                self.name(name.as_ref(), id);
            }
            Step::AddUpload {
                file,
                url,
                size,
                name,
            } => {
                let id = match (file, url) {
                    (Some(file), None) => {
                        let path = self.path(file);
                        self.upload_file(&path)?
                    }
                    (None, Some(url)) => {
                        if let Some(size) = size {
                            self.assets.insert(url.as_str(), *size);
                        }
                        self.session.add_upload(ImageSource::from(url.as_str()), *size)?
                    }
                    _ => return Err(ScriptError::UploadSource.into()),
                };
                self.name(name.as_ref(), id);
            }
            Step::AddClipart { clipart, name } => {
                let id = self.session.add_clipart(clipart)?;
                self.name(name.as_ref(), id);
            }
            Step::Move { layer, x, y } => {
                let target = self.layer(layer)?;
                self.select_mode();
                self.tools.process(
                    &mut self.session,
                    &CanvasEvent::DragEnd {
                        target,
                        pos: [*x, *y],
                    },
                )?;
            }
            Step::Transform { layer, node } => {
                let target = self.layer(layer)?;
                self.select_mode();
                self.tools.process(
                    &mut self.session,
                    &CanvasEvent::TransformEnd {
                        target,
                        node: *node,
                    },
                )?;
            }
            Step::Style {
                layer,
                text,
                font,
                size,
                fill,
                align,
                font_style,
            } => {
                let patch = LayerPatch::text(TextPatch {
                    text: text.clone(),
                    font_family: font.clone(),
                    font_size: *size,
                    fill: *fill,
                    align: *align,
                    font_style: font_style.map(Some),
                    ..TextPatch::default()
                });
                let id = self.layer(layer)?;
                self.session.update_layer(id, &patch)?;
            }
            Step::Visibility { layer, visible } => {
                let patch = LayerPatch::default().with_geometry(GeometryPatch {
                    visible: Some(*visible),
                    ..GeometryPatch::default()
                });
                let id = self.layer(layer)?;
                self.session.update_layer(id, &patch)?;
            }
            Step::Delete { layer } => {
                let id = self.layer(layer)?;
                self.session.delete_layer(id)?;
            }
            Step::Reorder { layer, direction } => {
                let id = self.layer(layer)?;
                self.session.reorder_layer(id, *direction)?;
            }
            Step::Select { layer } => {
                let id = self.layer(layer)?;
                self.session.select(id)?;
            }
            Step::Click { at } => {
                self.select_mode();
                let side = self.session.active_side();
                let target = self.session.project(side, &self.assets)?.hit_test(*at);
                self.tools.process(
                    &mut self.session,
                    &CanvasEvent::PointerDown { pos: *at, target },
                )?;
            }
            Step::Deselect => self.session.clear_selection(),
            Step::Side { side } => self.session.switch_side(*side)?,
            Step::Flip => {
                self.session.toggle_side()?;
            }
            Step::Product { id } => self.session.select_product(id)?,
            Step::Variant { id } => self.session.select_variant(id)?,
            Step::Draw {
                points,
                color,
                width,
                name,
            } => self.draw(points, *color, *width, name.as_ref())?,
            Step::Undo { times } => {
                for _ in 0..*times {
                    if !self.session.undo()? {
                        log::debug!("nothing left to undo");
                        break;
                    }
                }
            }
            Step::Redo { times } => {
                for _ in 0..*times {
                    if !self.session.redo()? {
                        log::debug!("nothing left to redo");
                        break;
                    }
                }
            }
            Step::Save { path } => {
                let path = self.path(path);
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("failed to create {path:?}"))?;
                DesignSnapshot::capture(&self.session.document())
                    .write_to(std::io::BufWriter::new(file))?;
                log::info!("saved design to {path:?}");
                self.session.mark_saved(path);
            }
            Step::Plan { path, side } => {
                let path = self.path(path);
                let side = side.unwrap_or_else(|| self.session.active_side());
                let plan = self.session.project(side, &self.assets)?;
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("failed to create {path:?}"))?;
                serde_json::to_writer_pretty(std::io::BufWriter::new(file), &plan)?;
                log::info!("wrote {} plan to {path:?}", side.as_ref());
            }
        }
        Ok(())
    }
    fn upload_file(&mut self, path: &Path) -> anyhow::Result<LayerID> {
        let bytes = std::fs::read(path).with_context(|| format!("failed to read {path:?}"))?;
        let format = image::ImageFormat::from_path(path)?;
        let mime = match format {
            image::ImageFormat::Png => "image/png",
            image::ImageFormat::Jpeg => "image/jpeg",
            format => {
                return Err(ScriptError::UnsupportedUpload {
                    path: path.to_owned(),
                    format,
                }
                .into())
            }
        };
        let (width, height) = image::load_from_memory_with_format(&bytes, format)
            .map(|image| (image.width(), image.height()))
            .with_context(|| format!("{path:?} is not a readable image"))?;
        log::debug!(
            "embedding {path:?}, {}, {width}x{height}",
            human_bytes::human_bytes(bytes.len() as f64)
        );
        let id = self
            .session
            .embed_upload(mime, &bytes, Some([width, height]))?;
        let document = self.session.document();
        if let Some(image) = document
            .active_layers()
            .get(id)
            .and_then(|layer| layer.kind.image())
        {
            self.assets.insert(image.source.as_str(), [width, height]);
        }
        Ok(id)
    }
    fn draw_gesture(
        &mut self,
        first: [f32; 2],
        rest: &[[f32; 2]],
        last: [f32; 2],
    ) -> Result<(), CommandError> {
        self.tools.process(
            &mut self.session,
            &CanvasEvent::PointerDown {
                pos: first,
                target: None,
            },
        )?;
        for &pos in rest {
            self.tools
                .process(&mut self.session, &CanvasEvent::PointerMove { pos })?;
        }
        self.tools
            .process(&mut self.session, &CanvasEvent::PointerUp { pos: last })
    }
    fn draw(
        &mut self,
        points: &[[f32; 2]],
        color: Option<Color>,
        width: Option<f32>,
        name: Option<&String>,
    ) -> anyhow::Result<()> {
        let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
            log::debug!("empty stroke");
            return Err(CommandError::NoOp.into());
        };
        let previous = *self.tools.brush_style_mut();
        {
            let style = self.tools.brush_style_mut();
            style.color = color.unwrap_or(previous.color);
            style.width = width.unwrap_or(previous.width);
        }
        self.tools.set_mode(ToolMode::Freehand, &mut self.session);
        let result = self.draw_gesture(first, &points[1..], last);
        // Leaving freehand closes the stroke if anything above bailed out mid-gesture.
        self.select_mode();
        *self.tools.brush_style_mut() = previous;
        result?;
        // The stroke just finished is the top layer of the active side.
        let drawn = self
            .session
            .document()
            .active_layers()
            .as_slice()
            .last()
            .map(|layer| layer.id());
        if let Some(id) = drawn {
            self.name(name, id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use printtique_core::catalog::Catalog;
    use printtique_core::state::freehand::StrokeStyle;
    use printtique_core::state::LayerKind;
    use std::sync::Arc;

    fn runner() -> Runner {
        let session = DesignSession::new(Arc::new(Catalog::builtin())).unwrap();
        Runner::new(session, ToolState::default(), PathBuf::from("."))
    }
    fn run(script: &str) -> (Runner, Summary) {
        let mut runner = runner();
        let summary = runner
            .run(&Script::from_toml_str(script).unwrap())
            .unwrap();
        (runner, summary)
    }

    #[test]
    fn hoodie_design() {
        let (runner, summary) = run(r##"
            variant = "v1_black"

            [[step]]
            action = "add-text"
            text = "Hello"
            name = "title"

            [[step]]
            action = "style"
            layer = "title"
            font = "Pacifico"
            fill = "#ffffff"

            [[step]]
            action = "move"
            layer = "title"
            x = 280
            y = 260

            [[step]]
            action = "add-clipart"
            clipart = "c3"
            name = "rocket"

            [[step]]
            action = "reorder"
            layer = "rocket"
            direction = "down"

            [[step]]
            action = "flip"

            [[step]]
            action = "draw"
            points = [[260, 300], [270, 310], [280, 305]]
            color = "#ef4444"
        "##);
        assert_eq!(summary, Summary { applied: 8, skipped: 0 });
        let doc = runner.session().document();
        assert_eq!(doc.garment().variant_id, "v1_black");
        assert_eq!(doc.active_side(), Side::Back);

        let front = doc.layers(Side::Front).as_slice();
        assert_eq!(front.len(), 2);
        assert_eq!(front[0].ty(), printtique_core::state::LayerType::Image);
        let text = front[1].kind.text().unwrap();
        assert_eq!(text.font_family, "Pacifico");
        assert_eq!(text.fill, Color::WHITE);
        assert_eq!([front[1].geometry.x, front[1].geometry.y], [280.0, 260.0]);

        let back = doc.layers(Side::Back).as_slice();
        let LayerKind::Path(path) = &back[0].kind else {
            panic!("expected a stroke");
        };
        assert_eq!(path.points, [260.0, 300.0, 270.0, 310.0, 280.0, 305.0]);
        assert_eq!(path.stroke, Color::rgb(0xef, 0x44, 0x44));
        // The brush goes back to the configured color afterwards.
        let mut tools = runner.tools;
        assert_eq!(tools.brush_style_mut().color, Color::BLACK);
    }
    #[test]
    fn failures_are_skipped() {
        let (runner, summary) = run(r#"
            [[step]]
            action = "add-text"
            text = "kept"
            name = "kept"

            [[step]]
            action = "move"
            layer = "missing"
            x = 1
            y = 1

            [[step]]
            action = "variant"
            id = "v9_plaid"

            [[step]]
            action = "reorder"
            layer = "kept"
            direction = "up"

            [[step]]
            action = "draw"
            points = []
        "#);
        assert_eq!(summary, Summary { applied: 1, skipped: 4 });
        let doc = runner.session().document();
        assert_eq!(doc.active_layers().len(), 1);
        assert_eq!(doc.garment().variant_id, "v1_white");
    }
    #[test]
    fn click_and_history() {
        let (runner, _) = run(r#"
            [[step]]
            action = "add-text"
            text = "one"
            name = "one"

            [[step]]
            action = "click"
            at = [0, 0]

            [[step]]
            action = "add-text"
            text = "two"

            [[step]]
            action = "undo"
            times = 5

            [[step]]
            action = "redo"
        "#);
        let doc = runner.session().document();
        assert_eq!(doc.active_layers().len(), 1);
        assert_eq!(
            doc.active_layers().as_slice()[0].kind.text().unwrap().text,
            "one"
        );
        // Clicking empty canvas dropped the selection.
        assert_eq!(runner.session().selection(), None);
    }
    #[test]
    fn embeds_local_uploads() {
        let dir = std::env::temp_dir().join(format!("printtique-upload-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        image::RgbaImage::from_pixel(40, 20, image::Rgba([0, 128, 255, 255]))
            .save(dir.join("logo.png"))
            .unwrap();

        let session = DesignSession::new(Arc::new(Catalog::builtin())).unwrap();
        let mut runner = Runner::new(session, ToolState::default(), dir.clone());
        let script = Script {
            steps: vec![Step::AddUpload {
                file: Some("logo.png".into()),
                url: None,
                size: None,
                name: Some("logo".into()),
            }],
            ..Script::default()
        };
        assert_eq!(runner.run(&script).unwrap().applied, 1);
        let doc = runner.session().document();
        let layer = &doc.active_layers().as_slice()[0];
        assert_eq!([layer.geometry.x, layer.geometry.y], [200.0, 100.0]);
        let image = layer.kind.image().unwrap();
        assert_eq!(image.natural_size, [40, 20]);
        assert!(image.low_resolution);
        assert!(image.source.as_str().starts_with("data:image/png;base64,"));
        assert!(image.source.embedded_bytes().is_some());

        std::fs::write(dir.join("anim.gif"), b"GIF89a").unwrap();
        let script = Script {
            steps: vec![Step::AddUpload {
                file: Some("anim.gif".into()),
                url: None,
                size: None,
                name: None,
            }],
            ..Script::default()
        };
        let error = runner.run(&script).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ScriptError>(),
            Some(ScriptError::UnsupportedUpload { .. })
        ));
        let _ = std::fs::remove_dir_all(dir);
    }
    #[test]
    fn drawing_returns_to_select() {
        let (mut runner, summary) = run(r##"
            [[step]]
            action = "draw"
            points = [[10, 10], [20, 20]]
            color = "#ef4444"
            width = 8
            name = "scribble"

            [[step]]
            action = "delete"
            layer = "scribble"
        "##);
        assert_eq!(summary, Summary { applied: 2, skipped: 0 });
        assert!(runner.session().document().active_layers().is_empty());
        assert_eq!(runner.tools.mode(), ToolMode::Select);
        assert_eq!(*runner.tools.brush_style_mut(), StrokeStyle::default());
    }
    #[test]
    fn upload_needs_one_source() {
        let mut runner = runner();
        let script = Script {
            steps: vec![Step::AddUpload {
                file: None,
                url: None,
                size: None,
                name: None,
            }],
            ..Script::default()
        };
        let error = runner.run(&script).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ScriptError>(),
            Some(ScriptError::UploadSource)
        ));

        let script = Script {
            steps: vec![Step::AddUpload {
                file: None,
                url: Some("https://example.com/photo.jpg".into()),
                size: Some([640, 480]),
                name: Some("photo".into()),
            }],
            ..Script::default()
        };
        assert_eq!(runner.run(&script).unwrap().applied, 1);
        let doc = runner.session().document();
        let image = doc.active_layers().as_slice()[0].kind.image().unwrap();
        assert!(image.low_resolution);
    }
}
