//! # Snapshots
//!
//! Designs are persisted as a JSON snapshot: garment, active side, and both layer stacks. History,
//! selection and any open stroke are session state and are not saved.

use crate::state::document::{DesignDocument, DesignID, Garment, LayerStack, Side};
use crate::state::layer::Layer;

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("layer id {id} appears twice on the {} side", .side.as_ref())]
    DuplicateId { side: Side, id: u64 },
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SideLayers {
    pub front: Vec<Layer>,
    pub back: Vec<Layer>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSnapshot {
    // Snapshots written by hand, or by older versions, may lack one.
    #[serde(default)]
    pub id: DesignID,
    #[serde(flatten)]
    pub garment: Garment,
    #[serde(default)]
    pub side: Side,
    pub layers: SideLayers,
}
impl DesignSnapshot {
    #[must_use]
    pub fn capture(doc: &DesignDocument) -> Self {
        let collect = |side| doc.layers(side).iter().cloned().collect();
        Self {
            id: doc.id(),
            garment: doc.garment().clone(),
            side: doc.active_side(),
            layers: SideLayers {
                front: collect(Side::Front),
                back: collect(Side::Back),
            },
        }
    }
    /// Rebuild the design. IDs must be unique per side, z indices are recomputed from order.
    pub fn into_document(self) -> Result<DesignDocument, SnapshotError> {
        let stack = |side: Side, layers: Vec<Layer>| {
            LayerStack::from_layers(layers).map_err(|id| SnapshotError::DuplicateId {
                side,
                id: id.id(),
            })
        };
        let front = stack(Side::Front, self.layers.front)?;
        let back = stack(Side::Back, self.layers.back)?;
        Ok(DesignDocument::from_parts(
            self.id,
            self.garment,
            self.side,
            front,
            back,
        ))
    }
    pub fn write_to(&self, writer: impl std::io::Write) -> Result<(), SnapshotError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
    pub fn read_from(reader: impl std::io::Read) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::layer::{Geometry, PathLayer, TextLayer};
    use crate::color::Color;

    fn document() -> DesignDocument {
        let text = Layer::text(
            TextLayer::plain("Hello", "Pacifico", 30.0),
            Geometry::at(280.0, 260.0),
            0,
        );
        let path = Layer::path(
            PathLayer {
                points: vec![260.0, 300.0, 270.0, 310.0],
                stroke: Color::rgb(0xef, 0x44, 0x44),
                stroke_width: 3.0,
                tension: 0.5,
            },
            1,
        );
        DesignDocument::from_parts(
            DesignID::default(),
            Garment {
                product_id: "p1".into(),
                variant_id: "v1_black".into(),
            },
            Side::Back,
            LayerStack::from_layers(vec![text, path]).unwrap(),
            LayerStack::default(),
        )
    }
    #[test]
    fn restores_structure() {
        let doc = document();
        let mut bytes = Vec::new();
        DesignSnapshot::capture(&doc).write_to(&mut bytes).unwrap();
        let restored = DesignSnapshot::read_from(bytes.as_slice())
            .unwrap()
            .into_document()
            .unwrap();
        assert_eq!(restored, doc);
    }
    #[test]
    fn wire_shape() {
        let json = serde_json::to_value(DesignSnapshot::capture(&document())).unwrap();
        assert_eq!(json["productId"], "p1");
        assert_eq!(json["variantId"], "v1_black");
        assert_eq!(json["side"], "back");
        assert_eq!(json["layers"]["front"][0]["type"], "text");
        assert_eq!(json["layers"]["front"][1]["zIndex"], 1);
        assert_eq!(json["layers"]["back"].as_array().map(Vec::len), Some(0));
    }
    #[test]
    fn minimal_snapshot() {
        let json = r#"{
            "productId": "p1",
            "variantId": "v1_white",
            "layers": {
                "front": [{
                    "id": 9001, "zIndex": 7, "type": "image",
                    "x": 200, "y": 100, "rotation": 0, "scaleX": 0.5, "scaleY": 0.5, "visible": true,
                    "src": "https://example.com/a.png", "naturalSize": [800, 600], "lowResolution": true
                }],
                "back": []
            }
        }"#;
        let doc = DesignSnapshot::read_from(json.as_bytes())
            .unwrap()
            .into_document()
            .unwrap();
        assert_eq!(doc.active_side(), Side::Front);
        let layer = &doc.layers(Side::Front).as_slice()[0];
        assert_eq!(layer.id().id(), 9001);
        // Recomputed from position.
        assert_eq!(layer.z_index(), 0);
        // Restored ids are never handed out again.
        assert!(crate::state::layer::LayerID::default().id() > 9001);
    }
    #[test]
    fn rejects_exhausting_ids() {
        let json = r##"{
            "productId": "p1",
            "variantId": "v1_white",
            "layers": {
                "front": [{
                    "id": 18446744073709551614, "zIndex": 0, "type": "text",
                    "x": 0, "y": 0, "rotation": 0, "scaleX": 1, "scaleY": 1, "visible": true,
                    "text": "late", "fontFamily": "Inter", "fontSize": 24, "fill": "#000000"
                }],
                "back": []
            }
        }"##;
        assert!(matches!(
            DesignSnapshot::read_from(json.as_bytes()),
            Err(SnapshotError::Json(_))
        ));
        // The session can keep adding layers afterwards.
        let _ = crate::state::layer::LayerID::default();
    }
    #[test]
    fn rejects_duplicates() {
        let doc = document();
        let mut snapshot = DesignSnapshot::capture(&doc);
        let copy = snapshot.layers.front[0].clone();
        snapshot.layers.front.push(copy);
        assert!(matches!(
            snapshot.into_document(),
            Err(SnapshotError::DuplicateId {
                side: Side::Front,
                ..
            })
        ));
        assert!(matches!(
            DesignSnapshot::read_from(&b"{"[..]),
            Err(SnapshotError::Json(_))
        ));
    }
}
