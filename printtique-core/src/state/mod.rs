pub mod document;
pub mod freehand;
pub mod layer;
pub mod selection;
pub mod transform;
pub mod writer;

pub use document::{DesignDocument, DesignID, Direction, Garment, LayerStack, Side};
pub use layer::{Layer, LayerID, LayerKind, LayerPatch, LayerType};
