//! The active layer. Selection is not part of the design or its history, it lives beside it.

use super::document::LayerStack;
use super::layer::LayerID;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    active: Option<LayerID>,
}
impl Selection {
    #[must_use]
    pub fn get(&self) -> Option<LayerID> {
        self.active
    }
    pub fn select(&mut self, id: LayerID) {
        self.active = Some(id);
    }
    pub fn clear(&mut self) {
        self.active = None;
    }
    #[must_use]
    pub fn is_selected(&self, id: LayerID) -> bool {
        self.active == Some(id)
    }
    /// Forget the selection if it no longer names a layer of `stack`.
    pub fn retain_in(&mut self, stack: &LayerStack) {
        if self.active.is_some_and(|id| !stack.contains(id)) {
            self.active = None;
        }
    }
}
