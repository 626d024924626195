/// How a drawn element combines with the pixels already on the canvas.
#[derive(
    strum::AsRefStr,
    strum::EnumIter,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CompositeOp {
    /// Plain painter's algorithm.
    #[default]
    SourceOver,
    /// Paint only where the destination already has coverage. Used to recolor a garment
    /// without touching the transparent background around it.
    SourceAtop,
}

/// Composite operation plus an opacity modulate.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Blend {
    pub op: CompositeOp,
    pub opacity: f32,
}
impl Blend {
    /// Opacity of the garment recolor overlay. Low enough that fabric folds stay visible.
    pub const GARMENT_TINT_OPACITY: f32 = 0.7;
    #[must_use]
    pub fn garment_tint() -> Self {
        Self {
            op: CompositeOp::SourceAtop,
            opacity: Self::GARMENT_TINT_OPACITY,
        }
    }
}
impl Default for Blend {
    fn default() -> Self {
        Self {
            op: CompositeOp::default(),
            opacity: 1.0,
        }
    }
}
