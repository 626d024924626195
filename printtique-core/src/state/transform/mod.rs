/// An axis-aligned rectangle in canvas units. 0,0 is top left, +X right, +Y down.
#[derive(Copy, Clone, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}
impl Rect {
    #[must_use]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
    /// Whether the point lies within the rect, edges inclusive.
    #[must_use]
    pub fn contains(&self, [x, y]: [f32; 2]) -> bool {
        (self.left..=self.right()).contains(&x) && (self.top..=self.bottom()).contains(&y)
    }
}

/// An arbitrary 2D affine transform. Units of output are canvas units.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Matrix {
    /// Column-major matrix elements
    pub elements: [[f32; 2]; 3],
}

impl Default for Matrix {
    fn default() -> Self {
        Self {
            elements: [[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]],
        }
    }
}

impl Matrix {
    /// Scale about the origin, then rotate *CW* by `rotation_deg`, then translate.
    /// This is the order a layer's geometry is applied in.
    #[must_use]
    pub fn from_parts(translation: [f32; 2], rotation_deg: f32, scale: [f32; 2]) -> Self {
        let (sin, cos) = rotation_deg.to_radians().sin_cos();
        Self {
            elements: [
                [scale[0] * cos, scale[0] * sin],
                [scale[1] * -sin, scale[1] * cos],
                translation,
            ],
        }
    }
    #[must_use]
    pub fn transform_point(&self, [x, y]: [f32; 2]) -> [f32; 2] {
        let [a, b, c] = self.elements;
        [
            a[0].mul_add(x, b[0].mul_add(y, c[0])),
            a[1].mul_add(x, b[1].mul_add(y, c[1])),
        ]
    }
    /// Axis-aligned bounds of the transformed rectangle `[0, size]`.
    #[must_use]
    pub fn bounds_of(&self, size: [f32; 2]) -> Rect {
        let corners = [
            [0.0, 0.0],
            [size[0], 0.0],
            [0.0, size[1]],
            [size[0], size[1]],
        ]
        .map(|corner| self.transform_point(corner));
        let (mut min, mut max) = (corners[0], corners[0]);
        for [x, y] in &corners[1..] {
            min = [min[0].min(*x), min[1].min(*y)];
            max = [max[0].max(*x), max[1].max(*y)];
        }
        Rect {
            left: min[0],
            top: min[1],
            width: max[0] - min[0],
            height: max[1] - min[1],
        }
    }
}
