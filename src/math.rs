//! Pixel-space math: power-of-two sizing, the orthographic projection and the
//! geometry/colour matrices applied when drawing images.
//!
//! Textures are allocated with power-of-two dimensions, so most sizes that
//! reach the GPU pass through [`next_pow2`] first.

use cgmath::Matrix4;

/// Round `n` up to the next power of two.
///
/// Powers of two map onto themselves and `0` maps to `1`.
///
/// # Panics
///
/// If `n` is above `2^31`, where no `u32` power of two is large enough.
/// Use [`checked_next_pow2`] for sizes that have not been validated yet.
pub fn next_pow2(n: u32) -> u32 {
    match checked_next_pow2(n) {
        Some(p) => p,
        None => panic!("next_pow2({n}) does not fit in a u32"),
    }
}

/// Like [`next_pow2`], but `None` when the result would not fit in a `u32`.
pub fn checked_next_pow2(n: u32) -> Option<u32> {
    n.max(1).checked_next_power_of_two()
}

/// Orthographic projection from pixel coordinates to normalized device coordinates.
///
/// The matrix is returned in cgmath's column-major layout, ready to be uploaded
/// into a WGSL `mat4x4<f32>`.
pub fn ortho_projection(left: i32, right: i32, bottom: i32, top: i32) -> Matrix4<f32> {
    let e11 = 2.0 / (right - left) as f32;
    let e22 = 2.0 / (top - bottom) as f32;
    let e14 = -1.0 * (right + left) as f32 / (right - left) as f32;
    let e24 = -1.0 * (top + bottom) as f32 / (top - bottom) as f32;

    #[rustfmt::skip]
    let m = Matrix4::new(
        e11, 0.0, 0.0, 0.0,
        0.0, e22, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        e14, e24, 0.0, 1.0,
    );
    m
}

/// Element access shared by the geometry and colour matrices.
pub trait Matrix {
    /// Number of rows.
    const ROWS: usize;
    /// Number of columns, including the translation column.
    const COLS: usize;

    fn element(&self, i: usize, j: usize) -> f64;
}

/// A 2x3 affine matrix applied to image vertices before projection.
///
/// Calls compose in order: `geo.scale(2.0, 2.0); geo.translate(10.0, 0.0);`
/// first scales and then translates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoM {
    elements: [[f64; 3]; 2],
}

impl Default for GeoM {
    fn default() -> Self {
        Self::identity()
    }
}

impl GeoM {
    pub fn identity() -> Self {
        Self {
            elements: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        }
    }

    pub fn scaling(x: f64, y: f64) -> Self {
        Self {
            elements: [[x, 0.0, 0.0], [0.0, y, 0.0]],
        }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            elements: [[1.0, 0.0, tx], [0.0, 1.0, ty]],
        }
    }

    pub fn rotation(theta: f64) -> Self {
        let (sin, cos) = theta.sin_cos();
        Self {
            elements: [[cos, -sin, 0.0], [sin, cos, 0.0]],
        }
    }

    /// Apply `other` after `self`.
    pub fn concat(&mut self, other: &GeoM) {
        let a = &other.elements;
        let b = &self.elements;
        let mut result = [[0.0; 3]; 2];
        for (i, row) in result.iter_mut().enumerate() {
            row[0] = a[i][0] * b[0][0] + a[i][1] * b[1][0];
            row[1] = a[i][0] * b[0][1] + a[i][1] * b[1][1];
            row[2] = a[i][0] * b[0][2] + a[i][1] * b[1][2] + a[i][2];
        }
        self.elements = result;
    }

    pub fn scale(&mut self, x: f64, y: f64) {
        self.concat(&GeoM::scaling(x, y));
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.concat(&GeoM::translation(tx, ty));
    }

    /// Rotate clockwise on screen (y points down) by `theta` radians.
    pub fn rotate(&mut self, theta: f64) {
        self.concat(&GeoM::rotation(theta));
    }

    pub fn set_element(&mut self, i: usize, j: usize, value: f64) {
        self.elements[i][j] = value;
    }

    /// Transform a point.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.elements;
        (
            m[0][0] * x + m[0][1] * y + m[0][2],
            m[1][0] * x + m[1][1] * y + m[1][2],
        )
    }

    /// Expand into a column-major 4x4 matrix for the vertex shader.
    pub fn to_matrix4(&self) -> Matrix4<f32> {
        let m = &self.elements;
        #[rustfmt::skip]
        let m4 = Matrix4::new(
            m[0][0] as f32, m[1][0] as f32, 0.0, 0.0,
            m[0][1] as f32, m[1][1] as f32, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            m[0][2] as f32, m[1][2] as f32, 0.0, 1.0,
        );
        m4
    }
}

impl Matrix for GeoM {
    const ROWS: usize = 2;
    const COLS: usize = 3;

    fn element(&self, i: usize, j: usize) -> f64 {
        self.elements[i][j]
    }
}

/// A 4x5 matrix transforming RGBA colours (components in `0.0..=1.0`).
///
/// The fifth column is a translation added after the 4x4 product.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorM {
    elements: [[f64; 5]; 4],
}

impl Default for ColorM {
    fn default() -> Self {
        Self::identity()
    }
}

impl ColorM {
    pub fn identity() -> Self {
        let mut elements = [[0.0; 5]; 4];
        for (i, row) in elements.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self { elements }
    }

    pub fn scaling(r: f64, g: f64, b: f64, a: f64) -> Self {
        let mut m = Self::identity();
        for (i, v) in [r, g, b, a].into_iter().enumerate() {
            m.elements[i][i] = v;
        }
        m
    }

    pub fn translation(r: f64, g: f64, b: f64, a: f64) -> Self {
        let mut m = Self::identity();
        for (i, v) in [r, g, b, a].into_iter().enumerate() {
            m.elements[i][4] = v;
        }
        m
    }

    /// Apply `other` after `self`.
    pub fn concat(&mut self, other: &ColorM) {
        let a = &other.elements;
        let b = &self.elements;
        let mut result = [[0.0; 5]; 4];
        for i in 0..4 {
            for j in 0..5 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += a[i][k] * b[k][j];
                }
                if j == 4 {
                    sum += a[i][4];
                }
                result[i][j] = sum;
            }
        }
        self.elements = result;
    }

    pub fn scale(&mut self, r: f64, g: f64, b: f64, a: f64) {
        self.concat(&ColorM::scaling(r, g, b, a));
    }

    pub fn translate(&mut self, r: f64, g: f64, b: f64, a: f64) {
        self.concat(&ColorM::translation(r, g, b, a));
    }

    pub fn set_element(&mut self, i: usize, j: usize, value: f64) {
        self.elements[i][j] = value;
    }

    pub fn apply(&self, rgba: [f64; 4]) -> [f64; 4] {
        let mut out = [0.0; 4];
        for (i, row) in self.elements.iter().enumerate() {
            out[i] = row[0] * rgba[0] + row[1] * rgba[1] + row[2] * rgba[2] + row[3] * rgba[3] + row[4];
        }
        out
    }

    /// Split into the column-major 4x4 body and the translation vector.
    pub fn to_uniform(&self) -> ([[f32; 4]; 4], [f32; 4]) {
        let mut body = [[0.0f32; 4]; 4];
        let mut translation = [0.0f32; 4];
        for (i, row) in self.elements.iter().enumerate() {
            for (j, column) in body.iter_mut().enumerate() {
                column[i] = row[j] as f32;
            }
            translation[i] = row[4] as f32;
        }
        (body, translation)
    }
}

impl Matrix for ColorM {
    const ROWS: usize = 4;
    const COLS: usize = 5;

    fn element(&self, i: usize, j: usize) -> f64 {
        self.elements[i][j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    #[test]
    fn next_pow2_rounds_up() {
        let cases = [(255, 256), (256, 256), (257, 512), (1, 1), (0, 1), (3, 4), (1000, 1024)];
        for (arg, expected) in cases {
            assert_eq!(next_pow2(arg), expected, "next_pow2({arg})");
        }
    }

    #[test]
    fn next_pow2_is_smallest_power_not_below() {
        for n in 1..=4096u32 {
            let p = next_pow2(n);
            assert!(p.is_power_of_two());
            assert!(p >= n);
            assert!(p / 2 < n);
        }
    }

    #[test]
    fn next_pow2_at_the_top_of_the_range() {
        assert_eq!(next_pow2(1 << 31), 1 << 31);
        assert_eq!(checked_next_pow2(1 << 31), Some(1 << 31));
        assert_eq!(checked_next_pow2((1 << 31) + 1), None);
        assert_eq!(checked_next_pow2(u32::MAX), None);
    }

    #[test]
    #[should_panic(expected = "does not fit in a u32")]
    fn next_pow2_panics_instead_of_wrapping() {
        next_pow2((1 << 31) + 1);
    }

    #[test]
    fn ortho_maps_corners_to_ndc() {
        let m = ortho_projection(0, 256, 256, 0);
        let top_left = m * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let bottom_right = m * Vector4::new(256.0, 256.0, 0.0, 1.0);
        assert_eq!((top_left.x, top_left.y), (-1.0, 1.0));
        assert_eq!((bottom_right.x, bottom_right.y), (1.0, -1.0));
    }

    #[test]
    fn ortho_elements_follow_the_textbook_layout() {
        let m = ortho_projection(0, 4, 0, 8);
        assert_eq!(m.x.x, 0.5);
        assert_eq!(m.y.y, 0.25);
        assert_eq!(m.w.x, -1.0);
        assert_eq!(m.w.y, -1.0);
        assert_eq!(m.z.z, 1.0);
        assert_eq!(m.w.w, 1.0);
    }

    #[test]
    fn geo_operations_apply_in_call_order() {
        let mut geo = GeoM::default();
        geo.scale(2.0, 3.0);
        geo.translate(10.0, 20.0);
        assert_eq!(geo.apply(1.0, 1.0), (12.0, 23.0));

        let mut geo = GeoM::default();
        geo.translate(10.0, 20.0);
        geo.scale(2.0, 3.0);
        assert_eq!(geo.apply(1.0, 1.0), (22.0, 63.0));
    }

    #[test]
    fn geo_rotation_quarter_turn() {
        let mut geo = GeoM::default();
        geo.rotate(std::f64::consts::FRAC_PI_2);
        let (x, y) = geo.apply(1.0, 0.0);
        assert!(x.abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn geo_matrix4_matches_apply() {
        let mut geo = GeoM::default();
        geo.scale(2.0, 0.5);
        geo.translate(-3.0, 4.0);
        let v = geo.to_matrix4() * Vector4::new(5.0, 6.0, 0.0, 1.0);
        let (x, y) = geo.apply(5.0, 6.0);
        assert_eq!((v.x as f64, v.y as f64), (x, y));
        assert_eq!(geo.element(0, 2), -3.0);
        assert_eq!(geo.element(1, 1), 0.5);
    }

    #[test]
    fn color_scale_then_translate() {
        let mut clr = ColorM::default();
        clr.scale(0.5, 1.0, 1.0, 1.0);
        clr.translate(0.25, 0.0, 0.0, 0.0);
        assert_eq!(clr.apply([1.0, 0.5, 0.25, 1.0]), [0.75, 0.5, 0.25, 1.0]);
        assert_eq!(clr.element(0, 4), 0.25);
    }

    #[test]
    fn color_uniform_is_column_major() {
        let mut clr = ColorM::identity();
        clr.set_element(0, 1, 0.5);
        clr.set_element(2, 4, 0.125);
        let (body, translation) = clr.to_uniform();
        // column 1, row 0
        assert_eq!(body[1][0], 0.5);
        assert_eq!(body[0][1], 0.0);
        assert_eq!(translation, [0.0, 0.0, 0.125, 0.0]);
    }
}
