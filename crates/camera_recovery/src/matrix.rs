//! Row-major 4x4 matrices in the row-vector (`v' = v · M`) convention.
//!
//! Element `(r, c)` lives at index `r * 4 + c`, so the D3D names map as
//! `_11 = m[0]`, `_34 = m[11]`, `_41.._43 = m[12..15]`, `_44 = m[15]`.

use glam::Vec3;
use serde::Serialize;

/// Coefficients below this magnitude make a perspective matrix non-invertible.
pub const PERSPECTIVE_EPSILON: f32 = 1e-4;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Serialize)]
pub struct Matrix4 {
    pub m: [f32; 16],
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4 {
    #[rustfmt::skip]
    pub const IDENTITY: Matrix4 = Matrix4 {
        m: [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    #[inline]
    pub const fn from_row_major(m: [f32; 16]) -> Self {
        Self { m }
    }

    #[inline]
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.m[row * 4 + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.m[row * 4 + col] = value;
    }

    /// `self · rhs`
    pub fn multiply(&self, rhs: &Matrix4) -> Matrix4 {
        let mut out = [0.0f32; 16];
        for r in 0..4 {
            for c in 0..4 {
                out[r * 4 + c] = (0..4).map(|k| self.at(r, k) * rhs.at(k, c)).sum();
            }
        }
        Matrix4 { m: out }
    }

    pub fn transpose(&self) -> Matrix4 {
        let mut out = [0.0f32; 16];
        for r in 0..4 {
            for c in 0..4 {
                out[c * 4 + r] = self.at(r, c);
            }
        }
        Matrix4 { m: out }
    }

    /// Row 3 xyz: the translation of a row-vector transform.
    #[inline]
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.m[12], self.m[13], self.m[14])
    }

    pub fn is_finite(&self) -> bool {
        self.m.iter().all(|v| v.is_finite())
    }

    /// Builds a rigid row-vector view matrix from an orthonormal camera basis
    /// and the camera's world position.
    ///
    /// ```text
    /// | rx  ux  fx  0 |
    /// | ry  uy  fy  0 |
    /// | rz  uz  fz  0 |
    /// | tx  ty  tz  1 |   t = -(right·eye, up·eye, forward·eye)
    /// ```
    #[rustfmt::skip]
    pub fn view_from_basis(right: Vec3, up: Vec3, forward: Vec3, eye: Vec3) -> Matrix4 {
        Matrix4::from_row_major([
            right.x, up.x, forward.x, 0.0,
            right.y, up.y, forward.y, 0.0,
            right.z, up.z, forward.z, 0.0,
            -right.dot(eye), -up.dot(eye), -forward.dot(eye), 1.0,
        ])
    }

    /// Left-handed perspective projection in the row-vector layout.
    ///
    /// ```text
    /// | xS  0   0   0 |
    /// | 0   yS  0   0 |
    /// | 0   0   A   1 |
    /// | 0   0   B   0 |
    /// ```
    #[rustfmt::skip]
    pub fn perspective_lh(x_scale: f32, y_scale: f32, a: f32, b: f32) -> Matrix4 {
        Matrix4::from_row_major([
            x_scale, 0.0,     0.0, 0.0,
            0.0,     y_scale, 0.0, 0.0,
            0.0,     0.0,     a,   1.0,
            0.0,     0.0,     b,   0.0,
        ])
    }

    /// Inverse of a rigid transform (orthonormal rotation + translation).
    ///
    /// The rotation block is transposed and the translation becomes `-t · Rᵀ`.
    pub fn invert_rigid(&self) -> Matrix4 {
        let mut out = Matrix4::IDENTITY;
        for r in 0..3 {
            for c in 0..3 {
                out.set(r, c, self.at(c, r));
            }
        }

        let t = self.translation();
        for c in 0..3 {
            let v = t.x * out.at(0, c) + t.y * out.at(1, c) + t.z * out.at(2, c);
            out.set(3, c, -v);
        }
        out
    }

    /// Inverse of a left-handed perspective projection (see [`Matrix4::perspective_lh`]).
    ///
    /// ```text
    /// | 1/xS  0     0   0    |
    /// | 0     1/yS  0   0    |
    /// | 0     0     0   1/B  |
    /// | 0     0     1   -A/B |
    /// ```
    ///
    /// Returns identity when `xS`, `yS` or `B` is below [`PERSPECTIVE_EPSILON`]:
    /// an identity projection is visually inert.
    pub fn invert_perspective(&self) -> Matrix4 {
        let (xs, ys, a, b) = (self.m[0], self.m[5], self.m[10], self.m[14]);
        if xs.abs() < PERSPECTIVE_EPSILON
            || ys.abs() < PERSPECTIVE_EPSILON
            || b.abs() < PERSPECTIVE_EPSILON
        {
            return Matrix4::IDENTITY;
        }

        let mut out = Matrix4 { m: [0.0; 16] };
        out.set(0, 0, 1.0 / xs);
        out.set(1, 1, 1.0 / ys);
        out.set(2, 3, 1.0 / b);
        out.set(3, 2, 1.0);
        out.set(3, 3, -a / b);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_matrix_eq(a: &Matrix4, b: &Matrix4, eps: f32) {
        for i in 0..16 {
            assert_abs_diff_eq!(a.m[i], b.m[i], epsilon = eps);
        }
    }

    fn sample_view() -> Matrix4 {
        // Yaw 30 degrees, pitch -10 degrees, somewhere off the origin.
        let (sy, cy) = 30f32.to_radians().sin_cos();
        let (sp, cp) = (-10f32).to_radians().sin_cos();
        let forward = Vec3::new(sy * cp, sp, cy * cp).normalize();
        let right = Vec3::Y.cross(forward).normalize();
        let up = forward.cross(right);
        Matrix4::view_from_basis(right, up, forward, Vec3::new(120.0, -45.0, 980.0))
    }

    #[test]
    fn test_multiply_by_identity() {
        let v = sample_view();
        assert_matrix_eq(&v.multiply(&Matrix4::identity()), &v, 1e-6);
        assert_matrix_eq(&Matrix4::identity().multiply(&v), &v, 1e-6);
    }

    #[test]
    fn test_multiply_is_row_major() {
        let a = Matrix4::from_row_major([
            1.0, 2.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        let b = Matrix4::from_row_major([
            1.0, 0.0, 0.0, 0.0, //
            3.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        let c = a.multiply(&b);
        assert_eq!(c.at(0, 0), 7.0);
        assert_eq!(c.at(0, 1), 2.0);
        assert_eq!(c.at(1, 0), 3.0);
    }

    #[test]
    fn test_transpose_swaps_rows_and_columns() {
        let v = sample_view();
        let t = v.transpose();
        assert_eq!(t.at(0, 3), v.at(3, 0));
        assert_eq!(t.at(2, 1), v.at(1, 2));
        assert_eq!(t.transpose(), v);
    }

    #[test]
    fn test_invert_rigid_round_trip() {
        let v = sample_view();
        assert_matrix_eq(&v.invert_rigid().invert_rigid(), &v, 1e-3);
        assert_matrix_eq(&v.multiply(&v.invert_rigid()), &Matrix4::IDENTITY, 1e-4);
    }

    #[test]
    fn test_invert_rigid_recovers_eye() {
        let eye = sample_view().invert_rigid().translation();
        assert_abs_diff_eq!(eye.x, 120.0, epsilon = 1e-3);
        assert_abs_diff_eq!(eye.y, -45.0, epsilon = 1e-3);
        assert_abs_diff_eq!(eye.z, 980.0, epsilon = 1e-2);
    }

    #[test]
    fn test_invert_perspective() {
        let (near, far) = (10.0f32, 100_000.0f32);
        let a = far / (far - near);
        let p = Matrix4::perspective_lh(0.97, 1.73, a, -near * a);
        assert_matrix_eq(&p.multiply(&p.invert_perspective()), &Matrix4::IDENTITY, 1e-5);
        assert_matrix_eq(&p.invert_perspective().multiply(&p), &Matrix4::IDENTITY, 1e-5);
    }

    #[test]
    fn test_invert_perspective_degenerate_is_identity() {
        let p = Matrix4::perspective_lh(0.00005, 1.0, 1.0, -10.0);
        assert_eq!(p.invert_perspective(), Matrix4::IDENTITY);

        let p = Matrix4::perspective_lh(1.0, 1.0, 1.0, 0.0);
        assert_eq!(p.invert_perspective(), Matrix4::IDENTITY);
    }
}
