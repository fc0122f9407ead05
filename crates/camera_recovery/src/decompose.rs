//! Factoring a scored candidate into View and Projection.
//!
//! The View is rebuilt as a rigid row-vector transform from the recovered
//! camera basis and eye. The Projection handed downstream is synthetic, with
//! configured near/far planes; the depth mapping the title actually used is
//! kept separately as the game projection so that `VP⁻¹` matches the upload.

use glam::Vec3;
use thiserror::Error;

use crate::convention::{Convention, UploadKind};
use crate::matrix::Matrix4;
use crate::scorer::{depth_row, perspective_row, x_row, y_row};

/// Scale and direction magnitudes below this are treated as degenerate.
pub const DEGENERATE_EPSILON: f32 = 0.001;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum DecomposeError {
    #[error("degenerate projection scale (xS={x_scale}, yS={y_scale})")]
    DegenerateScale { x_scale: f32, y_scale: f32 },
    #[error("degenerate forward direction (|f|={0})")]
    DegenerateForward(f32),
    #[error("degenerate view basis")]
    DegenerateBasis,
}

/// Parameters of the synthetic projection handed to the transform sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticProjection {
    pub z_near: f32,
    pub z_far: f32,
    /// Vertical field of view for view-only uploads, which carry no projection.
    pub fov_y_deg: f32,
    pub aspect: f32,
}

impl SyntheticProjection {
    /// Left-handed `[0, 1]` depth mapping `(A, B)` for the configured planes.
    pub fn depth(&self) -> (f32, f32) {
        let a = self.z_far / (self.z_far - self.z_near);
        (a, -self.z_near * a)
    }

    pub fn matrix(&self, x_scale: f32, y_scale: f32) -> Matrix4 {
        let (a, b) = self.depth();
        Matrix4::perspective_lh(x_scale, y_scale, a, b)
    }

    /// `(xS, yS)` implied by the configured field of view and aspect ratio.
    pub fn scales(&self) -> (f32, f32) {
        let y_scale = 1.0 / (0.5 * self.fov_y_deg.to_radians()).tan();
        (y_scale / self.aspect, y_scale)
    }
}

/// The depth mapping coefficients the title actually used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameDepth {
    pub a: f32,
    pub b: f32,
}

impl GameDepth {
    /// Near plane implied by `A` and `B`, if `A` is usable.
    pub fn near_estimate(&self) -> Option<f32> {
        (self.a.abs() > DEGENERATE_EPSILON).then(|| -self.b / self.a)
    }

    /// Far plane implied by `A` and `B`, if the mapping is not degenerate.
    pub fn far_estimate(&self) -> Option<f32> {
        let near = self.near_estimate()?;
        ((self.a - 1.0).abs() > DEGENERATE_EPSILON).then(|| near * self.a / (self.a - 1.0))
    }
}

/// A successful decomposition, not yet committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposition {
    pub view: Matrix4,
    pub projection: Matrix4,
    pub game_projection: Matrix4,
    pub eye: Vec3,
    pub x_scale: f32,
    pub y_scale: f32,
    /// `None` for view-only uploads.
    pub game_depth: Option<GameDepth>,
}

pub fn decompose(
    canonical: &Matrix4,
    convention: Convention,
    synthetic: &SyntheticProjection,
) -> Result<Decomposition, DecomposeError> {
    match convention.upload {
        UploadKind::ViewProjection => decompose_view_projection(canonical, synthetic),
        UploadKind::ViewOnly => decompose_view(canonical, synthetic),
    }
}

fn decompose_view_projection(
    c: &Matrix4,
    synthetic: &SyntheticProjection,
) -> Result<Decomposition, DecomposeError> {
    let x_scale = x_row(c).length();
    let y_scale = y_row(c).length();
    if x_scale < DEGENERATE_EPSILON || y_scale < DEGENERATE_EPSILON {
        return Err(DecomposeError::DegenerateScale { x_scale, y_scale });
    }

    let forward_len = perspective_row(c).length();
    if forward_len < DEGENERATE_EPSILON {
        return Err(DecomposeError::DegenerateForward(forward_len));
    }

    let right = x_row(c) / x_scale;
    let up = y_row(c) / y_scale;
    let forward = perspective_row(c) / forward_len;

    // The translation column holds each axis' projected dot product with the eye.
    let right_dot_eye = -c.m[12] / x_scale;
    let up_dot_eye = -c.m[13] / y_scale;
    let forward_dot_eye = -c.m[15];
    let eye = right * right_dot_eye + up * up_dot_eye + forward * forward_dot_eye;

    let game_depth = GameDepth {
        a: depth_row(c).length(),
        b: c.m[14] - depth_row(c).length() * c.m[15],
    };

    Ok(Decomposition {
        view: Matrix4::view_from_basis(right, up, forward, eye),
        projection: synthetic.matrix(x_scale, y_scale),
        game_projection: Matrix4::perspective_lh(x_scale, y_scale, game_depth.a, game_depth.b),
        eye,
        x_scale,
        y_scale,
        game_depth: Some(game_depth),
    })
}

fn decompose_view(
    c: &Matrix4,
    synthetic: &SyntheticProjection,
) -> Result<Decomposition, DecomposeError> {
    // Row-vector view: the basis vectors are the columns of the rotation block.
    let axes = [x_row(c), y_row(c), depth_row(c)];
    if axes.iter().any(|axis| axis.length() < DEGENERATE_EPSILON) {
        return Err(DecomposeError::DegenerateBasis);
    }
    let [right, up, forward] = axes.map(Vec3::normalize);

    let t = c.translation();
    let eye = -(right * t.x + up * t.y + forward * t.z);

    let (x_scale, y_scale) = synthetic.scales();
    let projection = synthetic.matrix(x_scale, y_scale);

    Ok(Decomposition {
        view: Matrix4::view_from_basis(right, up, forward, eye),
        projection,
        game_projection: projection,
        eye,
        x_scale,
        y_scale,
        game_depth: None,
    })
}
