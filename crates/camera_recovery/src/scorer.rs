//! Structural scoring of candidate constant blocks.
//!
//! Canonical view-projection layout (column-vector `VP = Projection · View`,
//! index `c * 4 + r` holds element `(r, c)`):
//!
//! - `{[0], [4], [8]}`  = xS · right, `[12]` = -xS · dot(right, eye)
//! - `{[1], [5], [9]}`  = yS · up,    `[13]` = -yS · dot(up, eye)
//! - `{[2], [6], [10]}` = A · forward, `[14]` = -A · dot(forward, eye) + B
//! - `{[3], [7], [11]}` = forward ("perspective row"), `[15]` = -dot(forward, eye)

use glam::Vec3;
use std::fmt;

use crate::convention::{Convention, UploadKind};
use crate::matrix::Matrix4;

pub const PERSPECTIVE_ROW_MIN: f32 = 0.8;
pub const PERSPECTIVE_ROW_MAX: f32 = 1.2;
pub const UNIT_TOLERANCE: f32 = 0.05;
pub const SCALE_MIN: f32 = 0.3;
pub const SCALE_MAX: f32 = 5.0;
pub const DISTANCE_MIN: f32 = 10.0;

pub const PERSPECTIVE_ROW_POINTS: u32 = 5;
pub const UNIT_BONUS_POINTS: u32 = 3;
pub const SCALE_POINTS: u32 = 2;
pub const DISTANCE_POINTS: u32 = 2;

/// Highest score any block can reach.
pub const MAX_SCORE: u32 =
    PERSPECTIVE_ROW_POINTS + UNIT_BONUS_POINTS + 2 * SCALE_POINTS + DISTANCE_POINTS;

/// View-only gate: rotation rows within this fraction of unit length.
pub const VIEW_ROW_TOLERANCE: f32 = 0.15;
/// View-only gate: homogeneous column within this of `(0, 0, 0, 1)`.
pub const VIEW_W_TOLERANCE: f32 = 0.01;

/// Quantities measured while scoring; kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metrics {
    /// At least one value was NaN or infinite.
    NonFinite,
    ViewProjection {
        perspective_row: f32,
        x_scale: f32,
        y_scale: f32,
        distance: f32,
        translation: Vec3,
    },
    View {
        row_lengths: [f32; 3],
        w: [f32; 4],
        translation: Vec3,
    },
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metrics::NonFinite => f.write_str("non-finite"),
            Metrics::ViewProjection {
                perspective_row,
                x_scale,
                y_scale,
                distance,
                translation: t,
            } => write!(
                f,
                "prMag={perspective_row:.3} xS={x_scale:.3} yS={y_scale:.3} f15={distance:.1} \
                 t=[{:.1},{:.1},{:.1}]",
                t.x, t.y, t.z
            ),
            Metrics::View {
                row_lengths: r,
                w,
                translation: t,
            } => write!(
                f,
                "rows=[{:.3},{:.3},{:.3}] w=[{:.3},{:.3},{:.3},{:.3}] trans=[{:.1},{:.1},{:.1}]",
                r[0], r[1], r[2], w[0], w[1], w[2], w[3], t.x, t.y, t.z
            ),
        }
    }
}

/// Score plus the measurements behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub score: u32,
    pub metrics: Metrics,
}

#[inline]
pub(crate) fn x_row(c: &Matrix4) -> Vec3 {
    Vec3::new(c.m[0], c.m[4], c.m[8])
}

#[inline]
pub(crate) fn y_row(c: &Matrix4) -> Vec3 {
    Vec3::new(c.m[1], c.m[5], c.m[9])
}

#[inline]
pub(crate) fn depth_row(c: &Matrix4) -> Vec3 {
    Vec3::new(c.m[2], c.m[6], c.m[10])
}

#[inline]
pub(crate) fn perspective_row(c: &Matrix4) -> Vec3 {
    Vec3::new(c.m[3], c.m[7], c.m[11])
}

/// Confidence that `canonical` is a genuine camera matrix under `convention`.
///
/// Pure and deterministic; 0 means rejected.
pub fn score(canonical: &Matrix4, convention: Convention) -> u32 {
    assess(canonical, convention).score
}

pub fn assess(canonical: &Matrix4, convention: Convention) -> Assessment {
    if !canonical.is_finite() {
        return Assessment {
            score: 0,
            metrics: Metrics::NonFinite,
        };
    }

    match convention.upload {
        UploadKind::ViewProjection => assess_view_projection(canonical),
        UploadKind::ViewOnly => assess_view(canonical),
    }
}

fn assess_view_projection(c: &Matrix4) -> Assessment {
    let perspective_row = perspective_row(c).length();
    let x_scale = x_row(c).length();
    let y_scale = y_row(c).length();
    let distance = c.m[15];
    let metrics = Metrics::ViewProjection {
        perspective_row,
        x_scale,
        y_scale,
        distance,
        translation: Vec3::new(c.m[12], c.m[13], c.m[14]),
    };
    let reject = Assessment { score: 0, metrics };

    // Hard gate: with an identity World the perspective row is the unit forward vector.
    if !(PERSPECTIVE_ROW_MIN..=PERSPECTIVE_ROW_MAX).contains(&perspective_row) {
        return reject;
    }
    let mut score = PERSPECTIVE_ROW_POINTS;
    if (perspective_row - 1.0).abs() < UNIT_TOLERANCE {
        score += UNIT_BONUS_POINTS;
    }

    for scale in [x_scale, y_scale] {
        if !(SCALE_MIN..=SCALE_MAX).contains(&scale) {
            return reject;
        }
        score += SCALE_POINTS;
    }

    if distance.abs() > DISTANCE_MIN {
        score += DISTANCE_POINTS;
    }

    Assessment { score, metrics }
}

fn assess_view(c: &Matrix4) -> Assessment {
    let row_lengths = [0, 1, 2].map(|r| Vec3::new(c.at(r, 0), c.at(r, 1), c.at(r, 2)).length());
    let w = [c.m[3], c.m[7], c.m[11], c.m[15]];
    let metrics = Metrics::View {
        row_lengths,
        w,
        translation: c.translation(),
    };

    let rows_ok = row_lengths
        .iter()
        .all(|len| (len - 1.0).abs() <= VIEW_ROW_TOLERANCE);
    let w_ok = w
        .iter()
        .zip([0.0, 0.0, 0.0, 1.0])
        .all(|(v, expected)| (v - expected).abs() <= VIEW_W_TOLERANCE);

    Assessment {
        score: if rows_ok && w_ok { MAX_SCORE } else { 0 },
        metrics,
    }
}
