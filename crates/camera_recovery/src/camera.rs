use glam::Vec3;

use crate::decompose::Decomposition;
use crate::matrix::Matrix4;

/// The camera currently exposed to the transform pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecomposedCamera {
    /// Rigid world → camera transform (row-vector).
    pub view: Matrix4,
    /// Synthetic projection with the configured depth range.
    pub projection: Matrix4,
    /// Projection with the title's own depth coefficients.
    pub game_projection: Matrix4,
    /// `(View · GameProjection)⁻¹`, kept in sync with `view` and `game_projection`.
    view_projection_inverse: Matrix4,
}

impl DecomposedCamera {
    pub fn new(decomposition: &Decomposition) -> Self {
        let mut camera = Self {
            view: decomposition.view,
            projection: decomposition.projection,
            game_projection: decomposition.game_projection,
            view_projection_inverse: Matrix4::IDENTITY,
        };
        camera.refresh_inverse();
        camera
    }

    /// Inverted as `P⁻¹ · V⁻¹` from the closed forms, never as a general 4x4.
    fn refresh_inverse(&mut self) {
        let projection_inverse = self.game_projection.invert_perspective();
        let view_inverse = self.view.invert_rigid();
        self.view_projection_inverse = projection_inverse.multiply(&view_inverse);
    }

    pub fn view_projection_inverse(&self) -> &Matrix4 {
        &self.view_projection_inverse
    }

    /// Camera position in world space.
    pub fn eye(&self) -> Vec3 {
        self.view.invert_rigid().translation()
    }

    /// World matrix of a draw whose canonical `W · V · P` block was uploaded.
    pub fn world_from_block(&self, canonical: &Matrix4) -> Matrix4 {
        canonical.multiply(&self.view_projection_inverse)
    }
}
