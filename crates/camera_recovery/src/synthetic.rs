//! Ideal camera data for tests and capture synthesis.
//!
//! Matrices are built with glam in the column-vector convention
//! (`clip = P · V · W · v`) and uploaded column-major, the way UE3 titles do.

use glam::{Mat4, Vec3};

use crate::feed::FeedEvent;
use crate::matrix::Matrix4;

/// A left-handed perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl CameraPose {
    /// 75 degree vertical FOV, 16:9, with a depth range unlike the detector defaults.
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        Self {
            eye,
            target,
            fov_y_deg: 75.0,
            aspect: 16.0 / 9.0,
            z_near: 5.0,
            z_far: 20_000.0,
        }
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize()
    }

    pub fn right(&self) -> Vec3 {
        Vec3::Y.cross(self.forward()).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.forward().cross(self.right())
    }

    pub fn view_cv(&self) -> Mat4 {
        Mat4::look_at_lh(self.eye, self.target, Vec3::Y)
    }

    pub fn projection_cv(&self) -> Mat4 {
        Mat4::perspective_lh(
            self.fov_y_deg.to_radians(),
            self.aspect,
            self.z_near,
            self.z_far,
        )
    }

    /// Row-vector view matrix, as the detector emits it.
    pub fn view_matrix(&self) -> Matrix4 {
        Matrix4::from_row_major(self.view_cv().to_cols_array())
    }

    /// `(xS, yS)` of the projection.
    pub fn scales(&self) -> (f32, f32) {
        let p = self.projection_cv();
        (p.x_axis.x, p.y_axis.y)
    }
}

/// Column-major `P · V` upload.
pub fn view_projection_block(pose: &CameraPose) -> [f32; 16] {
    (pose.projection_cv() * pose.view_cv()).to_cols_array()
}

/// Column-major `P · V · W` upload for one draw.
pub fn model_view_projection_block(pose: &CameraPose, world: Mat4) -> [f32; 16] {
    (pose.projection_cv() * pose.view_cv() * world).to_cols_array()
}

/// Column-major 2D orthographic upload, as a UI pass would write it.
#[rustfmt::skip]
pub fn ui_block(width: f32, height: f32) -> [f32; 16] {
    [
        2.0 / width, 0.0,           0.0, 0.0,
        0.0,         -2.0 / height, 0.0, 0.0,
        0.0,         0.0,           1.0, 0.0,
        -1.0,        1.0,           0.0, 1.0,
    ]
}

/// Deterministic multi-frame capture of a camera orbiting an off-origin point.
///
/// Every frame writes, at register 0 of stream 0: a UI block, a scaled-down
/// shadow-pass VP (scores below the main camera), the main camera VP with an
/// identity World, then `draws_per_frame` translated-object MVPs.
#[derive(Debug, Clone)]
pub struct OrbitCapture {
    pub frames: u32,
    pub draws_per_frame: u32,
    pub center: Vec3,
    pub radius: f32,
    pub height: f32,
    /// Orbit step per frame, radians.
    pub step: f32,
}

impl Default for OrbitCapture {
    fn default() -> Self {
        Self {
            frames: 120,
            draws_per_frame: 3,
            center: Vec3::new(400.0, 0.0, -250.0),
            radius: 600.0,
            height: 180.0,
            step: 0.02,
        }
    }
}

impl OrbitCapture {
    pub fn pose(&self, frame: u32) -> CameraPose {
        let theta = frame as f32 * self.step;
        let (s, c) = theta.sin_cos();
        let eye = self.center + Vec3::new(self.radius * c, self.height, self.radius * s);
        CameraPose::looking_at(eye, self.center)
    }

    /// World transform of draw `index` (1-based; draw 0 is the identity-World pass).
    pub fn draw_world(&self, index: u32) -> Mat4 {
        Mat4::from_translation(Vec3::new(35.0 * index as f32, 0.0, -20.0 * index as f32))
    }

    fn shadow_pose(&self, frame: u32) -> CameraPose {
        let eye = self.center + Vec3::new(-900.0, 1500.0, 300.0 + frame as f32);
        CameraPose::looking_at(eye, self.center)
    }

    pub fn events(&self) -> Vec<FeedEvent> {
        let upload = |values: [f32; 16]| FeedEvent::Upload {
            stream: 0,
            start_register: 0,
            values: values.to_vec(),
        };

        let mut events = Vec::new();
        for frame in 0..self.frames {
            let pose = self.pose(frame);

            events.push(FeedEvent::BeginScene { stream: 0 });
            events.push(upload(ui_block(1920.0, 1080.0)));

            let shadow = view_projection_block(&self.shadow_pose(frame)).map(|v| v * 0.9);
            events.push(upload(shadow));

            events.push(upload(view_projection_block(&pose)));
            for draw in 1..=self.draws_per_frame {
                events.push(upload(model_view_projection_block(
                    &pose,
                    self.draw_world(draw),
                )));
            }

            events.push(FeedEvent::Present { stream: 0 });
        }
        events
    }
}
