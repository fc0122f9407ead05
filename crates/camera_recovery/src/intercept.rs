//! Thin decorator over a rendering device.
//!
//! Only the three calls the engine needs are hooked. Everything else reaches
//! the wrapped device through `Deref`/`DerefMut`.

use std::ops::{Deref, DerefMut};

use crate::session::{Session, StreamId};
use crate::sink::TransformSink;

/// The slice of a rendering device the engine observes and drives.
pub trait ShaderConstantDevice: TransformSink {
    fn set_vertex_shader_constants(&mut self, start_register: u32, values: &[f32]);
    fn begin_scene(&mut self);
    fn present(&mut self);
}

#[derive(Debug)]
pub struct Intercepted<D> {
    inner: D,
    stream: StreamId,
}

impl<D: ShaderConstantDevice> Intercepted<D> {
    /// Attaches a new stream to `session` for `inner`.
    pub fn wrap(session: &mut Session, inner: D) -> Self {
        let stream = session.attach();
        Self { inner, stream }
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    /// The engine sees the upload before the device does, so a World it pushes
    /// is in place for the draw that follows.
    pub fn set_vertex_shader_constants(
        &mut self,
        session: &mut Session,
        start_register: u32,
        values: &[f32],
    ) {
        session.on_constant_upload(self.stream, start_register, values, &mut self.inner);
        self.inner.set_vertex_shader_constants(start_register, values);
    }

    /// Transforms are re-asserted before the device starts the scene.
    pub fn begin_scene(&mut self, session: &mut Session) {
        session.on_scene_begin(self.stream, &mut self.inner);
        self.inner.begin_scene();
    }

    pub fn present(&mut self, session: &mut Session) {
        session.on_frame_boundary(self.stream, &mut self.inner);
        self.inner.present();
    }

    /// Detaches the stream and hands back the device.
    pub fn release(self, session: &mut Session) -> D {
        session.detach(self.stream);
        self.inner
    }
}

impl<D> Deref for Intercepted<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.inner
    }
}

impl<D> DerefMut for Intercepted<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;
    use crate::diagnostics::DiagnosticLog;
    use crate::matrix::Matrix4;
    use crate::synthetic::{view_projection_block, CameraPose};
    use glam::Vec3;

    #[derive(Debug, Default)]
    struct CountingDevice {
        presents: u32,
        transforms: u32,
        calls: Vec<&'static str>,
    }

    impl TransformSink for CountingDevice {
        fn set_view(&mut self, _: &Matrix4) {
            self.transforms += 1;
            self.calls.push("view");
        }
        fn set_projection(&mut self, _: &Matrix4) {
            self.transforms += 1;
            self.calls.push("projection");
        }
        fn set_world(&mut self, _: &Matrix4) {
            self.transforms += 1;
            self.calls.push("world");
        }
    }

    impl ShaderConstantDevice for CountingDevice {
        fn set_vertex_shader_constants(&mut self, _: u32, _: &[f32]) {
            self.calls.push("upload");
        }
        fn begin_scene(&mut self) {
            self.calls.push("begin_scene");
        }
        fn present(&mut self) {
            self.presents += 1;
            self.calls.push("present");
        }
    }

    impl CountingDevice {
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn test_hooks_forward_to_device() {
        let mut session = Session::new(DetectorConfig::default(), DiagnosticLog::disabled());
        let mut device = Intercepted::wrap(&mut session, CountingDevice::default());

        device.begin_scene(&mut session);
        device.set_vertex_shader_constants(&mut session, 0, &[0.0; 16]);
        device.present(&mut session);

        assert_eq!(device.calls, vec!["begin_scene", "upload", "present"]);
        assert_eq!(device.transforms, 0);
        // Unhooked methods pass straight through.
        assert_eq!(device.name(), "counting");
    }

    #[test]
    fn test_scene_transforms_precede_device_begin_scene() {
        let mut session = Session::new(DetectorConfig::default(), DiagnosticLog::disabled());
        let mut device = Intercepted::wrap(&mut session, CountingDevice::default());

        for frame in 0..3 {
            let pose = CameraPose::looking_at(
                Vec3::new(-200.0 + 20.0 * frame as f32, 150.0, 400.0),
                Vec3::ZERO,
            );
            device.set_vertex_shader_constants(&mut session, 0, &view_projection_block(&pose));
            device.present(&mut session);
        }
        assert!(session.detector(device.stream()).unwrap().committed().is_some());

        device.calls.clear();
        device.begin_scene(&mut session);
        assert_eq!(device.calls, vec!["world", "view", "projection", "begin_scene"]);
    }

    #[test]
    fn test_release_detaches() {
        let mut session = Session::new(DetectorConfig::default(), DiagnosticLog::disabled());
        let device = Intercepted::wrap(&mut session, CountingDevice::default());
        let stream = device.stream();
        assert!(session.detector(stream).is_some());

        let inner = device.release(&mut session);
        assert!(session.detector(stream).is_none());
        assert_eq!(inner.presents, 0);
    }
}
