use camera_recovery::{Matrix4, ShaderConstantDevice, TransformCall, TransformSink};

/// Stand-in for a wrapped rendering device during replay.
///
/// Transform calls are queued until the replay loop drains them.
#[derive(Debug)]
pub struct ReplayDevice {
    pub capture_stream: u32,
    pub frame: u64,
    pub uploads: u64,
    queued: Vec<TransformCall>,
}

impl ReplayDevice {
    pub fn new(capture_stream: u32) -> Self {
        Self {
            capture_stream,
            frame: 0,
            uploads: 0,
            queued: Vec::new(),
        }
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, TransformCall> {
        self.queued.drain(..)
    }
}

impl TransformSink for ReplayDevice {
    fn set_view(&mut self, view: &Matrix4) {
        self.queued.push(TransformCall::View(*view));
    }

    fn set_projection(&mut self, projection: &Matrix4) {
        self.queued.push(TransformCall::Projection(*projection));
    }

    fn set_world(&mut self, world: &Matrix4) {
        self.queued.push(TransformCall::World(*world));
    }
}

impl ShaderConstantDevice for ReplayDevice {
    fn set_vertex_shader_constants(&mut self, _start_register: u32, _values: &[f32]) {
        self.uploads += 1;
    }

    fn begin_scene(&mut self) {}

    fn present(&mut self) {
        self.frame += 1;
    }
}
