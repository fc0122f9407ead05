//! Session context: configuration, diagnostic log and the per-stream detectors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::DetectorConfig;
use crate::detector::CameraDetector;
use crate::diagnostics::DiagnosticLog;
use crate::sink::TransformSink;

/// Identity of one wrapped device within a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u32);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owns everything the engine needs; passed down explicitly to every hook.
///
/// Events for streams that are not attached are ignored.
#[derive(Debug)]
pub struct Session {
    config: Arc<DetectorConfig>,
    log: DiagnosticLog,
    detectors: HashMap<StreamId, CameraDetector>,
    next_id: u32,
}

impl Session {
    pub fn new(config: DetectorConfig, log: DiagnosticLog) -> Self {
        Self {
            config: Arc::new(config),
            log,
            detectors: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Starts tracking a new stream.
    pub fn attach(&mut self) -> StreamId {
        let id = StreamId(self.next_id);
        self.next_id += 1;

        self.detectors
            .insert(id, CameraDetector::new(id, Arc::clone(&self.config)));
        log::info!(
            "Stream {} attached (watching c{}-c{}, {})",
            id,
            self.config.watch_register,
            self.config.watch_register + 3,
            self.config.convention()
        );
        self.log.line(format_args!(
            "=== stream {} attached, convention {} ===",
            id,
            self.config.convention()
        ));
        id
    }

    /// Discards the stream's state. Returns the final detector, if it was attached.
    pub fn detach(&mut self, id: StreamId) -> Option<CameraDetector> {
        let detector = self.detectors.remove(&id)?;
        log::info!(
            "Stream {} detached after {} frames ({})",
            id,
            detector.frame(),
            detector.phase()
        );
        Some(detector)
    }

    pub fn detector(&self, id: StreamId) -> Option<&CameraDetector> {
        self.detectors.get(&id)
    }

    pub fn streams(&self) -> impl Iterator<Item = StreamId> + '_ {
        self.detectors.keys().copied()
    }

    pub fn on_constant_upload<S: TransformSink + ?Sized>(
        &mut self,
        id: StreamId,
        start_register: u32,
        values: &[f32],
        sink: &mut S,
    ) {
        if let Some(detector) = self.detectors.get_mut(&id) {
            detector.on_constant_upload(start_register, values, sink, &mut self.log);
        }
    }

    pub fn on_frame_boundary<S: TransformSink + ?Sized>(&mut self, id: StreamId, sink: &mut S) {
        if let Some(detector) = self.detectors.get_mut(&id) {
            detector.on_frame_boundary(sink, &mut self.log);
        }
    }

    pub fn on_scene_begin<S: TransformSink + ?Sized>(&mut self, id: StreamId, sink: &mut S) {
        if let Some(detector) = self.detectors.get_mut(&id) {
            detector.on_scene_begin(sink);
        }
    }
}
