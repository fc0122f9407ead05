//! Per-stream engine: scoring, lock evidence, decomposition and commit.

use std::sync::Arc;

use crate::camera::DecomposedCamera;
use crate::candidate::{CandidateMatrix, RawConstantBlock};
use crate::config::DetectorConfig;
use crate::convention::Convention;
use crate::decompose::{decompose, SyntheticProjection};
use crate::diagnostics::{DiagnosticLog, DiagnosticWindow};
use crate::lock::{LockPhase, LockTracker};
use crate::matrix::Matrix4;
use crate::scorer;
use crate::session::StreamId;
use crate::sink::TransformSink;
use crate::sync::FrameSynchronizer;

/// State of one camera stream, from the wrapping of its device to its release.
#[derive(Debug)]
pub struct CameraDetector {
    id: StreamId,
    config: Arc<DetectorConfig>,
    convention: Convention,
    synthetic: SyntheticProjection,
    lock: LockTracker,
    sync: FrameSynchronizer,
    window: DiagnosticWindow,
    frame: u64,
    commits: u64,
}

impl CameraDetector {
    pub fn new(id: StreamId, config: Arc<DetectorConfig>) -> Self {
        Self {
            id,
            convention: config.convention(),
            synthetic: config.synthetic_projection(),
            lock: LockTracker::new(config.motion_threshold, config.lock_frames),
            sync: FrameSynchronizer::new(),
            window: DiagnosticWindow::new(&config),
            frame: 0,
            commits: 0,
            config,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn phase(&self) -> LockPhase {
        self.lock.phase()
    }

    /// Frames completed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn committed(&self) -> Option<&DecomposedCamera> {
        self.sync.committed()
    }

    /// Number of frames that committed a new camera.
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// One shader-constant write of `values.len() / 4` registers from `start_register`.
    pub fn on_constant_upload<S: TransformSink + ?Sized>(
        &mut self,
        start_register: u32,
        values: &[f32],
        sink: &mut S,
        log: &mut DiagnosticLog,
    ) {
        let Some(block) = RawConstantBlock::extract(
            start_register,
            values,
            self.config.watch_register,
            self.frame,
        ) else {
            return;
        };

        let canonical = self.convention.canonicalize(&block.values);
        let assessment = scorer::assess(&canonical, self.convention);
        self.window
            .candidate(log, self.frame, block.register, &assessment);

        if assessment.score >= self.config.candidate_score_threshold && assessment.score > 0 {
            self.sync.offer(CandidateMatrix {
                block,
                canonical,
                score: assessment.score,
                convention: self.convention,
            });
        }

        if self.lock.is_locked() && self.convention.supports_world() {
            self.push_world(&canonical, sink, log);
        }
    }

    fn push_world<S: TransformSink + ?Sized>(
        &mut self,
        canonical: &Matrix4,
        sink: &mut S,
        log: &mut DiagnosticLog,
    ) {
        let Some(camera) = self.sync.committed() else {
            return;
        };
        if !canonical.is_finite() {
            return;
        }

        let world = if self.config.is_secondary_pass(canonical.m[14]) {
            Matrix4::IDENTITY
        } else {
            camera.world_from_block(canonical)
        };
        if !world.is_finite() {
            return;
        }
        sink.set_world(&world);
        self.window.world(log, &world);
    }

    /// Frame boundary: lock evidence, decomposition of the frame's winner, commit.
    pub fn on_frame_boundary<S: TransformSink + ?Sized>(
        &mut self,
        sink: &mut S,
        log: &mut DiagnosticLog,
    ) {
        let best = self.sync.best().copied();

        if let Some(best) = best {
            let mut decompose_best = false;
            if self.lock.is_locked() {
                decompose_best = best.score >= self.config.commit_score_threshold;
            } else {
                let scalar = best.motion_scalar();
                let evidence = self.lock.observe(scalar);
                self.window
                    .frame_evidence(log, self.frame, best.score, scalar, &evidence);
                if evidence.locked_now {
                    log::info!(
                        "Stream {} locked at frame {} after {} moving frames ({})",
                        self.id,
                        self.frame,
                        evidence.consecutive,
                        self.convention
                    );
                    self.window.event(
                        log,
                        format_args!(
                            ">>> LOCKED at frame {} ({}) score={}",
                            self.frame, self.convention, best.score
                        ),
                    );
                    decompose_best = true;
                }
            }

            if decompose_best {
                self.stage(&best, log);
            }
        }

        let frame = self.frame;
        if let Some(camera) = self.sync.end_frame(self.lock.is_locked()) {
            sink.set_view(&camera.view);
            sink.set_projection(&camera.projection);

            self.commits += 1;
            if self.commits == 1 {
                let eye = camera.eye();
                log::info!(
                    "Stream {} first camera at frame {}: eye=({:.1}, {:.1}, {:.1})",
                    self.id,
                    frame,
                    eye.x,
                    eye.y,
                    eye.z
                );
                self.window.event(
                    log,
                    format_args!(
                        ">>> CAMERA frame {frame} eye=({:.1},{:.1},{:.1})",
                        eye.x, eye.y, eye.z
                    ),
                );
            }
        }

        let presented = frame + 1;
        if self.window.is_status_frame(presented) {
            self.window.event(
                log,
                format_args!(
                    "[STATUS] frame {} {} consec={} commits={}",
                    presented,
                    self.lock.phase(),
                    self.lock.consecutive(),
                    self.commits
                ),
            );
        }

        self.window.end_frame();
        self.frame += 1;
    }

    fn stage(&mut self, best: &CandidateMatrix, log: &mut DiagnosticLog) {
        match decompose(&best.canonical, self.convention, &self.synthetic) {
            Ok(decomposition) => {
                if let Some(depth) = decomposition.game_depth {
                    self.window.game_depth(
                        log,
                        &depth,
                        decomposition.x_scale,
                        decomposition.y_scale,
                    );
                }
                self.sync.stage(decomposition);
            }
            Err(err) => {
                log::debug!(
                    "Stream {} frame {}: keeping previous camera: {}",
                    self.id,
                    self.frame,
                    err
                );
            }
        }
    }

    /// Start of a scene: re-asserts the committed camera with an identity World.
    pub fn on_scene_begin<S: TransformSink + ?Sized>(&mut self, sink: &mut S) {
        if let Some(camera) = self.sync.committed() {
            sink.set_world(&Matrix4::IDENTITY);
            sink.set_view(&camera.view);
            sink.set_projection(&camera.projection);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{TransformCall, TransformRecorder};
    use crate::synthetic::{model_view_projection_block, view_projection_block, CameraPose};
    use approx::assert_abs_diff_eq;
    use glam::{Mat4, Vec3};

    #[derive(Clone, Default)]
    struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn status_lines(&self) -> usize {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .filter(|l| l.starts_with("[STATUS]"))
                .count()
        }
    }

    fn detector() -> CameraDetector {
        CameraDetector::new(StreamId(0), Arc::new(DetectorConfig::default()))
    }

    fn pose(frame: u32) -> CameraPose {
        CameraPose::looking_at(
            Vec3::new(100.0 + 10.0 * frame as f32, 200.0, 300.0),
            Vec3::new(0.0, 100.0, 0.0),
        )
    }

    fn run_frame(
        detector: &mut CameraDetector,
        uploads: &[[f32; 16]],
        sink: &mut TransformRecorder,
        log: &mut DiagnosticLog,
    ) {
        for values in uploads {
            detector.on_constant_upload(0, values, sink, log);
        }
        detector.on_frame_boundary(sink, log);
    }

    #[test]
    fn test_scanning_pushes_nothing() {
        let mut detector = detector();
        let mut sink = TransformRecorder::new();
        let mut log = DiagnosticLog::disabled();

        run_frame(&mut detector, &[view_projection_block(&pose(0))], &mut sink, &mut log);
        run_frame(&mut detector, &[view_projection_block(&pose(1))], &mut sink, &mut log);

        assert_eq!(detector.phase(), LockPhase::Scanning);
        assert!(sink.calls.is_empty());
        assert!(detector.committed().is_none());
    }

    #[test]
    fn test_locks_and_seeds_on_third_moving_frame() {
        let mut detector = detector();
        let mut sink = TransformRecorder::new();
        let mut log = DiagnosticLog::disabled();

        for frame in 0..3 {
            run_frame(
                &mut detector,
                &[view_projection_block(&pose(frame))],
                &mut sink,
                &mut log,
            );
        }

        assert_eq!(detector.phase(), LockPhase::Locked);
        assert_eq!(detector.commits(), 1);
        let eye = detector.committed().unwrap().eye();
        assert_abs_diff_eq!(eye.x, 120.0, epsilon = 1e-2);
        assert_abs_diff_eq!(eye.y, 200.0, epsilon = 1e-2);
        assert_eq!(
            sink.calls.iter().filter(|c| matches!(c, TransformCall::View(_))).count(),
            1
        );
    }

    #[test]
    fn test_static_camera_never_locks() {
        let mut detector = detector();
        let mut sink = TransformRecorder::new();
        let mut log = DiagnosticLog::disabled();
        let block = view_projection_block(&pose(0));

        for _ in 0..20 {
            run_frame(&mut detector, &[block], &mut sink, &mut log);
        }
        // The first frame moves away from the initial 0.0 and counts once.
        assert_eq!(detector.phase(), LockPhase::Scanning);
        assert_eq!(detector.frame(), 20);
    }

    #[test]
    fn test_world_pushed_after_lock() {
        let mut detector = detector();
        let mut sink = TransformRecorder::new();
        let mut log = DiagnosticLog::disabled();
        for frame in 0..3 {
            run_frame(
                &mut detector,
                &[view_projection_block(&pose(frame))],
                &mut sink,
                &mut log,
            );
        }
        sink.clear();

        let world = Mat4::from_translation(Vec3::new(40.0, 0.0, -15.0));
        let block = model_view_projection_block(&pose(2), world);
        detector.on_constant_upload(0, &block, &mut sink, &mut log);

        let pushed: Vec<_> = sink.worlds().copied().collect();
        assert_eq!(pushed.len(), 1);
        let t = pushed[0].translation();
        assert_abs_diff_eq!(t.x, 40.0, epsilon = 0.1);
        assert_abs_diff_eq!(t.z, -15.0, epsilon = 0.1);
    }

    #[test]
    fn test_secondary_pass_gets_identity_world() {
        let mut detector = detector();
        let mut sink = TransformRecorder::new();
        let mut log = DiagnosticLog::disabled();
        for frame in 0..3 {
            run_frame(
                &mut detector,
                &[view_projection_block(&pose(frame))],
                &mut sink,
                &mut log,
            );
        }
        sink.clear();

        let mut block = view_projection_block(&pose(2));
        block[14] = 0.25;
        detector.on_constant_upload(0, &block, &mut sink, &mut log);
        assert_eq!(sink.calls, vec![TransformCall::World(Matrix4::IDENTITY)]);
    }

    #[test]
    fn test_non_finite_upload_pushes_no_world() {
        let mut detector = detector();
        let mut sink = TransformRecorder::new();
        let mut log = DiagnosticLog::disabled();
        for frame in 0..3 {
            run_frame(
                &mut detector,
                &[view_projection_block(&pose(frame))],
                &mut sink,
                &mut log,
            );
        }
        sink.clear();

        let mut block = view_projection_block(&pose(2));
        block[5] = f32::NAN;
        detector.on_constant_upload(0, &block, &mut sink, &mut log);
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_uploads_outside_watch_window_ignored() {
        let mut detector = CameraDetector::new(
            StreamId(1),
            Arc::new(DetectorConfig {
                watch_register: 4,
                ..Default::default()
            }),
        );
        let mut sink = TransformRecorder::new();
        let mut log = DiagnosticLog::disabled();
        for frame in 0..5 {
            run_frame(
                &mut detector,
                &[view_projection_block(&pose(frame))],
                &mut sink,
                &mut log,
            );
        }
        assert_eq!(detector.phase(), LockPhase::Scanning);
    }

    #[test]
    fn test_scene_begin_reasserts_camera() {
        let mut detector = detector();
        let mut sink = TransformRecorder::new();
        let mut log = DiagnosticLog::disabled();

        detector.on_scene_begin(&mut sink);
        assert!(sink.calls.is_empty());

        for frame in 0..3 {
            run_frame(
                &mut detector,
                &[view_projection_block(&pose(frame))],
                &mut sink,
                &mut log,
            );
        }
        sink.clear();
        detector.on_scene_begin(&mut sink);

        let camera = *detector.committed().unwrap();
        assert_eq!(
            sink.calls,
            vec![
                TransformCall::World(Matrix4::IDENTITY),
                TransformCall::View(camera.view),
                TransformCall::Projection(camera.projection),
            ]
        );
    }

    #[test]
    fn test_low_score_best_not_committed_when_locked() {
        let mut detector = CameraDetector::new(
            StreamId(0),
            Arc::new(DetectorConfig {
                commit_score_threshold: 14,
                ..Default::default()
            }),
        );
        let mut sink = TransformRecorder::new();
        let mut log = DiagnosticLog::disabled();
        for frame in 0..3 {
            run_frame(
                &mut detector,
                &[view_projection_block(&pose(frame))],
                &mut sink,
                &mut log,
            );
        }
        let seeded = *detector.committed().unwrap();

        // Perspective row at 0.9 drops the unit bonus.
        let shadow = view_projection_block(&pose(9)).map(|v| v * 0.9);
        run_frame(&mut detector, &[shadow], &mut sink, &mut log);
        assert_eq!(detector.committed(), Some(&seeded));
        assert_eq!(detector.commits(), 1);
    }

    #[test]
    fn test_status_line_after_full_interval() {
        let mut detector = CameraDetector::new(
            StreamId(0),
            Arc::new(DetectorConfig {
                status_interval_frames: 3,
                ..Default::default()
            }),
        );
        let buf = SharedBuf::default();
        let mut log = DiagnosticLog::to_writer(buf.clone());
        let mut sink = TransformRecorder::new();

        run_frame(&mut detector, &[], &mut sink, &mut log);
        run_frame(&mut detector, &[], &mut sink, &mut log);
        assert_eq!(buf.status_lines(), 0);

        run_frame(&mut detector, &[], &mut sink, &mut log);
        assert_eq!(buf.status_lines(), 1);

        for _ in 0..3 {
            run_frame(&mut detector, &[], &mut sink, &mut log);
        }
        assert_eq!(buf.status_lines(), 2);
    }
}
