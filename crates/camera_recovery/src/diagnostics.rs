//! Bounded diagnostic stream used to discover registers and conventions.
//!
//! `DiagnosticLog` is the session-wide line sink. `DiagnosticWindow` is the
//! per-stream bookkeeping that keeps the volume bounded: full candidate detail
//! only for a few frames after the first plausible candidate, then a periodic
//! status line.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::config::DetectorConfig;
use crate::decompose::GameDepth;
use crate::lock::Evidence;
use crate::matrix::Matrix4;
use crate::scorer::Assessment;

/// Append-only, line-oriented diagnostic sink.
///
/// Every line is mirrored to `log::debug!`. A failed write disables the sink;
/// diagnostics never surface errors to the engine.
pub struct DiagnosticLog {
    sink: Option<Box<dyn Write + Send>>,
}

impl fmt::Debug for DiagnosticLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticLog")
            .field("active", &self.sink.is_some())
            .finish()
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::disabled()
    }
}

impl DiagnosticLog {
    /// Lines only reach the `log` facade.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn to_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Some(Box::new(writer)),
        }
    }

    /// Truncates or creates `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::to_writer(BufWriter::new(file)))
    }

    pub fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    pub fn line(&mut self, args: fmt::Arguments<'_>) {
        log::debug!(target: "camera_recovery::diag", "{}", args);

        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let written = writeln!(sink, "{}", args).and_then(|_| sink.flush());
        if let Err(err) = written {
            log::warn!("Diagnostic log write failed, disabling it: {}", err);
            self.sink = None;
        }
    }
}

/// Per-stream limits on what reaches the [`DiagnosticLog`].
#[derive(Debug, Clone)]
pub struct DiagnosticWindow {
    enabled: bool,
    window_frames: u64,
    lines_per_frame: u32,
    world_limit: u32,
    status_interval: u64,

    start_frame: Option<u64>,
    lines_this_frame: u32,
    worlds_logged: u32,
    game_depth_logged: bool,
}

impl DiagnosticWindow {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            enabled: config.enable_logging,
            window_frames: u64::from(config.diagnostic_frames),
            lines_per_frame: config.diagnostic_lines_per_frame,
            world_limit: config.world_log_limit,
            status_interval: config.status_interval_frames,
            start_frame: None,
            lines_this_frame: 0,
            worlds_logged: 0,
            game_depth_logged: false,
        }
    }

    pub fn start_frame(&self) -> Option<u64> {
        self.start_frame
    }

    pub fn in_window(&self, frame: u64) -> bool {
        self.enabled
            && self
                .start_frame
                .is_some_and(|start| frame < start + self.window_frames)
    }

    /// Logs one scored upload. The window opens on the first non-zero score.
    pub fn candidate(
        &mut self,
        log: &mut DiagnosticLog,
        frame: u64,
        register: u32,
        assessment: &Assessment,
    ) {
        if !self.enabled {
            return;
        }
        if assessment.score > 0 && self.start_frame.is_none() {
            self.start_frame = Some(frame);
            log.line(format_args!("=== DIAGNOSTIC START frame {frame} ==="));
        }
        if self.in_window(frame) && self.lines_this_frame < self.lines_per_frame {
            log.line(format_args!(
                "  [c{register}] F{frame} s={} {}",
                assessment.score, assessment.metrics
            ));
            self.lines_this_frame += 1;
        }
    }

    pub fn frame_evidence(
        &mut self,
        log: &mut DiagnosticLog,
        frame: u64,
        best_score: u32,
        scalar: f32,
        evidence: &Evidence,
    ) {
        if self.in_window(frame) {
            log.line(format_args!(
                "  Frame {frame}: bestScore={best_score} scalar={scalar:.1} delta={:.3} consec={}",
                evidence.delta, evidence.consecutive
            ));
        }
    }

    pub fn game_depth(&mut self, log: &mut DiagnosticLog, depth: &GameDepth, x_scale: f32, y_scale: f32) {
        if !self.enabled || self.game_depth_logged {
            return;
        }
        self.game_depth_logged = true;
        log.line(format_args!(
            "GAME PROJ: A={:.4} B={:.2} xS={x_scale:.4} yS={y_scale:.4} (zNear_est={:.1} zFar_est={:.1})",
            depth.a,
            depth.b,
            depth.near_estimate().unwrap_or(0.0),
            depth.far_estimate().unwrap_or(f32::INFINITY),
        ));
    }

    pub fn world(&mut self, log: &mut DiagnosticLog, world: &Matrix4) {
        if !self.enabled || self.worlds_logged >= self.world_limit {
            return;
        }
        let t = world.translation();
        log.line(format_args!(
            "WORLD[{}]: diag=[{:.3},{:.3},{:.3},{:.3}] trans=[{:.1},{:.1},{:.1}]",
            self.worlds_logged,
            world.m[0],
            world.m[5],
            world.m[10],
            world.m[15],
            t.x,
            t.y,
            t.z
        ));
        self.worlds_logged += 1;
    }

    /// Free-form event line (lock, first camera), always written when enabled.
    pub fn event(&self, log: &mut DiagnosticLog, args: fmt::Arguments<'_>) {
        if self.enabled {
            log.line(args);
        }
    }

    /// Whether a status line is due once `presented` frames have completed.
    pub fn is_status_frame(&self, presented: u64) -> bool {
        self.enabled
            && self.status_interval > 0
            && presented > 0
            && presented % self.status_interval == 0
    }

    pub fn end_frame(&mut self) {
        self.lines_this_frame = 0;
    }
}
