use anyhow::{Context, Result};
use camera_recovery::{FeedEvent, Intercepted, LockPhase, Session, StreamId, TransformCall};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use crate::device::ReplayDevice;

#[derive(Serialize)]
struct OutputRecord<'a> {
    stream: u32,
    frame: u64,
    #[serde(flatten)]
    call: &'a TransformCall,
}

/// What one capture stream ended up as.
#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub capture_stream: u32,
    pub frames: u64,
    pub uploads: u64,
    pub phase: LockPhase,
    pub commits: u64,
    pub eye: Option<[f32; 3]>,
}

pub struct Replay<'s> {
    session: &'s mut Session,
    devices: BTreeMap<u32, Intercepted<ReplayDevice>>,
    output: Option<Box<dyn Write>>,
    summaries: Vec<StreamSummary>,
    events: u64,
}

impl<'s> Replay<'s> {
    pub fn new(session: &'s mut Session, output: Option<Box<dyn Write>>) -> Self {
        Self {
            session,
            devices: BTreeMap::new(),
            output,
            summaries: Vec::new(),
            events: 0,
        }
    }

    /// Feeds every JSON line of `reader`. Blank lines are skipped.
    pub fn run<R: BufRead>(mut self, reader: R) -> Result<Vec<StreamSummary>> {
        for (index, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("reading capture line {}", index + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let event: FeedEvent = serde_json::from_str(&line)
                .with_context(|| format!("parsing capture line {}", index + 1))?;
            self.apply(event)?;
        }

        let remaining: Vec<u32> = self.devices.keys().copied().collect();
        for capture_stream in remaining {
            self.release(capture_stream);
        }
        if let Some(out) = self.output.as_mut() {
            out.flush().context("flushing transform output")?;
        }
        info!("Replayed {} events", self.events);
        Ok(self.summaries)
    }

    pub fn apply(&mut self, event: FeedEvent) -> Result<()> {
        self.events += 1;
        let capture_stream = event.stream();

        if let FeedEvent::Release { .. } = event {
            if !self.release(capture_stream) {
                warn!("Release of unknown capture stream {}", capture_stream);
            }
            return Ok(());
        }

        let session = &mut *self.session;
        let device = self
            .devices
            .entry(capture_stream)
            .or_insert_with(|| Intercepted::wrap(session, ReplayDevice::new(capture_stream)));

        match event {
            FeedEvent::Upload {
                start_register,
                values,
                ..
            } => device.set_vertex_shader_constants(session, start_register, &values),
            FeedEvent::BeginScene { .. } => device.begin_scene(session),
            FeedEvent::Present { .. } => device.present(session),
            FeedEvent::Release { .. } => {}
        }

        let frame = device.frame;
        if let Some(out) = self.output.as_mut() {
            for call in device.drain() {
                let record = OutputRecord {
                    stream: capture_stream,
                    frame,
                    call: &call,
                };
                serde_json::to_writer(&mut *out, &record).context("writing transform output")?;
                out.write_all(b"\n").context("writing transform output")?;
            }
        } else {
            device.drain();
        }
        Ok(())
    }

    fn release(&mut self, capture_stream: u32) -> bool {
        let Some(device) = self.devices.remove(&capture_stream) else {
            return false;
        };
        let summary = summarize(self.session, device.stream(), &device);
        info!(
            "Capture stream {}: {} frames, {} uploads, {}, {} commits, eye {}",
            summary.capture_stream,
            summary.frames,
            summary.uploads,
            summary.phase,
            summary.commits,
            summary
                .eye
                .map(|e| format!("({:.1}, {:.1}, {:.1})", e[0], e[1], e[2]))
                .unwrap_or_else(|| "unknown".to_string())
        );
        self.summaries.push(summary);
        device.release(self.session);
        true
    }
}

fn summarize(session: &Session, id: StreamId, device: &ReplayDevice) -> StreamSummary {
    let detector = session.detector(id);
    StreamSummary {
        capture_stream: device.capture_stream,
        frames: device.frame,
        uploads: device.uploads,
        phase: detector.map_or(LockPhase::Scanning, |d| d.phase()),
        commits: detector.map_or(0, |d| d.commits()),
        eye: detector
            .and_then(|d| d.committed())
            .map(|camera| camera.eye().to_array()),
    }
}
