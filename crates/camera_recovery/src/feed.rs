//! Recorded constant-feed events, as written by capture tools and replayed by `camera_replay`.

use serde::{Deserialize, Serialize};

/// One event of a recorded constant feed.
///
/// `stream` is the capture-local index of the wrapped device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    /// A vertex-shader constant write of `values.len() / 4` registers.
    Upload {
        stream: u32,
        start_register: u32,
        values: Vec<f32>,
    },
    BeginScene {
        stream: u32,
    },
    /// Frame boundary.
    Present {
        stream: u32,
    },
    /// The wrapped device was released.
    Release {
        stream: u32,
    },
}

impl FeedEvent {
    pub fn stream(&self) -> u32 {
        match self {
            FeedEvent::Upload { stream, .. }
            | FeedEvent::BeginScene { stream }
            | FeedEvent::Present { stream }
            | FeedEvent::Release { stream } => *stream,
        }
    }
}
