//! camera_recovery: recovers a 3D camera from unlabeled shader-constant uploads.
//!
//! Data flow per wrapped device (one [`session::StreamId`]):
//!
//!   upload  -> extract watched 4-register window -> canonicalize -> score
//!           -> offer to the frame's best (strictly higher score wins)
//!           -> when locked: World = block · (View · GameProjection)⁻¹, pushed now
//!   present -> scanning: motion evidence from the best block, lock after N frames
//!           -> locked: decompose the best block, commit once, push View/Projection
//!
//! Matrices handed to a [`sink::TransformSink`] are row-major, row-vector
//! (`v' = v · M`), left-handed, `[0, 1]` depth.
//!
//! Nothing here panics or returns errors from the event entry points. Rejected
//! candidates score 0, degenerate decompositions keep the last good camera, and
//! non-finite blocks never reach committed state.

pub mod camera;
pub mod candidate;
pub mod config;
pub mod convention;
pub mod decompose;
pub mod detector;
pub mod diagnostics;
pub mod feed;
pub mod intercept;
pub mod lock;
pub mod matrix;
pub mod scorer;
pub mod session;
pub mod sink;
pub mod sync;
pub mod synthetic;

pub use camera::DecomposedCamera;
pub use config::{ConfigError, DetectorConfig, DEFAULT_CONFIG_FILE};
pub use convention::{Convention, StorageOrder, UploadKind};
pub use decompose::{decompose, DecomposeError, Decomposition};
pub use detector::CameraDetector;
pub use diagnostics::DiagnosticLog;
pub use feed::FeedEvent;
pub use intercept::{Intercepted, ShaderConstantDevice};
pub use lock::LockPhase;
pub use matrix::Matrix4;
pub use scorer::{assess, score, MAX_SCORE};
pub use session::{Session, StreamId};
pub use sink::{TransformCall, TransformRecorder, TransformSink};
