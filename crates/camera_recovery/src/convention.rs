//! How a title lays out its camera constants in the register file.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::matrix::Matrix4;

/// Memory order of the 16 floats in the watched register window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageOrder {
    /// Each register holds a column of the column-vector matrix (UE3 style).
    ColumnMajor,
    /// Each register holds a row of the column-vector matrix.
    RowMajor,
}

/// What the watched register window carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    /// A composed `Projection · View` (possibly with a World folded in per draw).
    ViewProjection,
    /// The view matrix alone, at a fixed known register.
    ViewOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Convention {
    pub storage: StorageOrder,
    pub upload: UploadKind,
}

impl Default for Convention {
    fn default() -> Self {
        Self::COLUMN_MAJOR_VP
    }
}

impl Convention {
    pub const COLUMN_MAJOR_VP: Convention = Convention {
        storage: StorageOrder::ColumnMajor,
        upload: UploadKind::ViewProjection,
    };

    pub const fn new(storage: StorageOrder, upload: UploadKind) -> Self {
        Self { storage, upload }
    }

    /// Rearranges a raw block so that index `c * 4 + r` holds element `(r, c)`
    /// of the column-vector matrix.
    ///
    /// Read as a row-major [`Matrix4`], the canonical block is the row-vector
    /// form of the same transform.
    pub fn canonicalize(&self, raw: &[f32; 16]) -> Matrix4 {
        let block = Matrix4::from_row_major(*raw);
        match self.storage {
            StorageOrder::ColumnMajor => block,
            StorageOrder::RowMajor => block.transpose(),
        }
    }

    /// The scalar whose frame-to-frame change is taken as camera motion.
    ///
    /// `-dot(forward, eye)` for view-projection uploads, view translation z for
    /// view-only uploads.
    pub fn motion_scalar(&self, canonical: &Matrix4) -> f32 {
        match self.upload {
            UploadKind::ViewProjection => canonical.m[15],
            UploadKind::ViewOnly => canonical.m[14],
        }
    }

    /// Per-draw World matrices can only be recovered from composed uploads.
    pub fn supports_world(&self) -> bool {
        self.upload == UploadKind::ViewProjection
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = match self.storage {
            StorageOrder::ColumnMajor => "col-major",
            StorageOrder::RowMajor => "row-major",
        };
        let upload = match self.upload {
            UploadKind::ViewProjection => "VP",
            UploadKind::ViewOnly => "V",
        };
        write!(f, "{storage} {upload}")
    }
}
