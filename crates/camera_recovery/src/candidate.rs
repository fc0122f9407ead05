use crate::convention::Convention;
use crate::matrix::Matrix4;

/// Registers in one 4x4 float block.
pub const BLOCK_REGISTERS: u32 = 4;

/// The 16 floats of the watched register window, with provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawConstantBlock {
    pub values: [f32; 16],
    /// First register of the block.
    pub register: u32,
    /// Frame index of the upload.
    pub frame: u64,
    pub upload_start: u32,
    pub upload_count: u32,
}

impl RawConstantBlock {
    /// Cuts the window starting at `register` out of an upload of float4 registers.
    ///
    /// Returns `None` unless the upload covers all four registers of the window.
    /// A trailing partial register in `values` is ignored.
    pub fn extract(start_register: u32, values: &[f32], register: u32, frame: u64) -> Option<Self> {
        let whole = values.len() / 4 * 4;
        let registers: &[[f32; 4]] = bytemuck::cast_slice(&values[..whole]);
        let count = u32::try_from(registers.len()).ok()?;

        let covers = start_register <= register
            && start_register.checked_add(count)? >= register.checked_add(BLOCK_REGISTERS)?;
        if !covers {
            return None;
        }

        let offset = (register - start_register) as usize;
        let window: [[f32; 4]; 4] = registers[offset..offset + 4].try_into().ok()?;

        Some(Self {
            values: bytemuck::cast(window),
            register,
            frame,
            upload_start: start_register,
            upload_count: count,
        })
    }
}

/// A scored block, in the layout its convention canonicalizes to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateMatrix {
    pub block: RawConstantBlock,
    pub canonical: Matrix4,
    pub score: u32,
    pub convention: Convention,
}

impl CandidateMatrix {
    pub fn motion_scalar(&self) -> f32 {
        self.convention.motion_scalar(&self.canonical)
    }
}
