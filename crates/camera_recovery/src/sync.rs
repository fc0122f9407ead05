//! Once-per-frame commit of the winning candidate.
//!
//! Only the highest-scoring candidate of a frame is ever decomposed, so shadow
//! maps, reflections and secondary viewports drawn in the same frame cannot
//! make the visible camera jitter.

use crate::camera::DecomposedCamera;
use crate::candidate::CandidateMatrix;
use crate::decompose::Decomposition;

#[derive(Debug, Clone, Default)]
pub struct FrameSynchronizer {
    best: Option<CandidateMatrix>,
    pending: Option<Decomposition>,
    committed: Option<DecomposedCamera>,
}

impl FrameSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `candidate` if it beats the frame's best so far; ties keep the earlier one.
    pub fn offer(&mut self, candidate: CandidateMatrix) -> bool {
        let better = self
            .best
            .as_ref()
            .map_or(true, |best| candidate.score > best.score);
        if better {
            self.best = Some(candidate);
        }
        better
    }

    pub fn best(&self) -> Option<&CandidateMatrix> {
        self.best.as_ref()
    }

    pub fn best_score(&self) -> u32 {
        self.best.as_ref().map_or(0, |c| c.score)
    }

    /// Stages a decomposition to be committed at the end of the frame.
    pub fn stage(&mut self, decomposition: Decomposition) {
        self.pending = Some(decomposition);
    }

    pub fn pending(&self) -> Option<&Decomposition> {
        self.pending.as_ref()
    }

    pub fn committed(&self) -> Option<&DecomposedCamera> {
        self.committed.as_ref()
    }

    /// Frame boundary: commits the pending decomposition when `locked`, then
    /// clears all per-frame state.
    ///
    /// Returns the camera if a commit happened this frame.
    pub fn end_frame(&mut self, locked: bool) -> Option<&DecomposedCamera> {
        self.best = None;
        let pending = self.pending.take();

        match (locked, pending) {
            (true, Some(decomposition)) => {
                self.committed = Some(DecomposedCamera::new(&decomposition));
                self.committed.as_ref()
            }
            _ => None,
        }
    }
}
