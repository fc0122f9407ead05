use serde::Serialize;

use crate::matrix::Matrix4;

/// Receives recovered transforms. Each call fully replaces the named transform.
pub trait TransformSink {
    fn set_view(&mut self, view: &Matrix4);
    fn set_projection(&mut self, projection: &Matrix4);
    fn set_world(&mut self, world: &Matrix4);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "transform", content = "matrix", rename_all = "snake_case")]
pub enum TransformCall {
    View(Matrix4),
    Projection(Matrix4),
    World(Matrix4),
}

/// Sink that keeps every call in order.
#[derive(Debug, Clone, Default)]
pub struct TransformRecorder {
    pub calls: Vec<TransformCall>,
}

impl TransformRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_view(&self) -> Option<&Matrix4> {
        self.calls.iter().rev().find_map(|call| match call {
            TransformCall::View(m) => Some(m),
            _ => None,
        })
    }

    pub fn last_projection(&self) -> Option<&Matrix4> {
        self.calls.iter().rev().find_map(|call| match call {
            TransformCall::Projection(m) => Some(m),
            _ => None,
        })
    }

    pub fn worlds(&self) -> impl Iterator<Item = &Matrix4> {
        self.calls.iter().filter_map(|call| match call {
            TransformCall::World(m) => Some(m),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl TransformSink for TransformRecorder {
    fn set_view(&mut self, view: &Matrix4) {
        self.calls.push(TransformCall::View(*view));
    }

    fn set_projection(&mut self, projection: &Matrix4) {
        self.calls.push(TransformCall::Projection(*projection));
    }

    fn set_world(&mut self, world: &Matrix4) {
        self.calls.push(TransformCall::World(*world));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_keeps_order() {
        let mut recorder = TransformRecorder::new();
        let mut view = Matrix4::IDENTITY;
        view.m[12] = 5.0;
        recorder.set_world(&Matrix4::IDENTITY);
        recorder.set_view(&view);
        recorder.set_projection(&Matrix4::IDENTITY);

        assert_eq!(recorder.calls.len(), 3);
        assert_eq!(recorder.calls[0], TransformCall::World(Matrix4::IDENTITY));
        assert_eq!(recorder.last_view(), Some(&view));
        assert_eq!(recorder.worlds().count(), 1);
    }
}
