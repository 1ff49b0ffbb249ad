use crate::analysis::IntervalKind;

use super::session::{ActiveInterval, Snapshot};

pub type IntervalHandler = Box<dyn FnMut(&ActiveInterval) + Send>;
pub type FrameHandler = Box<dyn FnMut(&Snapshot) + Send>;

/// Listener table for interval transitions and per-frame snapshots.
#[derive(Default)]
pub struct Hooks {
    intervals: [Vec<IntervalHandler>; 5],
    frames: Vec<FrameHandler>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` each time a new interval of `kind` becomes active.
    pub fn on<F>(&mut self, kind: IntervalKind, handler: F)
    where
        F: FnMut(&ActiveInterval) + Send + 'static,
    {
        self.intervals[kind.index()].push(Box::new(handler));
    }

    /// Call `handler` with a fresh snapshot after every frame.
    pub fn on_frame<F>(&mut self, handler: F)
    where
        F: FnMut(&Snapshot) + Send + 'static,
    {
        self.frames.push(Box::new(handler));
    }

    pub fn wants_frames(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn dispatch(&mut self, changes: &[ActiveInterval]) {
        for change in changes {
            for handler in &mut self.intervals[change.kind.index()] {
                handler(change);
            }
        }
    }

    pub fn publish(&mut self, snapshot: &Snapshot) {
        for handler in &mut self.frames {
            handler(snapshot);
        }
    }
}
