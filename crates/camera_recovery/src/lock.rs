//! Scanning → locked transition driven by per-frame motion evidence.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockPhase {
    #[default]
    Scanning,
    /// Terminal for the life of the stream.
    Locked,
}

impl fmt::Display for LockPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LockPhase::Scanning => "SCANNING",
            LockPhase::Locked => "LOCKED",
        })
    }
}

/// Result of feeding one frame's best scalar to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evidence {
    pub delta: f32,
    pub consecutive: u32,
    /// True only on the frame that completed the lock.
    pub locked_now: bool,
}

#[derive(Debug, Clone)]
pub struct LockTracker {
    phase: LockPhase,
    consecutive: u32,
    previous: f32,
    motion_threshold: f32,
    frames_required: u32,
}

impl LockTracker {
    pub fn new(motion_threshold: f32, frames_required: u32) -> Self {
        Self {
            phase: LockPhase::Scanning,
            consecutive: 0,
            previous: 0.0,
            motion_threshold,
            frames_required,
        }
    }

    pub fn phase(&self) -> LockPhase {
        self.phase
    }

    pub fn is_locked(&self) -> bool {
        self.phase == LockPhase::Locked
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Records the current frame's distinguishing scalar.
    ///
    /// A frame without motion leaves the counter untouched rather than resetting
    /// it, so a paused camera does not restart the count.
    pub fn observe(&mut self, scalar: f32) -> Evidence {
        let delta = (scalar - self.previous).abs();
        if self.is_locked() {
            return Evidence {
                delta,
                consecutive: self.consecutive,
                locked_now: false,
            };
        }

        if delta > self.motion_threshold {
            self.consecutive += 1;
        }
        self.previous = scalar;

        let locked_now = self.consecutive >= self.frames_required;
        if locked_now {
            self.phase = LockPhase::Locked;
        }

        Evidence {
            delta,
            consecutive: self.consecutive,
            locked_now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_scalar_never_locks() {
        let mut lock = LockTracker::new(0.01, 3);
        lock.observe(500.0);
        for _ in 0..1000 {
            let e = lock.observe(500.005);
            assert!(!e.locked_now);
        }
        assert_eq!(lock.phase(), LockPhase::Scanning);
        assert_eq!(lock.consecutive(), 1);
    }

    #[test]
    fn test_small_deltas_stay_scanning() {
        let mut lock = LockTracker::new(0.01, 3);
        let mut v = 0.0;
        for _ in 0..100 {
            v += 0.005;
            lock.observe(v);
        }
        assert_eq!(lock.phase(), LockPhase::Scanning);
    }

    #[test]
    fn test_locks_on_third_moving_frame() {
        let mut lock = LockTracker::new(0.01, 3);
        assert!(!lock.observe(10.0).locked_now);
        assert!(!lock.observe(11.0).locked_now);
        let third = lock.observe(12.0);
        assert!(third.locked_now);
        assert_eq!(third.consecutive, 3);
        assert!(lock.is_locked());

        // Exactly once.
        assert!(!lock.observe(13.0).locked_now);
        assert!(!lock.observe(14.0).locked_now);
        assert_eq!(lock.phase(), LockPhase::Locked);
    }

    #[test]
    fn test_stall_does_not_reset_counter() {
        let mut lock = LockTracker::new(0.01, 3);
        lock.observe(10.0);
        lock.observe(11.0);
        lock.observe(11.0); // paused camera
        assert_eq!(lock.consecutive(), 2);
        assert!(lock.observe(12.0).locked_now);
    }

    #[test]
    fn test_first_observation_compares_against_zero() {
        let mut lock = LockTracker::new(0.01, 3);
        let e = lock.observe(250.0);
        assert_eq!(e.delta, 250.0);
        assert_eq!(e.consecutive, 1);
    }
}
