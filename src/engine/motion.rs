//! Path and time accounting shared by the engines.

use crate::engine::{PathResult, TimeResult};

/// Tracks the tool tip and sums travel.
///
/// Positions are machine coordinates in millimetres, feeds in mm/min, times in
/// seconds. `begin_line` clears the per-line components so that after a line
/// they hold that line's share only.
#[derive(Debug, Clone)]
pub struct MotionTracker {
    position: [f64; 3],
    rapid_feed: f64,
    path: PathResult,
    time: TimeResult,
}

impl MotionTracker {
    pub fn new(start: [f64; 3], rapid_feed: f64) -> Self {
        Self {
            position: start,
            rapid_feed,
            path: PathResult::default(),
            time: TimeResult::default(),
        }
    }

    pub fn begin_line(&mut self) {
        self.path.fast_motion = 0.0;
        self.path.work_motion = 0.0;
        self.time.fast_motion = 0.0;
        self.time.work_motion = 0.0;
    }

    pub fn position(&self) -> [f64; 3] {
        self.position
    }

    /// Move without accounting for it.
    pub fn set_position(&mut self, position: [f64; 3]) {
        self.position = position;
    }

    pub fn set_rapid_feed(&mut self, rapid_feed: f64) {
        self.rapid_feed = rapid_feed;
    }

    /// Straight rapid traverse to `target`.
    pub fn rapid(&mut self, target: [f64; 3]) {
        let distance = distance(self.position, target);
        self.position = target;
        if distance <= 0.0 {
            return;
        }
        self.add_path(distance);
        self.path.fast_motion += distance;
        if self.rapid_feed > 0.0 {
            let seconds = distance / self.rapid_feed * 60.0;
            self.time.total += seconds;
            self.time.fast_motion += seconds;
        }
    }

    /// Cutting move of `length` ending at `target`. A feed of zero counts the
    /// path but no time.
    pub fn cut(&mut self, target: [f64; 3], length: f64, feed: f64) {
        self.position = target;
        if length <= 0.0 {
            return;
        }
        self.add_path(length);
        self.path.work_motion += length;
        if feed > 0.0 {
            let seconds = length / feed * 60.0;
            self.time.total += seconds;
            self.time.work_motion += seconds;
        }
    }

    pub fn dwell(&mut self, seconds: f64) {
        if seconds > 0.0 {
            self.time.total += seconds;
        }
    }

    /// Start counting the tool path of tool `id` from zero.
    pub fn change_tool(&mut self, id: u32) {
        if self.path.tool_id != id {
            log::trace!("tool change T{} -> T{}", self.path.tool_id, id);
        }
        self.path.tool_id = id;
        self.path.tool_total = 0.0;
    }

    pub fn path(&self) -> PathResult {
        self.path
    }

    pub fn time(&self) -> TimeResult {
        self.time
    }

    fn add_path(&mut self, length: f64) {
        self.path.total += length;
        self.path.tool_total += length;
    }
}

pub fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(p, q)| (q - p) * (q - p))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rapid_and_cut_accounting() {
        let mut tracker = MotionTracker::new([0.0; 3], 6000.0);

        tracker.begin_line();
        tracker.rapid([30.0, 40.0, 0.0]);
        assert_eq!(tracker.path().total, 50.0);
        assert_eq!(tracker.path().fast_motion, 50.0);
        assert!((tracker.time().total - 0.5).abs() < 1e-9);

        tracker.begin_line();
        tracker.cut([30.0, 40.0, -10.0], 10.0, 100.0);
        assert_eq!(tracker.path().fast_motion, 0.0);
        assert_eq!(tracker.path().work_motion, 10.0);
        assert!((tracker.time().work_motion - 6.0).abs() < 1e-9);
        assert!((tracker.time().total - 6.5).abs() < 1e-9);
    }

    #[test]
    fn test_tool_change_resets_tool_path() {
        let mut tracker = MotionTracker::new([0.0; 3], 6000.0);
        tracker.rapid([10.0, 0.0, 0.0]);
        tracker.change_tool(2);
        tracker.rapid([15.0, 0.0, 0.0]);

        let path = tracker.path();
        assert_eq!(path.tool_id, 2);
        assert_eq!(path.total, 15.0);
        assert_eq!(path.tool_total, 5.0);
    }

    #[test]
    fn test_zero_length_moves_cost_nothing() {
        let mut tracker = MotionTracker::new([1.0, 2.0, 3.0], 6000.0);
        tracker.rapid([1.0, 2.0, 3.0]);
        tracker.cut([1.0, 2.0, 3.0], 0.0, 100.0);
        assert_eq!(tracker.path(), PathResult::default());
        assert_eq!(tracker.time(), TimeResult::default());
    }
}
