//! Path/time annotations
//!
//! Built from the engine's cumulative results after each line. Running rapid
//! and cut totals only exist for the duration of one parse.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::engine::{PathResult, TimeResult};

/// Smallest magnitude worth printing.
pub const TOLERANCE: f64 = 0.01;

/// Annotation text keyed by line number.
pub type PathTimeResult = BTreeMap<usize, String>;

#[derive(Debug, Default)]
pub struct PathTimeAccumulator {
    previous_time: f64,
    rapid_path: f64,
    rapid_time: f64,
    cut_path: f64,
    cut_time: f64,
}

impl PathTimeAccumulator {
    /// Fold in the results read after line `number`. Returns the annotation and
    /// its key when the time total moved.
    pub fn observe(&mut self, number: usize, path: PathResult, time: TimeResult) -> Option<(usize, String)> {
        if !time.total.is_finite() || time.total == self.previous_time {
            return None;
        }
        self.previous_time = time.total;

        if path.fast_motion != 0.0 {
            self.rapid_path += path.fast_motion;
        }
        if time.fast_motion != 0.0 {
            self.rapid_time += time.fast_motion;
        }
        if path.work_motion != 0.0 {
            self.cut_path += path.work_motion;
        }
        if time.work_motion != 0.0 {
            self.cut_time += time.work_motion;
        }

        let mut text = String::from(" | ");
        let mut clause = |label: &str, value: String| {
            let _ = write!(text, "{} = {} | ", label, value);
        };
        if path.total >= TOLERANCE {
            clause("Total path", format!("{:.2}", path.total));
        }
        if time.total >= TOLERANCE {
            clause("Total time", format_time(time.total));
        }
        if path.tool_total >= TOLERANCE && path.total - path.tool_total >= TOLERANCE {
            clause(&format!("T{} total path", path.tool_id), format!("{:.2}", path.tool_total));
        }
        if path.fast_motion >= TOLERANCE {
            clause("Total rapid path", format!("{:.2}", self.rapid_path));
        }
        if time.fast_motion >= TOLERANCE {
            clause("Total rapid time", format_time(self.rapid_time));
        }
        if path.work_motion >= TOLERANCE {
            clause("Total cut path", format!("{:.2}", self.cut_path));
        }
        if time.work_motion >= TOLERANCE {
            clause("Total cut time", format_time(self.cut_time));
        }

        Some((number.saturating_sub(1), text))
    }
}

/// `MM:SS.mmm`, or `H:MM:SS.mmm` from one hour up.
pub fn format_time(seconds: f64) -> String {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = millis / 3_600_000;
    let minutes = millis / 60_000 % 60;
    let secs = millis / 1000 % 60;
    let ms = millis % 1000;
    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00.000");
        assert_eq!(format_time(6.5), "00:06.500");
        assert_eq!(format_time(75.25), "01:15.250");
        assert_eq!(format_time(3723.004), "1:02:03.004");
    }

    #[test]
    fn test_no_annotation_without_time_change() {
        let mut acc = PathTimeAccumulator::default();
        assert_eq!(acc.observe(1, PathResult::default(), TimeResult::default()), None);
    }

    #[test]
    fn test_non_finite_total_ignored() {
        let mut acc = PathTimeAccumulator::default();
        let time = TimeResult {
            total: f64::NAN,
            ..TimeResult::default()
        };
        assert_eq!(acc.observe(1, PathResult::default(), time), None);
        assert_eq!(acc.observe(2, PathResult::default(), time), None);
    }

    #[test]
    fn test_clauses_and_key() {
        let mut acc = PathTimeAccumulator::default();
        let path = PathResult {
            total: 10.0,
            tool_total: 10.0,
            tool_id: 1,
            fast_motion: 10.0,
            work_motion: 0.0,
        };
        let time = TimeResult {
            total: 0.06,
            fast_motion: 0.06,
            work_motion: 0.0,
        };
        let (key, text) = acc.observe(2, path, time).unwrap();
        assert_eq!(key, 1);
        assert_eq!(
            text,
            " | Total path = 10.00 | Total time = 00:00.060 | Total rapid path = 10.00 | Total rapid time = 00:00.060 | "
        );
    }

    #[test]
    fn test_tolerance_boundary() {
        let mut acc = PathTimeAccumulator::default();
        let at = PathResult {
            total: 0.01,
            work_motion: 0.01,
            tool_total: 0.01,
            ..PathResult::default()
        };
        let time = TimeResult {
            total: 1.0,
            work_motion: 1.0,
            fast_motion: 0.0,
        };
        let (_, text) = acc.observe(1, at, time).unwrap();
        assert!(text.contains("Total path = 0.01 |"));
        assert!(text.contains("Total cut path = 0.01 |"));

        let below = PathResult {
            total: 0.02,
            work_motion: 0.009,
            tool_total: 0.02,
            ..PathResult::default()
        };
        let time = TimeResult {
            total: 2.0,
            work_motion: 1.0,
            fast_motion: 0.0,
        };
        let (_, text) = acc.observe(2, below, time).unwrap();
        assert!(!text.contains("Total cut path"));
    }

    #[test]
    fn test_tool_clause_after_tool_change() {
        let mut acc = PathTimeAccumulator::default();
        let path = PathResult {
            total: 15.0,
            tool_total: 5.0,
            tool_id: 2,
            fast_motion: 5.0,
            work_motion: 0.0,
        };
        let time = TimeResult {
            total: 0.09,
            fast_motion: 0.03,
            work_motion: 0.0,
        };
        let (_, text) = acc.observe(3, path, time).unwrap();
        assert!(text.contains("T2 total path = 5.00 |"));
    }
}
