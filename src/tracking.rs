//! Pose samples delivered by the XR runtime each frame.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn label(self) -> &'static str {
        match self {
            Handedness::Left => "left",
            Handedness::Right => "right",
        }
    }
}

/// World-space joint samples for one hand. Any of them may be missing while
/// the hand is out of tracking range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HandPose {
    #[serde(default)]
    pub index_tip: Option<Vec3>,
    #[serde(default)]
    pub thumb_tip: Option<Vec3>,
    #[serde(default)]
    pub wrist: Option<Quat>,
}

impl HandPose {
    pub fn untracked() -> Self {
        Self::default()
    }

    pub fn new(index_tip: Vec3, thumb_tip: Vec3, wrist: Quat) -> Self {
        Self {
            index_tip: Some(index_tip),
            thumb_tip: Some(thumb_tip),
            wrist: Some(wrist),
        }
    }

    /// All three joints, or `None` if any is unavailable.
    pub fn joints(&self) -> Option<(Vec3, Vec3, Quat)> {
        Some((self.index_tip?, self.thumb_tip?, self.wrist?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingFrame {
    #[serde(default)]
    pub time_ms: u64,
    #[serde(default)]
    pub head: Option<HeadPose>,
    #[serde(default)]
    pub left: HandPose,
    #[serde(default)]
    pub right: HandPose,
}

impl TrackingFrame {
    pub fn hand(&self, hand: Handedness) -> &HandPose {
        match hand {
            Handedness::Left => &self.left,
            Handedness::Right => &self.right,
        }
    }
}

pub trait SpatialTracker {
    /// The next frame of samples, or `None` once the session has ended.
    fn next_frame(&mut self) -> Option<TrackingFrame>;
}

/// Plays back a fixed list of frames.
pub struct ScriptedTracker {
    frames: VecDeque<TrackingFrame>,
}

impl ScriptedTracker {
    pub fn new(frames: impl IntoIterator<Item = TrackingFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl SpatialTracker for ScriptedTracker {
    fn next_frame(&mut self) -> Option<TrackingFrame> {
        self.frames.pop_front()
    }
}

/// Reads a session recorded as one JSON `TrackingFrame` per line. Blank
/// lines are skipped.
pub struct RecordedTracker {
    inner: ScriptedTracker,
}

impl RecordedTracker {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open recording {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to read recording {}", path.display()))
    }

    pub fn from_reader(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut frames = Vec::new();

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let frame: TrackingFrame = serde_json::from_str(&line)
                .with_context(|| format!("Invalid tracking frame on line {}", line_number + 1))?;
            frames.push(frame);
        }

        Ok(Self {
            inner: ScriptedTracker::new(frames),
        })
    }

    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }
}

impl SpatialTracker for RecordedTracker {
    fn next_frame(&mut self) -> Option<TrackingFrame> {
        self.inner.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn recording_parses_partial_hands() {
        let recording = concat!(
            r#"{"time_ms": 0, "left": {"index_tip": [0.0, 1.0, -0.3], "#,
            r#""thumb_tip": [0.0, 1.02, -0.3], "wrist": [0.0, 0.0, 0.0, 1.0]}}"#,
            "\n\n",
            r#"{"time_ms": 16}"#,
            "\n"
        );

        let mut tracker = RecordedTracker::from_reader(Cursor::new(recording)).unwrap();
        assert_eq!(tracker.remaining(), 2);

        let first = tracker.next_frame().unwrap();
        assert!(first.left.joints().is_some());
        assert!(first.right.joints().is_none());

        let second = tracker.next_frame().unwrap();
        assert_eq!(second.time_ms, 16);
        assert!(second.head.is_none());
        assert!(tracker.next_frame().is_none());
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let err = RecordedTracker::from_reader(Cursor::new("{}\nnot json\n"))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
