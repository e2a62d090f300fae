use foundation::time::Time;

/// Frame metadata handed to every per-frame step.
///
/// Display refresh timestamps are irregular, so `dt_s` is measured between
/// consecutive timestamps rather than fixed. `Frame::new` keeps a fixed-step
/// constructor for tests and replays.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds since the previous frame (0 for the first frame).
    pub dt_s: f64,
    /// Timestamp of this frame.
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, dt_s: f64) -> Self {
        Self {
            index,
            dt_s,
            time: Time(index as f64 * dt_s),
        }
    }

    pub fn first(now: Time) -> Self {
        Self {
            index: 0,
            dt_s: 0.0,
            time: now,
        }
    }

    /// The frame following `self`, stamped at `now`.
    pub fn advance(self, now: Time) -> Self {
        Self {
            index: self.index + 1,
            dt_s: now.since(self.time),
            time: now,
        }
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.dt_s)
    }
}
