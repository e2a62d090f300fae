/// Engine time in seconds.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64);

impl Time {
    pub const ZERO: Time = Time(0.0);

    /// Browser frame timestamps (`requestAnimationFrame`, `performance.now()`) are
    /// milliseconds.
    pub fn from_millis(ms: f64) -> Self {
        Self(ms / 1000.0)
    }

    pub fn as_millis(self) -> f64 {
        self.0 * 1000.0
    }

    /// Seconds elapsed since `earlier`, clamped at zero so a clock that jumps
    /// backwards never produces a negative step.
    pub fn since(self, earlier: Time) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn millis_round_trip() {
        let t = Time::from_millis(1500.0);
        assert_eq!(t, Time(1.5));
        assert_eq!(t.as_millis(), 1500.0);
    }

    #[test]
    fn since_never_negative() {
        assert_eq!(Time(1.0).since(Time(2.0)), 0.0);
        assert_eq!(Time(2.5).since(Time(2.0)), 0.5);
    }
}
