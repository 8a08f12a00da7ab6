//! Event identification stamped by input modules.

use serde::{Deserialize, Serialize};

/// Acquisition timestamp with nanosecond resolution.
///
/// Packs seconds and nanoseconds into a single ordered `u64` so timestamps
/// can be compared and used as index keys directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventTime(u64);

impl EventTime {
    #[must_use]
    pub fn new(sec: u32, nsec: u32) -> Self {
        Self((u64::from(sec) << 32) | u64::from(nsec))
    }

    /// Raw packed representation, seconds in the high word.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn sec(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[must_use]
    pub fn nsec(&self) -> u32 {
        (self.0 & 0xffff_ffff) as u32
    }
}

impl From<u64> for EventTime {
    fn from(packed: u64) -> Self {
        Self(packed)
    }
}

impl std::fmt::Display for EventTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.sec(), self.nsec())
    }
}

/// Identity of one event within its run.
///
/// Placed into the [`Event`](crate::Event) container by input modules; the
/// builtin `PrintEventId` module and the indexing interface consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    time: EventTime,
    run: i32,
    fiducials: u32,
}

impl EventId {
    #[must_use]
    pub fn new(time: EventTime, run: i32, fiducials: u32) -> Self {
        Self { time, run, fiducials }
    }

    #[must_use]
    pub fn time(&self) -> EventTime {
        self.time
    }

    /// Run number, or a negative value when the input does not know it.
    #[must_use]
    pub fn run(&self) -> i32 {
        self.run
    }

    /// Timing-system fiducial counter.
    #[must_use]
    pub fn fiducials(&self) -> u32 {
        self.fiducials
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "run={} time={} fiducials={}",
            self.run, self.time, self.fiducials
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_packs_and_unpacks() {
        let t = EventTime::new(1_600_000_000, 123_456_789);
        assert_eq!(t.sec(), 1_600_000_000);
        assert_eq!(t.nsec(), 123_456_789);
        assert_eq!(EventTime::from(t.as_u64()), t);
    }

    #[test]
    fn time_ordering_follows_seconds_first() {
        let early = EventTime::new(100, 999_999_999);
        let late = EventTime::new(101, 0);
        assert!(early < late);
    }

    #[test]
    fn id_display() {
        let id = EventId::new(EventTime::new(2, 5), 42, 0x1234);
        let s = id.to_string();
        assert!(s.contains("run=42"));
        assert!(s.contains("2.000000005"));
    }
}
