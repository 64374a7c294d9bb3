// Timing utilities used to stamp orders at insertion.

use std::sync::OnceLock;
use std::time::Instant;

/// Global anchor point for converting Instant to nanoseconds.
static EPOCH: OnceLock<Instant> = OnceLock::new();

fn get_epoch() -> &'static Instant {
    EPOCH.get_or_init(Instant::now)
}

/// Nanosecond-precision, process-local timestamp.
///
/// Monotonic and relative to an arbitrary process-start epoch, not wall-clock
/// time. FIFO ordering within a price level is maintained by list position,
/// not by this value; it is carried verbatim for callers that want it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Nanos(pub u64);

impl Nanos {
    #[inline]
    pub const fn new(nanos: u64) -> Self {
        Self(nanos)
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::ops::Sub for Nanos {
    type Output = u64;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

impl From<u64> for Nanos {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Nanos> for u64 {
    #[inline]
    fn from(value: Nanos) -> Self {
        value.0
    }
}

/// Current time in nanoseconds since an arbitrary process-local epoch.
#[inline]
pub fn now_nanos() -> Nanos {
    let epoch = get_epoch();
    let elapsed = Instant::now().duration_since(*epoch);
    Nanos(elapsed.as_nanos() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanos_creation() {
        let n = Nanos::new(12345);
        assert_eq!(n.as_u64(), 12345);
        assert_eq!(n.0, 12345);
    }

    #[test]
    fn test_nanos_from_u64() {
        let n: Nanos = 42u64.into();
        assert_eq!(n.0, 42);

        let v: u64 = n.into();
        assert_eq!(v, 42);
    }

    #[test]
    fn test_nanos_ordering() {
        let a = Nanos(100);
        let b = Nanos(200);
        let c = Nanos(100);

        assert!(a < b);
        assert!(b > a);
        assert_eq!(a, c);
    }

    #[test]
    fn test_nanos_subtraction() {
        let a = Nanos(200);
        let b = Nanos(100);
        assert_eq!(a - b, 100);

        // Saturating subtraction, no underflow.
        assert_eq!(b - a, 0);
    }

    #[test]
    fn test_now_nanos_advances() {
        let t1 = now_nanos();
        for _ in 0..1000 {
            std::hint::black_box(0);
        }
        let t2 = now_nanos();

        assert!(t2 >= t1, "time should not go backwards");
    }
}
