//! Fixed-interval scheduling
//!
//! [`IntervalTicker`] fires immediately and then once per interval. A cycle
//! that overruns the interval delays the next tick instead of producing a
//! burst of catch-up ticks.

use crate::traits::Ticker;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::{Stream, StreamExt};

/// Ticker backed by `tokio::time::interval`
#[derive(Debug, Clone, Copy)]
pub struct IntervalTicker {
    period: Duration,
}

impl IntervalTicker {
    /// Create a ticker with the given period
    ///
    /// A zero period is clamped to one millisecond, since
    /// `tokio::time::interval` panics on zero.
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Ticker for IntervalTicker {
    fn ticks(&self) -> Pin<Box<dyn Stream<Item = ()> + Send + 'static>> {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Box::pin(IntervalStream::new(interval).map(|_| ()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_tick_is_immediate() {
        let ticker = IntervalTicker::new(Duration::from_secs(3600));
        let mut ticks = ticker.ticks();

        let first = tokio::time::timeout(Duration::from_millis(500), ticks.next()).await;
        assert_eq!(first.expect("first tick is immediate"), Some(()));
    }

    #[tokio::test]
    async fn test_ticks_repeat_at_period() {
        let ticker = IntervalTicker::new(Duration::from_millis(10));
        let mut ticks = ticker.ticks();

        for _ in 0..3 {
            let tick = tokio::time::timeout(Duration::from_secs(1), ticks.next()).await;
            assert_eq!(tick.expect("tick within a second"), Some(()));
        }
    }

    #[test]
    fn test_zero_period_clamped() {
        assert_eq!(
            IntervalTicker::new(Duration::ZERO).period(),
            Duration::from_millis(1)
        );
    }
}
