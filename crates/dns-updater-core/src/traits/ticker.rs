// # Ticker Trait
//
// Defines the timer that wakes the reconciliation loop.
//
// ## Implementations
//
// - Fixed interval: [`crate::schedule::IntervalTicker`]
// - Tests drive the loop with a manually fed stream instead of sleeping
//
// ## Usage
//
// ```rust,ignore
// use dns_updater_core::Ticker;
// use tokio_stream::StreamExt;
//
// let mut ticks = ticker.ticks();
// while ticks.next().await.is_some() {
//     // run one cycle
// }
// ```

use std::pin::Pin;
use tokio_stream::Stream;

/// Source of "start a cycle now" signals
///
/// The stream yields once per cycle. An ending stream stops the loop; the
/// production ticker never ends.
pub trait Ticker: Send + Sync {
    /// Stream of ticks
    ///
    /// The first tick should arrive immediately so the process reconciles as
    /// soon as it starts.
    fn ticks(&self) -> Pin<Box<dyn Stream<Item = ()> + Send + 'static>>;
}
