//! Simulated processing progress.
//!
//! The percentage is perceptual feedback only: a ticker adds a fixed step on
//! an interval up to a ceiling, and the value jumps to 100 when the network
//! call settles. It is not derived from bytes transferred, and its precision
//! must not be "improved" without real progress reporting from upstream.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Production tick interval; tests shorten it.
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);
const TICK_STEP: u8 = 5;
const TICK_CEILING: u8 = 90;
const SETTLED: u8 = 100;

/// One ticker advance, capped at the ceiling so the bar never looks done
/// before the call settles.
fn next_step(current: u8) -> u8 {
    current.saturating_add(TICK_STEP).min(TICK_CEILING)
}

/// A running progress simulation. The ticker task stops on [`finish`] and is
/// aborted on drop, so it cannot outlive the request it decorates.
///
/// [`finish`]: SimulatedProgress::finish
#[derive(Debug)]
pub struct SimulatedProgress {
    value: Arc<AtomicU8>,
    ticker: JoinHandle<()>,
}

impl SimulatedProgress {
    pub fn start(period: Duration) -> Self {
        let value = Arc::new(AtomicU8::new(0));
        let ticked = Arc::clone(&value);
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick of a tokio interval fires immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let current = ticked.load(Ordering::SeqCst);
                ticked.store(next_step(current), Ordering::SeqCst);
            }
        });
        Self { value, ticker }
    }

    pub fn percent(&self) -> u8 {
        self.value.load(Ordering::SeqCst)
    }

    /// Stop the ticker and force the value to 100, whatever it showed.
    pub fn finish(&self) {
        self.ticker.abort();
        self.value.store(SETTLED, Ordering::SeqCst);
    }
}

impl Drop for SimulatedProgress {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_advance_by_five_up_to_the_ceiling() {
        assert_eq!(next_step(0), 5);
        assert_eq!(next_step(85), 90);
        assert_eq!(next_step(88), 90);
        assert_eq!(next_step(90), 90);
    }

    #[tokio::test]
    async fn ticker_advances_but_respects_the_ceiling() {
        let progress = SimulatedProgress::start(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let percent = progress.percent();
        assert!(percent > 0, "ticker never advanced");
        assert!(percent <= 90, "ticker passed the ceiling: {percent}");
    }

    #[tokio::test]
    async fn finish_forces_one_hundred_and_stops_the_ticker() {
        let progress = SimulatedProgress::start(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(30)).await;

        progress.finish();
        assert_eq!(progress.percent(), 100);

        // A still-running ticker would cap the value back at 90.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(progress.percent(), 100);
    }
}
