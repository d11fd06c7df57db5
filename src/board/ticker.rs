//! Recurring timer that releases buffered changes once bursts go quiet.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::board::aggregator::Board;

/// Shortest period the ticker runs at.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Spawn a task that calls [`Board::tick`] every `period`.
///
/// Without it, a change buffered inside a window is only released by the
/// next board operation. A `period` below [`MIN_TICK_PERIOD`] (including
/// zero) is raised to it. Abort the returned handle to stop ticking.
pub fn spawn_ticker(board: Arc<Mutex<Board>>, period: Duration) -> JoinHandle<()> {
    if period < MIN_TICK_PERIOD {
        log::warn!(
            "ticker period {:?} is below {:?}; using the minimum",
            period,
            MIN_TICK_PERIOD
        );
    }
    let period = period.max(MIN_TICK_PERIOD);
    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            timer.tick().await;
            let emitted = board.lock().tick();
            if let Some(notification) = emitted {
                log::trace!(
                    "ticker released {} change(s) for board '{}'",
                    notification.changes.len(),
                    notification.board
                );
            }
        }
    })
}
